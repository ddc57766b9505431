//! Stream driver
//!
//! Owns one pricing connection from open to close and moves every decoded
//! record through the classifier into a sink. States advance
//! `Connecting -> Streaming -> Closed`; `Closed` is terminal and the body is
//! released when the decoder that owns it is dropped on the way out.

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::{PersistencePolicy, StreamConfig};
use crate::error::{SinkError, StreamError};
use crate::stream::classify::classify;
use crate::stream::decoder::{ByteStream, StreamDecoder};
use crate::stream::messages::StreamRecord;
use crate::stream::sink::{SinkKind, TickSink};
use crate::types::PricingStreamRequest;

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closure {
    Clean,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Streaming,
    Closed(Closure),
}

/// Record counts for one finished session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub quotes: u64,
    pub heartbeats: u64,
    pub unknown: u64,
    /// Persistence failures tolerated under `PersistencePolicy::BestEffort`
    pub sink_failures: u64,
    /// Stopped by the shutdown signal rather than end of stream
    pub cancelled: bool,
}

/// Opens the raw pricing body. A non-2xx response is an error here.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn open(&self, request: &PricingStreamRequest) -> Result<ByteStream, StreamError>;
}

pub struct StreamDriver<P: PriceSource, K: TickSink> {
    source: P,
    sink: K,
    config: StreamConfig,
    state: watch::Sender<StreamState>,
}

impl<P: PriceSource, K: TickSink> StreamDriver<P, K> {
    pub fn new(source: P, sink: K, config: StreamConfig) -> Self {
        let (state, _) = watch::channel(StreamState::Connecting);
        Self {
            source,
            sink,
            config,
            state,
        }
    }

    /// Watch handle on the driver's state
    pub fn state(&self) -> watch::Receiver<StreamState> {
        self.state.subscribe()
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Run one session until end of stream, a fatal error, or `shutdown`
    /// flips to `true`.
    ///
    /// The sink is closed exactly once before returning. No reconnect is
    /// attempted; call `run` again for a fresh connection.
    pub async fn run(
        &mut self,
        request: &PricingStreamRequest,
        shutdown: watch::Receiver<bool>,
    ) -> Result<StreamSummary, StreamError> {
        self.state.send_replace(StreamState::Connecting);

        let streamed = self.stream(request, shutdown).await;
        let closed = self.sink.close().await;

        let result = match (streamed, closed) {
            (Ok(_), Err(e)) => Err(StreamError::from(e)),
            (Err(e), Err(close_err)) => {
                warn!(error = %close_err, "failed to close sink");
                Err(e)
            }
            (streamed, Ok(())) => streamed,
        };

        let closure = match &result {
            Ok(summary) => {
                info!(
                    quotes = summary.quotes,
                    heartbeats = summary.heartbeats,
                    unknown = summary.unknown,
                    sink_failures = summary.sink_failures,
                    cancelled = summary.cancelled,
                    "price stream closed"
                );
                Closure::Clean
            }
            Err(e) => {
                error!(error = %e, "price stream failed");
                Closure::Failed(e.to_string())
            }
        };
        self.state.send_replace(StreamState::Closed(closure));

        result
    }

    async fn stream(
        &mut self,
        request: &PricingStreamRequest,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<StreamSummary, StreamError> {
        let mut summary = StreamSummary::default();

        let body = tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => {
                info!("shutdown requested before stream opened");
                summary.cancelled = true;
                return Ok(summary);
            }
            opened = self.source.open(request) => opened?,
        };

        self.state.send_replace(StreamState::Streaming);
        info!(
            instruments = %request.instruments.join(","),
            sink = ?self.sink.kind(),
            "price stream open"
        );

        let mut decoder = StreamDecoder::new(body);
        let idle = self.config.idle_timeout;

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => {
                    info!("shutdown signal received");
                    summary.cancelled = true;
                    break;
                }
                next = tokio::time::timeout(idle, decoder.next_value()) => next,
            };

            let value = match next {
                Err(_) => {
                    return Err(StreamError::Idle {
                        timeout_ms: idle.as_millis() as u64,
                    })
                }
                Ok(result) => match result? {
                    Some(value) => value,
                    None => break,
                },
            };

            let record = classify(value);
            if let StreamRecord::Unknown(unknown) = &record {
                debug!(kind = ?unknown.kind, reason = %unknown.reason, "dropping record");
                summary.unknown += 1;
                continue;
            }

            match self.sink.accept(&record).await {
                Ok(()) => match record {
                    StreamRecord::Quote(_) => summary.quotes += 1,
                    StreamRecord::Heartbeat(_) => summary.heartbeats += 1,
                    StreamRecord::Unknown(_) => {}
                },
                Err(SinkError::Persistence(e))
                    if self.sink.kind() == SinkKind::Persistence
                        && self.config.persistence == PersistencePolicy::BestEffort =>
                {
                    warn!(error = %e, "failed to persist record, continuing");
                    summary.sink_failures += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        debug!(bytes = decoder.consumed(), "price stream drained");
        Ok(summary)
    }
}

/// Resolves once the flag reads `true`. A dropped sender never resolves.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
