//! Sink adapters for classified stream records

use async_trait::async_trait;
use std::io::Write;

use crate::db::TickRepository;
use crate::error::SinkError;
use crate::stream::messages::StreamRecord;

/// What a sink does with records. `PersistencePolicy::BestEffort` only
/// applies to `Persistence` sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Console,
    Persistence,
}

/// Destination for classified records.
///
/// `Unknown` records never reach a sink through the driver; implementations
/// should ignore them if handed one directly.
#[async_trait]
pub trait TickSink: Send {
    fn kind(&self) -> SinkKind;

    /// Accept one record. Called exactly once per quote or heartbeat.
    async fn accept(&mut self, record: &StreamRecord) -> Result<(), SinkError>;

    /// Flush and release resources. Called once when the stream closes.
    async fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes human-readable records to a terminal or any other writer
pub struct ConsoleSink<W: Write + Send> {
    out: W,
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: Write + Send> TickSink for ConsoleSink<W> {
    fn kind(&self) -> SinkKind {
        SinkKind::Console
    }

    async fn accept(&mut self, record: &StreamRecord) -> Result<(), SinkError> {
        match record {
            StreamRecord::Quote(quote) => writeln!(self.out, "{}\n", quote)?,
            StreamRecord::Heartbeat(heartbeat) => writeln!(self.out, "{}", heartbeat)?,
            StreamRecord::Unknown(_) => return Ok(()),
        }
        self.out.flush()?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.out.flush()?;
        Ok(())
    }
}

/// Inserts each record as one row through a [`TickRepository`]
pub struct PersistenceSink<R: TickRepository> {
    repo: R,
}

impl<R: TickRepository> PersistenceSink<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }
}

#[async_trait]
impl<R: TickRepository> TickSink for PersistenceSink<R> {
    fn kind(&self) -> SinkKind {
        SinkKind::Persistence
    }

    async fn accept(&mut self, record: &StreamRecord) -> Result<(), SinkError> {
        match record {
            StreamRecord::Quote(quote) => self.repo.insert_quote(quote).await?,
            StreamRecord::Heartbeat(heartbeat) => self.repo.insert_heartbeat(heartbeat).await?,
            StreamRecord::Unknown(_) => {}
        }
        Ok(())
    }
}
