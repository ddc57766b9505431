//! Incremental JSON decoder over a chunked byte stream
//!
//! The pricing body is a run of concatenated JSON objects with no framing.
//! Objects may be split across chunks or packed several to a chunk.

use bytes::{Buf, Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use std::pin::Pin;
use tracing::trace;

use crate::error::{DecodeError, StreamError};

/// Response body as seen by the decoder
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Yields raw JSON values from a byte stream, one at a time.
///
/// Not restartable: once `next_value` returns `Ok(None)` or an error, the
/// stream is finished. Dropping the decoder drops the underlying body.
pub struct StreamDecoder<S> {
    inner: S,
    buf: BytesMut,
    /// Bytes of the stream consumed by complete values (and whitespace)
    consumed: u64,
    finished: bool,
}

impl<S> StreamDecoder<S>
where
    S: Stream<Item = Result<Bytes, std::io::Error>> + Unpin,
{
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(8 * 1024),
            consumed: 0,
            finished: false,
        }
    }

    /// Total bytes decoded so far
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Next complete value; `Ok(None)` on a clean end of input.
    pub async fn next_value(&mut self) -> Result<Option<Value>, StreamError> {
        loop {
            if let Some(value) = self.decode_buffered()? {
                return Ok(Some(value));
            }
            if self.finished {
                return self.finish();
            }

            match self.inner.next().await {
                Some(Ok(chunk)) => {
                    trace!(len = chunk.len(), "stream chunk");
                    self.buf.extend_from_slice(&chunk);
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Err(StreamError::Transport(e.to_string()));
                }
                None => self.finished = true,
            }
        }
    }

    /// Decode one value from the buffer if a complete one is present.
    fn decode_buffered(&mut self) -> Result<Option<Value>, DecodeError> {
        let mut values = serde_json::Deserializer::from_slice(&self.buf).into_iter::<Value>();
        match values.next() {
            Some(Ok(value)) => {
                let used = values.byte_offset();
                self.advance(used);
                Ok(Some(value))
            }
            Some(Err(e)) if e.is_eof() => Ok(None),
            Some(Err(e)) => {
                self.finished = true;
                Err(DecodeError::Syntax {
                    offset: self.consumed,
                    message: e.to_string(),
                })
            }
            None => {
                // Whitespace only
                let used = self.buf.len();
                self.advance(used);
                Ok(None)
            }
        }
    }

    fn finish(&mut self) -> Result<Option<Value>, StreamError> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        let pending_bytes = self.buf.len();
        self.buf.clear();
        Err(DecodeError::Truncated { pending_bytes }.into())
    }

    fn advance(&mut self, n: usize) {
        self.buf.advance(n);
        self.consumed += n as u64;
    }
}
