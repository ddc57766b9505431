use thiserror::Error;

/// Errors from loading the credentials document
#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("failed to read credentials file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse credentials JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid credentials for account '{alias}': {reason}")]
    Invalid { alias: String, reason: String },

    #[error("no credentials for account alias '{0}'")]
    UnknownAlias(String),
}

/// Errors from one-shot REST calls (candles, accounts)
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Fatal decode failures on the price stream.
///
/// A clean end of input is not an error; it ends the record sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("stream ended mid-object with {pending_bytes} bytes pending")]
    Truncated { pending_bytes: usize },

    #[error("invalid JSON at stream offset {offset}: {message}")]
    Syntax { offset: u64, message: String },
}

/// Errors from writing ticks to the relational store
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("invalid database configuration: {0}")]
    Config(String),

    #[error("pool error: {0}")]
    Pool(String),

    #[error("invalid timestamp '{value}': {reason}")]
    Timestamp { value: String, reason: String },

    #[error("insert into {table} failed: {reason}")]
    Insert { table: &'static str, reason: String },
}

/// Errors returned by a sink when it cannot accept a record
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Terminal failures of a price stream session
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("stream rejected with HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no data received for {timeout_ms}ms")]
    Idle { timeout_ms: u64 },

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("output error: {0}")]
    Output(std::io::Error),
}

impl From<SinkError> for StreamError {
    fn from(err: SinkError) -> Self {
        match err {
            SinkError::Output(e) => StreamError::Output(e),
            SinkError::Persistence(e) => StreamError::Persistence(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::Truncated { pending_bytes: 12 };
        assert_eq!(err.to_string(), "stream ended mid-object with 12 bytes pending");

        let err = StreamError::from(DecodeError::Syntax {
            offset: 40,
            message: "expected value".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "decode error: invalid JSON at stream offset 40: expected value"
        );
    }

    #[test]
    fn test_sink_error_maps_to_stream_error() {
        let err: StreamError = SinkError::Persistence(PersistenceError::Pool("down".into())).into();
        assert!(matches!(err, StreamError::Persistence(PersistenceError::Pool(_))));

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err: StreamError = SinkError::Output(io).into();
        assert!(matches!(err, StreamError::Output(_)));
    }
}
