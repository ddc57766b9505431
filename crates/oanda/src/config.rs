//! Endpoint and stream session configuration

use std::time::Duration;

/// Practice REST host
pub const PRACTICE_REST_URL: &str = "https://api-fxpractice.oanda.com";

/// Practice streaming host
pub const PRACTICE_STREAM_URL: &str = "https://stream-fxpractice.oanda.com";

/// Live REST host
pub const LIVE_REST_URL: &str = "https://api-fxtrade.oanda.com";

/// Live streaming host
pub const LIVE_STREAM_URL: &str = "https://stream-fxtrade.oanda.com";

/// Heartbeats arrive roughly every 5s, so 30s of silence means the connection is dead.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Which Oanda division to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Practice,
    Live,
}

impl Environment {
    pub fn rest_url(self) -> &'static str {
        match self {
            Environment::Practice => PRACTICE_REST_URL,
            Environment::Live => LIVE_REST_URL,
        }
    }

    pub fn stream_url(self) -> &'static str {
        match self {
            Environment::Practice => PRACTICE_STREAM_URL,
            Environment::Live => LIVE_STREAM_URL,
        }
    }
}

/// Whether a failed insert ends the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistencePolicy {
    /// Any insert failure closes the stream with a persistence error
    #[default]
    Required,
    /// Insert failures from a persistence sink are logged and counted; the
    /// stream keeps going
    BestEffort,
}

/// Per-session settings for the stream driver
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Longest wait for the next record before the session is failed
    pub idle_timeout: Duration,
    pub persistence: PersistencePolicy,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            persistence: PersistencePolicy::Required,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_urls() {
        assert_eq!(Environment::default(), Environment::Practice);
        assert!(Environment::Practice.rest_url().contains("fxpractice"));
        assert!(Environment::Practice.stream_url().starts_with("https://stream-"));
        assert!(Environment::Live.rest_url().contains("fxtrade"));
        assert!(Environment::Live.stream_url().contains("fxtrade"));
    }

    #[test]
    fn test_stream_config_default() {
        let config = StreamConfig::default();
        assert_eq!(config.idle_timeout, Duration::from_secs(30));
        assert_eq!(config.persistence, PersistencePolicy::Required);
    }
}
