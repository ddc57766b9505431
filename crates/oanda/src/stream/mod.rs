//! Streaming price ingestion: decode, classify, route.

pub mod classify;
pub mod decoder;
pub mod driver;
pub mod messages;
pub mod sink;

pub use classify::classify;
pub use decoder::{ByteStream, StreamDecoder};
pub use driver::{Closure, PriceSource, StreamDriver, StreamState, StreamSummary};
pub use messages::{Heartbeat, PriceBucket, Quote, StreamRecord, UnknownRecord};
pub use sink::{ConsoleSink, PersistenceSink, SinkKind, TickSink};
