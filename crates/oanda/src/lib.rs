//! fxmd-oanda: Oanda v20 market data client
//!
//! Fetches historical candles and account state over REST and ingests the
//! live pricing stream, routing each quote and heartbeat to the console or a
//! Postgres store.

pub mod client;
pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod stream;
pub mod types;

pub use client::OandaClient;
pub use config::{Environment, PersistencePolicy, StreamConfig};
pub use credentials::{CredentialStore, Credentials};
pub use db::{create_pool, PostgresTickRepository, TickRepository};
pub use error::{ApiError, CredentialsError, DecodeError, PersistenceError, SinkError, StreamError};
pub use types::{
    Account, AccountChangeSet, AccountChanges, AccountRef, AccountState, AccountSummary, Candle,
    CandleRequest, CandleSeries, Granularity, Instrument, Ohlc, Order, Position, PositionSide,
    PricingStreamRequest, Trade, Transaction,
};
