//! Relational storage for stream records
//!
//! Expects two tables:
//!
//! - `price_ticks (record_type, time, bid_price, bid_liquidity, ask_price,
//!   ask_liquidity, closeout_bid, closeout_ask, status, tradeable, instrument)`
//! - `heartbeats (record_type, time)`
//!
//! Schema management is left to the deployment; see `schema.sql` for the
//! shape the inserts are written against.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Config, CreatePoolError, Pool, Runtime};
use tokio_postgres::NoTls;
use tracing::debug;

use crate::error::PersistenceError;
use crate::stream::messages::{parse_time, Heartbeat, Quote, PRICE};

const INSERT_PRICE_TICK: &str = "INSERT INTO price_ticks \
     (record_type, time, bid_price, bid_liquidity, ask_price, ask_liquidity, \
      closeout_bid, closeout_ask, status, tradeable, instrument) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)";

const INSERT_HEARTBEAT: &str = "INSERT INTO heartbeats (record_type, time) VALUES ($1, $2)";

/// Create a connection pool from a database URL. No connection is made
/// until the first checkout; a malformed URL or one without a database name
/// fails here.
pub fn create_pool(database_url: &str) -> Result<Pool, PersistenceError> {
    let mut cfg = Config::new();
    cfg.url = Some(database_url.to_string());

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| match e {
            CreatePoolError::Config(e) => {
                PersistenceError::Config(format!("invalid database URL: {}", e))
            }
            e => PersistenceError::Pool(format!("failed to create pool: {}", e)),
        })
}

/// Row-level writes for quotes and heartbeats
#[async_trait]
pub trait TickRepository: Send + Sync {
    async fn insert_quote(&self, quote: &Quote) -> Result<(), PersistenceError>;

    async fn insert_heartbeat(&self, heartbeat: &Heartbeat) -> Result<(), PersistenceError>;
}

/// [`TickRepository`] over a Postgres pool. All record fields are bound as
/// parameters; `tradeable` maps to a native `BOOLEAN`.
#[derive(Clone)]
pub struct PostgresTickRepository {
    pool: Pool,
}

impl PostgresTickRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn client(&self) -> Result<deadpool_postgres::Object, PersistenceError> {
        self.pool
            .get()
            .await
            .map_err(|e| PersistenceError::Pool(format!("failed to get connection: {}", e)))
    }
}

#[async_trait]
impl TickRepository for PostgresTickRepository {
    async fn insert_quote(&self, quote: &Quote) -> Result<(), PersistenceError> {
        let time = row_time(&quote.time)?;
        let client = self.client().await?;
        let insert_err = |e: tokio_postgres::Error| PersistenceError::Insert {
            table: "price_ticks",
            reason: e.to_string(),
        };

        let stmt = client
            .prepare_cached(INSERT_PRICE_TICK)
            .await
            .map_err(insert_err)?;
        client
            .execute(
                &stmt,
                &[
                    &PRICE,
                    &time,
                    &quote.bid.price,
                    &quote.bid.liquidity,
                    &quote.ask.price,
                    &quote.ask.liquidity,
                    &quote.closeout_bid,
                    &quote.closeout_ask,
                    &quote.status,
                    &quote.tradeable,
                    &quote.instrument,
                ],
            )
            .await
            .map_err(insert_err)?;

        debug!(instrument = %quote.instrument, time = %quote.time, "price tick stored");
        Ok(())
    }

    async fn insert_heartbeat(&self, heartbeat: &Heartbeat) -> Result<(), PersistenceError> {
        let time = row_time(&heartbeat.time)?;
        let client = self.client().await?;
        let insert_err = |e: tokio_postgres::Error| PersistenceError::Insert {
            table: "heartbeats",
            reason: e.to_string(),
        };

        let stmt = client
            .prepare_cached(INSERT_HEARTBEAT)
            .await
            .map_err(insert_err)?;
        client
            .execute(&stmt, &[&heartbeat.kind, &time])
            .await
            .map_err(insert_err)?;

        debug!(time = %heartbeat.time, "heartbeat stored");
        Ok(())
    }
}

fn row_time(value: &str) -> Result<DateTime<Utc>, PersistenceError> {
    parse_time(value).map_err(|e| PersistenceError::Timestamp {
        value: value.to_string(),
        reason: e.to_string(),
    })
}
