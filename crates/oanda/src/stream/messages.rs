//! Pricing stream record types
//!
//! The stream interleaves two object shapes, discriminated by `type`:
//!
//! ```json
//! {"type":"PRICE","time":"2024-01-01T00:00:00.123Z","instrument":"USD_CAD",
//!  "bids":[{"price":"1.35012","liquidity":1000000}],
//!  "asks":[{"price":"1.35030","liquidity":1000000}],
//!  "closeoutBid":"1.35012","closeoutAsk":"1.35030",
//!  "status":"tradeable","tradeable":true}
//! {"type":"HEARTBEAT","time":"2024-01-01T00:00:05.000Z"}
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

pub const PRICE: &str = "PRICE";
pub const HEARTBEAT: &str = "HEARTBEAT";

/// Parse an RFC3339 timestamp as sent with `Accept-Datetime-Format: RFC3339`
pub fn parse_time(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

/// One level of the book: price and available liquidity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBucket {
    pub price: Decimal,
    pub liquidity: i64,
}

/// A live price update for one instrument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub instrument: String,
    pub time: String,
    pub bid: PriceBucket,
    pub ask: PriceBucket,
    pub closeout_bid: Option<Decimal>,
    pub closeout_ask: Option<Decimal>,
    pub tradeable: bool,
    pub status: String,
}

impl Quote {
    pub fn timestamp(&self) -> Result<DateTime<Utc>, chrono::ParseError> {
        parse_time(&self.time)
    }

    pub fn spread(&self) -> Decimal {
        self.ask.price - self.bid.price
    }
}

impl Serialize for Quote {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WirePrice::from(self).serialize(serializer)
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Type: {}", PRICE)?;
        writeln!(f, "Time: {}", self.time)?;
        writeln!(f, "Bids:")?;
        writeln!(f, "\tPrice: {}", self.bid.price)?;
        writeln!(f, "\tLiquidity: {}", self.bid.liquidity)?;
        writeln!(f, "Ask:")?;
        writeln!(f, "\tPrice: {}", self.ask.price)?;
        writeln!(f, "\tLiquidity: {}", self.ask.liquidity)?;
        writeln!(f, "Close Out Bid: {}", display_opt(&self.closeout_bid))?;
        writeln!(f, "Close Out Ask: {}", display_opt(&self.closeout_ask))?;
        writeln!(f, "Status: {}", self.status)?;
        writeln!(f, "Tradeable: {}", self.tradeable)?;
        write!(f, "Instrument: {}", self.instrument)
    }
}

fn display_opt(value: &Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Liveness marker sent when no price is pending
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heartbeat {
    #[serde(rename = "type")]
    pub kind: String,
    pub time: String,
}

impl Heartbeat {
    pub fn new(time: impl Into<String>) -> Self {
        Self {
            kind: HEARTBEAT.to_string(),
            time: time.into(),
        }
    }

    pub fn timestamp(&self) -> Result<DateTime<Utc>, chrono::ParseError> {
        parse_time(&self.time)
    }
}

impl fmt::Display for Heartbeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type: {}, Time: {}", self.kind, self.time)
    }
}

/// A record the classifier could not use. Dropped by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRecord {
    /// The `type` field, when it was a string
    pub kind: Option<String>,
    pub reason: String,
}

/// A classified pricing stream record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamRecord {
    Quote(Quote),
    Heartbeat(Heartbeat),
    Unknown(UnknownRecord),
}

impl StreamRecord {
    pub fn unknown(kind: Option<&str>, reason: impl Into<String>) -> Self {
        StreamRecord::Unknown(UnknownRecord {
            kind: kind.map(str::to_string),
            reason: reason.into(),
        })
    }
}

/// Wire shape of a PRICE object. Only the best bucket per side is kept.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WirePrice {
    #[serde(rename = "type")]
    pub kind: String,
    pub time: String,
    #[serde(default)]
    pub bids: Vec<PriceBucket>,
    #[serde(default)]
    pub asks: Vec<PriceBucket>,
    #[serde(
        rename = "closeoutBid",
        alias = "closeoutbid",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub closeout_bid: Option<Decimal>,
    #[serde(
        rename = "closeoutAsk",
        alias = "closeoutask",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub closeout_ask: Option<Decimal>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tradeable: bool,
    pub instrument: String,
}

impl WirePrice {
    pub fn into_quote(self) -> Result<Quote, &'static str> {
        let bid = self.bids.first().copied().ok_or("price record has no bids")?;
        let ask = self.asks.first().copied().ok_or("price record has no asks")?;
        Ok(Quote {
            instrument: self.instrument,
            time: self.time,
            bid,
            ask,
            closeout_bid: self.closeout_bid,
            closeout_ask: self.closeout_ask,
            tradeable: self.tradeable,
            status: self.status,
        })
    }
}

impl From<&Quote> for WirePrice {
    fn from(quote: &Quote) -> Self {
        Self {
            kind: PRICE.to_string(),
            time: quote.time.clone(),
            bids: vec![quote.bid],
            asks: vec![quote.ask],
            closeout_bid: quote.closeout_bid,
            closeout_ask: quote.closeout_ask,
            status: quote.status.clone(),
            tradeable: quote.tradeable,
            instrument: quote.instrument.clone(),
        }
    }
}
