use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Candle time bucket, as named by the instruments endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    S5,
    S10,
    S15,
    S30,
    M1,
    M2,
    M4,
    M5,
    M10,
    M15,
    M30,
    H1,
    H2,
    H3,
    H4,
    H6,
    H8,
    H12,
    D,
    W,
    M,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid granularity '{0}', expected one of S5..S30, M1..M30, H1..H12, D, W, M")]
pub struct ParseGranularityError(pub String);

impl Granularity {
    pub const ALL: [Self; 21] = [
        Self::S5,
        Self::S10,
        Self::S15,
        Self::S30,
        Self::M1,
        Self::M2,
        Self::M4,
        Self::M5,
        Self::M10,
        Self::M15,
        Self::M30,
        Self::H1,
        Self::H2,
        Self::H3,
        Self::H4,
        Self::H6,
        Self::H8,
        Self::H12,
        Self::D,
        Self::W,
        Self::M,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::S5 => "S5",
            Self::S10 => "S10",
            Self::S15 => "S15",
            Self::S30 => "S30",
            Self::M1 => "M1",
            Self::M2 => "M2",
            Self::M4 => "M4",
            Self::M5 => "M5",
            Self::M10 => "M10",
            Self::M15 => "M15",
            Self::M30 => "M30",
            Self::H1 => "H1",
            Self::H2 => "H2",
            Self::H3 => "H3",
            Self::H4 => "H4",
            Self::H6 => "H6",
            Self::H8 => "H8",
            Self::H12 => "H12",
            Self::D => "D",
            Self::W => "W",
            Self::M => "M",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = ParseGranularityError;

    // Case matters: "M" is monthly, "m" is not a granularity.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|g| g.as_str() == value)
            .ok_or_else(|| ParseGranularityError(value.to_string()))
    }
}

/// Parameters for one candles fetch
#[derive(Debug, Clone)]
pub struct CandleRequest {
    pub instrument: String,
    pub granularity: Granularity,
    /// Number of candles; the provider defaults to 500 when absent
    pub count: Option<u32>,
}

impl CandleRequest {
    pub fn new(instrument: impl Into<String>, granularity: Granularity) -> Self {
        Self {
            instrument: instrument.into(),
            granularity,
            count: None,
        }
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }
}

/// Open/high/low/close for one side of the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ohlc {
    #[serde(rename = "o")]
    pub open: Decimal,
    #[serde(rename = "h")]
    pub high: Decimal,
    #[serde(rename = "l")]
    pub low: Decimal,
    #[serde(rename = "c")]
    pub close: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub complete: bool,
    pub volume: i64,
    pub time: String,
    pub bid: Ohlc,
    pub ask: Ohlc,
}

/// Historical bid/ask candles for one instrument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleSeries {
    pub instrument: String,
    pub granularity: Granularity,
    #[serde(default)]
    pub candles: Vec<Candle>,
}

impl CandleSeries {
    /// The last candle in the series, which may still be forming
    pub fn most_recent(&self) -> Option<&Candle> {
        self.candles.last()
    }
}

impl fmt::Display for CandleSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Instrument: \t\t{}", self.instrument)?;
        writeln!(f, "Granularity: \t\t{}", self.granularity)?;
        write!(f, "Candles - Count: \t{}", self.candles.len())?;
        let Some(candle) = self.most_recent() else {
            return Ok(());
        };
        writeln!(f)?;
        writeln!(f, "Candles - Complete: \t{}", candle.complete)?;
        writeln!(f, "Candles - Volume: \t{}", candle.volume)?;
        writeln!(f, "Candles - Time: \t{}", candle.time)?;
        for (label, side) in [("Bid", &candle.bid), ("Ask", &candle.ask)] {
            writeln!(f, "\t- {}:", label)?;
            writeln!(f, "\t\tOpen: \t{}", side.open)?;
            writeln!(f, "\t\tHigh: \t{}", side.high)?;
            writeln!(f, "\t\tLow: \t{}", side.low)?;
            writeln!(f, "\t\tClose: \t{}", side.close)?;
        }
        Ok(())
    }
}

/// Parameters for opening the pricing stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingStreamRequest {
    pub instruments: Vec<String>,
    /// Send a price snapshot for every instrument on connect
    pub snapshot: bool,
    pub include_home_conversions: bool,
}

impl PricingStreamRequest {
    pub fn new<I, S>(instruments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            instruments: instruments.into_iter().map(Into::into).collect(),
            snapshot: true,
            include_home_conversions: false,
        }
    }

    pub fn query_pairs(&self) -> [(&'static str, String); 3] {
        [
            ("instruments", self.instruments.join(",")),
            ("snapshot", self.snapshot.to_string()),
            (
                "includeHomeConversions",
                self.include_home_conversions.to_string(),
            ),
        ]
    }
}

/// An account the token is authorized for
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountRef {
    pub id: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountsResponse {
    pub accounts: Vec<AccountRef>,
}

/// Balance and exposure summary for one account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: String,
    #[serde(default)]
    pub alias: String,
    pub currency: String,
    pub balance: Decimal,
    #[serde(rename = "NAV")]
    pub nav: Decimal,
    #[serde(rename = "unrealizedPL")]
    pub unrealized_pl: Decimal,
    pub pl: Decimal,
    pub margin_used: Decimal,
    pub margin_available: Decimal,
    pub open_trade_count: u32,
    pub open_position_count: u32,
    pub pending_order_count: u32,
    #[serde(default)]
    pub hedging_enabled: bool,
    #[serde(rename = "lastTransactionID")]
    pub last_transaction_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountSummaryResponse {
    pub account: AccountSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InstrumentTag {
    #[serde(rename = "type")]
    pub tag_type: String,
    pub name: String,
}

/// A tradeable instrument for an account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub name: String,
    #[serde(rename = "type")]
    pub instrument_type: String,
    pub display_name: String,
    pub pip_location: i32,
    pub display_precision: u32,
    pub trade_units_precision: u32,
    pub minimum_trade_size: Decimal,
    pub margin_rate: Decimal,
    #[serde(default)]
    pub tags: Vec<InstrumentTag>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InstrumentsResponse {
    pub instruments: Vec<Instrument>,
}

/// One direction (long or short) of a position
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSide {
    pub units: Decimal,
    #[serde(default)]
    pub average_price: Option<Decimal>,
    pub pl: Decimal,
    #[serde(rename = "unrealizedPL", default)]
    pub unrealized_pl: Option<Decimal>,
    #[serde(rename = "resettablePL", default)]
    pub resettable_pl: Option<Decimal>,
    #[serde(default)]
    pub financing: Option<Decimal>,
    #[serde(rename = "tradeIDs", default)]
    pub trade_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub instrument: String,
    pub pl: Decimal,
    #[serde(rename = "unrealizedPL", default)]
    pub unrealized_pl: Option<Decimal>,
    #[serde(rename = "resettablePL", default)]
    pub resettable_pl: Option<Decimal>,
    pub long: PositionSide,
    pub short: PositionSide,
}

/// An order as it appears in account details and change sets. Only the
/// fields common to every order type are kept.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub state: String,
    pub create_time: String,
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default)]
    pub units: Option<Decimal>,
    #[serde(default)]
    pub time_in_force: Option<String>,
    #[serde(default)]
    pub filled_time: Option<String>,
    #[serde(rename = "fillingTransactionID", default)]
    pub filling_transaction_id: Option<String>,
    #[serde(rename = "tradeOpenedID", default)]
    pub trade_opened_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: String,
    pub instrument: String,
    pub price: Decimal,
    pub open_time: String,
    pub state: String,
    pub initial_units: Decimal,
    pub current_units: Decimal,
    #[serde(rename = "realizedPL")]
    pub realized_pl: Decimal,
    #[serde(rename = "unrealizedPL", default)]
    pub unrealized_pl: Option<Decimal>,
    #[serde(default)]
    pub financing: Option<Decimal>,
}

/// Full account details: the summary figures plus open positions, trades
/// and pending orders
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub alias: String,
    pub currency: String,
    #[serde(default)]
    pub created_time: Option<String>,
    pub balance: Decimal,
    #[serde(rename = "NAV")]
    pub nav: Decimal,
    #[serde(rename = "unrealizedPL")]
    pub unrealized_pl: Decimal,
    pub pl: Decimal,
    #[serde(default)]
    pub financing: Option<Decimal>,
    #[serde(default)]
    pub commission: Option<Decimal>,
    pub margin_rate: Decimal,
    pub margin_used: Decimal,
    pub margin_available: Decimal,
    #[serde(default)]
    pub position_value: Option<Decimal>,
    #[serde(default)]
    pub withdrawal_limit: Option<Decimal>,
    #[serde(default)]
    pub margin_closeout_percent: Option<Decimal>,
    pub open_trade_count: u32,
    pub open_position_count: u32,
    pub pending_order_count: u32,
    #[serde(default)]
    pub hedging_enabled: bool,
    #[serde(rename = "lastTransactionID")]
    pub last_transaction_id: String,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub trades: Vec<Trade>,
    #[serde(default)]
    pub orders: Vec<Order>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountResponse {
    pub account: Account,
}

/// A transaction recorded against the account. Type-specific fields beyond
/// these are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub time: String,
    #[serde(rename = "type")]
    pub transaction_type: String,
    #[serde(rename = "batchID", default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default)]
    pub units: Option<Decimal>,
    #[serde(default)]
    pub account_balance: Option<Decimal>,
}

/// What changed on the account since a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountChangeSet {
    pub orders_created: Vec<Order>,
    pub orders_cancelled: Vec<Order>,
    pub orders_filled: Vec<Order>,
    pub orders_triggered: Vec<Order>,
    pub trades_opened: Vec<Trade>,
    pub trades_reduced: Vec<Trade>,
    pub trades_closed: Vec<Trade>,
    pub positions: Vec<Position>,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionState {
    pub instrument: String,
    #[serde(rename = "netUnrealizedPL")]
    pub net_unrealized_pl: Decimal,
    #[serde(rename = "longUnrealizedPL")]
    pub long_unrealized_pl: Decimal,
    #[serde(rename = "shortUnrealizedPL")]
    pub short_unrealized_pl: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TradeState {
    pub id: String,
    #[serde(rename = "unrealizedPL")]
    pub unrealized_pl: Decimal,
}

/// Price-dependent account figures as of the latest transaction
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountState {
    #[serde(rename = "NAV")]
    pub nav: Decimal,
    #[serde(rename = "unrealizedPL")]
    pub unrealized_pl: Decimal,
    pub margin_used: Decimal,
    pub margin_available: Decimal,
    #[serde(default)]
    pub position_value: Option<Decimal>,
    #[serde(default)]
    pub withdrawal_limit: Option<Decimal>,
    #[serde(default)]
    pub margin_closeout_percent: Option<Decimal>,
    #[serde(default)]
    pub positions: Vec<PositionState>,
    #[serde(default)]
    pub trades: Vec<TradeState>,
}

/// Response to a changes poll. Pass `last_transaction_id` as the next
/// `since` to keep polling.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountChanges {
    pub changes: AccountChangeSet,
    pub state: AccountState,
    #[serde(rename = "lastTransactionID")]
    pub last_transaction_id: String,
}

/// Error body returned with non-2xx responses
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(rename = "errorMessage")]
    pub error_message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_granularity() {
        assert_eq!("S5".parse::<Granularity>().unwrap(), Granularity::S5);
        assert_eq!(" H12 ".parse::<Granularity>().unwrap(), Granularity::H12);
        assert_eq!("M".parse::<Granularity>().unwrap(), Granularity::M);
    }

    #[test]
    fn test_rejects_invalid_granularity() {
        let err = "m5".parse::<Granularity>().unwrap_err();
        assert_eq!(err, ParseGranularityError("m5".to_string()));
        assert!("S1".parse::<Granularity>().is_err());
    }

    #[test]
    fn test_granularity_display_matches_wire() {
        for g in Granularity::ALL {
            assert_eq!(g.to_string().parse::<Granularity>().unwrap(), g);
        }
    }

    #[test]
    fn test_stream_request_query() {
        let request = PricingStreamRequest::new(["USD_CAD", "EUR_USD"]);
        let pairs = request.query_pairs();
        assert_eq!(pairs[0], ("instruments", "USD_CAD,EUR_USD".to_string()));
        assert_eq!(pairs[1], ("snapshot", "true".to_string()));
        assert_eq!(pairs[2], ("includeHomeConversions", "false".to_string()));
    }

    #[test]
    fn test_candle_series_deserialize() {
        let json = r#"{
            "instrument": "USD_CAD",
            "granularity": "S5",
            "candles": [
                {
                    "complete": true,
                    "volume": 4,
                    "time": "2024-01-01T00:00:00.000000000Z",
                    "bid": {"o": "1.32410", "h": "1.32415", "l": "1.32405", "c": "1.32412"},
                    "ask": {"o": "1.32430", "h": "1.32435", "l": "1.32425", "c": "1.32432"}
                }
            ]
        }"#;

        let series: CandleSeries = serde_json::from_str(json).unwrap();
        assert_eq!(series.granularity, Granularity::S5);
        let candle = series.most_recent().unwrap();
        assert_eq!(candle.bid.open, Decimal::from_str("1.32410").unwrap());
        assert_eq!(candle.ask.close, Decimal::from_str("1.32432").unwrap());
        assert!(candle.complete);
    }

    #[test]
    fn test_candle_series_display_empty() {
        let series = CandleSeries {
            instrument: "USD_CAD".to_string(),
            granularity: Granularity::M1,
            candles: Vec::new(),
        };
        let text = series.to_string();
        assert!(text.contains("Candles - Count: \t0"));
        assert!(!text.contains("Complete"));
    }

    #[test]
    fn test_account_summary_deserialize() {
        let json = r#"{
            "id": "101-002-1234567-001",
            "alias": "Primary",
            "currency": "CAD",
            "balance": "100000.0000",
            "NAV": "100012.5000",
            "unrealizedPL": "12.5000",
            "pl": "-3.2000",
            "marginUsed": "250.0000",
            "marginAvailable": "99762.5000",
            "openTradeCount": 1,
            "openPositionCount": 1,
            "pendingOrderCount": 0,
            "hedgingEnabled": false,
            "lastTransactionID": "42",
            "createdByUserID": 1234567
        }"#;

        let summary: AccountSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.currency, "CAD");
        assert_eq!(summary.nav, Decimal::from_str("100012.5").unwrap());
        assert_eq!(summary.pl, Decimal::from_str("-3.2").unwrap());
        assert_eq!(summary.last_transaction_id, "42");
    }

    #[test]
    fn test_account_deserialize_with_positions() {
        let json = r#"{
            "id": "101-002-1234567-001",
            "currency": "CAD",
            "createdTime": "2024-01-01T00:00:00Z",
            "balance": "100000.0000",
            "NAV": "100012.5000",
            "unrealizedPL": "12.5000",
            "pl": "0.0000",
            "marginRate": "0.02",
            "marginUsed": "250.0000",
            "marginAvailable": "99762.5000",
            "openTradeCount": 1,
            "openPositionCount": 1,
            "pendingOrderCount": 0,
            "lastTransactionID": "7",
            "positions": [{
                "instrument": "USD_CAD",
                "pl": "0.0000",
                "unrealizedPL": "12.5000",
                "long": {"units": "10000", "averagePrice": "1.35010", "pl": "0.0000", "tradeIDs": ["6"]},
                "short": {"units": "0", "pl": "0.0000"}
            }],
            "trades": [{
                "id": "6",
                "instrument": "USD_CAD",
                "price": "1.35010",
                "openTime": "2024-01-02T00:00:00Z",
                "state": "OPEN",
                "initialUnits": "10000",
                "currentUnits": "10000",
                "realizedPL": "0.0000"
            }],
            "orders": []
        }"#;

        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.alias, "");
        assert_eq!(account.margin_rate, Decimal::from_str("0.02").unwrap());
        let position = &account.positions[0];
        assert_eq!(position.long.units, Decimal::from(10000));
        assert_eq!(position.long.trade_ids, vec!["6"]);
        assert_eq!(position.short.average_price, None);
        assert_eq!(account.trades[0].current_units, Decimal::from(10000));
        assert!(account.orders.is_empty());
    }

    #[test]
    fn test_account_changes_missing_sections_default_empty() {
        let json = r#"{
            "changes": {
                "transactions": [{
                    "id": "8",
                    "time": "2024-01-02T00:00:01Z",
                    "type": "DAILY_FINANCING",
                    "accountBalance": "99999.8000"
                }]
            },
            "state": {
                "NAV": "100010.0000",
                "unrealizedPL": "10.2000",
                "marginUsed": "250.0000",
                "marginAvailable": "99760.0000",
                "trades": [{"id": "6", "unrealizedPL": "10.2000"}]
            },
            "lastTransactionID": "8"
        }"#;

        let changes: AccountChanges = serde_json::from_str(json).unwrap();
        assert!(changes.changes.orders_filled.is_empty());
        assert!(changes.changes.trades_opened.is_empty());
        let transaction = &changes.changes.transactions[0];
        assert_eq!(transaction.transaction_type, "DAILY_FINANCING");
        assert_eq!(transaction.units, None);
        assert_eq!(changes.state.trades[0].unrealized_pl, Decimal::from_str("10.2").unwrap());
        assert!(changes.state.positions.is_empty());
        assert_eq!(changes.last_transaction_id, "8");
    }
}
