use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Environment;
use crate::credentials::Credentials;
use crate::error::{ApiError, StreamError};
use crate::stream::decoder::ByteStream;
use crate::stream::driver::PriceSource;
use crate::types::*;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const STREAM_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

const JSON_CONTENT_TYPE: &str = "application/json";
const STREAM_CONTENT_TYPE: &str = "application/octet-stream";

/// Oanda v20 REST and streaming client for one account
pub struct OandaClient {
    http: Client,
    /// No overall timeout; the pricing body stays open indefinitely
    stream_http: Client,
    credentials: Credentials,
    rest_url: String,
    stream_url: String,
}

impl OandaClient {
    pub fn new(credentials: Credentials, environment: Environment) -> Result<Self, ApiError> {
        Self::with_urls(credentials, environment.rest_url(), environment.stream_url())
    }

    /// Create a client against explicit hosts (proxies, test servers)
    pub fn with_urls(
        credentials: Credentials,
        rest_url: impl Into<String>,
        stream_url: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Connection(format!("failed to build HTTP client: {}", e)))?;
        let stream_http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_idle_timeout(STREAM_POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|e| ApiError::Connection(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            stream_http,
            credentials,
            rest_url: rest_url.into().trim_end_matches('/').to_string(),
            stream_url: stream_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn account_id(&self) -> &str {
        &self.credentials.id
    }

    /// Auth, datetime and content-type headers shared by REST and streaming requests
    fn authorize(&self, request: RequestBuilder, content_type: &str) -> RequestBuilder {
        request
            .bearer_auth(&self.credentials.token)
            .header("Accept-Datetime-Format", "RFC3339")
            .header("Content-Type", content_type)
    }

    /// Make an authenticated GET request and decode a JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.rest_url, path);
        debug!(url = %url, "GET request");

        let resp = self
            .authorize(self.http.get(&url), JSON_CONTENT_TYPE)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::Timeout {
                        timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
                    }
                } else {
                    ApiError::Connection(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(resp).await,
            });
        }

        resp.json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Fetch bid/ask candles for one instrument
    pub async fn candles(&self, request: &CandleRequest) -> Result<CandleSeries, ApiError> {
        validate_instrument(&request.instrument).map_err(ApiError::InvalidRequest)?;

        let mut query = vec![
            ("granularity", request.granularity.to_string()),
            ("price", "BA".to_string()),
        ];
        if let Some(count) = request.count {
            query.push(("count", count.to_string()));
        }

        let path = format!("/v3/instruments/{}/candles", request.instrument);
        let series: CandleSeries = self.get_json(&path, &query).await?;
        debug!(
            instrument = %series.instrument,
            count = series.candles.len(),
            "candles fetched"
        );
        Ok(series)
    }

    /// Accounts the token is authorized for
    pub async fn accounts(&self) -> Result<Vec<AccountRef>, ApiError> {
        let resp: AccountsResponse = self.get_json("/v3/accounts", &[]).await?;
        Ok(resp.accounts)
    }

    pub async fn account_summary(&self) -> Result<AccountSummary, ApiError> {
        let path = format!("/v3/accounts/{}/summary", self.credentials.id);
        let resp: AccountSummaryResponse = self.get_json(&path, &[]).await?;
        Ok(resp.account)
    }

    /// Full account details including open positions, trades and orders
    pub async fn account(&self) -> Result<Account, ApiError> {
        let path = format!("/v3/accounts/{}", self.credentials.id);
        let resp: AccountResponse = self.get_json(&path, &[]).await?;
        debug!(
            positions = resp.account.positions.len(),
            trades = resp.account.trades.len(),
            "account fetched"
        );
        Ok(resp.account)
    }

    /// Changes to the account since `since_transaction_id`.
    ///
    /// The provider rejects IDs newer than the account's last transaction
    /// with a 400; that surfaces as `ApiError::Status` carrying its
    /// `errorMessage`.
    pub async fn account_changes(
        &self,
        since_transaction_id: &str,
    ) -> Result<AccountChanges, ApiError> {
        if since_transaction_id.is_empty()
            || !since_transaction_id.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ApiError::InvalidRequest(format!(
                "invalid transaction ID '{}'",
                since_transaction_id
            )));
        }

        let path = format!("/v3/accounts/{}/changes", self.credentials.id);
        let query = [("sinceTransactionID", since_transaction_id.to_string())];
        let changes: AccountChanges = self.get_json(&path, &query).await?;
        debug!(
            since = since_transaction_id,
            last = %changes.last_transaction_id,
            transactions = changes.changes.transactions.len(),
            "account changes fetched"
        );
        Ok(changes)
    }

    /// Instruments tradeable by this account
    pub async fn account_instruments(&self) -> Result<Vec<Instrument>, ApiError> {
        let path = format!("/v3/accounts/{}/instruments", self.credentials.id);
        let resp: InstrumentsResponse = self.get_json(&path, &[]).await?;
        Ok(resp.instruments)
    }
}

#[async_trait]
impl PriceSource for OandaClient {
    async fn open(&self, request: &PricingStreamRequest) -> Result<ByteStream, StreamError> {
        if request.instruments.is_empty() {
            return Err(StreamError::Connection("no instruments requested".to_string()));
        }
        for instrument in &request.instruments {
            validate_instrument(instrument).map_err(StreamError::Connection)?;
        }

        let url = format!(
            "{}/v3/accounts/{}/pricing/stream",
            self.stream_url, self.credentials.id
        );
        debug!(url = %url, "opening pricing stream");

        let resp = self
            .authorize(self.stream_http.get(&url), STREAM_CONTENT_TYPE)
            .header("Connection", "Keep-Alive")
            .query(&request.query_pairs())
            .send()
            .await
            .map_err(|e| StreamError::Connection(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(StreamError::Status {
                status: status.as_u16(),
                message: error_message(resp).await,
            });
        }

        info!(account = %self.credentials.id, "pricing stream connected");
        let body = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));
        Ok(Box::pin(body))
    }
}

impl std::fmt::Debug for OandaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OandaClient")
            .field("credentials", &self.credentials)
            .field("rest_url", &self.rest_url)
            .field("stream_url", &self.stream_url)
            .finish()
    }
}

/// Instrument names are interpolated into URL paths
fn validate_instrument(instrument: &str) -> Result<(), String> {
    if instrument.is_empty() {
        return Err("instrument is empty".to_string());
    }
    if !instrument
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(format!("invalid instrument name '{}'", instrument));
    }
    Ok(())
}

/// Prefer the provider's `errorMessage`, fall back to the raw body
async fn error_message(resp: Response) -> String {
    let body = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(err) => err.error_message,
        Err(_) => body,
    }
}
