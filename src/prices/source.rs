//! Price table fetching from the external pricing backend.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;
use tracing::{Instrument, debug, info_span};
use url::Url;

use super::{PriceEntry, PriceKey};
use crate::clock::{Clock, SystemClock};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(8);
pub const DEFAULT_ROW_LIMIT: u32 = 1000;

/// Row fields holding the price name, tried in order.
pub const KEY_FIELDS: &[&str] = &["key", "Key", "name", "Name", "Title"];
/// Row fields holding the numeric price, tried in order.
pub const VALUE_FIELDS: &[&str] = &["value", "Value", "price", "Price", "Preis", "Wert", "amount"];
/// Row fields holding the unit label, tried in order.
pub const UNIT_FIELDS: &[&str] = &["unit", "Unit", "Einheit"];
/// Object members that may wrap the row list.
const ROW_CONTAINERS: &[&str] = &["list", "rows", "data"];

const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The backend could not be reached or did not answer in time.
    Transport,
    /// The backend answered, but not with a usable price table.
    Semantic,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Price request timed out after {:.1}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("Pricing backend returned HTTP {status}")]
    Status { status: u16, body: String },

    #[error("Malformed price payload: {0}")]
    Malformed(String),

    #[error("Price table has no usable rows ({skipped} skipped)")]
    EmptyTable { skipped: usize },
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Transport(_) | Self::Timeout(_) => FetchErrorKind::Transport,
            Self::Status { .. } | Self::Malformed(_) | Self::EmptyTable { .. } => {
                FetchErrorKind::Semantic
            }
        }
    }

    pub fn is_transport(&self) -> bool {
        self.kind() == FetchErrorKind::Transport
    }

    fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Source of the complete price table.
///
/// Implementations report every failure as a [`FetchError`]; nothing
/// escapes as a panic.
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<PriceEntry>, FetchError>;
}

/// Fetches the whole table with a single bearer-authenticated GET.
pub struct HttpPriceSource {
    http: reqwest::Client,
    endpoint: Url,
    token: Option<SecretString>,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl HttpPriceSource {
    pub fn builder(endpoint: Url) -> HttpPriceSourceBuilder {
        HttpPriceSourceBuilder::new(endpoint)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn fetch_payload(&self) -> Result<Value, FetchError> {
        let mut request = self.http.get(self.endpoint.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.timeout))?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self) -> Result<Vec<PriceEntry>, FetchError> {
        let span = info_span!("prices.fetch", endpoint = %self.endpoint);
        async {
            let payload = self.fetch_payload().await?;
            parse_price_rows(&payload, self.clock.now())
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for HttpPriceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPriceSource")
            .field("endpoint", &self.endpoint.as_str())
            .field("has_token", &self.token.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

pub struct HttpPriceSourceBuilder {
    endpoint: Url,
    token: Option<SecretString>,
    timeout: Duration,
    row_limit: u32,
    clock: Arc<dyn Clock>,
}

impl HttpPriceSourceBuilder {
    fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            token: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            row_limit: DEFAULT_ROW_LIMIT,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn row_limit(mut self, row_limit: u32) -> Self {
        self.row_limit = row_limit;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> crate::Result<HttpPriceSource> {
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .build()?;

        let mut endpoint = self.endpoint;
        endpoint
            .query_pairs_mut()
            .append_pair("limit", &self.row_limit.to_string());

        Ok(HttpPriceSource {
            http,
            endpoint,
            token: self.token,
            timeout: self.timeout,
            clock: self.clock,
        })
    }
}

/// Turns a backend payload into price entries.
///
/// Rows whose name is not a known [`PriceKey`], that carry no numeric value
/// under any of [`VALUE_FIELDS`], or whose value is negative or above
/// [`PriceKey::max_value`] are skipped.
/// The first row for a key wins.
pub fn parse_price_rows(
    payload: &Value,
    fetched_at: DateTime<Utc>,
) -> Result<Vec<PriceEntry>, FetchError> {
    let rows = match payload {
        Value::Array(rows) => rows,
        Value::Object(map) => ROW_CONTAINERS
            .iter()
            .find_map(|field| map.get(*field).and_then(Value::as_array))
            .ok_or_else(|| {
                FetchError::Malformed(format!(
                    "expected a row array under one of {:?}",
                    ROW_CONTAINERS
                ))
            })?,
        other => {
            return Err(FetchError::Malformed(format!(
                "expected an object or array, got {}",
                json_type_name(other)
            )));
        }
    };

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(rows.len());
    let mut skipped = 0;

    for row in rows {
        match parse_row(row, fetched_at) {
            Some(entry) if seen.insert(entry.key) => entries.push(entry),
            Some(entry) => {
                debug!(key = %entry.key, "Duplicate price row ignored");
                skipped += 1;
            }
            None => skipped += 1,
        }
    }

    if entries.is_empty() {
        return Err(FetchError::EmptyTable { skipped });
    }
    if skipped > 0 {
        debug!(parsed = entries.len(), skipped, "Skipped unusable price rows");
    }
    Ok(entries)
}

fn parse_row(row: &Value, fetched_at: DateTime<Utc>) -> Option<PriceEntry> {
    let name = KEY_FIELDS
        .iter()
        .find_map(|field| row.get(*field).and_then(Value::as_str))?;

    let Some(key) = PriceKey::from_wire(name) else {
        debug!(name, "Unknown price row");
        return None;
    };

    let Some(value) = VALUE_FIELDS
        .iter()
        .find_map(|field| row.get(*field).and_then(numeric_value))
    else {
        debug!(%key, "Price row without numeric value");
        return None;
    };

    if value < Decimal::ZERO {
        debug!(%key, %value, "Negative price row");
        return None;
    }
    if value > key.max_value() {
        debug!(%key, %value, "Price row above ceiling");
        return None;
    }

    let mut entry = PriceEntry::new(key, value, fetched_at);
    if let Some(unit) = UNIT_FIELDS
        .iter()
        .find_map(|field| row.get(*field).and_then(Value::as_str))
        .filter(|u| !u.trim().is_empty())
    {
        entry = entry.with_unit(unit.trim());
    }
    Some(entry)
}

fn numeric_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => {
            let s = s.trim();
            match (s.rfind(','), s.rfind('.')) {
                // "1,234.50": comma groups thousands.
                (Some(comma), Some(dot)) if dot > comma => parse_decimal(&s.replace(',', "")),
                // "1.234,50" or "0,12": comma is the decimal separator.
                (Some(_), _) => parse_decimal(&s.replace('.', "").replace(',', ".")),
                _ => parse_decimal(s),
            }
        }
        _ => None,
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
