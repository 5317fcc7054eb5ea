//! AlphaVantage intraday data provider.
//!
//! Fetches `TIME_SERIES_INTRADAY` as CSV. AlphaVantage reports errors and
//! rate limiting as a small JSON document with HTTP 200, so the body is
//! sniffed before CSV parsing.

use std::time::Duration;

use chrono::NaiveDateTime;

use super::provider::{DataError, DataProvider, DataSource};
use crate::domain::{PriceSample, PriceSeries, MISSING_SENTINEL};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const EXPECTED_HEADER: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

/// Environment variable consulted by [`AlphaVantageProvider::from_env`].
pub const DEFAULT_API_KEY_ENV: &str = "MARKETGRAPH_ALPHAVANTAGE_API_KEY";

/// AlphaVantage data provider.
pub struct AlphaVantageProvider {
    client: reqwest::blocking::Client,
    api_key: String,
    interval: String,
}

impl AlphaVantageProvider {
    pub fn new(
        api_key: impl Into<String>,
        interval: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            interval: interval.into(),
        })
    }

    /// Read the API key from `key_env`, falling back to AlphaVantage's `demo` key.
    pub fn from_env(key_env: &str, interval: &str, timeout: Duration) -> Result<Self, DataError> {
        let api_key = std::env::var(key_env).unwrap_or_else(|_| String::from("demo"));
        Self::new(api_key, interval, timeout)
    }

    fn request(&self, ticker: &str) -> Result<String, DataError> {
        let resp = self
            .client
            .get(BASE_URL)
            .query(&[
                ("function", "TIME_SERIES_INTRADAY"),
                ("symbol", ticker),
                ("interval", self.interval.as_str()),
                ("datatype", "csv"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited(format!("HTTP {status}")));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(DataError::AuthenticationRequired(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(DataError::Other(format!("HTTP {status} for {ticker}")));
        }

        resp.text()
            .map_err(|e| DataError::ResponseFormatChanged(format!("unreadable body: {e}")))
    }
}

impl DataProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        "alphavantage"
    }

    fn source(&self) -> DataSource {
        DataSource::AlphaVantage
    }

    fn fetch(&self, symbol: &str) -> Result<PriceSeries, DataError> {
        let ticker = symbol.rsplit(':').next().unwrap_or(symbol);
        let body = self.request(ticker)?;
        parse_intraday_csv(symbol, &body)
    }
}

/// Parse an intraday CSV body into a series in ascending timestamp order.
///
/// Missing numeric fields (`-` or empty) become [`MISSING_SENTINEL`].
pub fn parse_intraday_csv(symbol: &str, body: &str) -> Result<PriceSeries, DataError> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('{') {
        return Err(classify_json_error(symbol, trimmed));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(trimmed.as_bytes());

    let header = reader
        .headers()
        .map_err(|e| DataError::ResponseFormatChanged(format!("unreadable header: {e}")))?;
    let matches = header.len() >= EXPECTED_HEADER.len()
        && EXPECTED_HEADER
            .iter()
            .zip(header.iter())
            .all(|(want, got)| got.eq_ignore_ascii_case(want));
    if !matches {
        return Err(DataError::ResponseFormatChanged(format!(
            "unexpected CSV header: {}",
            header.iter().collect::<Vec<_>>().join(",")
        )));
    }

    let mut samples = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            DataError::ResponseFormatChanged(format!("bad CSV row {}: {e}", line + 1))
        })?;
        let raw_ts = record.get(0).unwrap_or_default();
        let timestamp = NaiveDateTime::parse_from_str(raw_ts, TIMESTAMP_FORMAT).map_err(|e| {
            DataError::ValidationError(format!("invalid timestamp '{raw_ts}' for {symbol}: {e}"))
        })?;

        let field = |idx: usize| parse_field(symbol, record.get(idx));
        samples.push(PriceSample {
            timestamp,
            open: field(1)?,
            high: field(2)?,
            low: field(3)?,
            close: field(4)?,
            volume: field(5)?,
        });
    }

    if samples.is_empty() {
        return Err(DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        });
    }

    samples.sort_by_key(|s| s.timestamp);
    Ok(PriceSeries::new(symbol, samples))
}

fn parse_field(symbol: &str, raw: Option<&str>) -> Result<f64, DataError> {
    match raw {
        None | Some("") | Some("-") => Ok(MISSING_SENTINEL),
        Some(text) => text.parse::<f64>().map_err(|_| {
            DataError::ValidationError(format!("non-numeric field '{text}' for {symbol}"))
        }),
    }
}

fn classify_json_error(symbol: &str, body: &str) -> DataError {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => return DataError::ResponseFormatChanged(format!("unparseable JSON body: {e}")),
    };

    let text = |key: &str| value.get(key).and_then(|v| v.as_str()).map(str::to_string);

    if text("Error Message").is_some() {
        DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        }
    } else if let Some(note) = text("Note").or_else(|| text("Information")) {
        DataError::RateLimited(note)
    } else {
        DataError::ResponseFormatChanged(format!("unexpected JSON body for {symbol}"))
    }
}
