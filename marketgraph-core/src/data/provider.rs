//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over quote sources (AlphaVantage, the
//! deterministic synthetic generator, test fixtures) so the pipeline can
//! swap implementations and tests can inject failures.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PriceSeries;

/// Structured error types for a single retrieval attempt.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider: {0}")]
    RateLimited(String),

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    AlphaVantage,
    Synthetic,
    Fixture,
}

/// Trait for quote providers.
///
/// Implementations must be callable repeatedly with the same symbol and
/// either return a well-formed series or an error. Retrying is the caller's
/// concern (see [`super::retry`]).
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Provenance tag attached to every series this provider returns.
    fn source(&self) -> DataSource;

    /// Fetch the intraday series for one `exchange:ticker` id.
    fn fetch(&self, symbol: &str) -> Result<PriceSeries, DataError>;
}
