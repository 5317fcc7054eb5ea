//! Bounded retry around a single fallible retrieval call.
//!
//! Attempts are immediate (no backoff). The final failure is wrapped in
//! [`RetryError::Exhausted`] so callers can tell "gave up on this symbol"
//! apart from every other fault.

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::provider::{DataError, DataProvider};
use crate::domain::PriceSeries;

/// Retry budget for one retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// Every attempt failed.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: E,
    },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// The error raised by the final attempt.
    pub fn into_last(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Effective attempt count (at least one).
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Invoke `op` until it succeeds or the budget is spent.
    ///
    /// The first successful result is returned as-is. Earlier failures are
    /// discarded; the last one is carried in the returned error.
    pub fn run<T, E, F>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
        E: std::fmt::Display,
    {
        let attempts = self.attempts();
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => {
                    return Err(RetryError::Exhausted { attempts, last: e });
                }
                Err(e) => {
                    debug!("attempt {attempt}/{attempts} failed: {e}");
                    attempt += 1;
                }
            }
        }
    }
}

/// Fetch one symbol through `provider`, retrying per `policy`.
pub fn fetch_with_retry(
    provider: &dyn DataProvider,
    symbol: &str,
    policy: &RetryPolicy,
) -> Result<PriceSeries, RetryError<DataError>> {
    policy.run(|| provider.fetch(symbol))
}
