//! Data retrieval and alignment

pub mod align;
pub mod alphavantage;
pub mod provider;
pub mod retry;
pub mod synthetic;
pub mod universe;

pub use align::{variation_matrix, AlignError, VariationMatrix};
pub use alphavantage::AlphaVantageProvider;
pub use provider::{DataError, DataProvider, DataSource};
pub use retry::{fetch_with_retry, RetryError, RetryPolicy};
pub use synthetic::SyntheticProvider;
pub use universe::Universe;
