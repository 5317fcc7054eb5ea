//! Domain types for MarketGraph

pub mod series;
pub mod symbol;

pub use series::{PriceSample, PriceSeries, MISSING_SENTINEL};
pub use symbol::{Symbol, SymbolTable};
