//! MarketGraph Core: the analysis pipeline behind the market structure graph.
//!
//! This crate turns per-symbol intraday quotes into a renderable scene:
//! - Domain types (symbols in canonical order, price series)
//! - Data providers, retry-with-exhaustion and series alignment
//! - Standardization and sparse inverse covariance (graphical lasso with CV)
//! - Affinity propagation clustering over the learned covariance
//! - Locally linear embedding into the plane
//! - Edge thresholding, node sizing and label placement

pub mod analysis;
pub mod data;
pub mod domain;
pub mod fingerprint;
pub mod layout;
