//! The persisted structure model and the load-or-fit cache seam.
//!
//! Fitting is expensive and the intended usage is "fit once, reuse across
//! visualization runs". Persistence is injected through [`ModelStore`] so
//! the cache behavior can be exercised with an in-memory fake.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::{info, warn};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::glasso::{CvPoint, GlassoError, GraphicalLassoCv};
use super::standardize::StandardizedVariation;

/// Current on-disk schema version. Newer versions are rejected on load.
pub const MODEL_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    1
}

/// Sparse precision model over a fixed, ordered symbol set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureModel {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Symbol ids in canonical order; matrix index `i` refers to `symbols[i]`.
    pub symbols: Vec<String>,
    /// Selected l1 penalty.
    pub alpha: f64,
    pub covariance: DMatrix<f64>,
    pub precision: DMatrix<f64>,
    #[serde(default)]
    pub cv_path: Vec<CvPoint>,
    /// Fingerprint of the data the model was fitted on.
    #[serde(default)]
    pub dataset_hash: String,
    pub fitted_at: DateTime<Utc>,
}

impl StructureModel {
    pub fn n_symbols(&self) -> usize {
        self.symbols.len()
    }

    fn check_shape(&self) -> Result<(), StructureError> {
        let n = self.symbols.len();
        for m in [&self.covariance, &self.precision] {
            if m.shape() != (n, n) {
                return Err(StructureError::ShapeMismatch {
                    symbols: n,
                    rows: m.nrows(),
                    cols: m.ncols(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("model store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt model snapshot: {0}")]
    Corrupt(String),

    #[error("unsupported model schema version {found} (max supported: {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },
}

/// Persistence collaborator for the structure model.
pub trait ModelStore {
    /// The persisted model, or `None` when nothing has been saved yet.
    fn load(&self) -> Result<Option<StructureModel>, StoreError>;

    /// Persist `model`, replacing any previous snapshot.
    fn save(&self, model: &StructureModel) -> Result<(), StoreError>;
}

/// Fits covariance and precision on standardized variations.
pub trait StructureEstimator {
    fn estimate(&self, x: &StandardizedVariation) -> Result<Estimate, GlassoError>;
}

/// Raw output of a [`StructureEstimator`].
#[derive(Debug, Clone)]
pub struct Estimate {
    pub alpha: f64,
    pub covariance: DMatrix<f64>,
    pub precision: DMatrix<f64>,
    pub cv_path: Vec<CvPoint>,
}

impl StructureEstimator for GraphicalLassoCv {
    fn estimate(&self, x: &StandardizedVariation) -> Result<Estimate, GlassoError> {
        let fit = self.fit(&x.values)?;
        info!("cross-validation selected alpha = {:.5}", fit.alpha);
        Ok(Estimate {
            alpha: fit.alpha,
            covariance: fit.covariance,
            precision: fit.precision,
            cv_path: fit.path,
        })
    }
}

/// Whether the model came from the store or from a fresh fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelOrigin {
    Loaded,
    Fitted,
}

#[derive(Debug, Error)]
pub enum StructureError {
    #[error("model fit failed: {0}")]
    Fit(#[from] GlassoError),

    #[error("model persistence failed: {0}")]
    Store(#[from] StoreError),

    #[error("cached model covers symbols {cached:?} but this run has {current:?}; delete the model to refit")]
    SymbolMismatch {
        cached: Vec<String>,
        current: Vec<String>,
    },

    #[error("model matrices are {rows}×{cols} but the model has {symbols} symbols")]
    ShapeMismatch {
        symbols: usize,
        rows: usize,
        cols: usize,
    },
}

/// Load the persisted model if there is one, otherwise fit and persist.
///
/// A loaded model skips fitting entirely. A fresh fit is saved before it is
/// returned; if saving fails the whole call fails.
pub fn load_or_fit(
    store: &dyn ModelStore,
    estimator: &dyn StructureEstimator,
    x: &StandardizedVariation,
    dataset_hash: &str,
) -> Result<(StructureModel, ModelOrigin), StructureError> {
    if let Some(model) = store.load()? {
        model.check_shape()?;
        if model.symbols != x.symbols {
            return Err(StructureError::SymbolMismatch {
                cached: model.symbols,
                current: x.symbols.clone(),
            });
        }
        if !model.dataset_hash.is_empty() && model.dataset_hash != dataset_hash {
            warn!("cached model was fitted on different data; reusing it anyway");
        }
        info!("loaded cached structure model (alpha = {:.5})", model.alpha);
        return Ok((model, ModelOrigin::Loaded));
    }

    info!("no cached model, fitting on {} symbols", x.n_symbols());
    let estimate = estimator.estimate(x)?;
    let model = StructureModel {
        schema_version: MODEL_SCHEMA_VERSION,
        symbols: x.symbols.clone(),
        alpha: estimate.alpha,
        covariance: estimate.covariance,
        precision: estimate.precision,
        cv_path: estimate.cv_path,
        dataset_hash: dataset_hash.to_string(),
        fitted_at: Utc::now(),
    };
    store.save(&model)?;
    Ok((model, ModelOrigin::Fitted))
}
