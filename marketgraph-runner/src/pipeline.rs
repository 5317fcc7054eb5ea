//! The end-to-end pipeline.
//!
//! A single linear pass, each stage consuming its predecessor's output:
//! load → align → standardize → load-or-fit → cluster + embed → scene.
//! The only branch is the model cache hit or miss.

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use marketgraph_core::analysis::{
    load_or_fit, standardize, ClusterAssignment, ClusterError, Embedding, EmbeddingError,
    ModelOrigin, ModelStore, StandardizeError, StructureError, StructureEstimator,
    StructureModel,
};
use marketgraph_core::data::{variation_matrix, AlignError, DataProvider};
use marketgraph_core::domain::SymbolTable;
use marketgraph_core::fingerprint::dataset_hash;
use marketgraph_core::layout::{compose_scene, LayoutError, Scene};

use crate::config::PipelineConfig;
use crate::data_loader::{load_series, LoadError, LoadedData, SkippedSymbol};

/// Errors from the pipeline. Symbol-level fetch failures are not errors;
/// they show up in [`PipelineResult::skipped`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("alignment error: {0}")]
    Align(#[from] AlignError),
    #[error("standardization error: {0}")]
    Standardize(#[from] StandardizeError),
    #[error("structure model error: {0}")]
    Structure(#[from] StructureError),
    #[error("clustering error: {0}")]
    Cluster(#[from] ClusterError),
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),
}

/// Everything one run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub symbols: SymbolTable,
    pub model: StructureModel,
    pub origin: ModelOrigin,
    pub clusters: ClusterAssignment,
    pub embedding: Embedding,
    pub scene: Scene,
    pub skipped: Vec<SkippedSymbol>,
    pub n_samples: usize,
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

impl PipelineResult {
    /// Display names per cluster, clusters in label order.
    pub fn cluster_names(&self) -> Vec<Vec<String>> {
        (0..self.clusters.n_clusters())
            .map(|label| {
                self.clusters
                    .members(label)
                    .into_iter()
                    .filter_map(|i| self.symbols.get(i).map(|s| s.name.clone()))
                    .collect()
            })
            .collect()
    }
}

/// Fetch the configured universe through `provider`, then analyze it.
pub fn run_pipeline(
    config: &PipelineConfig,
    provider: &dyn DataProvider,
    store: &dyn ModelStore,
) -> Result<PipelineResult, PipelineError> {
    let universe = config.universe().table();
    info!(
        "running on {} symbols from {}",
        universe.len(),
        provider.name()
    );
    let loaded = load_series(&universe, provider, &config.retry_policy())?;
    analyze(config, &loaded, store, &config.estimator())
}

/// Run every stage after loading. No network I/O; the store is the only side effect.
pub fn analyze(
    config: &PipelineConfig,
    loaded: &LoadedData,
    store: &dyn ModelStore,
    estimator: &dyn StructureEstimator,
) -> Result<PipelineResult, PipelineError> {
    let variation = variation_matrix(&loaded.series)?;
    let hash = dataset_hash(&variation);
    let x = standardize(&variation)?;

    let (model, origin) = load_or_fit(store, estimator, &x, &hash)?;

    let clusters = config.clustering().fit(&model.covariance)?;
    info!("found {} clusters", clusters.n_clusters());

    let embedding = config.embedder().fit_transform(&x.points())?;

    let scene = compose_scene(
        &loaded.table,
        &model.precision,
        &clusters,
        &embedding,
        &config.graph_style(),
    )?;
    info!("scene has {} edges", scene.edges.len());

    Ok(PipelineResult {
        symbols: loaded.table.clone(),
        model,
        origin,
        clusters,
        embedding,
        scene,
        skipped: loaded.skipped.clone(),
        n_samples: x.n_samples(),
        dataset_hash: hash,
        has_synthetic: loaded.has_synthetic,
    })
}
