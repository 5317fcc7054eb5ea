//! Pipeline configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! the standard run: 15-minute AlphaVantage quotes, 3 attempts per symbol,
//! 3-fold CV with 4 alphas and 4 refinements, 6-neighbor LLE and a 0.02
//! edge threshold.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use marketgraph_core::analysis::{AffinityPropagation, GraphicalLassoCv, LocallyLinearEmbedding};
use marketgraph_core::data::alphavantage::DEFAULT_API_KEY_ENV;
use marketgraph_core::data::{RetryPolicy, Universe};
use marketgraph_core::layout::GraphStyle;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Attempts per symbol, including the first.
    pub attempts: u32,
    pub interval: String,
    /// Environment variable holding the AlphaVantage key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            interval: "15min".into(),
            api_key_env: DEFAULT_API_KEY_ENV.into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Where the fitted model is persisted and looked up.
    pub path: PathBuf,
    pub cv_folds: usize,
    pub n_alphas: usize,
    pub n_refinements: usize,
    pub tol: f64,
    pub enet_tol: f64,
    pub max_iter: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let cv = GraphicalLassoCv::default();
        Self {
            path: PathBuf::from("model.json"),
            cv_folds: cv.folds,
            n_alphas: cv.n_alphas,
            n_refinements: cv.n_refinements,
            tol: cv.tol,
            enet_tol: cv.enet_tol,
            max_iter: cv.max_iter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub damping: f64,
    pub max_iter: usize,
    pub convergence_iter: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        let ap = AffinityPropagation::default();
        Self {
            damping: ap.damping,
            max_iter: ap.max_iter,
            convergence_iter: ap.convergence_iter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub n_neighbors: usize,
    pub reg: f64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let lle = LocallyLinearEmbedding::default();
        Self {
            n_neighbors: lle.n_neighbors,
            reg: lle.reg,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub edge_threshold: f64,
    pub label_offset: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        let style = GraphStyle::default();
        Self {
            edge_threshold: style.edge_threshold,
            label_offset: style.label_offset,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub fetch: FetchConfig,
    pub model: ModelConfig,
    pub cluster: ClusterConfig,
    pub embedding: EmbeddingConfig,
    pub graph: GraphConfig,
    /// `id = "display name"` pairs; the built-in universe when absent.
    pub universe: Option<BTreeMap<String, String>>,
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.fetch.attempts == 0 {
            return invalid("fetch.attempts must be at least 1".into());
        }
        if self.model.cv_folds < 2 {
            return invalid(format!("model.cv_folds must be at least 2, got {}", self.model.cv_folds));
        }
        if self.model.n_alphas < 2 {
            return invalid(format!("model.n_alphas must be at least 2, got {}", self.model.n_alphas));
        }
        if !(self.model.tol > 0.0 && self.model.enet_tol > 0.0) {
            return invalid("model.tol and model.enet_tol must be positive".into());
        }
        if !(0.5..1.0).contains(&self.cluster.damping) {
            return invalid(format!(
                "cluster.damping must be in [0.5, 1), got {}",
                self.cluster.damping
            ));
        }
        if self.cluster.convergence_iter == 0 {
            return invalid("cluster.convergence_iter must be at least 1".into());
        }
        if self.embedding.n_neighbors == 0 {
            return invalid("embedding.n_neighbors must be at least 1".into());
        }
        if self.graph.edge_threshold < 0.0 {
            return invalid("graph.edge_threshold must not be negative".into());
        }
        if matches!(&self.universe, Some(u) if u.is_empty()) {
            return invalid("universe table is empty".into());
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.fetch.attempts)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }

    pub fn estimator(&self) -> GraphicalLassoCv {
        GraphicalLassoCv {
            folds: self.model.cv_folds,
            n_alphas: self.model.n_alphas,
            n_refinements: self.model.n_refinements,
            tol: self.model.tol,
            enet_tol: self.model.enet_tol,
            max_iter: self.model.max_iter,
        }
    }

    pub fn clustering(&self) -> AffinityPropagation {
        AffinityPropagation {
            damping: self.cluster.damping,
            max_iter: self.cluster.max_iter,
            convergence_iter: self.cluster.convergence_iter,
            ..AffinityPropagation::default()
        }
    }

    pub fn embedder(&self) -> LocallyLinearEmbedding {
        LocallyLinearEmbedding {
            n_neighbors: self.embedding.n_neighbors,
            reg: self.embedding.reg,
        }
    }

    pub fn graph_style(&self) -> GraphStyle {
        GraphStyle::default()
            .with_edge_threshold(self.graph.edge_threshold)
            .with_label_offset(self.graph.label_offset)
    }

    pub fn universe(&self) -> Universe {
        match &self.universe {
            Some(symbols) => Universe {
                symbols: symbols.clone(),
            },
            None => Universe::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.fetch.attempts, 3);
        assert_eq!(config.model.path, PathBuf::from("model.json"));
        assert_eq!(config.embedding.n_neighbors, 6);
        assert_eq!(config.graph.edge_threshold, 0.02);
        assert_eq!(config.universe().len(), 49);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
            [fetch]
            attempts = 5

            [model]
            path = "cache/structure.json"
            n_refinements = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.fetch.attempts, 5);
        assert_eq!(config.fetch.interval, "15min");
        assert_eq!(config.model.path, PathBuf::from("cache/structure.json"));
        assert_eq!(config.estimator().n_refinements, 2);
        assert_eq!(config.estimator().folds, 3);
        assert_eq!(config.retry_policy().attempts(), 5);
    }

    #[test]
    fn universe_table_overrides_default() {
        let config = PipelineConfig::from_toml(
            r#"
            [universe]
            "NYSE:XOM" = "Exxon"
            "NASDAQ:AAPL" = "Apple"
            "#,
        )
        .unwrap();
        let table = config.universe().table();
        assert_eq!(table.ids(), vec!["NASDAQ:AAPL", "NYSE:XOM"]);
    }

    #[test]
    fn rejects_zero_attempts() {
        let err = PipelineConfig::from_toml("[fetch]\nattempts = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_low_damping() {
        let err = PipelineConfig::from_toml("[cluster]\ndamping = 0.2").unwrap_err();
        assert!(err.to_string().contains("damping"));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            PipelineConfig::from_toml("[fetch\nattempts = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = PipelineConfig::from_file(Path::new("/nonexistent/marketgraph.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn graph_style_carries_threshold() {
        let config = PipelineConfig::from_toml("[graph]\nedge_threshold = 0.05").unwrap();
        let style = config.graph_style();
        assert_eq!(style.edge_threshold, 0.05);
        assert_eq!(style.label_offset, 0.002);
    }
}
