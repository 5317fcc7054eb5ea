//! MarketGraph Runner: pipeline orchestration on top of `marketgraph-core`.
//!
//! This crate provides:
//! - TOML pipeline configuration with defaults for every field
//! - Quote loading with retry, per-symbol skip and length filtering
//! - A file-backed model store for the load-or-fit cache
//! - The end-to-end pipeline producing a renderable scene
//! - Artifact export (scene JSON, edge CSV, cluster report, SVG)

pub mod config;
pub mod data_loader;
pub mod export;
pub mod model_store;
pub mod pipeline;
pub mod render;

pub use config::{ConfigError, PipelineConfig};
pub use data_loader::{load_series, LoadError, LoadedData, SkipReason, SkippedSymbol};
pub use export::{cluster_report, export_edges_csv, export_scene_json, save_artifacts, ArtifactPaths};
pub use model_store::FileModelStore;
pub use pipeline::{analyze, run_pipeline, PipelineError, PipelineResult};
pub use render::render_svg;
