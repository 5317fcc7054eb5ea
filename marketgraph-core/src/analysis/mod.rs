//! Structure learning, clustering and embedding over standardized variations

pub mod cluster;
pub mod covariance;
pub mod embedding;
pub mod glasso;
pub mod standardize;
pub mod structure;

pub use cluster::{AffinityPropagation, ClusterAssignment, ClusterError};
pub use embedding::{Embedding, EmbeddingError, LocallyLinearEmbedding};
pub use glasso::{CvFit, CvPoint, GlassoError, GlassoFit, GraphicalLasso, GraphicalLassoCv};
pub use standardize::{standardize, StandardizeError, StandardizedVariation};
pub use structure::{
    load_or_fit, Estimate, ModelOrigin, ModelStore, StoreError, StructureError, StructureEstimator,
    StructureModel, MODEL_SCHEMA_VERSION,
};
