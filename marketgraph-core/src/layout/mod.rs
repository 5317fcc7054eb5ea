//! Graph composition and label placement.
//!
//! Turns the fitted precision matrix, the cluster labels and the 2-D
//! embedding into a renderable [`Scene`]: nodes, thresholded edges and
//! label anchors. No drawing happens here.

pub mod graph;
pub mod labels;
pub mod scene;

pub use graph::{node_sizes, partial_correlations, Edge, EdgeSet, GraphStyle, LayoutError};
pub use labels::{place_labels, HorizontalAlign, LabelAnchor, VerticalAlign, LABEL_SENTINEL};
pub use scene::{compose_scene, Scene, SceneEdge, SceneLabel, SceneNode, Viewport};
