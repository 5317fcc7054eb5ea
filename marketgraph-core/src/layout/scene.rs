//! Scene composition: everything a renderer needs, nothing it has to compute.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::graph::{node_sizes, partial_correlations, EdgeSet, GraphStyle, LayoutError};
use super::labels::{place_labels, HorizontalAlign, VerticalAlign};
use crate::analysis::{ClusterAssignment, Embedding};
use crate::domain::SymbolTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub index: usize,
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub cluster: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneEdge {
    pub i: usize,
    pub j: usize,
    pub from: [f64; 2],
    pub to: [f64; 2],
    pub weight: f64,
    pub linewidth: f64,
    /// Position on the edge color ramp, in [0, 1].
    pub color_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneLabel {
    pub index: usize,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub horizontal: HorizontalAlign,
    pub vertical: VerticalAlign,
    pub color_fraction: f64,
}

/// Plot limits with asymmetric horizontal padding for right-aligned labels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Viewport {
    pub fn around(xs: &[f64], ys: &[f64]) -> Self {
        let (x_lo, x_hi) = bounds(xs);
        let (y_lo, y_hi) = bounds(ys);
        let x_ptp = x_hi - x_lo;
        let y_ptp = y_hi - y_lo;
        Self {
            x_min: x_lo - 0.15 * x_ptp,
            x_max: x_hi + 0.10 * x_ptp,
            y_min: y_lo - 0.03 * y_ptp,
            y_max: y_hi + 0.03 * y_ptp,
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

fn bounds(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<SceneEdge>,
    pub labels: Vec<SceneLabel>,
    pub viewport: Viewport,
    pub n_clusters: usize,
}

/// Build the scene for `symbols` (canonical order) from the model outputs.
pub fn compose_scene(
    symbols: &SymbolTable,
    precision: &DMatrix<f64>,
    clusters: &ClusterAssignment,
    embedding: &Embedding,
    style: &GraphStyle,
) -> Result<Scene, LayoutError> {
    let n = symbols.len();
    let check = |what: &'static str, actual: usize| {
        if actual == n {
            Ok(())
        } else {
            Err(LayoutError::LengthMismatch {
                what,
                expected: n,
                actual,
            })
        }
    };
    check("precision matrix", precision.nrows())?;
    check("cluster labels", clusters.labels.len())?;
    check("embedding", embedding.len())?;

    let partial = partial_correlations(precision)?;
    let sizes = node_sizes(precision, style.node_scale)?;
    let edge_set = EdgeSet::from_partial_correlations(&partial, style.edge_threshold);
    let coords = &embedding.coords;

    let nodes = symbols
        .iter()
        .enumerate()
        .map(|(index, symbol)| SceneNode {
            index,
            id: symbol.id.clone(),
            x: coords[index][0],
            y: coords[index][1],
            size: sizes[index],
            cluster: clusters.labels[index],
        })
        .collect();

    let ceiling = style.edge_color_ceiling * edge_set.max_weight();
    let edges = edge_set
        .iter()
        .map(|edge| SceneEdge {
            i: edge.i,
            j: edge.j,
            from: coords[edge.i],
            to: coords[edge.j],
            weight: edge.weight,
            linewidth: style.edge_width_scale * edge.weight,
            color_value: if ceiling > 0.0 {
                (edge.weight / ceiling).clamp(0.0, 1.0)
            } else {
                0.0
            },
        })
        .collect();

    let labels = symbols
        .iter()
        .zip(place_labels(coords, style.label_offset))
        .enumerate()
        .map(|(index, (symbol, anchor))| SceneLabel {
            index,
            text: symbol.name.clone(),
            x: anchor.x,
            y: anchor.y,
            horizontal: anchor.horizontal,
            vertical: anchor.vertical,
            color_fraction: clusters.color_fraction(clusters.labels[index]),
        })
        .collect();

    Ok(Scene {
        nodes,
        edges,
        labels,
        viewport: Viewport::around(&embedding.xs(), &embedding.ys()),
        n_clusters: clusters.n_clusters(),
    })
}
