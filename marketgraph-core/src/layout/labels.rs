//! Label anchor placement.
//!
//! For each node the label is pushed away from two neighbors: the node that
//! is closest vertically decides the horizontal side, the node that is closest
//! horizontally decides the vertical side. The node's own offset is replaced
//! by [`LABEL_SENTINEL`] so it never wins the nearest search.
//!
//! The sentinel only works while coordinates span less than one unit, which
//! holds for embeddings built from unit-norm eigenvectors. Ties in the
//! nearest search go to the lowest index.

use serde::{Deserialize, Serialize};

/// Offset substituted for a node's distance to itself.
pub const LABEL_SENTINEL: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlign {
    /// Text starts at the anchor and extends to the right.
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    /// Text sits above the anchor.
    Bottom,
    Top,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelAnchor {
    pub x: f64,
    pub y: f64,
    pub horizontal: HorizontalAlign,
    pub vertical: VerticalAlign,
}

pub fn place_labels(coords: &[[f64; 2]], offset: f64) -> Vec<LabelAnchor> {
    coords
        .iter()
        .enumerate()
        .map(|(index, &[x, y])| {
            let offsets = |axis: usize, origin: f64| -> Vec<f64> {
                coords
                    .iter()
                    .enumerate()
                    .map(|(j, c)| if j == index { LABEL_SENTINEL } else { origin - c[axis] })
                    .collect()
            };
            let dx = offsets(0, x);
            let dy = offsets(1, y);

            let this_dx = dx[argmin_abs(&dy)];
            let this_dy = dy[argmin_abs(&dx)];

            let (x, horizontal) = if this_dx > 0.0 {
                (x + offset, HorizontalAlign::Left)
            } else {
                (x - offset, HorizontalAlign::Right)
            };
            let (y, vertical) = if this_dy > 0.0 {
                (y + offset, VerticalAlign::Bottom)
            } else {
                (y - offset, VerticalAlign::Top)
            };

            LabelAnchor {
                x,
                y,
                horizontal,
                vertical,
            }
        })
        .collect()
}

fn argmin_abs(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if v.abs() < values[best].abs() {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    const POINTS: [[f64; 2]; 4] = [[0.0, 0.0], [0.5, 0.1], [-0.3, 0.4], [0.2, -0.5]];

    #[test]
    fn four_point_alignments() {
        let anchors = place_labels(&POINTS, 0.002);
        let aligns: Vec<_> = anchors.iter().map(|a| (a.horizontal, a.vertical)).collect();
        assert_eq!(
            aligns,
            vec![
                (HorizontalAlign::Right, VerticalAlign::Bottom),
                (HorizontalAlign::Left, VerticalAlign::Bottom),
                (HorizontalAlign::Right, VerticalAlign::Bottom),
                (HorizontalAlign::Left, VerticalAlign::Top),
            ]
        );
    }

    #[test]
    fn anchors_shift_by_offset_toward_alignment() {
        let anchors = place_labels(&POINTS, 0.002);
        assert!((anchors[0].x - -0.002).abs() < 1e-15);
        assert!((anchors[0].y - 0.002).abs() < 1e-15);
        assert!((anchors[3].x - 0.202).abs() < 1e-15);
        assert!((anchors[3].y - -0.502).abs() < 1e-15);
    }

    #[test]
    fn repeated_placement_is_identical() {
        assert_eq!(place_labels(&POINTS, 0.002), place_labels(&POINTS, 0.002));
    }

    #[test]
    fn single_node_uses_sentinel() {
        let anchors = place_labels(&[[0.3, -0.2]], 0.01);
        assert_eq!(anchors[0].horizontal, HorizontalAlign::Left);
        assert_eq!(anchors[0].vertical, VerticalAlign::Bottom);
    }

    #[test]
    fn ties_pick_lowest_index() {
        assert_eq!(argmin_abs(&[0.5, -0.2, 0.2, 1.0]), 1);
    }

    #[test]
    fn empty_input() {
        assert!(place_labels(&[], 0.002).is_empty());
    }
}
