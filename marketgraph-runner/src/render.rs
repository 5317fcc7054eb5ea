//! Static SVG rendering of a [`Scene`].
//!
//! Draw order: edges, then nodes, then labels. The scene viewport is mapped
//! onto the canvas with the y axis flipped. Nodes and label frames use a
//! spectral ramp indexed by cluster; edges use a reversed "hot" ramp
//! indexed by their color value.

use std::fmt::Write;

use marketgraph_core::layout::{HorizontalAlign, Scene, VerticalAlign, Viewport};

pub const SVG_WIDTH: f64 = 1000.0;
pub const SVG_HEIGHT: f64 = 800.0;

const FONT_SIZE: f64 = 10.0;

/// Anchor stops of the spectral ramp.
const SPECTRAL: [(f64, [u8; 3]); 11] = [
    (0.0, [0, 0, 0]),
    (0.1, [120, 0, 136]),
    (0.2, [0, 0, 221]),
    (0.3, [0, 136, 221]),
    (0.4, [0, 170, 136]),
    (0.5, [0, 153, 0]),
    (0.6, [0, 221, 0]),
    (0.7, [204, 238, 0]),
    (0.8, [255, 204, 0]),
    (0.9, [238, 0, 0]),
    (1.0, [204, 204, 204]),
];

fn spectral(fraction: f64) -> String {
    let f = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
    let upper = SPECTRAL.iter().position(|(stop, _)| *stop >= f).unwrap_or(SPECTRAL.len() - 1);
    if upper == 0 {
        return hex(SPECTRAL[0].1);
    }
    let (lo_stop, lo) = SPECTRAL[upper - 1];
    let (hi_stop, hi) = SPECTRAL[upper];
    let t = (f - lo_stop) / (hi_stop - lo_stop);
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    hex([mix(lo[0], hi[0]), mix(lo[1], hi[1]), mix(lo[2], hi[2])])
}

/// Reversed black-red-yellow-white ramp: 0 is white, 1 is black.
fn hot_reversed(value: f64) -> String {
    let x = 1.0 - if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
    let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    hex([channel(3.0 * x), channel(3.0 * x - 1.0), channel(3.0 * x - 2.0)])
}

fn hex([r, g, b]: [u8; 3]) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

struct Canvas {
    viewport: Viewport,
    width: f64,
    height: f64,
}

impl Canvas {
    fn map(&self, x: f64, y: f64) -> (f64, f64) {
        let span = |s: f64| if s > 0.0 { s } else { 1.0 };
        let px = (x - self.viewport.x_min) / span(self.viewport.width()) * self.width;
        let py = self.height - (y - self.viewport.y_min) / span(self.viewport.height()) * self.height;
        (px, py)
    }
}

/// Render `scene` as a standalone SVG document.
pub fn render_svg(scene: &Scene, width: f64, height: f64) -> String {
    let canvas = Canvas {
        viewport: scene.viewport,
        width,
        height,
    };
    let max_cluster = scene.nodes.iter().map(|n| n.cluster).max().unwrap_or(0);
    let node_fraction = |cluster: usize| {
        if max_cluster == 0 {
            0.0
        } else {
            cluster as f64 / max_cluster as f64
        }
    };

    let mut svg = String::new();
    // fmt::Write into a String cannot fail
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);

    let _ = writeln!(svg, r#"<g id="edges" stroke-linecap="round">"#);
    for edge in &scene.edges {
        let (x1, y1) = canvas.map(edge.from[0], edge.from[1]);
        let (x2, y2) = canvas.map(edge.to[0], edge.to[1]);
        let _ = writeln!(
            svg,
            r#"<line x1="{x1:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y2:.2}" stroke="{}" stroke-width="{:.2}"/>"#,
            hot_reversed(edge.color_value),
            edge.linewidth
        );
    }
    let _ = writeln!(svg, "</g>");

    let _ = writeln!(svg, r#"<g id="nodes">"#);
    for node in &scene.nodes {
        let (cx, cy) = canvas.map(node.x, node.y);
        // marker size is an area, as in scatter plots
        let r = node.size.max(0.0).sqrt() / 2.0;
        let _ = writeln!(
            svg,
            r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="{r:.2}" fill="{}"><title>{}</title></circle>"#,
            spectral(node_fraction(node.cluster)),
            escape(&node.id)
        );
    }
    let _ = writeln!(svg, "</g>");

    let _ = writeln!(
        svg,
        r#"<g id="labels" font-family="sans-serif" font-size="{FONT_SIZE}">"#
    );
    for label in &scene.labels {
        let (x, y) = canvas.map(label.x, label.y);
        let text_width = 0.6 * FONT_SIZE * label.text.chars().count() as f64;
        let (anchor, box_x) = match label.horizontal {
            HorizontalAlign::Left => ("start", x),
            HorizontalAlign::Right => ("end", x - text_width),
        };
        let (baseline, box_y) = match label.vertical {
            VerticalAlign::Bottom => ("text-after-edge", y - FONT_SIZE * 1.2),
            VerticalAlign::Top => ("text-before-edge", y),
        };
        let _ = writeln!(
            svg,
            r#"<rect x="{box_x:.2}" y="{box_y:.2}" width="{text_width:.2}" height="{:.2}" fill="white" fill-opacity="0.6" stroke="{}"/>"#,
            FONT_SIZE * 1.2,
            spectral(label.color_fraction)
        );
        let _ = writeln!(
            svg,
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="{anchor}" dominant-baseline="{baseline}">{}</text>"#,
            escape(&label.text)
        );
    }
    let _ = writeln!(svg, "</g>");
    let _ = writeln!(svg, "</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketgraph_core::layout::{SceneEdge, SceneLabel, SceneNode};

    fn scene() -> Scene {
        Scene {
            nodes: vec![
                SceneNode {
                    index: 0,
                    id: "X:A".into(),
                    x: 0.0,
                    y: 0.0,
                    size: 100.0,
                    cluster: 0,
                },
                SceneNode {
                    index: 1,
                    id: "X:B".into(),
                    x: 1.0,
                    y: 1.0,
                    size: 64.0,
                    cluster: 1,
                },
            ],
            edges: vec![SceneEdge {
                i: 0,
                j: 1,
                from: [0.0, 0.0],
                to: [1.0, 1.0],
                weight: 0.5,
                linewidth: 7.5,
                color_value: 1.0,
            }],
            labels: vec![SceneLabel {
                index: 0,
                text: "AT&T <Inc>".into(),
                x: -0.002,
                y: 0.002,
                horizontal: HorizontalAlign::Right,
                vertical: VerticalAlign::Bottom,
                color_fraction: 0.0,
            }],
            viewport: Viewport {
                x_min: 0.0,
                x_max: 1.0,
                y_min: 0.0,
                y_max: 1.0,
            },
            n_clusters: 2,
        }
    }

    #[test]
    fn ramps_hit_their_endpoints() {
        assert_eq!(spectral(0.0), "#000000");
        assert_eq!(spectral(1.0), "#cccccc");
        assert_eq!(spectral(0.5), "#009900");
        assert_eq!(hot_reversed(0.0), "#ffffff");
        assert_eq!(hot_reversed(1.0), "#000000");
    }

    #[test]
    fn maps_viewport_with_flipped_y() {
        let canvas = Canvas {
            viewport: scene().viewport,
            width: 100.0,
            height: 50.0,
        };
        assert_eq!(canvas.map(0.0, 0.0), (0.0, 50.0));
        assert_eq!(canvas.map(1.0, 1.0), (100.0, 0.0));
    }

    #[test]
    fn renders_every_element_in_order() {
        let svg = render_svg(&scene(), SVG_WIDTH, SVG_HEIGHT);
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<line").count(), 1);
        assert_eq!(svg.matches("<circle").count(), 2);
        assert_eq!(svg.matches("<text").count(), 1);
        let edges = svg.find(r#"id="edges""#).unwrap();
        let nodes = svg.find(r#"id="nodes""#).unwrap();
        let labels = svg.find(r#"id="labels""#).unwrap();
        assert!(edges < nodes && nodes < labels);
    }

    #[test]
    fn label_text_is_escaped_and_anchored() {
        let svg = render_svg(&scene(), SVG_WIDTH, SVG_HEIGHT);
        assert!(svg.contains("AT&amp;T &lt;Inc&gt;"));
        assert!(svg.contains(r#"text-anchor="end""#));
        assert!(svg.contains(r#"dominant-baseline="text-after-edge""#));
    }

    #[test]
    fn degenerate_viewport_does_not_divide_by_zero() {
        let mut s = scene();
        s.viewport = Viewport {
            x_min: 0.5,
            x_max: 0.5,
            y_min: 0.5,
            y_max: 0.5,
        };
        let svg = render_svg(&s, SVG_WIDTH, SVG_HEIGHT);
        assert!(!svg.contains("NaN"));
        assert!(!svg.contains("inf"));
    }
}
