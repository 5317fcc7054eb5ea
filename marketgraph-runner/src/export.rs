//! Artifact export: scene JSON, edge CSV, cluster report and SVG.
//!
//! All artifacts of a run land in one output directory:
//! - `scene.json`: the full scene description
//! - `edges.csv`: one row per retained edge
//! - `clusters.txt`: member names per cluster
//! - `result.svg`: the rendered graph

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use marketgraph_core::layout::Scene;

use crate::pipeline::PipelineResult;
use crate::render::{render_svg, SVG_HEIGHT, SVG_WIDTH};

/// Paths of the files written by [`save_artifacts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub scene: PathBuf,
    pub edges: PathBuf,
    pub clusters: PathBuf,
    pub svg: PathBuf,
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_scene_json(scene: &Scene) -> Result<String> {
    serde_json::to_string_pretty(scene).context("failed to serialize scene to JSON")
}

pub fn import_scene_json(json: &str) -> Result<Scene> {
    serde_json::from_str(json).context("failed to deserialize scene from JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: i, j, source, target, weight, linewidth
pub fn export_edges_csv(result: &PipelineResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["i", "j", "source", "target", "weight", "linewidth"])?;

    let id = |index: usize| {
        result
            .symbols
            .get(index)
            .map(|s| s.id.clone())
            .unwrap_or_default()
    };
    for edge in &result.scene.edges {
        wtr.write_record([
            &edge.i.to_string(),
            &edge.j.to_string(),
            &id(edge.i),
            &id(edge.j),
            &format!("{:.6}", edge.weight),
            &format!("{:.6}", edge.linewidth),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Cluster report ─────────────────────────────────────────────────

/// Human-readable cluster listing, one line per cluster.
pub fn cluster_report(result: &PipelineResult) -> String {
    let mut out = String::new();
    if result.has_synthetic {
        out.push_str("# SYNTHETIC DATA\n");
    }
    for (label, names) in result.cluster_names().iter().enumerate() {
        out.push_str(&format!("Cluster {}: {}\n", label + 1, names.join(", ")));
    }
    if !result.skipped.is_empty() {
        let ids: Vec<&str> = result.skipped.iter().map(|s| s.id.as_str()).collect();
        out.push_str(&format!("Skipped: {}\n", ids.join(", ")));
    }
    out
}

// ─── Artifact directory ─────────────────────────────────────────────

/// Write every artifact of `result` into `output_dir`, creating it if needed.
pub fn save_artifacts(result: &PipelineResult, output_dir: &Path) -> Result<ArtifactPaths> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let paths = ArtifactPaths {
        scene: output_dir.join("scene.json"),
        edges: output_dir.join("edges.csv"),
        clusters: output_dir.join("clusters.txt"),
        svg: output_dir.join("result.svg"),
    };

    let write = |path: &Path, content: &str| {
        std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
    };
    write(&paths.scene, &export_scene_json(&result.scene)?)?;
    write(&paths.edges, &export_edges_csv(result)?)?;
    write(&paths.clusters, &cluster_report(result))?;
    write(&paths.svg, &render_svg(&result.scene, SVG_WIDTH, SVG_HEIGHT))?;

    log::info!("artifacts written to {}", output_dir.display());
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use marketgraph_core::analysis::{ClusterAssignment, Embedding, ModelOrigin, StructureModel};
    use marketgraph_core::domain::SymbolTable;
    use marketgraph_core::layout::{compose_scene, GraphStyle};
    use nalgebra::DMatrix;

    use crate::data_loader::{SkipReason, SkippedSymbol};

    fn result() -> PipelineResult {
        let symbols = SymbolTable::from_pairs([("X:A", "Alpha"), ("X:B", "Beta"), ("X:C", "Gamma")]);
        let precision =
            DMatrix::from_row_slice(3, 3, &[1.0, -0.6, 0.0, -0.6, 1.0, 0.0, 0.0, 0.0, 1.0]);
        let clusters = ClusterAssignment {
            labels: vec![0, 0, 1],
            exemplars: vec![0, 2],
            converged: true,
        };
        let embedding = Embedding {
            coords: vec![[0.1, 0.2], [0.3, -0.4], [-0.5, 0.6]],
        };
        let scene = compose_scene(&symbols, &precision, &clusters, &embedding, &GraphStyle::default())
            .unwrap();
        PipelineResult {
            model: StructureModel {
                schema_version: 1,
                symbols: symbols.ids(),
                alpha: 0.1,
                covariance: DMatrix::identity(3, 3),
                precision,
                cv_path: vec![],
                dataset_hash: "h".into(),
                fitted_at: Utc::now(),
            },
            symbols,
            origin: ModelOrigin::Fitted,
            clusters,
            embedding,
            scene,
            skipped: vec![SkippedSymbol {
                id: "X:D".into(),
                reason: SkipReason::Empty,
            }],
            n_samples: 20,
            dataset_hash: "h".into(),
            has_synthetic: true,
        }
    }

    #[test]
    fn edges_csv_lists_retained_edges() {
        let csv = export_edges_csv(&result()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "i,j,source,target,weight,linewidth");
        assert_eq!(lines[1], "0,1,X:A,X:B,0.600000,9.000000");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn cluster_report_lists_members() {
        let report = cluster_report(&result());
        assert_eq!(
            report,
            "# SYNTHETIC DATA\nCluster 1: Alpha, Beta\nCluster 2: Gamma\nSkipped: X:D\n"
        );
    }

    #[test]
    fn scene_json_round_trips() {
        let r = result();
        let json = export_scene_json(&r.scene).unwrap();
        assert_eq!(import_scene_json(&json).unwrap(), r.scene);
    }

    #[test]
    fn save_artifacts_writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("run");
        let paths = save_artifacts(&result(), &out).unwrap();
        for path in [&paths.scene, &paths.edges, &paths.clusters, &paths.svg] {
            assert!(path.exists(), "{} missing", path.display());
        }
        let svg = std::fs::read_to_string(&paths.svg).unwrap();
        assert!(svg.contains("Gamma"));
    }
}
