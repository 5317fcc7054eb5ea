//! End-to-end analysis: five symbols, one strongly correlated pair.

use std::f64::consts::PI;

use chrono::{Duration, NaiveDate};

use marketgraph_core::analysis::{
    standardize, AffinityPropagation, GraphicalLassoCv, LocallyLinearEmbedding,
};
use marketgraph_core::data::variation_matrix;
use marketgraph_core::domain::{PriceSample, PriceSeries, SymbolTable};
use marketgraph_core::layout::{compose_scene, GraphStyle};

const T: usize = 20;

/// Variation paths: the first two correlate at 0.95, the rest are mutually orthogonal.
fn variations() -> Vec<(&'static str, &'static str, Vec<f64>)> {
    let w = 2.0 * PI / T as f64;
    let rho: f64 = 0.95;
    let wave = |f: fn(f64) -> f64, k: f64| (0..T).map(move |t| f(k * w * t as f64));
    vec![
        ("A:PAIR1", "Pair One", wave(f64::cos, 1.0).collect()),
        (
            "A:PAIR2",
            "Pair Two",
            (0..T)
                .map(|t| {
                    let x = w * t as f64;
                    rho * x.cos() + (1.0 - rho * rho).sqrt() * x.sin()
                })
                .collect(),
        ),
        ("B:SOLO1", "Solo One", wave(f64::cos, 2.0).collect()),
        ("B:SOLO2", "Solo Two", wave(f64::sin, 3.0).collect()),
        ("B:SOLO3", "Solo Three", wave(f64::cos, 4.0).collect()),
    ]
}

fn series(symbol: &str, path: &[f64]) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    let samples = path
        .iter()
        .enumerate()
        .map(|(t, v)| PriceSample {
            timestamp: start + Duration::minutes(15 * t as i64),
            open: 100.0,
            high: 100.0 + v.max(0.0),
            low: 100.0 + v.min(0.0),
            close: 100.0 + v,
            volume: 5000.0,
        })
        .collect();
    PriceSeries::new(symbol, samples)
}

#[test]
fn correlated_pair_is_the_only_edge() {
    let data = variations();
    let table = SymbolTable::from_pairs(data.iter().map(|(id, name, _)| (*id, *name)));
    let quotes: Vec<PriceSeries> = data.iter().map(|(id, _, path)| series(id, path)).collect();

    let variation = variation_matrix(&quotes).unwrap();
    assert_eq!(variation.values.shape(), (5, T));

    let x = standardize(&variation).unwrap();
    let fit = GraphicalLassoCv::default().fit(&x.values).unwrap();
    assert!(fit.alpha > 0.0);

    let clusters = AffinityPropagation::default().fit(&fit.covariance).unwrap();
    assert_eq!(clusters.labels.len(), 5);
    let solo = &clusters.labels[2..];
    assert_ne!(solo[0], solo[1]);
    assert_ne!(solo[0], solo[2]);
    assert_ne!(solo[1], solo[2]);
    for &label in solo {
        assert!(!clusters.labels[..2].contains(&label));
    }

    let embedding = LocallyLinearEmbedding::default()
        .fit_transform(&x.points())
        .unwrap();
    assert_eq!(embedding.len(), 5);

    let scene = compose_scene(&table, &fit.precision, &clusters, &embedding, &GraphStyle::default())
        .unwrap();
    assert_eq!(scene.edges.len(), 1);
    assert_eq!((scene.edges[0].i, scene.edges[0].j), (0, 1));
    assert_eq!(scene.nodes.len(), 5);
    assert_eq!(scene.labels.len(), 5);
    assert_eq!(scene.labels[0].text, "Pair One");
}

#[test]
fn analysis_is_repeatable() {
    let data = variations();
    let quotes: Vec<PriceSeries> = data.iter().map(|(id, _, path)| series(id, path)).collect();
    let x = standardize(&variation_matrix(&quotes).unwrap()).unwrap();

    let run = || {
        let fit = GraphicalLassoCv::default().fit(&x.values).unwrap();
        let clusters = AffinityPropagation::default().fit(&fit.covariance).unwrap();
        let embedding = LocallyLinearEmbedding::default()
            .fit_transform(&x.points())
            .unwrap();
        (fit.alpha, clusters, embedding)
    };

    assert_eq!(run(), run());
}
