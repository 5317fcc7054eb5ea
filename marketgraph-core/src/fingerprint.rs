//! Dataset fingerprinting.
//!
//! A BLAKE3 digest over the canonical symbol ids and the variation values,
//! stored next to a persisted model so a reload on different data can be
//! reported.

use crate::data::VariationMatrix;

/// Hex digest identifying a variation matrix.
pub fn dataset_hash(variation: &VariationMatrix) -> String {
    let mut hasher = blake3::Hasher::new();
    for id in &variation.symbols {
        hasher.update(id.as_bytes());
        hasher.update(&[0]);
    }
    hasher.update(&(variation.n_symbols() as u64).to_le_bytes());
    hasher.update(&(variation.n_samples() as u64).to_le_bytes());
    // row-major so the digest does not depend on the matrix storage order
    for row in variation.values.row_iter() {
        for v in row.iter() {
            hasher.update(&v.to_bits().to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn matrix(values: &[f64]) -> VariationMatrix {
        VariationMatrix {
            symbols: vec!["A:X".into(), "A:Y".into()],
            values: DMatrix::from_row_slice(2, 2, values),
        }
    }

    #[test]
    fn same_data_same_hash() {
        let a = matrix(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(dataset_hash(&a), dataset_hash(&a.clone()));
        assert_eq!(dataset_hash(&a).len(), 64);
    }

    #[test]
    fn value_change_changes_hash() {
        assert_ne!(
            dataset_hash(&matrix(&[1.0, 2.0, 3.0, 4.0])),
            dataset_hash(&matrix(&[1.0, 2.0, 3.0, 4.5]))
        );
    }

    #[test]
    fn symbol_change_changes_hash() {
        let a = matrix(&[1.0, 2.0, 3.0, 4.0]);
        let mut b = a.clone();
        b.symbols[1] = "A:Z".into();
        assert_ne!(dataset_hash(&a), dataset_hash(&b));
    }
}
