//! Kimura distances estimated from an existing alignment

use rayon::prelude::*;

use super::{DistanceMatrix, SymmetricDistanceMatrix};
use crate::alphabet::is_gap;
use crate::error::{MsaError, MsaResult};
use crate::types::Sequence;

/// Distance assigned to saturated pairs (p >= 0.75) or pairs with no shared residue column
pub const KIMURA_MAX_DISTANCE: f32 = 2.0;

const SATURATION: f64 = 0.75;

#[derive(Debug, Clone)]
pub struct KimuraDistanceMatrixGenerator {
    max_distance: f32,
}

impl Default for KimuraDistanceMatrixGenerator {
    fn default() -> Self {
        Self {
            max_distance: KIMURA_MAX_DISTANCE,
        }
    }
}

impl KimuraDistanceMatrixGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_distance(max_distance: f32) -> Self {
        Self { max_distance }
    }

    /// Kimura-corrected distance between two aligned rows of equal length
    pub fn distance(&self, a: &[u8], b: &[u8]) -> f32 {
        let mut shared = 0usize;
        let mut differing = 0usize;
        for (&x, &y) in a.iter().zip(b) {
            if is_gap(x) || is_gap(y) {
                continue;
            }
            shared += 1;
            if !x.eq_ignore_ascii_case(&y) {
                differing += 1;
            }
        }
        if shared == 0 {
            return self.max_distance;
        }
        let p = differing as f64 / shared as f64;
        if p >= SATURATION {
            return self.max_distance;
        }
        let d = -(1.0 - p - p * p / 5.0).ln();
        (d as f32).min(self.max_distance)
    }

    /// Distances between every pair of aligned sequences.
    pub fn generate(&self, aligned: &[Sequence]) -> MsaResult<SymmetricDistanceMatrix> {
        let n = aligned.len();
        if let Some(first) = aligned.first() {
            if let Some(bad) = aligned.iter().find(|s| s.len() != first.len()) {
                return Err(MsaError::NotAligned(format!(
                    "sequence '{}' has length {} but '{}' has length {}",
                    bad.id,
                    bad.len(),
                    first.id,
                    first.len()
                )));
            }
        }

        let mut matrix = SymmetricDistanceMatrix::new(n)?;
        let pairs: Vec<(usize, usize)> = (0..n).flat_map(|i| (i + 1..n).map(move |j| (i, j))).collect();
        let distances: Vec<f32> = pairs
            .par_iter()
            .map(|&(i, j)| self.distance(&aligned[i].data, &aligned[j].data))
            .collect();
        for (&(i, j), &d) in pairs.iter().zip(&distances) {
            matrix.set(i, j, d)?;
        }
        log::debug!("Generated {}x{} Kimura distance matrix", n, n);
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_rows() {
        let generator = KimuraDistanceMatrixGenerator::new();
        assert_eq!(generator.distance(b"AC-GT", b"ACGGT"), 0.0);
    }

    #[test]
    fn test_known_value() {
        let generator = KimuraDistanceMatrixGenerator::new();
        // one difference in four shared columns: p = 0.25
        let expected = -(1.0f64 - 0.25 - 0.0625 / 5.0).ln() as f32;
        assert!((generator.distance(b"ACGT", b"ACGA") - expected).abs() < 1e-6);
    }

    #[test]
    fn test_saturation_and_no_overlap() {
        let generator = KimuraDistanceMatrixGenerator::new();
        assert_eq!(generator.distance(b"AAAA", b"CCCA"), KIMURA_MAX_DISTANCE);
        assert_eq!(generator.distance(b"AA--", b"--CC"), KIMURA_MAX_DISTANCE);
    }

    #[test]
    fn test_generate_requires_alignment() {
        let generator = KimuraDistanceMatrixGenerator::new();
        let rows = vec![
            Sequence::new("a".to_string(), b"ACGT".to_vec()),
            Sequence::new("b".to_string(), b"ACG".to_vec()),
        ];
        assert!(matches!(generator.generate(&rows), Err(MsaError::NotAligned(_))));
    }

    #[test]
    fn test_generate_matrix() {
        let generator = KimuraDistanceMatrixGenerator::new();
        let rows = vec![
            Sequence::new("a".to_string(), b"ACGTACGT".to_vec()),
            Sequence::new("b".to_string(), b"ACGTACGA".to_vec()),
            Sequence::new("c".to_string(), b"TTGTACCA".to_vec()),
        ];
        let matrix = generator.generate(&rows).unwrap();
        assert!(matrix.get(0, 1).unwrap() < matrix.get(0, 2).unwrap());
        assert_eq!(matrix.get(1, 0).unwrap(), matrix.get(0, 1).unwrap());
    }
}
