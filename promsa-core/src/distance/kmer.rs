//! Alignment-free k-mer distances for the draft guide tree

use fnv::FnvHashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{DistanceMatrix, SymmetricDistanceMatrix};
use crate::alphabet::is_gap;
use crate::error::{MsaError, MsaResult};
use crate::types::Sequence;

/// k-mer occurrence counts of one sequence
pub type KmerCounts = FnvHashMap<Vec<u8>, u32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KmerDistanceFunction {
    #[default]
    Euclidean,
    ModifiedMuscle,
    PearsonCorrelation,
    CoVariance,
}

impl KmerDistanceFunction {
    pub const ALL: [KmerDistanceFunction; 4] = [
        KmerDistanceFunction::Euclidean,
        KmerDistanceFunction::ModifiedMuscle,
        KmerDistanceFunction::PearsonCorrelation,
        KmerDistanceFunction::CoVariance,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            KmerDistanceFunction::Euclidean => "euclidean",
            KmerDistanceFunction::ModifiedMuscle => "modified-muscle",
            KmerDistanceFunction::PearsonCorrelation => "pearson-correlation",
            KmerDistanceFunction::CoVariance => "co-variance",
        }
    }
}

impl fmt::Display for KmerDistanceFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KmerDistanceFunction {
    type Err = MsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MsaError::InvalidConfig(format!("unknown k-mer distance function '{s}'")))
    }
}

/// Builds a [`SymmetricDistanceMatrix`] from k-mer composition
#[derive(Debug, Clone)]
pub struct KmerDistanceMatrixGenerator {
    kmer_length: usize,
    function: KmerDistanceFunction,
}

impl KmerDistanceMatrixGenerator {
    pub fn new(kmer_length: usize, function: KmerDistanceFunction) -> MsaResult<Self> {
        if kmer_length == 0 {
            return Err(MsaError::InvalidConfig("k-mer length must be positive".to_string()));
        }
        Ok(Self { kmer_length, function })
    }

    pub fn kmer_length(&self) -> usize {
        self.kmer_length
    }

    pub fn function(&self) -> KmerDistanceFunction {
        self.function
    }

    /// Count the k-mers of the ungapped, upper-cased symbols of `data`.
    pub fn count_kmers(data: &[u8], kmer_length: usize) -> KmerCounts {
        let residues: Vec<u8> = data
            .iter()
            .filter(|&&s| !is_gap(s))
            .map(|s| s.to_ascii_uppercase())
            .collect();
        let mut counts = KmerCounts::default();
        if kmer_length == 0 || residues.len() < kmer_length {
            return counts;
        }
        for window in residues.windows(kmer_length) {
            *counts.entry(window.to_vec()).or_insert(0) += 1;
        }
        counts
    }

    /// Distance between two k-mer count tables.
    ///
    /// `len_a` and `len_b` are the residue counts of the two sequences.
    pub fn distance(&self, a: &KmerCounts, len_a: usize, b: &KmerCounts, len_b: usize) -> f32 {
        match self.function {
            KmerDistanceFunction::Euclidean => euclidean(a, b),
            KmerDistanceFunction::ModifiedMuscle => modified_muscle(a, len_a, b, len_b, self.kmer_length),
            KmerDistanceFunction::PearsonCorrelation => match union_moments(a, b) {
                Some(m) if m.var_a > 0.0 && m.var_b > 0.0 => {
                    (1.0 - m.cov / (m.var_a * m.var_b).sqrt()) as f32
                }
                _ => 1.0,
            },
            KmerDistanceFunction::CoVariance => match union_moments(a, b) {
                Some(m) => (1.0 / (1.0 + m.cov.max(0.0))) as f32,
                None => 1.0,
            },
        }
    }

    /// Distances between every pair of `sequences`, computed in parallel.
    pub fn generate(&self, sequences: &[Sequence]) -> MsaResult<SymmetricDistanceMatrix> {
        let n = sequences.len();
        let mut matrix = SymmetricDistanceMatrix::new(n)?;

        let counts: Vec<(KmerCounts, usize)> = sequences
            .par_iter()
            .map(|s| (Self::count_kmers(&s.data, self.kmer_length), s.residue_count()))
            .collect();

        let pairs: Vec<(usize, usize)> = (0..n).flat_map(|i| (i + 1..n).map(move |j| (i, j))).collect();
        let distances: Vec<f32> = pairs
            .par_iter()
            .map(|&(i, j)| self.distance(&counts[i].0, counts[i].1, &counts[j].0, counts[j].1))
            .collect();

        for (&(i, j), &d) in pairs.iter().zip(&distances) {
            matrix.set(i, j, d)?;
        }
        log::debug!(
            "Generated {}x{} {} k-mer distance matrix (k = {})",
            n,
            n,
            self.function,
            self.kmer_length
        );
        Ok(matrix)
    }
}

fn euclidean(a: &KmerCounts, b: &KmerCounts) -> f32 {
    let mut sum = 0.0f64;
    for (kmer, &count_a) in a {
        let count_b = b.get(kmer).copied().unwrap_or(0);
        let diff = count_a as f64 - count_b as f64;
        sum += diff * diff;
    }
    for (kmer, &count_b) in b {
        if !a.contains_key(kmer) {
            sum += (count_b as f64) * (count_b as f64);
        }
    }
    sum.sqrt() as f32
}

/// 1 minus the fraction of shared k-mers relative to the shorter sequence
fn modified_muscle(a: &KmerCounts, len_a: usize, b: &KmerCounts, len_b: usize, k: usize) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 1.0;
    }
    let shared: u32 = a
        .iter()
        .filter_map(|(kmer, &count_a)| b.get(kmer).map(|&count_b| count_a.min(count_b)))
        .sum();
    let windows = len_a.min(len_b) + 1 - k;
    (1.0 - shared as f64 / windows as f64).max(0.0) as f32
}

struct Moments {
    cov: f64,
    var_a: f64,
    var_b: f64,
}

/// Population covariance and variances over the union of observed k-mers
fn union_moments(a: &KmerCounts, b: &KmerCounts) -> Option<Moments> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let mut pairs: Vec<(f64, f64)> = a
        .iter()
        .map(|(kmer, &count_a)| (count_a as f64, b.get(kmer).copied().unwrap_or(0) as f64))
        .collect();
    pairs.extend(
        b.iter()
            .filter(|(kmer, _)| !a.contains_key(*kmer))
            .map(|(_, &count_b)| (0.0, count_b as f64)),
    );

    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let mut moments = Moments { cov: 0.0, var_a: 0.0, var_b: 0.0 };
    for &(x, y) in &pairs {
        moments.cov += (x - mean_a) * (y - mean_b);
        moments.var_a += (x - mean_a) * (x - mean_a);
        moments.var_b += (y - mean_b) * (y - mean_b);
    }
    moments.cov /= n;
    moments.var_a /= n;
    moments.var_b /= n;
    Some(moments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seqs(data: &[&str]) -> Vec<Sequence> {
        data.iter()
            .enumerate()
            .map(|(i, d)| Sequence::new(format!("s{i}"), d.as_bytes().to_vec()))
            .collect()
    }

    #[test]
    fn test_count_kmers() {
        let counts = KmerDistanceMatrixGenerator::count_kmers(b"acgta-a", 3);
        assert_eq!(counts.len(), 4);
        assert_eq!(counts[&b"ACG".to_vec()], 1);
        assert_eq!(counts[&b"TAA".to_vec()], 1);

        let repeated = KmerDistanceMatrixGenerator::count_kmers(b"AAAAA", 3);
        assert_eq!(repeated[&b"AAA".to_vec()], 3);

        assert!(KmerDistanceMatrixGenerator::count_kmers(b"AC", 3).is_empty());
    }

    #[test]
    fn test_identical_sequences_have_zero_distance() {
        for function in KmerDistanceFunction::ALL {
            let generator = KmerDistanceMatrixGenerator::new(3, function).unwrap();
            let matrix = generator.generate(&seqs(&["ACGTACGGT", "ACGTACGGT"])).unwrap();
            let d = matrix.get(0, 1).unwrap();
            match function {
                KmerDistanceFunction::CoVariance => assert!(d < 1.0, "{function}: {d}"),
                _ => assert!(d.abs() < 1e-6, "{function}: {d}"),
            }
        }
    }

    #[test]
    fn test_short_sequences_default_to_one() {
        for function in [KmerDistanceFunction::ModifiedMuscle, KmerDistanceFunction::PearsonCorrelation] {
            let generator = KmerDistanceMatrixGenerator::new(3, function).unwrap();
            let matrix = generator.generate(&seqs(&["AC", "ACGTT"])).unwrap();
            assert_eq!(matrix.get(0, 1).unwrap(), 1.0);
        }
    }

    #[test]
    fn test_closer_sequences_have_smaller_distance() {
        let generator = KmerDistanceMatrixGenerator::new(3, KmerDistanceFunction::Euclidean).unwrap();
        let matrix = generator
            .generate(&seqs(&["ACGTACGTAC", "ACGTACGTTC", "GGGGCCCCAA"]))
            .unwrap();
        assert!(matrix.get(0, 1).unwrap() < matrix.get(0, 2).unwrap());
        assert_eq!(matrix.nearest_neighbors()[0], 1);
    }

    #[test]
    fn test_zero_kmer_length_rejected() {
        assert!(matches!(
            KmerDistanceMatrixGenerator::new(0, KmerDistanceFunction::Euclidean),
            Err(MsaError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_function_names_round_trip() {
        for function in KmerDistanceFunction::ALL {
            assert_eq!(function.to_string().parse::<KmerDistanceFunction>().unwrap(), function);
        }
        assert!("manhattan".parse::<KmerDistanceFunction>().is_err());
    }
}
