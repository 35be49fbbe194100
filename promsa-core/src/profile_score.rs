//! Profile-versus-profile column scores
//!
//! Every [`ProfileScoreFunction`] is a pure function of a similarity matrix and
//! two column vectors. [`ProfileScorer`] binds one function to a pair of
//! profiles for the DP fill: the kernel is picked once at construction and any
//! per-column preprocessing (sorted index orders, `matrix x column` products,
//! shifted or exponentiated matrices) is done up front.
//!
//! Larger is always better. Distance and divergence functions are negated;
//! Jensen-Shannon scores as `1 - JS`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{MsaError, MsaResult};
use crate::profile::Profile;
use crate::similarity::SimilarityMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileScoreFunction {
    InnerProduct,
    InnerProductFast,
    #[default]
    WeightedInnerProduct,
    WeightedInnerProductCached,
    WeightedInnerProductFast,
    WeightedInnerProductShifted,
    WeightedInnerProductShiftedFast,
    WeightedEuclideanDistance,
    WeightedEuclideanDistanceFast,
    PearsonCorrelation,
    LogExponentialInnerProduct,
    LogExponentialInnerProductFast,
    LogExponentialInnerProductShifted,
    LogExponentialInnerProductShiftedFast,
    SymmetrizedEntropy,
    JensenShannonDivergence,
}

impl ProfileScoreFunction {
    pub const ALL: [ProfileScoreFunction; 16] = [
        ProfileScoreFunction::InnerProduct,
        ProfileScoreFunction::InnerProductFast,
        ProfileScoreFunction::WeightedInnerProduct,
        ProfileScoreFunction::WeightedInnerProductCached,
        ProfileScoreFunction::WeightedInnerProductFast,
        ProfileScoreFunction::WeightedInnerProductShifted,
        ProfileScoreFunction::WeightedInnerProductShiftedFast,
        ProfileScoreFunction::WeightedEuclideanDistance,
        ProfileScoreFunction::WeightedEuclideanDistanceFast,
        ProfileScoreFunction::PearsonCorrelation,
        ProfileScoreFunction::LogExponentialInnerProduct,
        ProfileScoreFunction::LogExponentialInnerProductFast,
        ProfileScoreFunction::LogExponentialInnerProductShifted,
        ProfileScoreFunction::LogExponentialInnerProductShiftedFast,
        ProfileScoreFunction::SymmetrizedEntropy,
        ProfileScoreFunction::JensenShannonDivergence,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProfileScoreFunction::InnerProduct => "inner-product",
            ProfileScoreFunction::InnerProductFast => "inner-product-fast",
            ProfileScoreFunction::WeightedInnerProduct => "weighted-inner-product",
            ProfileScoreFunction::WeightedInnerProductCached => "weighted-inner-product-cached",
            ProfileScoreFunction::WeightedInnerProductFast => "weighted-inner-product-fast",
            ProfileScoreFunction::WeightedInnerProductShifted => "weighted-inner-product-shifted",
            ProfileScoreFunction::WeightedInnerProductShiftedFast => "weighted-inner-product-shifted-fast",
            ProfileScoreFunction::WeightedEuclideanDistance => "weighted-euclidean-distance",
            ProfileScoreFunction::WeightedEuclideanDistanceFast => "weighted-euclidean-distance-fast",
            ProfileScoreFunction::PearsonCorrelation => "pearson-correlation",
            ProfileScoreFunction::LogExponentialInnerProduct => "log-exponential-inner-product",
            ProfileScoreFunction::LogExponentialInnerProductFast => "log-exponential-inner-product-fast",
            ProfileScoreFunction::LogExponentialInnerProductShifted => "log-exponential-inner-product-shifted",
            ProfileScoreFunction::LogExponentialInnerProductShiftedFast => {
                "log-exponential-inner-product-shifted-fast"
            }
            ProfileScoreFunction::SymmetrizedEntropy => "symmetrized-entropy",
            ProfileScoreFunction::JensenShannonDivergence => "jensen-shannon-divergence",
        }
    }

    /// Reference evaluation on two full column vectors (residue slots plus gap slot).
    ///
    /// Performance variants evaluate to the same value as their plain form.
    pub fn evaluate(&self, matrix: &SimilarityMatrix, a: &[f32], b: &[f32]) -> f32 {
        let n = a.len() - 1;
        let (ra, rb) = (&a[..n], &b[..n]);
        let scale = (1.0 - a[n]) * (1.0 - b[n]);
        match self {
            ProfileScoreFunction::InnerProduct | ProfileScoreFunction::InnerProductFast => {
                (0..n).map(|i| ra[i] * rb[i] * matrix.get(i, i)).sum::<f32>() * scale
            }
            ProfileScoreFunction::WeightedInnerProduct
            | ProfileScoreFunction::WeightedInnerProductCached
            | ProfileScoreFunction::WeightedInnerProductFast => bilinear(ra, rb, |i, j| matrix.get(i, j)) * scale,
            ProfileScoreFunction::WeightedInnerProductShifted
            | ProfileScoreFunction::WeightedInnerProductShiftedFast => {
                bilinear(ra, rb, |i, j| matrix.get(i, j) + 0.5) * scale
            }
            ProfileScoreFunction::WeightedEuclideanDistance
            | ProfileScoreFunction::WeightedEuclideanDistanceFast => {
                let mut sum = 0.0f32;
                for i in 0..n {
                    for j in 0..n {
                        let d = ra[i] - rb[j];
                        sum += d * d * matrix.get(i, j);
                    }
                }
                -sum
            }
            ProfileScoreFunction::PearsonCorrelation => pearson(a, b),
            ProfileScoreFunction::LogExponentialInnerProduct
            | ProfileScoreFunction::LogExponentialInnerProductFast => {
                log_floor(bilinear(ra, rb, |i, j| matrix.get(i, j).exp2()) * scale)
            }
            ProfileScoreFunction::LogExponentialInnerProductShifted
            | ProfileScoreFunction::LogExponentialInnerProductShiftedFast => {
                log_floor(bilinear(ra, rb, |i, j| (matrix.get(i, j) + 0.5).exp2()) * scale)
            }
            ProfileScoreFunction::SymmetrizedEntropy => -(kullback_leibler(a, b) + kullback_leibler(b, a)) / 2.0,
            ProfileScoreFunction::JensenShannonDivergence => 1.0 - jensen_shannon(a, b),
        }
    }
}

impl fmt::Display for ProfileScoreFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProfileScoreFunction {
    type Err = MsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MsaError::InvalidConfig(format!("unknown profile score function '{s}'")))
    }
}

fn bilinear(a: &[f32], b: &[f32], weight: impl Fn(usize, usize) -> f32) -> f32 {
    let mut sum = 0.0f32;
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in b.iter().enumerate() {
            sum += weight(i, j) * x * y;
        }
    }
    sum
}

#[inline]
fn log_floor(value: f32) -> f32 {
    value.max(f32::MIN_POSITIVE).log2()
}

/// Pearson correlation; 0 when either vector is constant
pub fn pearson(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len() as f32;
    let mean_a = a.iter().sum::<f32>() / n;
    let mean_b = b.iter().sum::<f32>() / n;
    let (mut cov, mut var_a, mut var_b) = (0.0f32, 0.0f32, 0.0f32);
    for (&x, &y) in a.iter().zip(b) {
        cov += (x - mean_a) * (y - mean_b);
        var_a += (x - mean_a) * (x - mean_a);
        var_b += (y - mean_b) * (y - mean_b);
    }
    if var_a <= 0.0 || var_b <= 0.0 {
        return 0.0;
    }
    cov / (var_a * var_b).sqrt()
}

/// `sum a[i] log2(a[i] / b[i])` over slots where both are non-zero
pub fn kullback_leibler(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .filter(|(&x, &y)| x != 0.0 && y != 0.0)
        .map(|(&x, &y)| x * (x / y).log2())
        .sum()
}

pub fn jensen_shannon(a: &[f32], b: &[f32]) -> f32 {
    let mean: Vec<f32> = a.iter().zip(b).map(|(&x, &y)| (x + y) / 2.0).collect();
    (kullback_leibler(a, &mean) + kullback_leibler(b, &mean)) / 2.0
}

type Kernel = fn(&ProfileScorer<'_>, usize, usize) -> f32;

/// A score function bound to two profiles
pub struct ProfileScorer<'a> {
    function: ProfileScoreFunction,
    matrix: &'a SimilarityMatrix,
    a: &'a Profile,
    b: &'a Profile,
    residues: usize,
    kernel: Kernel,
    /// Substitution weights used by the bilinear kernels (plain, shifted or exponentiated)
    weights: Vec<f32>,
    /// `weights x column` for every column of `b`
    cached_b: Vec<f32>,
    /// Per column: residue slots with non-zero value, largest first
    order_a: SortedColumns,
    order_b: SortedColumns,
}

#[derive(Default)]
struct SortedColumns {
    indices: Vec<u8>,
    offsets: Vec<usize>,
}

impl SortedColumns {
    fn build(profile: &Profile, residues: usize) -> Self {
        let mut indices = Vec::new();
        let mut offsets = Vec::with_capacity(profile.len() + 1);
        offsets.push(0);
        let mut order: Vec<u8> = Vec::with_capacity(residues);
        for column in 0..profile.len() {
            let vector = profile.column(column);
            order.clear();
            order.extend((0..residues as u8).filter(|&i| vector[i as usize] > 0.0));
            order.sort_by(|&x, &y| vector[y as usize].total_cmp(&vector[x as usize]).then(x.cmp(&y)));
            indices.extend_from_slice(&order);
            offsets.push(indices.len());
        }
        Self { indices, offsets }
    }

    #[inline]
    fn column(&self, index: usize) -> &[u8] {
        &self.indices[self.offsets[index]..self.offsets[index + 1]]
    }
}

impl<'a> ProfileScorer<'a> {
    pub fn new(
        function: ProfileScoreFunction,
        matrix: &'a SimilarityMatrix,
        a: &'a Profile,
        b: &'a Profile,
    ) -> MsaResult<Self> {
        if a.width() != b.width() {
            return Err(MsaError::DimensionMismatch {
                expected: a.width(),
                found: b.width(),
            });
        }
        if a.width() != matrix.size() + 1 {
            return Err(MsaError::DimensionMismatch {
                expected: matrix.size() + 1,
                found: a.width(),
            });
        }
        let residues = matrix.size();

        let weights: Vec<f32> = match function {
            ProfileScoreFunction::WeightedInnerProductShifted | ProfileScoreFunction::WeightedInnerProductShiftedFast => {
                substitution_weights(matrix, |s| s + 0.5)
            }
            ProfileScoreFunction::LogExponentialInnerProduct | ProfileScoreFunction::LogExponentialInnerProductFast => {
                substitution_weights(matrix, f32::exp2)
            }
            ProfileScoreFunction::LogExponentialInnerProductShifted
            | ProfileScoreFunction::LogExponentialInnerProductShiftedFast => {
                substitution_weights(matrix, |s| (s + 0.5).exp2())
            }
            _ => substitution_weights(matrix, |s| s),
        };

        let fast = matches!(
            function,
            ProfileScoreFunction::InnerProductFast
                | ProfileScoreFunction::WeightedInnerProductFast
                | ProfileScoreFunction::WeightedInnerProductShiftedFast
                | ProfileScoreFunction::WeightedEuclideanDistanceFast
                | ProfileScoreFunction::LogExponentialInnerProductFast
                | ProfileScoreFunction::LogExponentialInnerProductShiftedFast
        );
        let (order_a, order_b) = if fast {
            (SortedColumns::build(a, residues), SortedColumns::build(b, residues))
        } else {
            (SortedColumns::default(), SortedColumns::default())
        };

        let cached_b = if function == ProfileScoreFunction::WeightedInnerProductCached {
            let mut cache = Vec::with_capacity(b.len() * residues);
            for column in 0..b.len() {
                let vector = &b.column(column)[..residues];
                for i in 0..residues {
                    let row = &weights[i * residues..(i + 1) * residues];
                    cache.push(row.iter().zip(vector).map(|(w, v)| w * v).sum());
                }
            }
            cache
        } else {
            Vec::new()
        };

        let kernel: Kernel = match function {
            ProfileScoreFunction::InnerProduct => inner_product,
            ProfileScoreFunction::InnerProductFast => inner_product_fast,
            ProfileScoreFunction::WeightedInnerProduct | ProfileScoreFunction::WeightedInnerProductShifted => {
                weighted_inner_product
            }
            ProfileScoreFunction::WeightedInnerProductCached => weighted_inner_product_cached,
            ProfileScoreFunction::WeightedInnerProductFast | ProfileScoreFunction::WeightedInnerProductShiftedFast => {
                weighted_inner_product_fast
            }
            ProfileScoreFunction::WeightedEuclideanDistance => weighted_euclidean,
            ProfileScoreFunction::WeightedEuclideanDistanceFast => weighted_euclidean_fast,
            ProfileScoreFunction::PearsonCorrelation => pearson_kernel,
            ProfileScoreFunction::LogExponentialInnerProduct | ProfileScoreFunction::LogExponentialInnerProductShifted => {
                log_exponential
            }
            ProfileScoreFunction::LogExponentialInnerProductFast
            | ProfileScoreFunction::LogExponentialInnerProductShiftedFast => log_exponential_fast,
            ProfileScoreFunction::SymmetrizedEntropy => symmetrized_entropy_kernel,
            ProfileScoreFunction::JensenShannonDivergence => jensen_shannon_kernel,
        };

        Ok(Self {
            function,
            matrix,
            a,
            b,
            residues,
            kernel,
            weights,
            cached_b,
            order_a,
            order_b,
        })
    }

    pub fn function(&self) -> ProfileScoreFunction {
        self.function
    }

    /// Score of column `i` of profile A against column `j` of profile B
    #[inline]
    pub fn score(&self, i: usize, j: usize) -> f32 {
        (self.kernel)(self, i, j)
    }

    #[inline]
    fn scale(&self, i: usize, j: usize) -> f32 {
        (1.0 - self.a.gap_fraction(i)) * (1.0 - self.b.gap_fraction(j))
    }

    #[inline]
    fn weight(&self, x: usize, y: usize) -> f32 {
        self.weights[x * self.residues + y]
    }
}

fn substitution_weights(matrix: &SimilarityMatrix, transform: impl Fn(f32) -> f32) -> Vec<f32> {
    let n = matrix.size();
    (0..n * n).map(|k| transform(matrix.get(k / n, k % n))).collect()
}

fn inner_product(s: &ProfileScorer<'_>, i: usize, j: usize) -> f32 {
    let (a, b) = (s.a.column(i), s.b.column(j));
    let mut sum = 0.0f32;
    for x in 0..s.residues {
        sum += a[x] * b[x] * s.matrix.get(x, x);
    }
    sum * s.scale(i, j)
}

fn inner_product_fast(s: &ProfileScorer<'_>, i: usize, j: usize) -> f32 {
    let (a, b) = (s.a.column(i), s.b.column(j));
    let mut sum = 0.0f32;
    for &x in s.order_a.column(i) {
        let x = x as usize;
        sum += a[x] * b[x] * s.matrix.get(x, x);
    }
    sum * s.scale(i, j)
}

fn weighted_inner_product(s: &ProfileScorer<'_>, i: usize, j: usize) -> f32 {
    let (a, b) = (s.a.column(i), s.b.column(j));
    let mut sum = 0.0f32;
    for x in 0..s.residues {
        for y in 0..s.residues {
            sum += s.weight(x, y) * a[x] * b[y];
        }
    }
    sum * s.scale(i, j)
}

fn weighted_inner_product_cached(s: &ProfileScorer<'_>, i: usize, j: usize) -> f32 {
    let a = s.a.column(i);
    let cached = &s.cached_b[j * s.residues..(j + 1) * s.residues];
    let sum: f32 = a[..s.residues].iter().zip(cached).map(|(x, c)| x * c).sum();
    sum * s.scale(i, j)
}

/// Zero entries contribute nothing, so only the non-zero prefix of each
/// sorted column is visited.
fn weighted_inner_product_fast(s: &ProfileScorer<'_>, i: usize, j: usize) -> f32 {
    let (a, b) = (s.a.column(i), s.b.column(j));
    let mut sum = 0.0f32;
    for &x in s.order_a.column(i) {
        let x = x as usize;
        for &y in s.order_b.column(j) {
            let y = y as usize;
            sum += s.weight(x, y) * a[x] * b[y];
        }
    }
    sum * s.scale(i, j)
}

fn weighted_euclidean(s: &ProfileScorer<'_>, i: usize, j: usize) -> f32 {
    let (a, b) = (s.a.column(i), s.b.column(j));
    let mut sum = 0.0f32;
    for x in 0..s.residues {
        for y in 0..s.residues {
            let d = a[x] - b[y];
            sum += d * d * s.weight(x, y);
        }
    }
    -sum
}

/// Pairs where both entries are zero contribute nothing: every non-zero slot of
/// A meets every slot of B, and the zero slots of A only meet non-zero slots of B.
fn weighted_euclidean_fast(s: &ProfileScorer<'_>, i: usize, j: usize) -> f32 {
    let (a, b) = (s.a.column(i), s.b.column(j));
    let mut sum = 0.0f32;
    for x in 0..s.residues {
        if a[x] != 0.0 {
            for y in 0..s.residues {
                let d = a[x] - b[y];
                sum += d * d * s.weight(x, y);
            }
        } else {
            for &y in s.order_b.column(j) {
                let y = y as usize;
                sum += b[y] * b[y] * s.weight(x, y);
            }
        }
    }
    -sum
}

fn pearson_kernel(s: &ProfileScorer<'_>, i: usize, j: usize) -> f32 {
    pearson(s.a.column(i), s.b.column(j))
}

fn log_exponential(s: &ProfileScorer<'_>, i: usize, j: usize) -> f32 {
    log_floor(weighted_inner_product(s, i, j))
}

fn log_exponential_fast(s: &ProfileScorer<'_>, i: usize, j: usize) -> f32 {
    log_floor(weighted_inner_product_fast(s, i, j))
}

fn symmetrized_entropy_kernel(s: &ProfileScorer<'_>, i: usize, j: usize) -> f32 {
    let (a, b) = (s.a.column(i), s.b.column(j));
    -(kullback_leibler(a, b) + kullback_leibler(b, a)) / 2.0
}

fn jensen_shannon_kernel(s: &ProfileScorer<'_>, i: usize, j: usize) -> f32 {
    1.0 - jensen_shannon(s.a.column(i), s.b.column(j))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;

    fn profiles() -> (Profile, Profile) {
        let a = Profile::from_rows(
            &[b"ACGTNA-", b"AC-TRAC", b"GCGTAAA"],
            &[1.0, 0.5, 2.0],
            Alphabet::Dna,
        )
        .unwrap();
        let b = Profile::from_rows(&[b"AGT-C", b"CGTAC"], &[1.0, 1.0], Alphabet::Dna).unwrap();
        (a, b)
    }

    #[test]
    fn test_kernels_match_reference_evaluation() {
        let matrix = SimilarityMatrix::diagonal(Alphabet::Dna, 2.0, -1.0);
        let (a, b) = profiles();
        for function in ProfileScoreFunction::ALL {
            let scorer = ProfileScorer::new(function, &matrix, &a, &b).unwrap();
            for i in 0..a.len() {
                for j in 0..b.len() {
                    let expected = function.evaluate(&matrix, a.column(i), b.column(j));
                    let got = scorer.score(i, j);
                    assert!(
                        (expected - got).abs() <= 1e-4 * expected.abs().max(1.0),
                        "{function} at ({i}, {j}): {got} vs {expected}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_fast_variants_equal_plain_forms() {
        let matrix = SimilarityMatrix::blosum62();
        let a = Profile::from_rows(&[b"ARNDX", b"ARQ-B"], &[1.0, 1.0], Alphabet::Protein).unwrap();
        let b = Profile::from_rows(&[b"AKNZW", b"-RNDW"], &[1.0, 1.0], Alphabet::Protein).unwrap();
        let pairs = [
            (ProfileScoreFunction::InnerProduct, ProfileScoreFunction::InnerProductFast),
            (ProfileScoreFunction::WeightedInnerProduct, ProfileScoreFunction::WeightedInnerProductFast),
            (ProfileScoreFunction::WeightedInnerProduct, ProfileScoreFunction::WeightedInnerProductCached),
            (
                ProfileScoreFunction::WeightedInnerProductShifted,
                ProfileScoreFunction::WeightedInnerProductShiftedFast,
            ),
            (
                ProfileScoreFunction::WeightedEuclideanDistance,
                ProfileScoreFunction::WeightedEuclideanDistanceFast,
            ),
            (
                ProfileScoreFunction::LogExponentialInnerProduct,
                ProfileScoreFunction::LogExponentialInnerProductFast,
            ),
        ];
        for (plain, fast) in pairs {
            let p = ProfileScorer::new(plain, &matrix, &a, &b).unwrap();
            let f = ProfileScorer::new(fast, &matrix, &a, &b).unwrap();
            for i in 0..a.len() {
                for j in 0..b.len() {
                    let (x, y) = (p.score(i, j), f.score(i, j));
                    assert!((x - y).abs() <= 1e-4 * x.abs().max(1.0), "{plain} vs {fast}: {x} {y}");
                }
            }
        }
    }

    #[test]
    fn test_weighted_inner_product_of_identical_residues() {
        let matrix = SimilarityMatrix::diagonal(Alphabet::Dna, 2.0, -2.0);
        let a = Profile::from_sequence(b"A", Alphabet::Dna, 1.0).unwrap();
        let b = Profile::from_sequence(b"AC", Alphabet::Dna, 1.0).unwrap();
        let scorer = ProfileScorer::new(ProfileScoreFunction::WeightedInnerProduct, &matrix, &a, &b).unwrap();
        assert_eq!(scorer.score(0, 0), 2.0);
        assert_eq!(scorer.score(0, 1), -2.0);
    }

    #[test]
    fn test_orientation() {
        let matrix = SimilarityMatrix::diagonal(Alphabet::Dna, 1.0, 0.0);
        let same = [1.0, 0.0, 0.0, 0.0, 0.0];
        let other = [0.0, 1.0, 0.0, 0.0, 0.0];
        for function in [
            ProfileScoreFunction::WeightedEuclideanDistance,
            ProfileScoreFunction::SymmetrizedEntropy,
            ProfileScoreFunction::JensenShannonDivergence,
            ProfileScoreFunction::PearsonCorrelation,
        ] {
            assert!(
                function.evaluate(&matrix, &same, &same) > function.evaluate(&matrix, &same, &other),
                "{function}"
            );
        }
        assert_eq!(ProfileScoreFunction::JensenShannonDivergence.evaluate(&matrix, &same, &same), 1.0);
    }

    #[test]
    fn test_log_exponential_floor() {
        let matrix = SimilarityMatrix::diagonal(Alphabet::Dna, 1.0, 0.0);
        let gap = [0.0, 0.0, 0.0, 0.0, 1.0];
        let value = ProfileScoreFunction::LogExponentialInnerProduct.evaluate(&matrix, &gap, &gap);
        assert!(value.is_finite());
        assert_eq!(value, f32::MIN_POSITIVE.log2());
    }

    #[test]
    fn test_pearson_constant_vector() {
        assert_eq!(pearson(&[0.2, 0.2, 0.2], &[0.1, 0.5, 0.0]), 0.0);
    }

    #[test]
    fn test_width_mismatch() {
        let matrix = SimilarityMatrix::default_for(Alphabet::Dna);
        let a = Profile::from_sequence(b"A", Alphabet::Dna, 1.0).unwrap();
        let b = Profile::from_sequence(b"A", Alphabet::Protein, 1.0).unwrap();
        assert!(matches!(
            ProfileScorer::new(ProfileScoreFunction::InnerProduct, &matrix, &a, &b),
            Err(MsaError::DimensionMismatch { .. })
        ));
        let protein = SimilarityMatrix::blosum62();
        assert!(ProfileScorer::new(ProfileScoreFunction::InnerProduct, &protein, &a, &a).is_err());
    }

    #[test]
    fn test_names_round_trip() {
        for function in ProfileScoreFunction::ALL {
            assert_eq!(function.to_string().parse::<ProfileScoreFunction>().unwrap(), function);
        }
    }
}
