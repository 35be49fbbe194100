//! Substitution (similarity) matrices
//!
//! Scores are stored over basic-symbol indices of an [`Alphabet`] so profile
//! score functions can index them directly. Symbol-level lookups resolve
//! ambiguity codes to the mean score over their expansions.

use crate::alphabet::{is_gap, Alphabet};
use crate::error::{MsaError, MsaResult};

/// BLOSUM62 in `A R N D C Q E G H I L K M F P S T W Y V` order
const BLOSUM62: [[i8; 20]; 20] = [
    [4, -1, -2, -2, 0, -1, -1, 0, -2, -1, -1, -1, -1, -2, -1, 1, 0, -3, -2, 0],
    [-1, 5, 0, -2, -3, 1, 0, -2, 0, -3, -2, 2, -1, -3, -2, -1, -1, -3, -2, -3],
    [-2, 0, 6, 1, -3, 0, 0, 0, 1, -3, -3, 0, -2, -3, -2, 1, 0, -4, -2, -3],
    [-2, -2, 1, 6, -3, 0, 2, -1, -1, -3, -4, -1, -3, -3, -1, 0, -1, -4, -3, -3],
    [0, -3, -3, -3, 9, -3, -4, -3, -3, -1, -1, -3, -1, -2, -3, -1, -1, -2, -2, -1],
    [-1, 1, 0, 0, -3, 5, 2, -2, 0, -3, -2, 1, 0, -3, -1, 0, -1, -2, -1, -2],
    [-1, 0, 0, 2, -4, 2, 5, -2, 0, -3, -3, 1, -2, -3, -1, 0, -1, -3, -2, -2],
    [0, -2, 0, -1, -3, -2, -2, 6, -2, -4, -4, -2, -3, -3, -2, 0, -2, -2, -3, -3],
    [-2, 0, 1, -1, -3, 0, 0, -2, 8, -3, -3, -1, -2, -1, -2, -1, -2, -2, 2, -3],
    [-1, -3, -3, -3, -1, -3, -3, -4, -3, 4, 2, -3, 1, 0, -3, -2, -1, -3, -1, 3],
    [-1, -2, -3, -4, -1, -2, -3, -4, -3, 2, 4, -2, 2, 0, -3, -2, -1, -2, -1, 1],
    [-1, 2, 0, -1, -3, 1, 1, -2, -1, -3, -2, 5, -1, -3, -1, 0, -1, -3, -2, -2],
    [-1, -1, -2, -3, -1, 0, -2, -3, -2, 1, 2, -1, 5, 0, -2, -1, -1, -1, -1, 1],
    [-2, -3, -3, -3, -2, -3, -3, -3, -1, 0, 0, -3, 0, 6, -4, -2, -2, 1, 3, -1],
    [-1, -2, -2, -1, -3, -1, -1, -2, -2, -3, -3, -1, -2, -4, 7, -1, -1, -4, -3, -2],
    [1, -1, 1, 0, -1, 0, 0, 0, -1, -2, -2, 0, -1, -2, -1, 4, 1, -3, -2, -2],
    [0, -1, 0, -1, -1, -1, -1, -2, -2, -1, -1, -1, -1, -2, -1, 1, 5, -2, -2, 0],
    [-3, -3, -4, -4, -2, -2, -3, -2, -2, -3, -2, -3, -1, 1, -4, -3, -2, 11, 2, -3],
    [-2, -2, -2, -3, -2, -1, -2, -3, 2, -1, -1, -2, -1, 3, -3, -2, -2, 2, 7, -1],
    [0, -3, -3, -3, -1, -2, -2, -3, -3, 3, 1, -2, 1, -1, -2, -2, 0, -3, -1, 4],
];

const NUCLEOTIDE_MATCH: f32 = 5.0;
const NUCLEOTIDE_MISMATCH: f32 = -4.0;

/// Number of ASCII symbols covered by the symbol-level table
const SYMBOLS: usize = 128;

#[derive(Debug, Clone)]
pub struct SimilarityMatrix {
    name: String,
    alphabet: Alphabet,
    size: usize,
    scores: Vec<f32>,
    symbol_scores: Vec<f32>,
    known: Vec<bool>,
}

impl SimilarityMatrix {
    /// Build from a row-major `size x size` table over basic-symbol indices.
    pub fn from_scores(name: impl Into<String>, alphabet: Alphabet, scores: Vec<f32>) -> MsaResult<Self> {
        let size = alphabet.basic_count();
        if scores.len() != size * size {
            return Err(MsaError::DimensionMismatch {
                expected: size * size,
                found: scores.len(),
            });
        }
        Ok(Self::build(name.into(), alphabet, scores))
    }

    fn build(name: String, alphabet: Alphabet, scores: Vec<f32>) -> Self {
        let size = alphabet.basic_count();
        let mut symbol_scores = vec![0.0f32; SYMBOLS * SYMBOLS];
        let mut known = vec![false; SYMBOLS];
        let expansions: Vec<Option<&'static [usize]>> =
            (0..SYMBOLS).map(|s| alphabet.residue_indices(s as u8)).collect();

        for a in 0..SYMBOLS {
            let Some(left) = expansions[a] else { continue };
            known[a] = true;
            for b in 0..SYMBOLS {
                let Some(right) = expansions[b] else { continue };
                if left.is_empty() || right.is_empty() {
                    continue;
                }
                let scores = &scores;
                let total: f32 = left
                    .iter()
                    .flat_map(|&i| right.iter().map(move |&j| scores[i * size + j]))
                    .sum();
                symbol_scores[a * SYMBOLS + b] = total / (left.len() * right.len()) as f32;
            }
        }

        Self {
            name,
            alphabet,
            size,
            scores,
            symbol_scores,
            known,
        }
    }

    /// Constant match score on the diagonal, constant mismatch elsewhere
    pub fn diagonal(alphabet: Alphabet, match_score: f32, mismatch_score: f32) -> Self {
        let size = alphabet.basic_count();
        let scores = (0..size * size)
            .map(|k| if k / size == k % size { match_score } else { mismatch_score })
            .collect();
        Self::build(format!("diagonal:{match_score}:{mismatch_score}"), alphabet, scores)
    }

    /// Nucleotide scoring (+5 match, -4 mismatch)
    pub fn nucleotide(alphabet: Alphabet) -> MsaResult<Self> {
        if alphabet == Alphabet::Protein {
            return Err(MsaError::UnsupportedSimilarityMatrix(
                "nucleotide matrix cannot score protein sequences".to_string(),
            ));
        }
        let mut matrix = Self::diagonal(alphabet, NUCLEOTIDE_MATCH, NUCLEOTIDE_MISMATCH);
        matrix.name = "nucleotide".to_string();
        Ok(matrix)
    }

    pub fn blosum62() -> Self {
        let scores = BLOSUM62.iter().flatten().map(|&s| s as f32).collect();
        Self::build("blosum62".to_string(), Alphabet::Protein, scores)
    }

    /// Default matrix for an alphabet
    pub fn default_for(alphabet: Alphabet) -> Self {
        match alphabet {
            Alphabet::Protein => Self::blosum62(),
            Alphabet::Dna | Alphabet::Rna => {
                Self::diagonal(alphabet, NUCLEOTIDE_MATCH, NUCLEOTIDE_MISMATCH).renamed("nucleotide")
            }
        }
    }

    /// Look up a built-in matrix by name.
    ///
    /// Accepts `blosum62`, `nucleotide` and `diagonal:<match>:<mismatch>`.
    pub fn by_name(name: &str, alphabet: Alphabet) -> MsaResult<Self> {
        let lowered = name.trim().to_ascii_lowercase();
        if let Some(rest) = lowered.strip_prefix("diagonal:") {
            let mut parts = rest.split(':');
            let parse = |part: Option<&str>| -> MsaResult<f32> {
                part.and_then(|p| p.trim().parse::<f32>().ok()).ok_or_else(|| {
                    MsaError::UnsupportedSimilarityMatrix(format!(
                        "'{name}' is not of the form diagonal:<match>:<mismatch>"
                    ))
                })
            };
            let match_score = parse(parts.next())?;
            let mismatch_score = parse(parts.next())?;
            if parts.next().is_some() {
                return Err(MsaError::UnsupportedSimilarityMatrix(format!(
                    "'{name}' is not of the form diagonal:<match>:<mismatch>"
                )));
            }
            return Ok(Self::diagonal(alphabet, match_score, mismatch_score));
        }

        match lowered.as_str() {
            "blosum62" if alphabet == Alphabet::Protein => Ok(Self::blosum62()),
            "blosum62" => Err(MsaError::UnsupportedSimilarityMatrix(format!(
                "blosum62 cannot score {alphabet} sequences"
            ))),
            "nucleotide" | "dna" | "rna" => Self::nucleotide(alphabet),
            other => Err(MsaError::UnsupportedSimilarityMatrix(format!(
                "unknown similarity matrix '{other}'"
            ))),
        }
    }

    fn renamed(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    /// Number of basic symbols
    pub fn size(&self) -> usize {
        self.size
    }

    /// Score between two basic-symbol indices
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.scores[i * self.size + j]
    }

    /// Scores of basic symbol `i` against every basic symbol
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.scores[i * self.size..(i + 1) * self.size]
    }

    /// Symbol-level score; ambiguity codes average over their expansions.
    pub fn score(&self, a: u8, b: u8) -> MsaResult<f32> {
        for symbol in [a, b] {
            if is_gap(symbol) || !self.is_known(symbol) {
                return Err(MsaError::UnknownSymbol {
                    symbol: symbol as char,
                    alphabet: self.alphabet.name().to_string(),
                });
            }
        }
        Ok(self.score_unchecked(a, b))
    }

    /// Symbol-level score for symbols already validated against the alphabet
    #[inline]
    pub fn score_unchecked(&self, a: u8, b: u8) -> f32 {
        let a = (a.to_ascii_uppercase() as usize) & (SYMBOLS - 1);
        let b = (b.to_ascii_uppercase() as usize) & (SYMBOLS - 1);
        self.symbol_scores[a * SYMBOLS + b]
    }

    fn is_known(&self, symbol: u8) -> bool {
        (symbol as usize) < SYMBOLS && self.known[symbol as usize]
    }

    pub fn max_score(&self) -> f32 {
        self.scores.iter().copied().fold(f32::MIN, f32::max)
    }

    pub fn min_score(&self) -> f32 {
        self.scores.iter().copied().fold(f32::MAX, f32::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blosum62_is_symmetric() {
        let m = SimilarityMatrix::blosum62();
        for i in 0..20 {
            for j in 0..20 {
                assert_eq!(m.get(i, j), m.get(j, i));
            }
        }
        assert_eq!(m.score(b'W', b'W').unwrap(), 11.0);
        assert_eq!(m.score(b'a', b'r').unwrap(), -1.0);
    }

    #[test]
    fn test_ambiguity_scores_are_means() {
        let m = SimilarityMatrix::default_for(Alphabet::Dna);
        assert_eq!(m.name(), "nucleotide");
        // R = A/G against A: (5 - 4) / 2
        assert!((m.score(b'R', b'A').unwrap() - 0.5).abs() < 1e-6);
        let p = SimilarityMatrix::blosum62();
        // Z = Q/E against E: (2 + 5) / 2
        assert!((p.score(b'Z', b'E').unwrap() - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_symbols_rejected() {
        let m = SimilarityMatrix::default_for(Alphabet::Dna);
        assert!(m.score(b'A', b'-').is_err());
        assert!(m.score(b'Q', b'A').is_err());
    }

    #[test]
    fn test_by_name() {
        let m = SimilarityMatrix::by_name("diagonal:2:-2", Alphabet::Dna).unwrap();
        assert_eq!(m.get(0, 0), 2.0);
        assert_eq!(m.get(0, 1), -2.0);
        assert_eq!(m.max_score(), 2.0);
        assert_eq!(m.min_score(), -2.0);

        assert!(SimilarityMatrix::by_name("blosum62", Alphabet::Protein).is_ok());
        assert!(matches!(
            SimilarityMatrix::by_name("blosum62", Alphabet::Dna),
            Err(MsaError::UnsupportedSimilarityMatrix(_))
        ));
        assert!(matches!(
            SimilarityMatrix::by_name("pam250", Alphabet::Protein),
            Err(MsaError::UnsupportedSimilarityMatrix(_))
        ));
        assert!(SimilarityMatrix::by_name("nucleotide", Alphabet::Protein).is_err());
        assert!(SimilarityMatrix::by_name("diagonal:2", Alphabet::Dna).is_err());
    }

    #[test]
    fn test_from_scores_checks_size() {
        assert!(matches!(
            SimilarityMatrix::from_scores("bad", Alphabet::Dna, vec![0.0; 3]),
            Err(MsaError::DimensionMismatch { expected: 16, found: 3 })
        ));
    }
}
