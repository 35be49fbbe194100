//! Alphabets and profile item sets
//!
//! Each alphabet has a fixed order of basic symbols. A profile column vector
//! holds one slot per basic symbol followed by one slot for the gap fraction.
//! Ambiguity codes spread their weight evenly over the basic symbols they
//! stand for.

use crate::error::{MsaError, MsaResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Gap symbol written into aligned sequences
pub const GAP: u8 = b'-';

/// True for the gap symbols accepted on input (`-` and `.`)
#[inline]
pub fn is_gap(symbol: u8) -> bool {
    symbol == b'-' || symbol == b'.'
}

const DNA_BASIC: &[u8] = b"ATGC";
const RNA_BASIC: &[u8] = b"AUGC";
const PROTEIN_BASIC: &[u8] = b"ARNDCQEGHILKMFPSTWYV";

const IDENTITY: [usize; 20] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alphabet {
    Dna,
    Rna,
    Protein,
}

impl Alphabet {
    pub fn name(&self) -> &'static str {
        match self {
            Alphabet::Dna => "dna",
            Alphabet::Rna => "rna",
            Alphabet::Protein => "protein",
        }
    }

    /// Basic (unambiguous) symbols in profile slot order
    pub fn basic_symbols(&self) -> &'static [u8] {
        match self {
            Alphabet::Dna => DNA_BASIC,
            Alphabet::Rna => RNA_BASIC,
            Alphabet::Protein => PROTEIN_BASIC,
        }
    }

    pub fn basic_count(&self) -> usize {
        self.basic_symbols().len()
    }

    /// Width of a profile column vector: basic symbols plus the gap slot
    pub fn profile_width(&self) -> usize {
        self.basic_count() + 1
    }

    /// Index of the gap-fraction slot in a profile column vector
    pub fn gap_slot(&self) -> usize {
        self.basic_count()
    }

    /// Basic-symbol slots a symbol contributes to.
    ///
    /// Returns `None` for symbols outside the alphabet and an empty slice for
    /// symbols that carry no residue information (protein `*`). Gaps are not
    /// residues and also return `None`.
    pub fn residue_indices(&self, symbol: u8) -> Option<&'static [usize]> {
        let symbol = symbol.to_ascii_uppercase();
        match self {
            Alphabet::Dna | Alphabet::Rna => {
                let thymine = if *self == Alphabet::Dna { b'T' } else { b'U' };
                let indices: &'static [usize] = match symbol {
                    b'A' => &[0],
                    s if s == thymine => &[1],
                    b'G' => &[2],
                    b'C' => &[3],
                    b'M' => &[0, 3],
                    b'S' => &[2, 3],
                    b'W' => &[0, 1],
                    b'R' => &[0, 2],
                    b'Y' => &[1, 3],
                    b'K' => &[1, 2],
                    b'B' => &[1, 2, 3],
                    b'V' => &[0, 2, 3],
                    b'H' => &[0, 1, 3],
                    b'D' => &[0, 1, 2],
                    b'N' => &IDENTITY[..4],
                    _ => return None,
                };
                Some(indices)
            }
            Alphabet::Protein => match symbol {
                b'B' => Some(&[2, 3]),
                b'J' => Some(&[9, 10]),
                b'Z' => Some(&[5, 6]),
                b'X' => Some(&IDENTITY[..]),
                b'*' => Some(&[]),
                _ => PROTEIN_BASIC
                    .iter()
                    .position(|&s| s == symbol)
                    .map(|i| &IDENTITY[i..=i]),
            },
        }
    }

    /// Slot of an unambiguous symbol, if it is one
    pub fn basic_index(&self, symbol: u8) -> Option<usize> {
        let symbol = symbol.to_ascii_uppercase();
        self.basic_symbols().iter().position(|&s| s == symbol)
    }

    /// True for residues, ambiguity codes and gaps of this alphabet
    pub fn contains(&self, symbol: u8) -> bool {
        is_gap(symbol) || self.residue_indices(symbol).is_some()
    }

    /// Check that every symbol of `data` belongs to the alphabet.
    pub fn validate(&self, data: &[u8]) -> MsaResult<()> {
        match data.iter().find(|&&s| !self.contains(s)) {
            Some(&symbol) => Err(MsaError::UnknownSymbol {
                symbol: symbol as char,
                alphabet: self.name().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Most specific alphabet that accepts every given sequence.
    ///
    /// DNA is preferred over RNA, and RNA over protein.
    pub fn detect<'a, I>(sequences: I) -> MsaResult<Alphabet>
    where
        I: IntoIterator<Item = &'a [u8]> + Clone,
    {
        for candidate in [Alphabet::Dna, Alphabet::Rna, Alphabet::Protein] {
            if sequences
                .clone()
                .into_iter()
                .all(|data| data.iter().all(|&s| candidate.contains(s)))
            {
                return Ok(candidate);
            }
        }
        Err(MsaError::InconsistentAlphabet(
            "no single DNA, RNA or protein alphabet covers all input sequences".to_string(),
        ))
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Alphabet {
    type Err = MsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dna" => Ok(Alphabet::Dna),
            "rna" => Ok(Alphabet::Rna),
            "protein" | "aa" => Ok(Alphabet::Protein),
            other => Err(MsaError::InvalidConfig(format!("unknown alphabet '{other}'"))),
        }
    }
}
