//! Column profiles of aligned sequence blocks
//!
//! A profile stores one frequency vector per alignment column, column-major in
//! a flat buffer. The first `width - 1` slots of a vector are residue
//! frequencies normalised among themselves; the last slot is the weighted
//! fraction of member sequences with a gap in that column.

use crate::alphabet::{is_gap, Alphabet};
use crate::error::{MsaError, MsaResult};
use crate::types::Sequence;

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    width: usize,
    values: Vec<f32>,
    /// Summed weight of the member sequences
    weight: f32,
    sequences: usize,
}

impl Profile {
    /// Profile of one (possibly gapped) sequence.
    pub fn from_sequence(data: &[u8], alphabet: Alphabet, weight: f32) -> MsaResult<Self> {
        Self::from_rows(&[data], &[weight], alphabet)
    }

    /// Profile of a block of aligned rows with per-row weights.
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R], weights: &[f32], alphabet: Alphabet) -> MsaResult<Self> {
        if rows.is_empty() {
            return Err(MsaError::EmptyInput("profile needs at least one row".to_string()));
        }
        if weights.len() != rows.len() {
            return Err(MsaError::DimensionMismatch {
                expected: rows.len(),
                found: weights.len(),
            });
        }
        let length = rows[0].as_ref().len();
        if let Some(other) = rows.iter().map(|r| r.as_ref().len()).find(|&l| l != length) {
            return Err(MsaError::NotAligned(format!(
                "profile rows have lengths {} and {}",
                length, other
            )));
        }

        let width = alphabet.profile_width();
        let gap_slot = alphabet.gap_slot();
        let total_weight: f32 = weights.iter().sum();
        let mut values = vec![0.0f32; length * width];

        for column in 0..length {
            let vector = &mut values[column * width..(column + 1) * width];
            let mut gap_weight = 0.0f32;
            for (row, &weight) in rows.iter().zip(weights) {
                let symbol = row.as_ref()[column];
                if is_gap(symbol) {
                    gap_weight += weight;
                    continue;
                }
                let indices = alphabet.residue_indices(symbol).ok_or(MsaError::UnknownSymbol {
                    symbol: symbol as char,
                    alphabet: alphabet.name().to_string(),
                })?;
                let share = weight / indices.len().max(1) as f32;
                for &i in indices {
                    vector[i] += share;
                }
            }
            normalize_residues(&mut vector[..gap_slot]);
            vector[gap_slot] = if total_weight > 0.0 { gap_weight / total_weight } else { 0.0 };
        }

        Ok(Self {
            width,
            values,
            weight: total_weight,
            sequences: rows.len(),
        })
    }

    /// Combine two profiles along an alignment path.
    ///
    /// `aligned_a` and `aligned_b` hold, per output column, the source column of
    /// each profile or `-1` for a gap. Residue mass of a side is its frequency
    /// times its weight times its non-gap fraction; a side aligned to a gap adds
    /// its whole weight to the gap fraction.
    pub fn merge(a: &Profile, b: &Profile, aligned_a: &[isize], aligned_b: &[isize]) -> MsaResult<Self> {
        if a.width != b.width {
            return Err(MsaError::DimensionMismatch {
                expected: a.width,
                found: b.width,
            });
        }
        if aligned_a.len() != aligned_b.len() {
            return Err(MsaError::NotAligned(format!(
                "alignment paths have lengths {} and {}",
                aligned_a.len(),
                aligned_b.len()
            )));
        }

        let width = a.width;
        let gap_slot = width - 1;
        let total = a.weight + b.weight;
        let mut values = vec![0.0f32; aligned_a.len() * width];

        for (column, (&ia, &ib)) in aligned_a.iter().zip(aligned_b).enumerate() {
            let vector = &mut values[column * width..(column + 1) * width];
            let mut gap = 0.0f32;
            for (profile, index) in [(a, ia), (b, ib)] {
                if index < 0 {
                    gap += profile.weight;
                    continue;
                }
                let source = profile.column(index as usize);
                let residue_mass = profile.weight * (1.0 - source[gap_slot]);
                for slot in 0..gap_slot {
                    vector[slot] += source[slot] * residue_mass;
                }
                gap += profile.weight * source[gap_slot];
            }
            normalize_residues(&mut vector[..gap_slot]);
            vector[gap_slot] = if total > 0.0 { gap / total } else { 0.0 };
        }

        Ok(Self {
            width,
            values,
            weight: total,
            sequences: a.sequences + b.sequences,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.values.len() / self.width
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn number_of_sequences(&self) -> usize {
        self.sequences
    }

    #[inline]
    pub fn column(&self, index: usize) -> &[f32] {
        &self.values[index * self.width..(index + 1) * self.width]
    }

    #[inline]
    pub fn gap_fraction(&self, index: usize) -> f32 {
        self.values[(index + 1) * self.width - 1]
    }

    /// Profile holding columns `start..end`
    pub fn slice(&self, start: usize, end: usize) -> Profile {
        Profile {
            width: self.width,
            values: self.values[start * self.width..end * self.width].to_vec(),
            weight: self.weight,
            sequences: self.sequences,
        }
    }
}

fn normalize_residues(slots: &mut [f32]) {
    let sum: f32 = slots.iter().sum();
    if sum > 0.0 {
        for value in slots.iter_mut() {
            *value /= sum;
        }
    }
}

/// Columns in which at least one of `rows` has a residue
pub fn non_gap_columns<R: AsRef<[u8]>>(rows: &[R]) -> Vec<usize> {
    let length = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
    (0..length)
        .filter(|&column| rows.iter().any(|row| !is_gap(row.as_ref()[column])))
        .collect()
}

/// A subset of an alignment with its all-gap columns removed
#[derive(Debug, Clone)]
pub struct SubAlignment {
    /// Indices of the member sequences in the full alignment
    pub members: Vec<usize>,
    /// Member rows restricted to `columns`
    pub rows: Vec<Vec<u8>>,
    /// Retained columns of the full alignment
    pub columns: Vec<usize>,
    pub profile: Profile,
}

impl SubAlignment {
    /// Extract `members` from `aligned`, dropping columns that are all gaps
    /// within the subset.
    pub fn extract(aligned: &[Sequence], members: &[usize], weights: &[f32], alphabet: Alphabet) -> MsaResult<Self> {
        if members.is_empty() {
            return Err(MsaError::EmptyInput("sub-alignment needs at least one member".to_string()));
        }
        if let Some(&bad) = members.iter().find(|&&m| m >= aligned.len()) {
            return Err(MsaError::IndexOutOfRange {
                row: bad,
                col: 0,
                dimension: aligned.len(),
            });
        }
        let full_rows: Vec<&[u8]> = members.iter().map(|&m| aligned[m].data.as_slice()).collect();
        let length = full_rows[0].len();
        if let Some(row) = full_rows.iter().find(|r| r.len() != length) {
            return Err(MsaError::NotAligned(format!(
                "aligned rows have lengths {} and {}",
                length,
                row.len()
            )));
        }

        let columns = non_gap_columns(&full_rows);
        let rows: Vec<Vec<u8>> = full_rows
            .iter()
            .map(|row| columns.iter().map(|&c| row[c]).collect())
            .collect();
        let member_weights: Vec<f32> = members.iter().map(|&m| weights.get(m).copied().unwrap_or(1.0)).collect();
        let profile = Profile::from_rows(&rows, &member_weights, alphabet)?;

        Ok(Self {
            members: members.to_vec(),
            rows,
            columns,
            profile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-6, "{a} != {b}");
    }

    #[test]
    fn test_single_sequence_profile() {
        let p = Profile::from_sequence(b"AC-N", Alphabet::Dna, 1.0).unwrap();
        assert_eq!(p.len(), 4);
        assert_eq!(p.width(), 5);
        assert_eq!(p.column(0), &[1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(p.column(1), &[0.0, 0.0, 0.0, 1.0, 0.0]);
        assert_eq!(p.column(2), &[0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(p.column(3), &[0.25, 0.25, 0.25, 0.25, 0.0]);
    }

    #[test]
    fn test_rows_profile_normalisation() {
        let p = Profile::from_rows(&[b"A", b"C", b"-", b"A"], &[1.0; 4], Alphabet::Dna).unwrap();
        let column = p.column(0);
        assert_close(column[0], 2.0 / 3.0);
        assert_close(column[3], 1.0 / 3.0);
        assert_close(column[4], 0.25);
        assert_close(p.weight(), 4.0);
        assert_eq!(p.number_of_sequences(), 4);
    }

    #[test]
    fn test_merge_matches_direct_construction() {
        let a = Profile::from_rows(&[b"AC", b"A-"], &[1.0, 1.0], Alphabet::Dna).unwrap();
        let b = Profile::from_sequence(b"G", Alphabet::Dna, 1.0).unwrap();
        // A C / A - / - G  aligned as columns (0,-1), (1,0)
        let merged = Profile::merge(&a, &b, &[0, 1], &[-1, 0]).unwrap();
        let direct = Profile::from_rows(&[b"AC", b"A-", b"-G"], &[1.0; 3], Alphabet::Dna).unwrap();
        for column in 0..2 {
            for slot in 0..5 {
                assert_close(merged.column(column)[slot], direct.column(column)[slot]);
            }
        }
        assert_close(merged.weight(), 3.0);
    }

    #[test]
    fn test_merge_rejects_width_mismatch() {
        let a = Profile::from_sequence(b"A", Alphabet::Dna, 1.0).unwrap();
        let b = Profile::from_sequence(b"A", Alphabet::Protein, 1.0).unwrap();
        assert!(matches!(
            Profile::merge(&a, &b, &[0], &[0]),
            Err(MsaError::DimensionMismatch { expected: 5, found: 21 })
        ));
    }

    #[test]
    fn test_unknown_symbol() {
        assert!(matches!(
            Profile::from_sequence(b"AJ", Alphabet::Dna, 1.0),
            Err(MsaError::UnknownSymbol { symbol: 'J', .. })
        ));
    }

    #[test]
    fn test_sub_alignment_drops_gap_columns() {
        let aligned = vec![
            Sequence::new("a".to_string(), b"A-C-".to_vec()),
            Sequence::new("b".to_string(), b"AGC-".to_vec()),
            Sequence::new("c".to_string(), b"A--T".to_vec()),
        ];
        let sub = SubAlignment::extract(&aligned, &[0, 2], &[], Alphabet::Dna).unwrap();
        assert_eq!(sub.columns, vec![0, 2, 3]);
        assert_eq!(sub.rows, vec![b"AC-".to_vec(), b"A-T".to_vec()]);
        assert_eq!(sub.profile.len(), 3);
        assert_close(sub.profile.gap_fraction(1), 0.5);
    }
}
