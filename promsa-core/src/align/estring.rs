//! Run-length alignment paths
//!
//! An [`EditScript`] records how a source row becomes an aligned row: a
//! positive run copies that many source symbols, a negative run inserts that
//! many gaps. Scripts compose, so a leaf can carry one script from its
//! unaligned sequence all the way to the root alignment.

use crate::alphabet::{is_gap, GAP};
use crate::error::{MsaError, MsaResult};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditScript {
    runs: Vec<isize>,
}

impl EditScript {
    /// Script copying `length` symbols unchanged
    pub fn identity(length: usize) -> Self {
        if length == 0 {
            return Self::default();
        }
        Self {
            runs: vec![length as isize],
        }
    }

    /// Encode an alignment path where non-negative entries are source
    /// positions and `-1` marks an inserted gap.
    pub fn from_aligned(aligned: &[isize]) -> Self {
        let mut runs: Vec<isize> = Vec::new();
        for &index in aligned {
            let step = if index < 0 { -1 } else { 1 };
            match runs.last_mut() {
                Some(last) if last.signum() == step => *last += step,
                _ => runs.push(step),
            }
        }
        Self { runs }
    }

    /// Script of an already gapped row: residues are copied, gaps inserted.
    pub fn from_gapped_row(row: &[u8]) -> Self {
        let path: Vec<isize> = row
            .iter()
            .map(|&symbol| if is_gap(symbol) { -1 } else { 0 })
            .collect();
        Self::from_aligned(&path)
    }

    pub fn runs(&self) -> &[isize] {
        &self.runs
    }

    /// Number of source symbols consumed
    pub fn source_len(&self) -> usize {
        self.runs.iter().filter(|&&r| r > 0).map(|&r| r as usize).sum()
    }

    /// Length of the aligned row produced
    pub fn output_len(&self) -> usize {
        self.runs.iter().map(|r| r.unsigned_abs()).sum()
    }

    /// Per output column, the source position it copies or `-1` for a gap
    pub fn positions(&self) -> Vec<isize> {
        let mut positions = Vec::with_capacity(self.output_len());
        let mut next = 0isize;
        for &run in &self.runs {
            if run > 0 {
                positions.extend(next..next + run);
                next += run;
            } else {
                positions.extend(std::iter::repeat(-1).take(run.unsigned_abs()));
            }
        }
        positions
    }

    /// Materialise the aligned row for `source`.
    pub fn apply(&self, source: &[u8]) -> MsaResult<Vec<u8>> {
        if source.len() != self.source_len() {
            return Err(MsaError::DimensionMismatch {
                expected: self.source_len(),
                found: source.len(),
            });
        }
        let mut output = Vec::with_capacity(self.output_len());
        let mut next = 0usize;
        for &run in &self.runs {
            if run > 0 {
                let end = next + run as usize;
                output.extend_from_slice(&source[next..end]);
                next = end;
            } else {
                output.extend(std::iter::repeat(GAP).take(run.unsigned_abs()));
            }
        }
        Ok(output)
    }

    /// Script equivalent to applying `self` and then `outer` to its output.
    pub fn then(&self, outer: &EditScript) -> MsaResult<EditScript> {
        if outer.source_len() != self.output_len() {
            return Err(MsaError::DimensionMismatch {
                expected: self.output_len(),
                found: outer.source_len(),
            });
        }
        let inner = self.positions();
        let mut composed = Vec::with_capacity(outer.output_len());
        let mut next = 0usize;
        for &run in &outer.runs {
            if run > 0 {
                let end = next + run as usize;
                composed.extend_from_slice(&inner[next..end]);
                next = end;
            } else {
                composed.extend(std::iter::repeat(-1).take(run.unsigned_abs()));
            }
        }
        Ok(Self::from_aligned(&composed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_aligned_runs() {
        let script = EditScript::from_aligned(&[0, 1, -1, -1, 2, -1]);
        assert_eq!(script.runs(), &[2, -2, 1, -1]);
        assert_eq!(script.source_len(), 3);
        assert_eq!(script.output_len(), 6);
        assert_eq!(script.apply(b"ACG").unwrap(), b"AC--G-".to_vec());
    }

    #[test]
    fn test_apply_rejects_wrong_source() {
        let script = EditScript::from_aligned(&[0, -1, 1]);
        assert!(matches!(
            script.apply(b"ACG"),
            Err(MsaError::DimensionMismatch { expected: 2, found: 3 })
        ));
    }

    #[test]
    fn test_composition() {
        let inner = EditScript::from_aligned(&[0, -1, 1]); // AC -> A-C
        let outer = EditScript::from_aligned(&[-1, 0, 1, -1, 2]); // xyz -> -xy-z
        let composed = inner.then(&outer).unwrap();
        let stepwise = outer.apply(&inner.apply(b"AC").unwrap()).unwrap();
        assert_eq!(composed.apply(b"AC").unwrap(), stepwise);
        assert_eq!(stepwise, b"-A--C".to_vec());
    }

    #[test]
    fn test_gapped_row_script() {
        let script = EditScript::from_gapped_row(b"-AC--G");
        assert_eq!(script.apply(b"ACG").unwrap(), b"-AC--G".to_vec());
        assert_eq!(EditScript::identity(3).apply(b"ACG").unwrap(), b"ACG".to_vec());
        assert_eq!(EditScript::identity(0).output_len(), 0);
    }

    #[test]
    fn test_positions() {
        let script = EditScript::from_aligned(&[-1, 0, 1, -1]);
        assert_eq!(script.positions(), vec![-1, 0, 1, -1]);
    }
}
