use serde::{Deserialize, Serialize};

use crate::alphabet::{is_gap, GAP};

/// A named biological sequence, gapped or ungapped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub id: String,
    pub description: Option<String>,
    pub data: Vec<u8>,
    pub length: usize,
}

impl Sequence {
    pub fn new(id: String, data: Vec<u8>) -> Self {
        let length = data.len();
        Self {
            id,
            description: None,
            data,
            length,
        }
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }

    /// Same identity, different symbols
    pub fn with_data(&self, data: Vec<u8>) -> Self {
        Self {
            id: self.id.clone(),
            description: self.description.clone(),
            length: data.len(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn is_gap(&self, index: usize) -> bool {
        is_gap(self.data[index])
    }

    pub fn residue_count(&self) -> usize {
        self.data.iter().filter(|&&s| !is_gap(s)).count()
    }

    pub fn has_gaps(&self) -> bool {
        self.data.iter().any(|&s| is_gap(s))
    }

    /// Copy of this sequence with every gap symbol removed
    pub fn ungapped(&self) -> Self {
        self.with_data(self.data.iter().copied().filter(|&s| !is_gap(s)).collect())
    }

    /// Copy restricted to the given column indices, in order
    pub fn select_columns(&self, columns: &[usize]) -> Self {
        self.with_data(columns.iter().map(|&c| self.data[c]).collect())
    }

    /// Symbols `[start, start + length)` as a new sequence
    pub fn subsequence(&self, start: usize, length: usize) -> Self {
        let end = (start + length).min(self.data.len());
        let start = start.min(end);
        self.with_data(self.data[start..end].to_vec())
    }

    /// Upper-cased data with `.` normalised to `-`
    pub fn normalized(&self) -> Self {
        self.with_data(
            self.data
                .iter()
                .map(|&s| if is_gap(s) { GAP } else { s.to_ascii_uppercase() })
                .collect(),
        )
    }
}
