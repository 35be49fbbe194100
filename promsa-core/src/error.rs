//! Error taxonomy for the alignment engine
//!
//! Every failure belongs to one of three kinds: bad input or configuration,
//! exhausted resources (memory, threads), or a broken internal invariant.

use thiserror::Error;

/// Coarse classification of an [`MsaError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    ResourceExhaustion,
    StructuralInvariant,
}

/// Errors raised anywhere in the alignment pipeline
#[derive(Debug, Error)]
pub enum MsaError {
    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Inconsistent alphabet: {0}")]
    InconsistentAlphabet(String),

    #[error("Unknown symbol '{symbol}' for {alphabet} alphabet")]
    UnknownSymbol { symbol: char, alphabet: String },

    #[error("Unsupported similarity matrix: {0}")]
    UnsupportedSimilarityMatrix(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Index ({row}, {col}) out of range for dimension {dimension}")]
    IndexOutOfRange { row: usize, col: usize, dimension: usize },

    #[error("Invalid distance {value} at ({row}, {col}); distances must be non-negative")]
    InvalidDistance { row: usize, col: usize, value: f32 },

    #[error("Sequences are not aligned: {0}")]
    NotAligned(String),

    #[error(
        "Out of memory allocating a {rows} x {cols} table. Sequence lengths are {rows} and {cols}. \
         Dynamic programming is order NxM in memory use; this problem requires about \
         {estimated_bytes} bytes (approx {estimated_gib:.2} GiB) of free memory."
    )]
    OutOfMemory {
        rows: usize,
        cols: usize,
        affine: bool,
        estimated_bytes: u64,
        estimated_gib: f64,
    },

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("Incompatible trees: {0}")]
    IncompatibleTrees(String),

    #[error("Invalid edge {index}: {reason}")]
    InvalidEdge { index: usize, reason: String },

    #[error("Malformed tree: {0}")]
    MalformedTree(String),
}

pub type MsaResult<T> = Result<T, MsaError>;

impl MsaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MsaError::EmptyInput(_)
            | MsaError::InconsistentAlphabet(_)
            | MsaError::UnknownSymbol { .. }
            | MsaError::UnsupportedSimilarityMatrix(_)
            | MsaError::InvalidConfig(_)
            | MsaError::DimensionMismatch { .. }
            | MsaError::IndexOutOfRange { .. }
            | MsaError::InvalidDistance { .. }
            | MsaError::NotAligned(_) => ErrorKind::InvalidInput,
            MsaError::OutOfMemory { .. } | MsaError::ThreadPool(_) => ErrorKind::ResourceExhaustion,
            MsaError::IncompatibleTrees(_)
            | MsaError::InvalidEdge { .. }
            | MsaError::MalformedTree(_) => ErrorKind::StructuralInvariant,
        }
    }

    /// Build the sizing diagnostic for a failed DP allocation.
    ///
    /// Simple gap tables need about 5 bytes per cell (one score, one traceback byte),
    /// affine tables about 13 (three scores, one traceback byte).
    pub fn out_of_memory(rows: usize, cols: usize, affine: bool) -> Self {
        let factor: u64 = if affine { 13 } else { 5 };
        Self::out_of_memory_cells(rows, cols, factor, affine)
    }

    /// Sizing diagnostic for any `rows x cols` table of `bytes_per_cell`.
    pub fn out_of_memory_cells(rows: usize, cols: usize, bytes_per_cell: u64, affine: bool) -> Self {
        let estimated_bytes = (rows as u64).saturating_mul(cols as u64).saturating_mul(bytes_per_cell);
        MsaError::OutOfMemory {
            rows,
            cols,
            affine,
            estimated_bytes,
            estimated_gib: estimated_bytes as f64 / 1_073_741_824.0,
        }
    }
}

/// Allocate a filled buffer, reporting failure through `on_failure`.
pub(crate) fn try_alloc<T: Clone>(len: usize, fill: T, on_failure: impl FnOnce() -> MsaError) -> MsaResult<Vec<T>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).map_err(|_| on_failure())?;
    buffer.resize(len, fill);
    Ok(buffer)
}
