//! Sequence file input and output

pub mod fasta;

pub use fasta::{write_alignment, write_sequences, FastaError, FastaParser, DEFAULT_LINE_WIDTH};

use anyhow::Result;
use std::path::Path;

use crate::types::Sequence;

/// Read sequences from a FASTA/FASTQ file (optionally gzipped)
pub fn read_sequences<P: AsRef<Path>>(path: P) -> Result<Vec<Sequence>> {
    FastaParser::parse_file(path)
}
