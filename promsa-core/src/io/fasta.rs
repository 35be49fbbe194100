//! FASTA/FASTQ sequence input and aligned FASTA output
//!
//! Reading goes through needletail; gzipped files are decompressed with
//! flate2. Gap symbols in the input are kept, so aligned FASTA reads back
//! unchanged.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use needletail::{parse_fastx_file, parse_fastx_reader};
use thiserror::Error;

use crate::types::Sequence;

/// Residues per line when writing FASTA
pub const DEFAULT_LINE_WIDTH: usize = 60;

#[derive(Debug, Error)]
pub enum FastaError {
    #[error("Invalid sequence format: {0}")]
    InvalidFormat(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Empty file or no sequences found")]
    EmptyFile,
    #[error("Duplicate sequence id '{0}'")]
    DuplicateId(String),
}

/// FASTA/FASTQ parser for reading sequence data
pub struct FastaParser;

impl FastaParser {
    /// Parse a FASTA/FASTQ file, gzipped when the name ends in `.gz`
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<Sequence>> {
        let path_str = path.as_ref().to_string_lossy();

        let sequences = if path_str.ends_with(".gz") {
            Self::parse_gzipped_file(&path)
        } else {
            Self::parse_uncompressed_file(&path)
        };
        sequences.with_context(|| format!("Failed to read sequences from {}", path_str))
    }

    fn parse_uncompressed_file<P: AsRef<Path>>(path: P) -> Result<Vec<Sequence>> {
        let mut reader = parse_fastx_file(&path).map_err(|e| FastaError::Parse(e.to_string()))?;

        let mut sequences = Vec::new();
        while let Some(record) = reader.next() {
            let record = record.map_err(|e| FastaError::Parse(e.to_string()))?;
            sequences.push(Self::record_to_sequence(&record)?);
        }
        Self::finish(sequences)
    }

    fn parse_gzipped_file<P: AsRef<Path>>(path: P) -> Result<Vec<Sequence>> {
        let file = File::open(&path)?;
        Self::parse_reader(BufReader::new(GzDecoder::new(file)))
    }

    /// Parse FASTA/FASTQ data from any readable source
    pub fn parse_reader<R: std::io::Read + Send>(reader: R) -> Result<Vec<Sequence>> {
        let mut fastx_reader = parse_fastx_reader(reader).map_err(|e| FastaError::Parse(e.to_string()))?;

        let mut sequences = Vec::new();
        while let Some(record) = fastx_reader.next() {
            let record = record.map_err(|e| FastaError::Parse(e.to_string()))?;
            sequences.push(Self::record_to_sequence(&record)?);
        }
        Self::finish(sequences)
    }

    /// Split the header into id and description at the first whitespace
    fn record_to_sequence(record: &needletail::parser::SequenceRecord) -> Result<Sequence> {
        let header = String::from_utf8_lossy(record.id()).to_string();
        let (id, description) = match header.split_once(char::is_whitespace) {
            Some((id, rest)) => (id.to_string(), Some(rest.trim().to_string()).filter(|d| !d.is_empty())),
            None => (header.trim().to_string(), None),
        };
        if id.is_empty() {
            return Err(FastaError::InvalidFormat("record without an id".to_string()).into());
        }

        let sequence = Sequence::new(id, record.seq().to_vec());
        Ok(match description {
            Some(description) => sequence.with_description(description),
            None => sequence,
        })
    }

    fn finish(sequences: Vec<Sequence>) -> Result<Vec<Sequence>> {
        if sequences.is_empty() {
            return Err(FastaError::EmptyFile.into());
        }
        let mut seen = fnv::FnvHashSet::default();
        if let Some(duplicate) = sequences.iter().find(|s| !seen.insert(s.id.as_str())) {
            return Err(FastaError::DuplicateId(duplicate.id.clone()).into());
        }
        Ok(sequences)
    }
}

/// Write sequences as FASTA, wrapping the data at `line_width` symbols
/// (0 writes each sequence on one line).
pub fn write_sequences<W: Write>(writer: &mut W, sequences: &[Sequence], line_width: usize) -> Result<()> {
    for sequence in sequences {
        match &sequence.description {
            Some(description) => writeln!(writer, ">{} {}", sequence.id, description)?,
            None => writeln!(writer, ">{}", sequence.id)?,
        }
        if sequence.data.is_empty() {
            writeln!(writer)?;
            continue;
        }
        let width = if line_width == 0 { sequence.data.len() } else { line_width };
        for line in sequence.data.chunks(width) {
            writer.write_all(line)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Write aligned rows to a FASTA file. All rows must have the same length.
pub fn write_alignment<P: AsRef<Path>>(path: P, sequences: &[Sequence], line_width: usize) -> Result<()> {
    if let Some(first) = sequences.first() {
        if let Some(row) = sequences.iter().find(|s| s.len() != first.len()) {
            return Err(FastaError::InvalidFormat(format!(
                "row '{}' has length {} but '{}' has length {}",
                row.id,
                row.len(),
                first.id,
                first.len()
            ))
            .into());
        }
    }
    let file = File::create(&path)
        .with_context(|| format!("Failed to create {}", path.as_ref().display()))?;
    let mut writer = BufWriter::new(file);
    write_sequences(&mut writer, sequences, line_width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_fasta_reader() {
        let fasta_data = ">seq1 description of sequence 1\n\
                          ATCGATCGATCG\n\
                          >seq2\n\
                          GCTAGCTAGCTA\n";

        let sequences = FastaParser::parse_reader(Cursor::new(fasta_data)).unwrap();

        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].id, "seq1");
        assert_eq!(sequences[0].description, Some("description of sequence 1".to_string()));
        assert_eq!(sequences[0].data, b"ATCGATCGATCG");
        assert_eq!(sequences[0].length, 12);

        assert_eq!(sequences[1].id, "seq2");
        assert_eq!(sequences[1].description, None);
    }

    #[test]
    fn test_gapped_multiline_fasta() {
        let fasta_data = ">row1\n\
                          AC-GT\n\
                          A--T\n\
                          >row2\n\
                          ACTGTAC-T\n";

        let sequences = FastaParser::parse_reader(Cursor::new(fasta_data)).unwrap();
        assert_eq!(sequences[0].data, b"AC-GTA--T");
        assert_eq!(sequences[1].length, 9);
    }

    #[test]
    fn test_parse_fastq_reader() {
        let fastq_data = "@read1\n\
                          ACGT\n\
                          +\n\
                          IIII\n";
        let sequences = FastaParser::parse_reader(Cursor::new(fastq_data)).unwrap();
        assert_eq!(sequences[0].id, "read1");
        assert_eq!(sequences[0].data, b"ACGT");
    }

    #[test]
    fn test_empty_and_duplicate_input() {
        assert!(FastaParser::parse_reader(Cursor::new("")).is_err());

        let err = FastaParser::parse_reader(Cursor::new(">a\nAC\n>a\nGT\n")).unwrap_err();
        assert!(matches!(err.downcast_ref::<FastaError>(), Some(FastaError::DuplicateId(id)) if id == "a"));
    }

    #[test]
    fn test_write_wraps_lines() {
        let sequences = vec![
            Sequence::new("a".to_string(), b"ACGTACG".to_vec()).with_description("first".to_string()),
            Sequence::new("b".to_string(), b"AC-TAC-".to_vec()),
        ];
        let mut out = Vec::new();
        write_sequences(&mut out, &sequences, 3).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            ">a first\nACG\nTAC\nG\n>b\nAC-\nTAC\n-\n"
        );

        let mut single = Vec::new();
        write_sequences(&mut single, &sequences[1..], 0).unwrap();
        assert_eq!(String::from_utf8(single).unwrap(), ">b\nAC-TAC-\n");
    }

    #[test]
    fn test_write_alignment_rejects_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![
            Sequence::new("a".to_string(), b"AC-".to_vec()),
            Sequence::new("b".to_string(), b"ACGT".to_vec()),
        ];
        assert!(write_alignment(dir.path().join("out.fa"), &rows, 60).is_err());
    }
}
