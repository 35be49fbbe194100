use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use promsa_core::io::{read_sequences, write_alignment, FastaError};
use promsa_core::{MsaConfig, MultipleSequenceAligner};
use tempfile::NamedTempFile;

fn write_fasta(records: &[(&str, &str)]) -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("create temp fasta");
    for (id, data) in records {
        writeln!(f, ">{}", id).unwrap();
        writeln!(f, "{}", data).unwrap();
    }
    f
}

#[test]
fn align_and_write_roundtrip() {
    let input = write_fasta(&[
        ("alpha first sequence", "ATGGCGTACGTTAGCATGCA"),
        ("beta", "ATGGCGTACGTAGCATGCA"),
        ("gamma", "ATGCGTACCTTAGCATG"),
    ]);
    let sequences = read_sequences(input.path()).expect("read fasta");
    assert_eq!(sequences.len(), 3);
    assert_eq!(sequences[0].id, "alpha");
    assert_eq!(sequences[0].description.as_deref(), Some("first sequence"));

    let alignment = MultipleSequenceAligner::new(MsaConfig::deterministic())
        .unwrap()
        .align(&sequences)
        .expect("align");

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("aligned.fa");
    write_alignment(&out, &alignment.sequences, 7).expect("write alignment");

    let back = read_sequences(&out).expect("read aligned fasta");
    assert_eq!(back, alignment.sequences);
    for (row, original) in back.iter().zip(&sequences) {
        assert_eq!(row.ungapped().data, original.data);
    }
}

#[test]
fn gzipped_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.fa.gz");
    let mut encoder = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
    encoder.write_all(b">x\nAC-GT\n>y\nACGGT\n").unwrap();
    encoder.finish().unwrap();

    let sequences = read_sequences(&path).expect("read gzipped fasta");
    assert_eq!(sequences.len(), 2);
    assert_eq!(sequences[0].data, b"AC-GT".to_vec());
}

#[test]
fn missing_and_empty_files() {
    assert!(read_sequences("/nonexistent/input.fa").is_err());

    let empty = NamedTempFile::new().unwrap();
    let err = read_sequences(empty.path()).unwrap_err();
    assert!(err.chain().any(|cause| matches!(cause.downcast_ref::<FastaError>(), Some(FastaError::EmptyFile))
        || cause.to_string().contains("Parse error")));
}
