//! Score command implementation - sum-of-pairs score and reference accuracy

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

use promsa_core::{
    alignment_score_q, alignment_score_tc, multiple_alignment_score, Alphabet, MsaConfig, Sequence, SimilarityMatrix,
};

use crate::config::Config;
use crate::error::{CliError, CliResult};

#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    /// Aligned sequences (FASTA)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Reference alignment of the same sequences
    #[arg(short, long)]
    pub reference: Option<PathBuf>,

    /// Similarity matrix (defaults to the configured or alphabet default)
    #[arg(long)]
    pub matrix: Option<String>,

    /// Gap open penalty
    #[arg(long, allow_hyphen_values = true)]
    pub gap_open: Option<f32>,

    /// Gap extend penalty
    #[arg(long, allow_hyphen_values = true)]
    pub gap_extend: Option<f32>,

    /// Print the scores as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Scores {
    pub alphabet: String,
    pub matrix: String,
    pub sequences: usize,
    pub columns: usize,
    pub sum_of_pairs: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tc: Option<f32>,
}

/// Reorder `reference` to follow the row order of `aligned`, matching by id
fn match_reference(aligned: &[Sequence], reference: Vec<Sequence>) -> CliResult<Vec<Sequence>> {
    if aligned.len() != reference.len() {
        return Err(CliError::invalid_input(format!(
            "alignment has {} sequences but the reference has {}",
            aligned.len(),
            reference.len()
        )));
    }
    let mut by_id: HashMap<String, Sequence> = reference.into_iter().map(|s| (s.id.clone(), s)).collect();
    aligned
        .iter()
        .map(|row| {
            by_id
                .remove(&row.id)
                .map(|s| s.normalized())
                .ok_or_else(|| CliError::invalid_input(format!("sequence '{}' is missing from the reference", row.id)))
        })
        .collect()
}

pub fn compute(config: &Config, args: &ScoreArgs, aligned: &[Sequence], reference: Option<Vec<Sequence>>) -> Result<Scores> {
    let aligned: Vec<Sequence> = aligned.iter().map(Sequence::normalized).collect();
    let alphabet = Alphabet::detect(aligned.iter().map(|s| s.data.as_slice())).map_err(CliError::from)?;
    let matrix = match args.matrix.as_ref().or(config.alignment.matrix.as_ref()) {
        Some(name) => SimilarityMatrix::by_name(name, alphabet).map_err(CliError::from)?,
        None => SimilarityMatrix::default_for(alphabet),
    };
    let (gap_open, gap_extend) = MsaConfig {
        gap_open: args.gap_open.unwrap_or(config.alignment.gap_open),
        gap_extend: args.gap_extend.unwrap_or(config.alignment.gap_extend),
        ..MsaConfig::default()
    }
    .gap_penalties();

    let sum_of_pairs = multiple_alignment_score(&aligned, &matrix, gap_open, gap_extend).map_err(CliError::from)?;
    let (q, tc) = match reference {
        Some(reference) => {
            let reference = match_reference(&aligned, reference)?;
            (
                Some(alignment_score_q(&aligned, &reference).map_err(CliError::from)?),
                Some(alignment_score_tc(&aligned, &reference).map_err(CliError::from)?),
            )
        }
        None => (None, None),
    };

    Ok(Scores {
        alphabet: alphabet.to_string(),
        matrix: matrix.name().to_string(),
        sequences: aligned.len(),
        columns: aligned.first().map_or(0, |s| s.len()),
        sum_of_pairs,
        q,
        tc,
    })
}

pub fn execute(config: &Config, args: ScoreArgs) -> Result<()> {
    let aligned = super::load_sequences(&args.input)?;
    let reference = match &args.reference {
        Some(path) => Some(super::load_sequences(path)?),
        None => None,
    };
    let scores = compute(config, &args, &aligned, reference)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&scores)?);
    } else {
        println!("sum-of-pairs: {:.6}", scores.sum_of_pairs);
        if let (Some(q), Some(tc)) = (scores.q, scores.tc) {
            println!("Q: {:.6}", q);
            println!("TC: {:.6}", tc);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(id: &str, data: &[u8]) -> Sequence {
        Sequence::new(id.to_string(), data.to_vec())
    }

    fn args() -> ScoreArgs {
        ScoreArgs {
            input: PathBuf::from("unused.fa"),
            reference: None,
            matrix: Some("diagonal:2:-1".to_string()),
            gap_open: Some(-4.0),
            gap_extend: Some(-1.0),
            json: false,
        }
    }

    #[test]
    fn test_sum_of_pairs_only() {
        let aligned = vec![seq("a", b"ACGT"), seq("b", b"acgt")];
        let scores = compute(&Config::default(), &args(), &aligned, None).unwrap();
        assert_eq!(scores.sum_of_pairs, 2.0);
        assert_eq!(scores.columns, 4);
        assert!(scores.q.is_none());
    }

    #[test]
    fn test_reference_matched_by_id() {
        let aligned = vec![seq("a", b"AC-GT"), seq("b", b"ACTGT")];
        let reference = vec![seq("b", b"ACTGT"), seq("a", b"AC-GT")];
        let scores = compute(&Config::default(), &args(), &aligned, Some(reference)).unwrap();
        assert_eq!(scores.q, Some(1.0));
        assert_eq!(scores.tc, Some(1.0));
    }

    #[test]
    fn test_reference_missing_sequence() {
        let aligned = vec![seq("a", b"ACGT"), seq("b", b"ACGT")];
        let reference = vec![seq("a", b"ACGT"), seq("c", b"ACGT")];
        let err = compute(&Config::default(), &args(), &aligned, Some(reference)).unwrap_err();
        assert!(err.to_string().contains("missing from the reference"));
    }
}
