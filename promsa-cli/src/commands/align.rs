//! Align command implementation - progressive MSA of a sequence file

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

use promsa_core::io::{write_alignment, write_sequences};
use promsa_core::{
    AlignerKind, GapModel, KmerDistanceFunction, MsaAlignment, MultipleSequenceAligner, ProfileScoreFunction,
    UpdateDistanceMethod,
};

use crate::config::Config;
use crate::deterministic::alignment_fingerprint;
use crate::error::CliError;

#[derive(Args, Debug, Clone)]
pub struct AlignArgs {
    /// Input sequences (FASTA/FASTQ, optionally gzipped)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output alignment (FASTA); stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Profile aligner
    #[arg(long)]
    pub aligner: Option<AlignerKind>,

    /// Gap model
    #[arg(long)]
    pub gap_model: Option<GapModel>,

    /// Profile column score function
    #[arg(long)]
    pub score_function: Option<ProfileScoreFunction>,

    /// Cluster distance update method
    #[arg(long)]
    pub update_method: Option<UpdateDistanceMethod>,

    /// K-mer distance function
    #[arg(long)]
    pub kmer_distance: Option<KmerDistanceFunction>,

    /// K-mer length for the draft distances
    #[arg(short, long)]
    pub kmer_length: Option<usize>,

    /// Gap open penalty (negative; 0 for the default)
    #[arg(long, allow_hyphen_values = true)]
    pub gap_open: Option<f32>,

    /// Gap extend penalty (negative; 0 for the default)
    #[arg(long, allow_hyphen_values = true)]
    pub gap_extend: Option<f32>,

    /// Similarity matrix (blosum62, nucleotide, diagonal:<match>:<mismatch>)
    #[arg(long)]
    pub matrix: Option<String>,

    /// DP wavefront partitions
    #[arg(long)]
    pub partitions: Option<usize>,

    /// Stop after the draft alignment
    #[arg(long)]
    pub faster: bool,

    /// Re-estimate the guide tree from the draft alignment
    #[arg(long)]
    pub stage_b: bool,

    /// Cap on tree refinement passes
    #[arg(long)]
    pub refinements: Option<usize>,

    /// Weight sequences by guide-tree branch lengths
    #[arg(long)]
    pub weights: bool,

    /// Residues per output line (0 for unwrapped)
    #[arg(long)]
    pub line_width: Option<usize>,

    /// Print a run report to stderr
    #[arg(long)]
    pub report: Option<ReportFormat>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

/// Summary of one run
#[derive(Debug, Serialize)]
pub struct AlignReport {
    pub alphabet: String,
    pub matrix: String,
    pub sequences: usize,
    pub columns: usize,
    pub score: f32,
    pub draft_score: f32,
    pub distance_refined_score: Option<f32>,
    pub tree_refined_score: Option<f32>,
    pub refinement_iterations: usize,
    pub guide_tree: Option<String>,
    pub fingerprint: String,
}

impl AlignReport {
    pub fn new(alignment: &MsaAlignment) -> Self {
        let names: Vec<String> = alignment.sequences.iter().map(|s| s.id.clone()).collect();
        Self {
            alphabet: alignment.alphabet.to_string(),
            matrix: alignment.matrix.clone(),
            sequences: alignment.sequences.len(),
            columns: alignment.sequences.first().map_or(0, |s| s.len()),
            score: alignment.score,
            draft_score: alignment.draft.score,
            distance_refined_score: alignment.distance_refined.as_ref().map(|s| s.score),
            tree_refined_score: alignment.tree_refined.as_ref().map(|s| s.score),
            refinement_iterations: alignment.refinement_iterations,
            guide_tree: alignment.guide_tree.as_ref().map(|t| t.to_newick(&names)),
            fingerprint: format!("{:016x}", alignment_fingerprint(&alignment.sequences)),
        }
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        Ok(match format {
            ReportFormat::Json => serde_json::to_string_pretty(self).context("Failed to serialize report")?,
            ReportFormat::Text => {
                let mut text = format!(
                    "alphabet: {}\nmatrix: {}\nsequences: {}\ncolumns: {}\nscore: {:.6}\ndraft score: {:.6}\n",
                    self.alphabet, self.matrix, self.sequences, self.columns, self.score, self.draft_score
                );
                if let Some(score) = self.distance_refined_score {
                    text.push_str(&format!("distance-refined score: {:.6}\n", score));
                }
                if let Some(score) = self.tree_refined_score {
                    text.push_str(&format!(
                        "tree-refined score: {:.6} ({} passes)\n",
                        score, self.refinement_iterations
                    ));
                }
                text.push_str(&format!("fingerprint: {}\n", self.fingerprint));
                text
            }
        })
    }
}

/// Fold command-line overrides into the file configuration
fn apply_overrides(config: &Config, args: &AlignArgs) -> Config {
    let mut config = config.clone();
    let alignment = &mut config.alignment;
    if let Some(aligner) = args.aligner {
        alignment.aligner = aligner;
    }
    if let Some(gap_model) = args.gap_model {
        alignment.gap_model = gap_model;
    }
    if let Some(score_function) = args.score_function {
        alignment.score_function = score_function;
    }
    if let Some(update_method) = args.update_method {
        alignment.update_method = update_method;
    }
    if let Some(kmer_distance) = args.kmer_distance {
        alignment.kmer_distance = kmer_distance;
    }
    if let Some(kmer_length) = args.kmer_length {
        alignment.kmer_length = kmer_length;
    }
    if let Some(gap_open) = args.gap_open {
        alignment.gap_open = gap_open;
    }
    if let Some(gap_extend) = args.gap_extend {
        alignment.gap_extend = gap_extend;
    }
    if args.matrix.is_some() {
        alignment.matrix = args.matrix.clone();
    }
    if args.partitions.is_some() {
        alignment.partitions = args.partitions;
    }
    alignment.use_weights |= args.weights;

    config.refinement.faster |= args.faster;
    config.refinement.use_stage_b |= args.stage_b;
    if let Some(refinements) = args.refinements {
        config.refinement.max_iterations = refinements;
    }
    if let Some(line_width) = args.line_width {
        config.output.line_width = line_width;
    }
    config
}

pub fn execute(config: &Config, deterministic: bool, args: AlignArgs) -> Result<()> {
    let config = apply_overrides(config, &args);
    let msa_config = config.to_msa_config(deterministic);
    log::debug!("Alignment settings: {:?}", msa_config);

    let sequences = super::load_sequences(&args.input)?;
    let aligner = MultipleSequenceAligner::new(msa_config).map_err(CliError::from)?;
    let alignment = aligner.align(&sequences).map_err(CliError::from)?;
    log::info!(
        "Aligned {} sequences into {} columns, score {:.6}",
        alignment.sequences.len(),
        alignment.sequences.first().map_or(0, |s| s.len()),
        alignment.score
    );

    match &args.output {
        Some(path) => {
            write_alignment(path, &alignment.sequences, config.output.line_width)?;
            log::info!("Alignment written to: {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            write_sequences(&mut handle, &alignment.sequences, config.output.line_width)?;
        }
    }

    if let Some(format) = args.report {
        let report = AlignReport::new(&alignment).render(format)?;
        let mut stderr = std::io::stderr();
        stderr.write_all(report.as_bytes())?;
        if format == ReportFormat::Json {
            writeln!(stderr)?;
        }
    }
    Ok(())
}
