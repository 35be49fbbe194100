//! Tree command implementation - k-mer guide tree in Newick format

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use promsa_core::{
    GuideTree, HierarchicalClusterer, KmerDistanceFunction, KmerDistanceMatrixGenerator, Sequence,
    UpdateDistanceMethod,
};

use crate::config::Config;
use crate::error::CliError;

#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    /// Input sequences (FASTA/FASTQ, optionally gzipped)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Newick output; stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// K-mer length
    #[arg(short, long)]
    pub kmer_length: Option<usize>,

    /// K-mer distance function
    #[arg(long)]
    pub kmer_distance: Option<KmerDistanceFunction>,

    /// Cluster distance update method
    #[arg(long)]
    pub update_method: Option<UpdateDistanceMethod>,
}

/// Newick guide tree of unaligned sequences
pub fn build_newick(config: &Config, args: &TreeArgs, sequences: &[Sequence]) -> Result<String> {
    let sequences: Vec<Sequence> = sequences.iter().map(|s| s.normalized().ungapped()).collect();
    let names: Vec<String> = sequences.iter().map(|s| s.id.clone()).collect();
    if sequences.len() == 1 {
        return Ok(format!("{};", names[0]));
    }

    let kmer_length = args.kmer_length.unwrap_or(config.alignment.kmer_length);
    let function = args.kmer_distance.unwrap_or(config.alignment.kmer_distance);
    let method = args.update_method.unwrap_or(config.alignment.update_method);
    log::info!("Building {}-mer guide tree ({}, {} linkage)", kmer_length, function, method);

    let mut distances = KmerDistanceMatrixGenerator::new(kmer_length, function)
        .and_then(|generator| generator.generate(&sequences))
        .map_err(CliError::from)?;
    let clustering = HierarchicalClusterer::new(method)
        .cluster(&mut distances)
        .map_err(CliError::from)?;
    let tree = GuideTree::from_clustering(&clustering).map_err(CliError::from)?;
    log::debug!("Guide tree height: {}", tree.height());
    Ok(tree.to_newick(&names))
}

pub fn execute(config: &Config, deterministic: bool, args: TreeArgs) -> Result<()> {
    if deterministic {
        log::debug!("Tree construction is single threaded in deterministic mode");
    }
    let sequences = super::load_sequences(&args.input)?;
    let newick = build_newick(config, &args, &sequences)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", newick))
                .with_context(|| format!("Failed to write tree to {}", path.display()))?;
            log::info!("Guide tree written to: {}", path.display());
        }
        None => println!("{}", newick),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> TreeArgs {
        TreeArgs {
            input: PathBuf::from("unused.fa"),
            output: None,
            kmer_length: Some(2),
            kmer_distance: None,
            update_method: None,
        }
    }

    #[test]
    fn test_newick_contains_every_name() {
        let sequences: Vec<Sequence> = [("x", "ACGTACGT"), ("y", "ACGTACGA"), ("z", "TTTTGGGG")]
            .iter()
            .map(|(id, data)| Sequence::new(id.to_string(), data.as_bytes().to_vec()))
            .collect();
        let newick = build_newick(&Config::default(), &args(), &sequences).unwrap();
        assert!(newick.starts_with('(') && newick.ends_with(';'));
        for name in ["x", "y", "z"] {
            assert!(newick.contains(name));
        }
    }

    #[test]
    fn test_single_sequence_tree() {
        let sequences = vec![Sequence::new("only".to_string(), b"ACGT".to_vec())];
        assert_eq!(build_newick(&Config::default(), &args(), &sequences).unwrap(), "only;");
    }
}
