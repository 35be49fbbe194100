use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod deterministic;
mod error;

use config::Config;
use error::{format_error_with_suggestions, CliError};

#[derive(Parser)]
#[command(name = "promsa")]
#[command(about = "ProMSA - progressive multiple sequence alignment")]
#[command(version)]
#[command(long_about = "
ProMSA builds multiple sequence alignments of DNA, RNA or protein families.
A k-mer guide tree drives progressive profile alignment; optional stages
re-estimate the tree from the draft and refine it by re-aligning tree cuts.

Examples:
  promsa align -i family.fa -o family.aln.fa
  promsa align -i family.fa -o out.fa --stage-b --refinements 5 --report json
  promsa score -i family.aln.fa --reference reference.aln.fa
  promsa tree -i family.fa -o guide.nwk
  promsa config --output promsa.toml
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (defaults to ./promsa.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable deterministic mode for reproducible results
    #[arg(long, global = true)]
    pub deterministic: bool,

    /// Number of threads to use
    #[arg(short, long, global = true)]
    pub threads: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Align unaligned sequences from a FASTA/FASTQ file
    Align(commands::align::AlignArgs),

    /// Sum-of-pairs score of an alignment, with Q and TC against a reference
    Score(commands::score::ScoreArgs),

    /// Build the k-mer guide tree and print it in Newick format
    Tree(commands::tree::TreeArgs),

    /// Print or write the example configuration
    Config {
        /// Write the configuration here instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn setup_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    std::env::set_var("RUST_LOG", level);

    env_logger::Builder::from_default_env()
        .format_timestamp_secs()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(threads) = cli.threads {
        if threads == 0 {
            return Err(CliError::config("--threads must be positive").into());
        }
        config.general.threads = threads;
    }
    let deterministic = cli.deterministic || config.general.deterministic;
    if deterministic {
        deterministic::init_deterministic_mode();
    }

    // Global pool for the commands that score outside the aligner's own pool
    let global_threads = if deterministic { 1 } else { config.general.threads.max(1) };
    rayon::ThreadPoolBuilder::new()
        .num_threads(global_threads)
        .build_global()
        .context("Failed to set thread count")?;

    match cli.command {
        Commands::Align(args) => commands::align::execute(&config, deterministic, args),
        Commands::Score(args) => commands::score::execute(&config, args),
        Commands::Tree(args) => commands::tree::execute(&config, deterministic, args),
        Commands::Config { output } => commands::config::execute(&config, output),
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    if let Err(err) = run(cli) {
        let message = match err.downcast_ref::<CliError>() {
            Some(cli_error) => format_error_with_suggestions(cli_error),
            None => format!("{:#}", err),
        };
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}
