//! Configuration handling for the ProMSA CLI
//!
//! Supports loading configuration from promsa.toml files with CLI argument overrides.

use anyhow::{Context, Result};
use promsa_core::{
    AlignerKind, GapModel, KmerDistanceFunction, MsaConfig, ProfileScoreFunction, UpdateDistanceMethod,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no --config is given
pub const DEFAULT_CONFIG_FILE: &str = "promsa.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub alignment: AlignmentConfig,
    #[serde(default)]
    pub refinement: RefinementConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable deterministic mode for reproducible results
    #[serde(default)]
    pub deterministic: bool,

    /// Default number of threads to use
    #[serde(default = "default_threads")]
    pub threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentConfig {
    #[serde(default = "default_kmer_length")]
    pub kmer_length: usize,

    #[serde(default)]
    pub kmer_distance: KmerDistanceFunction,

    #[serde(default)]
    pub update_method: UpdateDistanceMethod,

    /// Profile aligner (needleman-wunsch or smith-waterman)
    #[serde(default)]
    pub aligner: AlignerKind,

    #[serde(default)]
    pub gap_model: GapModel,

    #[serde(default)]
    pub score_function: ProfileScoreFunction,

    /// 0 selects the built-in default
    #[serde(default = "default_gap_open")]
    pub gap_open: f32,

    /// 0 selects the built-in default
    #[serde(default = "default_gap_extend")]
    pub gap_extend: f32,

    /// Similarity matrix name; chosen from the alphabet when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<String>,

    /// DP wavefront partitions (defaults to the thread count)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partitions: Option<usize>,

    /// Weight sequences by guide-tree branch lengths
    #[serde(default)]
    pub use_weights: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementConfig {
    /// Stop after the draft alignment
    #[serde(default)]
    pub faster: bool,

    /// Re-estimate distances from the draft alignment
    #[serde(default)]
    pub use_stage_b: bool,

    /// Cap on tree refinement passes
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Residues per FASTA line (0 for unwrapped)
    #[serde(default = "default_line_width")]
    pub line_width: usize,
}

// Default value functions
fn default_threads() -> usize { num_cpus::get() }
fn default_kmer_length() -> usize { 3 }
fn default_gap_open() -> f32 { promsa_core::config::DEFAULT_GAP_OPEN }
fn default_gap_extend() -> f32 { promsa_core::config::DEFAULT_GAP_EXTEND }
fn default_max_iterations() -> usize { 1 }
fn default_line_width() -> usize { promsa_core::io::DEFAULT_LINE_WIDTH }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            deterministic: false,
            threads: default_threads(),
        }
    }
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            kmer_length: default_kmer_length(),
            kmer_distance: KmerDistanceFunction::default(),
            update_method: UpdateDistanceMethod::default(),
            aligner: AlignerKind::default(),
            gap_model: GapModel::default(),
            score_function: ProfileScoreFunction::default(),
            gap_open: default_gap_open(),
            gap_extend: default_gap_extend(),
            matrix: None,
            partitions: None,
            use_weights: false,
        }
    }
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            faster: false,
            use_stage_b: false,
            max_iterations: default_max_iterations(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            line_width: default_line_width(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    log::info!("Loading configuration from: {}", DEFAULT_CONFIG_FILE);
                    Self::load_from_file(&default_path)?
                } else {
                    log::debug!("Using default configuration");
                    Self::default()
                }
            }
        };

        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Library settings described by this file; threads and partitions
    /// collapse to 1 in deterministic mode.
    pub fn to_msa_config(&self, deterministic: bool) -> MsaConfig {
        let alignment = &self.alignment;
        let threads = self.general.threads.max(1);
        let mut config = MsaConfig {
            kmer_length: alignment.kmer_length,
            kmer_distance: alignment.kmer_distance,
            update_method: alignment.update_method,
            aligner: alignment.aligner,
            gap_model: alignment.gap_model,
            score_function: alignment.score_function,
            gap_open: alignment.gap_open,
            gap_extend: alignment.gap_extend,
            similarity_matrix: alignment.matrix.clone(),
            partitions: alignment.partitions.unwrap_or(threads),
            degree_of_parallelism: threads,
            faster: self.refinement.faster,
            use_stage_b: self.refinement.use_stage_b,
            max_refinement_iterations: self.refinement.max_iterations,
            use_weights: alignment.use_weights,
        };
        if deterministic || self.general.deterministic {
            crate::deterministic::apply(&mut config);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.alignment.kmer_length, 3);
        assert_eq!(config.alignment.aligner, AlignerKind::NeedlemanWunsch);
        assert_eq!(config.output.line_width, 60);
        assert_eq!(config.refinement.max_iterations, 1);
    }

    #[test]
    fn test_config_roundtrip() -> Result<()> {
        let mut config = Config::default();
        config.alignment.score_function = ProfileScoreFunction::JensenShannonDivergence;
        config.alignment.matrix = Some("blosum62".to_string());
        let temp_file = NamedTempFile::new()?;

        config.save_to_file(temp_file.path())?;
        let loaded_config = Config::load_from_file(temp_file.path())?;

        assert_eq!(loaded_config.alignment.score_function, ProfileScoreFunction::JensenShannonDivergence);
        assert_eq!(loaded_config.alignment.matrix.as_deref(), Some("blosum62"));
        assert_eq!(config.general.threads, loaded_config.general.threads);

        Ok(())
    }

    #[test]
    fn test_partial_file_uses_defaults() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "[alignment]\naligner = \"smith-waterman\"\ngap_model = \"simple\"\n")?;
        writeln!(temp_file, "[refinement]\nuse_stage_b = true")?;

        let config = Config::load_from_file(temp_file.path())?;
        assert_eq!(config.alignment.aligner, AlignerKind::SmithWaterman);
        assert_eq!(config.alignment.gap_model, GapModel::Simple);
        assert_eq!(config.alignment.kmer_length, 3);
        assert!(config.refinement.use_stage_b);
        assert_eq!(config.output.line_width, 60);
        Ok(())
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[alignment]\nscore_function = \"no-such-function\"").unwrap();
        let err = Config::load_from_file(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse configuration file"));
    }

    #[test]
    fn test_deterministic_msa_config() {
        let mut config = Config::default();
        config.general.threads = 8;
        config.alignment.partitions = Some(4);

        let msa = config.to_msa_config(false);
        assert_eq!(msa.degree_of_parallelism, 8);
        assert_eq!(msa.partitions, 4);

        let msa = config.to_msa_config(true);
        assert_eq!(msa.degree_of_parallelism, 1);
        assert_eq!(msa.partitions, 1);
    }

    #[test]
    fn test_example_toml_generation() {
        let example = Config::default().to_toml().unwrap();
        assert!(example.contains("[general]"));
        assert!(example.contains("[alignment]"));
        assert!(example.contains("[refinement]"));
        assert!(example.contains("[output]"));
    }
}
