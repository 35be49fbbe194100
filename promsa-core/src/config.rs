//! Settings of one multiple alignment run

use serde::{Deserialize, Serialize};

use crate::align::{AlignerKind, AlignerParams, GapModel};
use crate::cluster::UpdateDistanceMethod;
use crate::distance::KmerDistanceFunction;
use crate::error::{MsaError, MsaResult};
use crate::profile_score::ProfileScoreFunction;

pub const DEFAULT_GAP_OPEN: f32 = -4.0;
pub const DEFAULT_GAP_EXTEND: f32 = -1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsaConfig {
    #[serde(default = "default_kmer_length")]
    pub kmer_length: usize,
    #[serde(default)]
    pub kmer_distance: KmerDistanceFunction,
    #[serde(default)]
    pub update_method: UpdateDistanceMethod,
    #[serde(default)]
    pub aligner: AlignerKind,
    #[serde(default)]
    pub gap_model: GapModel,
    #[serde(default)]
    pub score_function: ProfileScoreFunction,
    /// 0 selects the default
    #[serde(default = "default_gap_open")]
    pub gap_open: f32,
    /// 0 selects the default
    #[serde(default = "default_gap_extend")]
    pub gap_extend: f32,
    /// Similarity matrix name; the alphabet's default when unset
    #[serde(default)]
    pub similarity_matrix: Option<String>,
    /// Block grid size of the DP wavefront
    #[serde(default = "default_parallelism")]
    pub partitions: usize,
    /// Worker threads for clustering, scoring and the wavefront
    #[serde(default = "default_parallelism")]
    pub degree_of_parallelism: usize,
    /// Skip distance and tree refinement
    #[serde(default)]
    pub faster: bool,
    /// Re-estimate distances from the draft alignment
    #[serde(default)]
    pub use_stage_b: bool,
    #[serde(default = "default_refinements")]
    pub max_refinement_iterations: usize,
    /// Weight sequences by their guide-tree branch lengths
    #[serde(default)]
    pub use_weights: bool,
}

fn default_kmer_length() -> usize {
    3
}

fn default_gap_open() -> f32 {
    DEFAULT_GAP_OPEN
}

fn default_gap_extend() -> f32 {
    DEFAULT_GAP_EXTEND
}

fn default_parallelism() -> usize {
    num_cpus::get().max(1)
}

fn default_refinements() -> usize {
    1
}

impl Default for MsaConfig {
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
            similarity_matrix: None,
            partitions: default_parallelism(),
            degree_of_parallelism: default_parallelism(),
            faster: false,
            use_stage_b: false,
            max_refinement_iterations: default_refinements(),
            use_weights: false,
        }
    }
}

impl MsaConfig {
    /// Single-threaded settings that reproduce results exactly
    pub fn deterministic() -> Self {
        Self {
            partitions: 1,
            degree_of_parallelism: 1,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> MsaResult<()> {
        if self.kmer_length == 0 {
            return Err(MsaError::InvalidConfig("k-mer length must be positive".to_string()));
        }
        if self.partitions == 0 {
            return Err(MsaError::InvalidConfig("number of partitions must be positive".to_string()));
        }
        if self.degree_of_parallelism == 0 {
            return Err(MsaError::InvalidConfig("degree of parallelism must be positive".to_string()));
        }
        if !self.gap_open.is_finite() || !self.gap_extend.is_finite() {
            return Err(MsaError::InvalidConfig("gap penalties must be finite".to_string()));
        }
        Ok(())
    }

    /// Gap open and extend penalties with zeros replaced by the defaults
    pub fn gap_penalties(&self) -> (f32, f32) {
        let open = if self.gap_open == 0.0 {
            log::warn!("Gap open penalty of 0 replaced by {}", DEFAULT_GAP_OPEN);
            DEFAULT_GAP_OPEN
        } else {
            self.gap_open
        };
        let extend = if self.gap_extend == 0.0 {
            log::warn!("Gap extend penalty of 0 replaced by {}", DEFAULT_GAP_EXTEND);
            DEFAULT_GAP_EXTEND
        } else {
            self.gap_extend
        };
        (open, extend)
    }

    pub fn aligner_params(&self) -> AlignerParams {
        let (gap_open, gap_extend) = self.gap_penalties();
        AlignerParams {
            kind: self.aligner,
            gap_model: self.gap_model,
            score_function: self.score_function,
            gap_open,
            gap_extend,
            partitions: self.partitions,
        }
    }
}
