//! ProMSA Core Library
//!
//! Progressive multiple sequence alignment: k-mer distances, hierarchical
//! clustering, guide trees, profile-profile dynamic programming and
//! tree-based refinement.

pub mod error;
pub mod alphabet;
pub mod types;
pub mod similarity;
pub mod distance;
pub mod cluster;
pub mod tree;
pub mod profile;
pub mod profile_score;
pub mod align;
pub mod progressive;
pub mod scoring;
pub mod config;
pub mod msa;
pub mod io;

// Re-export commonly used types and functions
pub use error::{ErrorKind, MsaError, MsaResult};
pub use alphabet::Alphabet;
pub use types::Sequence;
pub use similarity::SimilarityMatrix;
pub use distance::{
    DistanceMatrix, KimuraDistanceMatrixGenerator, KmerDistanceFunction, KmerDistanceMatrixGenerator,
    SymmetricDistanceMatrix,
};
pub use cluster::{HierarchicalClusterer, HierarchicalClustering, UpdateDistanceMethod};
pub use tree::{compare_trees, find_smallest_tree_difference, GuideTree};
pub use profile::{Profile, SubAlignment};
pub use profile_score::ProfileScoreFunction;
pub use align::{AlignedProfile, AlignerKind, AlignerParams, EditScript, GapModel, ProfileAligner};
pub use progressive::{ProgressiveAligner, ProgressiveAlignment};
pub use scoring::{alignment_score_q, alignment_score_tc, multiple_alignment_score, pairwise_score};
pub use config::MsaConfig;
pub use msa::{MsaAlignment, MultipleSequenceAligner, Refinement, StageResult};
pub use io::{read_sequences, write_alignment, FastaParser};

/// Version information for the ProMSA core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
