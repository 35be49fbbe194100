//! Profile-profile dynamic programming
//!
//! [`ProfileAligner`] aligns two profiles with a single gap penalty
//! ([`ProfileAligner::align_simple`]) or with open and extend penalties
//! ([`ProfileAligner::align`]), globally or locally. The fill runs either
//! serially with rolling score columns or as a block wavefront over full
//! tables when more than one partition is configured; both give the same
//! cells bit for bit.

pub mod algorithm;
pub mod estring;
pub mod parallel;
pub mod serial;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{MsaError, MsaResult};
use crate::profile::Profile;
use crate::profile_score::{ProfileScoreFunction, ProfileScorer};
use crate::similarity::SimilarityMatrix;
use algorithm::{AffineRecurrence, BestCell, DpAlgorithm, NeedlemanWunsch, Path, Recurrence, SimpleRecurrence, SmithWaterman};

pub use estring::EditScript;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlignerKind {
    #[default]
    NeedlemanWunsch,
    SmithWaterman,
}

impl AlignerKind {
    pub const ALL: [AlignerKind; 2] = [AlignerKind::NeedlemanWunsch, AlignerKind::SmithWaterman];

    pub fn name(&self) -> &'static str {
        match self {
            AlignerKind::NeedlemanWunsch => "needleman-wunsch",
            AlignerKind::SmithWaterman => "smith-waterman",
        }
    }
}

impl fmt::Display for AlignerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AlignerKind {
    type Err = MsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MsaError::InvalidConfig(format!("unknown profile aligner '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GapModel {
    Simple,
    #[default]
    Affine,
}

impl GapModel {
    pub const ALL: [GapModel; 2] = [GapModel::Simple, GapModel::Affine];

    pub fn name(&self) -> &'static str {
        match self {
            GapModel::Simple => "simple",
            GapModel::Affine => "affine",
        }
    }
}

impl fmt::Display for GapModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GapModel {
    type Err = MsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MsaError::InvalidConfig(format!("unknown gap model '{s}'")))
    }
}

/// Knobs of one profile aligner
#[derive(Debug, Clone, PartialEq)]
pub struct AlignerParams {
    pub kind: AlignerKind,
    pub gap_model: GapModel,
    pub score_function: ProfileScoreFunction,
    /// Gap open penalty; also the single penalty of the simple model
    pub gap_open: f32,
    pub gap_extend: f32,
    /// Block grid size of the wavefront fill, 1 for the serial fill
    pub partitions: usize,
}

impl Default for AlignerParams {
    fn default() -> Self {
        Self {
            kind: AlignerKind::default(),
            gap_model: GapModel::default(),
            score_function: ProfileScoreFunction::default(),
            gap_open: -4.0,
            gap_extend: -1.0,
            partitions: 1,
        }
    }
}

/// Result of aligning two profiles
#[derive(Debug, Clone)]
pub struct AlignedProfile {
    /// Merged profile of both inputs
    pub profile: Profile,
    /// Per output column, the column of A it holds or `-1`
    pub aligned_a: Vec<isize>,
    pub aligned_b: Vec<isize>,
    /// Maps A's columns onto the merged columns
    pub edit_a: EditScript,
    pub edit_b: EditScript,
    pub score: f32,
}

/// Output of a table fill
pub(crate) struct Fill {
    pub traceback: Vec<u8>,
    /// Best value of the bottom-right cell
    pub corner: f32,
    /// Highest positive cell
    pub best: BestCell,
}

/// Diagnostic for penalties that are not strictly negative
fn penalty_warning(gap_open: f32, gap_extend: f32) -> Option<String> {
    if gap_open > 0.0 || gap_extend > 0.0 {
        Some(format!(
            "Gap penalties are expected to be negative; got open {} and extend {}",
            gap_open, gap_extend
        ))
    } else if gap_open == 0.0 || gap_extend == 0.0 {
        Some(format!(
            "Gap penalty of 0 makes gaps free; got open {} and extend {}",
            gap_open, gap_extend
        ))
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct ProfileAligner<'m> {
    matrix: &'m SimilarityMatrix,
    params: AlignerParams,
}

impl<'m> ProfileAligner<'m> {
    pub fn new(matrix: &'m SimilarityMatrix, params: AlignerParams) -> MsaResult<Self> {
        if params.partitions == 0 {
            return Err(MsaError::InvalidConfig(
                "number of partitions must be positive".to_string(),
            ));
        }
        if let Some(warning) = penalty_warning(params.gap_open, params.gap_extend) {
            log::warn!("{}", warning);
        }
        Ok(Self { matrix, params })
    }

    pub fn params(&self) -> &AlignerParams {
        &self.params
    }

    pub fn matrix(&self) -> &SimilarityMatrix {
        self.matrix
    }

    /// Align with the configured gap model.
    pub fn align_profiles(&self, a: &Profile, b: &Profile) -> MsaResult<AlignedProfile> {
        match self.params.gap_model {
            GapModel::Simple => self.align_simple(a, b),
            GapModel::Affine => self.align(a, b),
        }
    }

    /// Align with the gap open penalty charged for every gap.
    pub fn align_simple(&self, a: &Profile, b: &Profile) -> MsaResult<AlignedProfile> {
        match self.params.kind {
            AlignerKind::NeedlemanWunsch => self.run(&NeedlemanWunsch, a, b, false),
            AlignerKind::SmithWaterman => self.run(&SmithWaterman, a, b, false),
        }
    }

    /// Align with affine gaps (open, then extend).
    pub fn align(&self, a: &Profile, b: &Profile) -> MsaResult<AlignedProfile> {
        match self.params.kind {
            AlignerKind::NeedlemanWunsch => self.run(&NeedlemanWunsch, a, b, true),
            AlignerKind::SmithWaterman => self.run(&SmithWaterman, a, b, true),
        }
    }

    fn run<A: DpAlgorithm>(&self, algorithm: &A, a: &Profile, b: &Profile, affine: bool) -> MsaResult<AlignedProfile> {
        let scorer = ProfileScorer::new(self.params.score_function, self.matrix, a, b)?;
        let (n_cols, n_rows) = (a.len() + 1, b.len() + 1);
        log::trace!(
            "Aligning profiles of {} and {} columns ({} gaps)",
            a.len(),
            b.len(),
            if affine { "affine" } else { "simple" }
        );
        if affine {
            let recurrence = AffineRecurrence::new(
                algorithm,
                &scorer,
                self.params.gap_open,
                self.params.gap_extend,
                n_cols,
                n_rows,
            );
            self.solve(algorithm, &recurrence, a, b)
        } else {
            let recurrence = SimpleRecurrence::new(algorithm, &scorer, self.params.gap_open, n_cols, n_rows);
            self.solve(algorithm, &recurrence, a, b)
        }
    }

    fn solve<A: DpAlgorithm, R: Recurrence>(
        &self,
        algorithm: &A,
        recurrence: &R,
        a: &Profile,
        b: &Profile,
    ) -> MsaResult<AlignedProfile> {
        let (n_cols, n_rows) = (a.len() + 1, b.len() + 1);
        let partitions = self.params.partitions.min(a.len()).min(b.len());
        let fill = if partitions > 1 {
            parallel::fill(recurrence, n_cols, n_rows, partitions)?
        } else {
            serial::fill(recurrence, n_cols, n_rows)?
        };

        let path = match algorithm.traceback_start(n_cols, n_rows, &fill.best) {
            Some(start) => R::traceback(&fill.traceback, n_rows, start),
            None => Path::default(),
        };
        let score = algorithm.final_score(fill.corner, &fill.best);
        let (aligned_a, aligned_b) = path.with_overhangs(a.len(), b.len());
        let profile = Profile::merge(a, b, &aligned_a, &aligned_b)?;

        Ok(AlignedProfile {
            profile,
            edit_a: EditScript::from_aligned(&aligned_a),
            edit_b: EditScript::from_aligned(&aligned_b),
            aligned_a,
            aligned_b,
            score,
        })
    }
}
