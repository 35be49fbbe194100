//! Alignment scores and comparison against a reference alignment

use rayon::prelude::*;

use crate::alphabet::is_gap;
use crate::error::{MsaError, MsaResult};
use crate::similarity::SimilarityMatrix;
use crate::types::Sequence;

/// Round to six decimals
fn round6(value: f64) -> f32 {
    ((value * 1e6).round() / 1e6) as f32
}

/// Sum-of-pairs score of two aligned rows, divided by the row length.
///
/// Columns that are gaps in both rows are skipped. A run of gaps in one row
/// pays `gap_open` once and `gap_extend` for every further column. Any column
/// holding residues in both rows ends a run, so a gap after a match column
/// opens a new one.
pub fn pairwise_score(a: &[u8], b: &[u8], matrix: &SimilarityMatrix, gap_open: f32, gap_extend: f32) -> MsaResult<f32> {
    pair_score(a, b, matrix, gap_open, gap_extend).map(round6)
}

/// Unrounded per-column pair score
fn pair_score(a: &[u8], b: &[u8], matrix: &SimilarityMatrix, gap_open: f32, gap_extend: f32) -> MsaResult<f64> {
    if a.len() != b.len() {
        return Err(MsaError::NotAligned(format!(
            "rows have lengths {} and {}",
            a.len(),
            b.len()
        )));
    }
    if a.is_empty() {
        return Ok(0.0);
    }

    let mut score = 0.0f64;
    let (mut in_gap_a, mut in_gap_b) = (false, false);
    for (&x, &y) in a.iter().zip(b) {
        match (is_gap(x), is_gap(y)) {
            (true, true) => continue,
            (true, false) => {
                in_gap_b = false;
                score += if in_gap_a { gap_extend } else { gap_open } as f64;
                in_gap_a = true;
            }
            (false, true) => {
                in_gap_a = false;
                score += if in_gap_b { gap_extend } else { gap_open } as f64;
                in_gap_b = true;
            }
            (false, false) => {
                in_gap_a = false;
                in_gap_b = false;
                score += matrix.score(x, y)? as f64;
            }
        }
    }
    Ok(score / a.len() as f64)
}

/// Mean pairwise score over every pair of rows, rounded once at the end.
///
/// Pairs are scored in parallel and summed in pair order.
pub fn multiple_alignment_score(
    aligned: &[Sequence],
    matrix: &SimilarityMatrix,
    gap_open: f32,
    gap_extend: f32,
) -> MsaResult<f32> {
    let n = aligned.len();
    if n < 2 {
        return Ok(0.0);
    }
    let pairs: Vec<(usize, usize)> = (0..n).flat_map(|i| (i + 1..n).map(move |j| (i, j))).collect();
    let scores: Vec<f64> = pairs
        .par_iter()
        .map(|&(i, j)| pair_score(&aligned[i].data, &aligned[j].data, matrix, gap_open, gap_extend))
        .collect::<MsaResult<_>>()?;
    let total: f64 = scores.iter().sum();
    Ok(round6(total / pairs.len() as f64))
}

pub fn unalign(sequence: &Sequence) -> Sequence {
    sequence.ungapped()
}

pub fn unalign_all(sequences: &[Sequence]) -> Vec<Sequence> {
    sequences.iter().map(unalign).collect()
}

/// Residue rank of every column (`-1` for gaps) and the column of every rank
struct ResidueIndex {
    rank_at: Vec<isize>,
    column_of: Vec<usize>,
}

impl ResidueIndex {
    fn new(row: &[u8]) -> Self {
        let mut rank_at = Vec::with_capacity(row.len());
        let mut column_of = Vec::new();
        for (column, &symbol) in row.iter().enumerate() {
            if is_gap(symbol) {
                rank_at.push(-1);
            } else {
                rank_at.push(column_of.len() as isize);
                column_of.push(column);
            }
        }
        Self { rank_at, column_of }
    }
}

/// For each column of `aligned`, the column of `reference` holding the same
/// residue, or `-1` where `aligned` has a gap. Both rows must be gapped
/// versions of one sequence.
pub fn calculate_offsets(aligned: &[u8], reference: &[u8]) -> MsaResult<Vec<isize>> {
    let ours = ResidueIndex::new(aligned);
    let theirs = ResidueIndex::new(reference);
    if ours.column_of.len() != theirs.column_of.len() {
        return Err(MsaError::NotAligned(format!(
            "rows hold {} and {} residues",
            ours.column_of.len(),
            theirs.column_of.len()
        )));
    }
    Ok(ours
        .rank_at
        .iter()
        .map(|&rank| if rank < 0 { -1 } else { theirs.column_of[rank as usize] as isize })
        .collect())
}

fn residue_indices(aligned: &[Sequence], reference: &[Sequence]) -> MsaResult<(Vec<ResidueIndex>, Vec<ResidueIndex>)> {
    if aligned.len() != reference.len() {
        return Err(MsaError::DimensionMismatch {
            expected: reference.len(),
            found: aligned.len(),
        });
    }
    let ours: Vec<ResidueIndex> = aligned.iter().map(|s| ResidueIndex::new(&s.data)).collect();
    let theirs: Vec<ResidueIndex> = reference.iter().map(|s| ResidueIndex::new(&s.data)).collect();
    for (k, (o, t)) in ours.iter().zip(&theirs).enumerate() {
        if o.column_of.len() != t.column_of.len() {
            return Err(MsaError::NotAligned(format!(
                "sequence '{}' holds {} residues but its reference holds {}",
                aligned[k].id,
                o.column_of.len(),
                t.column_of.len()
            )));
        }
    }
    Ok((ours, theirs))
}

/// Fraction of residue pairs aligned in `reference` that `aligned` also aligns.
///
/// Rows are matched by position. Returns 0 when the reference aligns no pair.
pub fn alignment_score_q(aligned: &[Sequence], reference: &[Sequence]) -> MsaResult<f32> {
    let (ours, theirs) = residue_indices(aligned, reference)?;
    let n = aligned.len();
    let pairs: Vec<(usize, usize)> = (0..n).flat_map(|i| (i + 1..n).map(move |j| (i, j))).collect();
    let (shared, total) = pairs
        .par_iter()
        .map(|&(i, j)| {
            let mut shared = 0u64;
            let mut total = 0u64;
            for (&ri, &rj) in theirs[i].rank_at.iter().zip(&theirs[j].rank_at) {
                if ri < 0 || rj < 0 {
                    continue;
                }
                total += 1;
                let column = ours[i].column_of[ri as usize];
                if ours[j].rank_at[column] == rj {
                    shared += 1;
                }
            }
            (shared, total)
        })
        .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1));
    Ok(if total == 0 { 0.0 } else { (shared as f64 / total as f64) as f32 })
}

/// Fraction of reference columns with at least two residues that `aligned`
/// reproduces as one column holding exactly the same residues.
pub fn alignment_score_tc(aligned: &[Sequence], reference: &[Sequence]) -> MsaResult<f32> {
    let (ours, theirs) = residue_indices(aligned, reference)?;
    let length = theirs.first().map(|t| t.rank_at.len()).unwrap_or(0);
    if let Some(row) = theirs.iter().find(|t| t.rank_at.len() != length) {
        return Err(MsaError::NotAligned(format!(
            "reference rows have lengths {} and {}",
            length,
            row.rank_at.len()
        )));
    }

    let (mut considered, mut reproduced) = (0usize, 0usize);
    for column in 0..length {
        let residues: Vec<usize> = (0..theirs.len()).filter(|&k| theirs[k].rank_at[column] >= 0).collect();
        if residues.len() < 2 {
            continue;
        }
        considered += 1;
        let first = residues[0];
        let target = ours[first].column_of[theirs[first].rank_at[column] as usize];
        if (0..theirs.len()).all(|k| ours[k].rank_at.get(target).copied().unwrap_or(-1) == theirs[k].rank_at[column]) {
            reproduced += 1;
        }
    }
    Ok(if considered == 0 { 0.0 } else { reproduced as f32 / considered as f32 })
}
