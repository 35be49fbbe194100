//! Column-by-column fill keeping only two columns of scores
//!
//! The traceback table is kept whole (one byte per cell); score state lives in
//! two rolling columns of length `n_rows`.

use super::algorithm::{BestCell, Recurrence, LEFT, UP};
use super::Fill;
use crate::error::{try_alloc, MsaError, MsaResult};

pub(crate) fn fill<R: Recurrence>(recurrence: &R, n_cols: usize, n_rows: usize) -> MsaResult<Fill> {
    let mut traceback = try_alloc(n_cols * n_rows, 0u8, || {
        MsaError::out_of_memory(n_cols - 1, n_rows - 1, R::AFFINE)
    })?;

    let mut previous: Vec<R::Cell> = Vec::with_capacity(n_rows);
    for row in 0..n_rows {
        let (cell, byte) = recurrence.boundary(row, UP);
        previous.push(cell);
        traceback[row] = byte;
    }
    let mut current = previous.clone();
    let mut best = BestCell::NONE;

    for col in 1..n_cols {
        let base = col * n_rows;
        let (cell, byte) = recurrence.boundary(col, LEFT);
        current[0] = cell;
        traceback[base] = byte;
        for row in 1..n_rows {
            let (cell, byte) = recurrence.cell(col, row, previous[row - 1], current[row - 1], previous[row]);
            current[row] = cell;
            traceback[base + row] = byte;
            best.offer(R::value(&cell), base + row);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    Ok(Fill {
        traceback,
        corner: R::value(&previous[n_rows - 1]),
        best,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::algorithm::{AffineRecurrence, NeedlemanWunsch, SimpleRecurrence};
    use crate::alphabet::Alphabet;
    use crate::profile::Profile;
    use crate::profile_score::{ProfileScoreFunction, ProfileScorer};
    use crate::similarity::SimilarityMatrix;

    fn estimated_bytes(result: MsaResult<Fill>) -> (u64, bool) {
        match result {
            Err(MsaError::OutOfMemory { estimated_bytes, affine, .. }) => (estimated_bytes, affine),
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(_) => panic!("allocation unexpectedly succeeded"),
        }
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_out_of_memory_reports_full_table_size() {
        let matrix = SimilarityMatrix::default_for(Alphabet::Dna);
        let a = Profile::from_sequence(b"ACGT", Alphabet::Dna, 1.0).unwrap();
        let b = Profile::from_sequence(b"AGT", Alphabet::Dna, 1.0).unwrap();
        let scorer = ProfileScorer::new(ProfileScoreFunction::default(), &matrix, &a, &b).unwrap();
        let side = (1usize << 30) + 1;
        let cells = (1u64 << 30) * (1u64 << 30);

        let simple = SimpleRecurrence::new(&NeedlemanWunsch, &scorer, -4.0, side, side);
        assert_eq!(estimated_bytes(fill(&simple, side, side)), (cells * 5, false));

        let affine = AffineRecurrence::new(&NeedlemanWunsch, &scorer, -4.0, -1.0, side, side);
        assert_eq!(estimated_bytes(fill(&affine, side, side)), (cells * 13, true));
    }
}
