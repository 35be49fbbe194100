//! Anti-diagonal block wavefront over full score tables
//!
//! Columns `1..n_cols` are cut into `P` strips and rows `1..n_rows` into `P`
//! bands. Round `r` fills block `(strip k, band r - k)` for every valid `k` in
//! parallel, so `2P - 1` rounds cover the table. Each strip owns a disjoint
//! slice of the tables; the column to its left is read from a halo copy that
//! is refreshed between rounds.

use rayon::prelude::*;

use super::algorithm::{BestCell, Recurrence, LEFT, UP};
use super::Fill;
use crate::error::{try_alloc, MsaError, MsaResult};

/// Splits `start..end` into `parts` contiguous ranges of near-equal size
#[derive(Debug, Clone, Copy)]
pub(crate) struct IndexLocator {
    start: usize,
    end: usize,
    parts: usize,
}

impl IndexLocator {
    pub fn new(start: usize, end: usize, parts: usize) -> Self {
        Self { start, end, parts }
    }

    #[inline]
    fn position(&self, index: usize) -> usize {
        (self.end - self.start) * index / self.parts + self.start
    }

    /// Range of part `index`
    pub fn range(&self, index: usize) -> (usize, usize) {
        (self.position(index), self.position(index + 1))
    }
}

struct Strip<'t, C> {
    first_col: usize,
    end_col: usize,
    values: &'t mut [C],
    traceback: &'t mut [u8],
    /// Copy of the column left of `first_col`
    halo: Vec<C>,
}

impl<C: Copy> Strip<'_, C> {
    fn fill_band<R: Recurrence<Cell = C>>(&mut self, recurrence: &R, rows: (usize, usize), n_rows: usize) -> BestCell {
        let mut best = BestCell::NONE;
        for col in self.first_col..self.end_col {
            let local = (col - self.first_col) * n_rows;
            for row in rows.0..rows.1 {
                let (diag, left) = if col == self.first_col {
                    (self.halo[row - 1], self.halo[row])
                } else {
                    (self.values[local - n_rows + row - 1], self.values[local - n_rows + row])
                };
                let up = self.values[local + row - 1];
                let (cell, byte) = recurrence.cell(col, row, diag, up, left);
                self.values[local + row] = cell;
                self.traceback[local + row] = byte;
                best.offer(R::value(&cell), col * n_rows + row);
            }
        }
        best
    }

    fn last_column(&self, n_rows: usize) -> &[C] {
        let offset = (self.end_col - self.first_col - 1) * n_rows;
        &self.values[offset..offset + n_rows]
    }
}

fn refresh_halos<C: Copy>(strips: &mut [Strip<'_, C>], n_rows: usize) {
    for k in 1..strips.len() {
        let (done, pending) = strips.split_at_mut(k);
        pending[0].halo.copy_from_slice(done[k - 1].last_column(n_rows));
    }
}

/// Fill with `partitions` strips; callers keep `partitions` at most
/// `min(n_cols, n_rows) - 1`.
pub(crate) fn fill<R: Recurrence>(recurrence: &R, n_cols: usize, n_rows: usize, partitions: usize) -> MsaResult<Fill> {
    let cells = n_cols * n_rows;
    let on_failure = || MsaError::out_of_memory(n_cols - 1, n_rows - 1, R::AFFINE);
    let mut values: Vec<R::Cell> = try_alloc(cells, R::EMPTY, on_failure)?;
    let mut traceback = try_alloc(cells, 0u8, on_failure)?;

    for row in 0..n_rows {
        let (cell, byte) = recurrence.boundary(row, UP);
        values[row] = cell;
        traceback[row] = byte;
    }
    for col in 1..n_cols {
        let (cell, byte) = recurrence.boundary(col, LEFT);
        values[col * n_rows] = cell;
        traceback[col * n_rows] = byte;
    }

    let columns = IndexLocator::new(1, n_cols, partitions);
    let bands = IndexLocator::new(1, n_rows, partitions);
    log::trace!(
        "Wavefront fill of {}x{} table in {}x{} blocks",
        n_cols,
        n_rows,
        partitions,
        partitions
    );

    let mut best = BestCell::NONE;
    {
        let (column_zero, mut rest_values) = values.split_at_mut(n_rows);
        let (_, mut rest_traceback) = traceback.split_at_mut(n_rows);
        let mut strips = Vec::with_capacity(partitions);
        for k in 0..partitions {
            let (first_col, end_col) = columns.range(k);
            let width = (end_col - first_col) * n_rows;
            let (strip_values, tail_values) = std::mem::take(&mut rest_values).split_at_mut(width);
            let (strip_traceback, tail_traceback) = std::mem::take(&mut rest_traceback).split_at_mut(width);
            rest_values = tail_values;
            rest_traceback = tail_traceback;
            strips.push(Strip {
                first_col,
                end_col,
                values: strip_values,
                traceback: strip_traceback,
                halo: vec![R::EMPTY; n_rows],
            });
        }
        strips[0].halo.copy_from_slice(column_zero);
        refresh_halos(&mut strips, n_rows);

        for round in 0..2 * partitions - 1 {
            let round_best = strips
                .par_iter_mut()
                .enumerate()
                .filter(|(k, _)| *k <= round && round - *k < partitions)
                .map(|(k, strip)| strip.fill_band(recurrence, bands.range(round - k), n_rows))
                .reduce(|| BestCell::NONE, BestCell::better);
            best = best.better(round_best);
            refresh_halos(&mut strips, n_rows);
        }
    }

    Ok(Fill {
        corner: R::value(&values[cells - 1]),
        traceback,
        best,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_locator_covers_range() {
        let locator = IndexLocator::new(1, 11, 3);
        let ranges: Vec<_> = (0..3).map(|k| locator.range(k)).collect();
        assert_eq!(ranges, vec![(1, 4), (4, 7), (7, 11)]);
        let single = IndexLocator::new(1, 2, 1);
        assert_eq!(single.range(0), (1, 2));
    }
}
