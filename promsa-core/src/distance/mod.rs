//! Pairwise distance matrices with nearest-neighbour caches
//!
//! Every column `c` caches the row holding its smallest off-diagonal value so
//! the clusterer can find the globally closest pair by scanning one value per
//! column. Writes keep the caches exact: a lowering write takes over the cache
//! directly, a write that raises the cached minimum triggers a rescan of that
//! column over the still-active rows.

pub mod kimura;
pub mod kmer;

pub use kimura::KimuraDistanceMatrixGenerator;
pub use kmer::{KmerDistanceFunction, KmerDistanceMatrixGenerator};

use bitvec::prelude::*;
use std::fmt;

use crate::error::{try_alloc, MsaError, MsaResult};

/// Value of an unset or retired cell
pub const UNSET_DISTANCE: f32 = f32::MAX;

/// Shared read/write contract of the symmetric and asymmetric matrices
pub trait DistanceMatrix: Send + Sync + fmt::Debug {
    fn dimension(&self) -> usize;

    /// Unchecked read used on hot paths; indices must be `< dimension`.
    fn value(&self, row: usize, col: usize) -> f32;

    fn set(&mut self, row: usize, col: usize, value: f32) -> MsaResult<()>;

    /// Row index of the nearest neighbour of every column
    fn nearest_neighbors(&self) -> &[usize];

    /// Smallest off-diagonal value of every column
    fn nearest_distances(&self) -> &[f32];

    fn is_active(&self, index: usize) -> bool;

    /// Remove `index` from further consideration: its row and column become
    /// [`UNSET_DISTANCE`] and it is never chosen as a nearest neighbour again.
    fn retire(&mut self, index: usize) -> MsaResult<()>;

    fn is_symmetric(&self) -> bool;

    fn get(&self, row: usize, col: usize) -> MsaResult<f32> {
        check_index(row, col, self.dimension())?;
        Ok(self.value(row, col))
    }
}

fn check_index(row: usize, col: usize, dimension: usize) -> MsaResult<()> {
    if row >= dimension || col >= dimension {
        return Err(MsaError::IndexOutOfRange { row, col, dimension });
    }
    Ok(())
}

fn check_distance(row: usize, col: usize, value: f32) -> MsaResult<()> {
    if !(value >= 0.0) {
        return Err(MsaError::InvalidDistance { row, col, value });
    }
    Ok(())
}

/// Per-column nearest-neighbour bookkeeping shared by both storage layouts
#[derive(Debug, Clone)]
struct NearestCache {
    neighbors: Vec<usize>,
    distances: Vec<f32>,
    active: BitVec,
}

impl NearestCache {
    fn new(dimension: usize) -> Self {
        Self {
            neighbors: (0..dimension).map(|c| if c == 0 && dimension > 1 { 1 } else { 0 }).collect(),
            distances: vec![UNSET_DISTANCE; dimension],
            active: bitvec![1; dimension],
        }
    }

    /// Apply the effect of `m[row, col] = value` (previously `old`) on column `col`.
    /// Returns true when the column needs a rescan.
    #[inline]
    fn observe(&mut self, row: usize, col: usize, old: f32, value: f32) -> bool {
        if row == col || !self.active[row] {
            return false;
        }
        if value < self.distances[col] {
            self.distances[col] = value;
            self.neighbors[col] = row;
            false
        } else {
            self.neighbors[col] == row && value > old
        }
    }

    fn rescan(&mut self, col: usize, value: impl Fn(usize) -> f32) {
        let mut best_row = None;
        let mut best = UNSET_DISTANCE;
        for row in self.active.iter_ones() {
            if row == col {
                continue;
            }
            let candidate = value(row);
            if best_row.is_none() || candidate < best {
                best = candidate;
                best_row = Some(row);
            }
        }
        self.distances[col] = best;
        if let Some(row) = best_row {
            self.neighbors[col] = row;
        }
    }
}

/// Triangular storage; `m[i, j] == m[j, i]` by construction
#[derive(Debug, Clone)]
pub struct SymmetricDistanceMatrix {
    dimension: usize,
    values: Vec<f32>,
    cache: NearestCache,
}

impl SymmetricDistanceMatrix {
    pub fn new(dimension: usize) -> MsaResult<Self> {
        let len = dimension * (dimension + 1) / 2;
        let mut values = try_alloc(len, UNSET_DISTANCE, || {
            MsaError::out_of_memory_cells(dimension, dimension, 2, false)
        })?;
        for i in 0..dimension {
            values[Self::index(i, i)] = 0.0;
        }
        Ok(Self {
            dimension,
            values,
            cache: NearestCache::new(dimension),
        })
    }

    #[inline]
    fn index(row: usize, col: usize) -> usize {
        let (i, j) = if row >= col { (row, col) } else { (col, row) };
        i * (i + 1) / 2 + j
    }
}

impl DistanceMatrix for SymmetricDistanceMatrix {
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn value(&self, row: usize, col: usize) -> f32 {
        self.values[Self::index(row, col)]
    }

    fn set(&mut self, row: usize, col: usize, value: f32) -> MsaResult<()> {
        check_index(row, col, self.dimension)?;
        check_distance(row, col, value)?;
        let slot = Self::index(row, col);
        let old = self.values[slot];
        self.values[slot] = value;

        let rescan_col = self.cache.observe(row, col, old, value);
        let rescan_row = self.cache.observe(col, row, old, value);
        let values = &self.values;
        if rescan_col {
            self.cache.rescan(col, |r| values[Self::index(r, col)]);
        }
        if rescan_row {
            self.cache.rescan(row, |r| values[Self::index(r, row)]);
        }
        Ok(())
    }

    fn nearest_neighbors(&self) -> &[usize] {
        &self.cache.neighbors
    }

    fn nearest_distances(&self) -> &[f32] {
        &self.cache.distances
    }

    fn is_active(&self, index: usize) -> bool {
        index < self.dimension && self.cache.active[index]
    }

    fn retire(&mut self, index: usize) -> MsaResult<()> {
        check_index(index, index, self.dimension)?;
        self.cache.active.set(index, false);
        for other in 0..self.dimension {
            if other != index {
                self.values[Self::index(index, other)] = UNSET_DISTANCE;
            }
        }
        self.cache.distances[index] = UNSET_DISTANCE;

        let stale: Vec<usize> = self
            .cache
            .active
            .iter_ones()
            .filter(|&c| self.cache.neighbors[c] == index)
            .collect();
        let values = &self.values;
        for col in stale {
            self.cache.rescan(col, |r| values[Self::index(r, col)]);
        }
        Ok(())
    }

    fn is_symmetric(&self) -> bool {
        true
    }
}

/// Full row-major storage; `m[i, j]` and `m[j, i]` are independent
#[derive(Debug, Clone)]
pub struct AsymmetricDistanceMatrix {
    dimension: usize,
    values: Vec<f32>,
    cache: NearestCache,
}

impl AsymmetricDistanceMatrix {
    pub fn new(dimension: usize) -> MsaResult<Self> {
        let mut values = try_alloc(dimension * dimension, UNSET_DISTANCE, || {
            MsaError::out_of_memory_cells(dimension, dimension, 4, false)
        })?;
        for i in 0..dimension {
            values[i * dimension + i] = 0.0;
        }
        Ok(Self {
            dimension,
            values,
            cache: NearestCache::new(dimension),
        })
    }
}

impl DistanceMatrix for AsymmetricDistanceMatrix {
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn value(&self, row: usize, col: usize) -> f32 {
        self.values[row * self.dimension + col]
    }

    fn set(&mut self, row: usize, col: usize, value: f32) -> MsaResult<()> {
        check_index(row, col, self.dimension)?;
        check_distance(row, col, value)?;
        let n = self.dimension;
        let old = self.values[row * n + col];
        self.values[row * n + col] = value;

        if self.cache.observe(row, col, old, value) {
            let values = &self.values;
            self.cache.rescan(col, |r| values[r * n + col]);
        }
        Ok(())
    }

    fn nearest_neighbors(&self) -> &[usize] {
        &self.cache.neighbors
    }

    fn nearest_distances(&self) -> &[f32] {
        &self.cache.distances
    }

    fn is_active(&self, index: usize) -> bool {
        index < self.dimension && self.cache.active[index]
    }

    fn retire(&mut self, index: usize) -> MsaResult<()> {
        check_index(index, index, self.dimension)?;
        let n = self.dimension;
        self.cache.active.set(index, false);
        for other in 0..n {
            if other != index {
                self.values[index * n + other] = UNSET_DISTANCE;
                self.values[other * n + index] = UNSET_DISTANCE;
            }
        }
        self.cache.distances[index] = UNSET_DISTANCE;

        let stale: Vec<usize> = self
            .cache
            .active
            .iter_ones()
            .filter(|&c| self.cache.neighbors[c] == index)
            .collect();
        let values = &self.values;
        for col in stale {
            self.cache.rescan(col, |r| values[r * n + col]);
        }
        Ok(())
    }

    fn is_symmetric(&self) -> bool {
        false
    }
}
