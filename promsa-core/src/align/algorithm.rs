//! Recurrences shared by the serial and wavefront drivers
//!
//! Tables are column-major: column `i` walks profile A, row `j` walks profile
//! B, and cell `(i, j)` lives at `i * n_rows + j`. Moving up consumes a row of
//! B against a gap in A; moving left consumes a column of A against a gap in B.
//! Equal candidates resolve as diagonal, then up, then left.
//!
//! One traceback byte per cell:
//! - bits 0-1: best state of the cell (match, left, up, stop)
//! - bits 2-3: state the left-gap value came from
//! - bits 4-5: state the up-gap value came from
//!
//! The simple model only uses bits 0-1.

use crate::profile_score::ProfileScorer;

pub(crate) const MATCH: u8 = 0;
pub(crate) const LEFT: u8 = 1;
pub(crate) const UP: u8 = 2;
pub(crate) const STOP: u8 = 3;

#[inline]
pub(crate) fn pack(best: u8, left_from: u8, up_from: u8) -> u8 {
    best | (left_from << 2) | (up_from << 4)
}

#[inline]
pub(crate) fn best_state(byte: u8) -> u8 {
    byte & 0b11
}

#[inline]
fn left_from(byte: u8) -> u8 {
    (byte >> 2) & 0b11
}

#[inline]
fn up_from(byte: u8) -> u8 {
    (byte >> 4) & 0b11
}

/// Gap open and extend penalties; the simple model uses one value for both
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GapCosts {
    pub open: f32,
    pub extend: f32,
}

impl GapCosts {
    pub fn simple(gap: f32) -> Self {
        Self { open: gap, extend: gap }
    }

    pub fn affine(open: f32, extend: f32) -> Self {
        Self { open, extend }
    }

    /// Terminal gaps pay half price
    pub fn terminal(&self) -> Self {
        Self {
            open: self.open / 2.0,
            extend: self.extend / 2.0,
        }
    }

    /// Cost of `count` leading gaps
    pub fn leading(&self, count: usize) -> f32 {
        if count == 0 {
            return 0.0;
        }
        let terminal = self.terminal();
        terminal.open + terminal.extend * (count - 1) as f32
    }
}

/// Highest cell seen so far; ties keep the smaller cell index
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BestCell {
    pub score: f32,
    pub cell: usize,
}

impl BestCell {
    pub const NONE: BestCell = BestCell {
        score: 0.0,
        cell: usize::MAX,
    };

    /// Cells must be offered in increasing index order
    #[inline]
    pub fn offer(&mut self, score: f32, cell: usize) {
        if score > self.score {
            self.score = score;
            self.cell = cell;
        }
    }

    pub fn better(self, other: BestCell) -> BestCell {
        if other.score > self.score || (other.score == self.score && other.cell < self.cell) {
            other
        } else {
            self
        }
    }

    pub fn position(&self, n_rows: usize) -> Option<(usize, usize)> {
        (self.cell != usize::MAX).then(|| (self.cell / n_rows, self.cell % n_rows))
    }
}

/// Global or local flavour of the dynamic programme
pub(crate) trait DpAlgorithm: Sync {
    /// Value of the boundary cell `count` steps from the origin, `None` when
    /// the boundary is a free start
    fn boundary(&self, count: usize, gaps: &GapCosts) -> Option<f32>;

    /// Whether a cell with best value `best` starts the path afresh
    fn stops(&self, best: f32) -> bool;

    fn traceback_start(&self, n_cols: usize, n_rows: usize, best: &BestCell) -> Option<(usize, usize)>;

    fn final_score(&self, corner: f32, best: &BestCell) -> f32;
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct NeedlemanWunsch;

impl DpAlgorithm for NeedlemanWunsch {
    fn boundary(&self, count: usize, gaps: &GapCosts) -> Option<f32> {
        Some(gaps.leading(count))
    }

    fn stops(&self, _best: f32) -> bool {
        false
    }

    fn traceback_start(&self, n_cols: usize, n_rows: usize, _best: &BestCell) -> Option<(usize, usize)> {
        Some((n_cols - 1, n_rows - 1))
    }

    fn final_score(&self, corner: f32, _best: &BestCell) -> f32 {
        corner
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SmithWaterman;

impl DpAlgorithm for SmithWaterman {
    fn boundary(&self, _count: usize, _gaps: &GapCosts) -> Option<f32> {
        None
    }

    fn stops(&self, best: f32) -> bool {
        best <= 0.0
    }

    fn traceback_start(&self, _n_cols: usize, n_rows: usize, best: &BestCell) -> Option<(usize, usize)> {
        best.position(n_rows)
    }

    fn final_score(&self, _corner: f32, best: &BestCell) -> f32 {
        best.score
    }
}

/// Alignment path between two profiles
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Path {
    pub aligned_a: Vec<isize>,
    pub aligned_b: Vec<isize>,
    /// Columns of A covered by the path, `start..end`
    pub a_range: (usize, usize),
    pub b_range: (usize, usize),
}

impl Path {
    /// Attach the residues the path skipped (local alignments) as gapped
    /// overhangs, leading A then leading B, trailing A then trailing B.
    pub fn with_overhangs(self, len_a: usize, len_b: usize) -> (Vec<isize>, Vec<isize>) {
        let (a_start, a_end) = self.a_range;
        let (b_start, b_end) = self.b_range;
        let total = self.aligned_a.len() + a_start + b_start + (len_a - a_end) + (len_b - b_end);
        let mut aligned_a = Vec::with_capacity(total);
        let mut aligned_b = Vec::with_capacity(total);

        for i in 0..a_start {
            aligned_a.push(i as isize);
            aligned_b.push(-1);
        }
        for j in 0..b_start {
            aligned_a.push(-1);
            aligned_b.push(j as isize);
        }
        aligned_a.extend_from_slice(&self.aligned_a);
        aligned_b.extend_from_slice(&self.aligned_b);
        for i in a_end..len_a {
            aligned_a.push(i as isize);
            aligned_b.push(-1);
        }
        for j in b_end..len_b {
            aligned_a.push(-1);
            aligned_b.push(j as isize);
        }
        (aligned_a, aligned_b)
    }
}

/// One cell recurrence plus its traceback, driven by `serial::fill` or `parallel::fill`
pub(crate) trait Recurrence: Sync {
    type Cell: Copy + Send + Sync;

    const EMPTY: Self::Cell;
    const AFFINE: bool;

    /// Boundary cell `count` steps from the origin along row 0 (`LEFT`) or column 0 (`UP`)
    fn boundary(&self, count: usize, along: u8) -> (Self::Cell, u8);

    /// Interior cell `(col, row)`, both at least 1
    fn cell(&self, col: usize, row: usize, diag: Self::Cell, up: Self::Cell, left: Self::Cell) -> (Self::Cell, u8);

    /// Best value held by a cell
    fn value(cell: &Self::Cell) -> f32;

    fn traceback(traceback: &[u8], n_rows: usize, start: (usize, usize)) -> Path;
}

/// Single gap penalty recurrence
pub(crate) struct SimpleRecurrence<'a, A> {
    algorithm: &'a A,
    scorer: &'a ProfileScorer<'a>,
    gaps: GapCosts,
    terminal: GapCosts,
    last_col: usize,
    last_row: usize,
}

impl<'a, A: DpAlgorithm> SimpleRecurrence<'a, A> {
    pub fn new(algorithm: &'a A, scorer: &'a ProfileScorer<'a>, gap: f32, n_cols: usize, n_rows: usize) -> Self {
        let gaps = GapCosts::simple(gap);
        Self {
            algorithm,
            scorer,
            gaps,
            terminal: gaps.terminal(),
            last_col: n_cols - 1,
            last_row: n_rows - 1,
        }
    }
}

impl<A: DpAlgorithm> Recurrence for SimpleRecurrence<'_, A> {
    type Cell = f32;

    const EMPTY: f32 = 0.0;
    const AFFINE: bool = false;

    fn boundary(&self, count: usize, along: u8) -> (f32, u8) {
        match self.algorithm.boundary(count, &self.gaps) {
            None => (0.0, STOP),
            Some(value) if count == 0 => (value, MATCH),
            Some(value) => (value, along),
        }
    }

    #[inline]
    fn cell(&self, col: usize, row: usize, diag: f32, up: f32, left: f32) -> (f32, u8) {
        let up_gap = if col == self.last_col { self.terminal.extend } else { self.gaps.extend };
        let left_gap = if row == self.last_row { self.terminal.extend } else { self.gaps.extend };

        let mut best = diag + self.scorer.score(col - 1, row - 1);
        let mut state = MATCH;
        let candidate = up + up_gap;
        if candidate > best {
            best = candidate;
            state = UP;
        }
        let candidate = left + left_gap;
        if candidate > best {
            best = candidate;
            state = LEFT;
        }
        if self.algorithm.stops(best) {
            (0.0, STOP)
        } else {
            (best, state)
        }
    }

    #[inline]
    fn value(cell: &f32) -> f32 {
        *cell
    }

    fn traceback(traceback: &[u8], n_rows: usize, start: (usize, usize)) -> Path {
        let (mut i, mut j) = start;
        let mut pairs: Vec<(isize, isize)> = Vec::new();
        while i > 0 || j > 0 {
            match best_state(traceback[i * n_rows + j]) {
                MATCH if i > 0 && j > 0 => {
                    pairs.push(((i - 1) as isize, (j - 1) as isize));
                    i -= 1;
                    j -= 1;
                }
                UP if j > 0 => {
                    pairs.push((-1, (j - 1) as isize));
                    j -= 1;
                }
                LEFT if i > 0 => {
                    pairs.push(((i - 1) as isize, -1));
                    i -= 1;
                }
                _ => break,
            }
        }
        finish_path(pairs, (i, j), start)
    }
}

/// Three-state scores of one affine cell: match, left gap (`x`), up gap (`y`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AffineCell {
    pub m: f32,
    pub x: f32,
    pub y: f32,
}

impl AffineCell {
    const STOPPED: AffineCell = AffineCell {
        m: 0.0,
        x: f32::NEG_INFINITY,
        y: f32::NEG_INFINITY,
    };

    #[inline]
    fn best(&self) -> (f32, u8) {
        let (mut value, mut state) = (self.m, MATCH);
        if self.y > value {
            value = self.y;
            state = UP;
        }
        if self.x > value {
            value = self.x;
            state = LEFT;
        }
        (value, state)
    }
}

/// Gotoh recurrence with open and extend penalties
pub(crate) struct AffineRecurrence<'a, A> {
    algorithm: &'a A,
    scorer: &'a ProfileScorer<'a>,
    gaps: GapCosts,
    terminal: GapCosts,
    last_col: usize,
    last_row: usize,
}

impl<'a, A: DpAlgorithm> AffineRecurrence<'a, A> {
    pub fn new(
        algorithm: &'a A,
        scorer: &'a ProfileScorer<'a>,
        open: f32,
        extend: f32,
        n_cols: usize,
        n_rows: usize,
    ) -> Self {
        let gaps = GapCosts::affine(open, extend);
        Self {
            algorithm,
            scorer,
            gaps,
            terminal: gaps.terminal(),
            last_col: n_cols - 1,
            last_row: n_rows - 1,
        }
    }
}

impl<A: DpAlgorithm> Recurrence for AffineRecurrence<'_, A> {
    type Cell = AffineCell;

    const EMPTY: AffineCell = AffineCell::STOPPED;
    const AFFINE: bool = true;

    fn boundary(&self, count: usize, along: u8) -> (AffineCell, u8) {
        match self.algorithm.boundary(count, &self.gaps) {
            None => (AffineCell::STOPPED, pack(STOP, MATCH, MATCH)),
            Some(_) if count == 0 => (
                AffineCell {
                    m: 0.0,
                    x: f32::NEG_INFINITY,
                    y: f32::NEG_INFINITY,
                },
                pack(MATCH, MATCH, MATCH),
            ),
            Some(value) => {
                let from = if count == 1 { MATCH } else { along };
                if along == LEFT {
                    let cell = AffineCell {
                        m: f32::NEG_INFINITY,
                        x: value,
                        y: f32::NEG_INFINITY,
                    };
                    (cell, pack(LEFT, from, MATCH))
                } else {
                    let cell = AffineCell {
                        m: f32::NEG_INFINITY,
                        x: f32::NEG_INFINITY,
                        y: value,
                    };
                    (cell, pack(UP, MATCH, from))
                }
            }
        }
    }

    #[inline]
    fn cell(&self, col: usize, row: usize, diag: AffineCell, up: AffineCell, left: AffineCell) -> (AffineCell, u8) {
        let horizontal = if row == self.last_row { &self.terminal } else { &self.gaps };
        let vertical = if col == self.last_col { &self.terminal } else { &self.gaps };

        let m = diag.best().0 + self.scorer.score(col - 1, row - 1);

        let (mut x, mut x_from) = (left.m + horizontal.open, MATCH);
        let candidate = left.y + horizontal.open;
        if candidate > x {
            x = candidate;
            x_from = UP;
        }
        let candidate = left.x + horizontal.extend;
        if candidate > x {
            x = candidate;
            x_from = LEFT;
        }

        let (mut y, mut y_from) = (up.m + vertical.open, MATCH);
        let candidate = up.y + vertical.extend;
        if candidate > y {
            y = candidate;
            y_from = UP;
        }
        let candidate = up.x + vertical.open;
        if candidate > y {
            y = candidate;
            y_from = LEFT;
        }

        let cell = AffineCell { m, x, y };
        let (best, state) = cell.best();
        if self.algorithm.stops(best) {
            (AffineCell::STOPPED, pack(STOP, x_from, y_from))
        } else {
            (cell, pack(state, x_from, y_from))
        }
    }

    #[inline]
    fn value(cell: &AffineCell) -> f32 {
        cell.best().0
    }

    fn traceback(traceback: &[u8], n_rows: usize, start: (usize, usize)) -> Path {
        let (mut i, mut j) = start;
        let mut state = best_state(traceback[i * n_rows + j]);
        let mut pairs: Vec<(isize, isize)> = Vec::new();

        while (i > 0 || j > 0) && state != STOP {
            let byte = traceback[i * n_rows + j];
            match state {
                MATCH if i > 0 && j > 0 => {
                    pairs.push(((i - 1) as isize, (j - 1) as isize));
                    i -= 1;
                    j -= 1;
                    state = best_state(traceback[i * n_rows + j]);
                }
                LEFT if i > 0 => {
                    pairs.push(((i - 1) as isize, -1));
                    i -= 1;
                    state = left_from(byte);
                }
                UP if j > 0 => {
                    pairs.push((-1, (j - 1) as isize));
                    j -= 1;
                    state = up_from(byte);
                }
                _ => break,
            }
            // a match state on a cell that restarted the path ends a local alignment
            if state == MATCH && best_state(traceback[i * n_rows + j]) == STOP {
                break;
            }
        }
        finish_path(pairs, (i, j), start)
    }
}

fn finish_path(mut pairs: Vec<(isize, isize)>, end: (usize, usize), start: (usize, usize)) -> Path {
    pairs.reverse();
    let (aligned_a, aligned_b) = pairs.into_iter().unzip();
    Path {
        aligned_a,
        aligned_b,
        a_range: (end.0, start.0),
        b_range: (end.1, start.1),
    }
}
