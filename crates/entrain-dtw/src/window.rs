//! Search windows restricting which cost-matrix cells the DP may visit.

use std::ops::Range;

use crate::path::WarpingPath;

/// Set of admissible cost-matrix cells, stored as one contiguous column range per row.
///
/// Every window built here is monotone and connected: row starts and ends never
/// decrease, each row overlaps the reachable part of the row above, the first
/// row starts at column 0 and the last row ends at the last column. A monotone
/// path from `(0, 0)` to `(n_rows - 1, n_cols - 1)` therefore always exists
/// inside the window.
///
/// Cells are addressed compactly: cell `(i, j)` lives at
/// `offsets[i] + (j - rows[i].start)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchWindow {
    n_cols: usize,
    rows: Vec<Range<usize>>,
    offsets: Vec<usize>,
}

impl SearchWindow {
    /// Window covering the entire `n_rows x n_cols` matrix.
    #[must_use]
    pub fn full(n_rows: usize, n_cols: usize) -> Self {
        debug_assert!(n_rows > 0 && n_cols > 0);
        Self::from_rows(vec![0..n_cols; n_rows], n_cols)
    }

    /// Window around a path found at half resolution.
    ///
    /// Each coarse step `(a, b)` covers the full-resolution block
    /// `[2a, 2a+1] x [2b, 2b+1]`, widened by `radius` cells on every side and
    /// clamped to the matrix. Rows take the hull of the blocks that cover them.
    #[must_use]
    pub fn around_coarse_path(
        coarse: &WarpingPath,
        radius: usize,
        n_rows: usize,
        n_cols: usize,
    ) -> Self {
        debug_assert!(n_rows > 0 && n_cols > 0);
        let mut starts = vec![usize::MAX; n_rows];
        let mut ends = vec![0usize; n_rows];

        for step in coarse {
            let row_lo = (2 * step.a).saturating_sub(radius);
            let col_lo = (2 * step.b).saturating_sub(radius);
            debug_assert!(row_lo < n_rows && col_lo < n_cols, "coarse path out of range");
            let row_hi = (2 * step.a + 1 + radius).min(n_rows - 1);
            let col_end = (2 * step.b + 2 + radius).min(n_cols);

            for row in row_lo..=row_hi {
                starts[row] = starts[row].min(col_lo);
                ends[row] = ends[row].max(col_end);
            }
        }

        let rows = repair(starts, ends, n_cols);
        Self::from_rows(rows, n_cols)
    }

    fn from_rows(rows: Vec<Range<usize>>, n_cols: usize) -> Self {
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        let mut total = 0;
        offsets.push(0);
        for r in &rows {
            total += r.len();
            offsets.push(total);
        }
        Self {
            n_cols,
            rows,
            offsets,
        }
    }

    /// Return the number of matrix rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Return the number of matrix columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Return the admissible column range for `row`.
    #[must_use]
    pub fn column_range(&self, row: usize) -> Range<usize> {
        self.rows[row].clone()
    }

    /// Return the total number of admissible cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.offsets[self.rows.len()]
    }

    /// Return true if `(row, col)` is admissible.
    #[must_use]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.rows.len() && self.rows[row].contains(&col)
    }

    /// Return the compact storage index of `(row, col)`, or `None` outside the window.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<usize> {
        if self.contains(row, col) {
            Some(self.offsets[row] + col - self.rows[row].start)
        } else {
            None
        }
    }
}

/// Turn raw per-row hulls into a monotone, connected window.
///
/// Only ever widens rows, so the cells covered by the coarse projection stay
/// admissible. Rows the projection missed (`start == usize::MAX`) inherit
/// their neighbours' extent.
fn repair(mut starts: Vec<usize>, mut ends: Vec<usize>, n_cols: usize) -> Vec<Range<usize>> {
    let n = starts.len();
    starts[0] = 0;
    ends[n - 1] = n_cols;
    starts[n - 1] = starts[n - 1].min(n_cols - 1);

    // Starts non-decreasing.
    for i in (0..n - 1).rev() {
        starts[i] = starts[i].min(starts[i + 1]);
    }

    // Ends non-decreasing; every row reachable from the one above and non-empty.
    ends[0] = ends[0].max(1);
    for i in 1..n {
        ends[i] = ends[i].max(ends[i - 1]);
        if starts[i] > ends[i - 1] {
            starts[i] = ends[i - 1];
        }
        ends[i] = ends[i].max(starts[i] + 1).min(n_cols);
    }

    starts
        .into_iter()
        .zip(ends)
        .map(|(s, e)| s..e)
        .collect()
}
