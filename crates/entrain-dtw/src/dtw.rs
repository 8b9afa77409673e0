//! Exact DTW over a full or windowed cost matrix.

use tracing::instrument;

use crate::distance::DtwDistance;
use crate::error::DtwError;
use crate::metric::{Euclidean, LocalDistance};
use crate::path::{WarpingPath, WarpingStep};
use crate::result::{check_inputs, AlignmentResult, Aligner};
use crate::series::FeatureView;
use crate::window::SearchWindow;

/// Predecessor chosen for a cell during the forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    /// From `(i-1, j-1)`.
    Diagonal,
    /// From `(i-1, j)`.
    Up,
    /// From `(i, j-1)`.
    Left,
}

/// Windowed DTW: returns the cumulative cost and the optimal warping path.
///
/// Cells outside `window` are treated as infinite cost. Ties between
/// predecessors resolve in the fixed order diagonal, up, left.
///
/// `window` must be monotone and connected (see [`SearchWindow`]) so that
/// `(n-1, m-1)` is reachable.
pub(crate) fn dtw_windowed<M>(
    a: FeatureView<'_>,
    b: FeatureView<'_>,
    window: &SearchWindow,
    metric: &M,
) -> (f64, Vec<WarpingStep>)
where
    M: LocalDistance + ?Sized,
{
    let n = a.len();
    let m = b.len();
    debug_assert_eq!(window.n_rows(), n);
    debug_assert_eq!(window.n_cols(), m);

    let cells = window.cell_count();
    let mut cost = vec![f64::INFINITY; cells];
    let mut moves = vec![Move::Diagonal; cells];
    let lookup = |cost: &[f64], i: usize, j: usize| window.cell(i, j).map_or(f64::INFINITY, |k| cost[k]);

    for i in 0..n {
        let col_range = window.column_range(i);
        let frame_a = a.frame(i);
        let row_base = window.cell(i, col_range.start).unwrap_or(0);

        for j in col_range.clone() {
            let c = metric.distance(frame_a, b.frame(j));
            let idx = row_base + (j - col_range.start);

            if i == 0 && j == 0 {
                cost[idx] = c;
                continue;
            }

            let diag = if i > 0 && j > 0 {
                lookup(&cost, i - 1, j - 1)
            } else {
                f64::INFINITY
            };
            let up = if i > 0 {
                lookup(&cost, i - 1, j)
            } else {
                f64::INFINITY
            };
            let left = if j > col_range.start {
                cost[idx - 1]
            } else {
                f64::INFINITY
            };

            let (min_val, mv) = if diag <= up && diag <= left {
                (diag, Move::Diagonal)
            } else if up <= left {
                (up, Move::Up)
            } else {
                (left, Move::Left)
            };

            cost[idx] = c + min_val;
            moves[idx] = mv;
        }
    }

    // Traceback from (n-1, m-1) to (0, 0). Every cell on the way is finite, so
    // its recorded move points at an admissible predecessor.
    let mut path = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n - 1, m - 1);
    loop {
        path.push(WarpingStep::new(i, j));
        if i == 0 && j == 0 {
            break;
        }
        let idx = window.cell(i, j).unwrap_or_default();
        match moves[idx] {
            Move::Diagonal => {
                i -= 1;
                j -= 1;
            }
            Move::Up => i -= 1,
            Move::Left => j -= 1,
        }
    }
    path.reverse();

    let last = window.cell(n - 1, m - 1).unwrap_or_default();
    (cost[last], path)
}

/// Exact (full-matrix) DTW. Runs in O(n * m) time.
///
/// Used where the optimal alignment is required, and as the reference the
/// approximate [`FastDtw`](crate::FastDtw) converges to as its radius grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExactDtw<M = Euclidean> {
    metric: M,
}

impl ExactDtw<Euclidean> {
    /// Create an exact DTW aligner using Euclidean local distance.
    #[must_use]
    pub fn new() -> Self {
        Self { metric: Euclidean }
    }
}

impl<M> ExactDtw<M> {
    /// Replace the local distance function.
    #[must_use]
    pub fn with_metric<N>(self, metric: N) -> ExactDtw<N> {
        ExactDtw { metric }
    }

    /// Return the local distance function.
    #[must_use]
    pub fn metric(&self) -> &M {
        &self.metric
    }
}

impl<M: LocalDistance> ExactDtw<M> {
    /// Compute only the DTW distance.
    ///
    /// Uses a rolling two-row buffer rather than the full cost matrix: O(n * m)
    /// time, O(m) space. Each buffer has a leading INF sentinel at index 0 so
    /// column `j` lives at `j + 1`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Aligner::align`].
    #[instrument(skip(self, a, b), fields(n = a.len(), m = b.len()))]
    pub fn distance(&self, a: FeatureView<'_>, b: FeatureView<'_>) -> Result<DtwDistance, DtwError> {
        check_inputs(a, b)?;
        let m = b.len();

        let mut prev = vec![f64::INFINITY; m + 1];
        let mut curr = vec![f64::INFINITY; m + 1];

        for (i, frame_a) in a.frames().enumerate() {
            curr[0] = f64::INFINITY;
            for (j, frame_b) in b.frames().enumerate() {
                let c = self.metric.distance(frame_a, frame_b);
                let best = if i == 0 && j == 0 {
                    0.0
                } else {
                    // diag = prev[j], up = prev[j + 1], left = curr[j]
                    prev[j].min(prev[j + 1]).min(curr[j])
                };
                curr[j + 1] = c + best;
            }
            std::mem::swap(&mut prev, &mut curr);
        }

        // After the final swap, `prev` holds the last completed row.
        Ok(DtwDistance::new_unchecked(prev[m]))
    }
}

impl<M: LocalDistance> Aligner for ExactDtw<M> {
    #[instrument(skip(self, a, b), fields(n = a.len(), m = b.len()))]
    fn align(&self, a: FeatureView<'_>, b: FeatureView<'_>) -> Result<AlignmentResult, DtwError> {
        check_inputs(a, b)?;
        let window = SearchWindow::full(a.len(), b.len());
        let (dist, steps) = dtw_windowed(a, b, &window, &self.metric);
        Ok(AlignmentResult {
            distance: DtwDistance::new_unchecked(dist),
            path: WarpingPath::new(steps),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::Manhattan;

    fn scalar(values: &[f64]) -> Vec<f64> {
        values.to_vec()
    }

    fn view(data: &[f64]) -> FeatureView<'_> {
        FeatureView::new(data, 1).unwrap()
    }

    #[test]
    fn identical_sequences_distance_zero() {
        let a = scalar(&[1.0, 2.0, 3.0]);
        let result = ExactDtw::new().align(view(&a), view(&a)).unwrap();
        assert_eq!(result.distance.value(), 0.0);
        let diag: Vec<_> = (0..3).map(|i| WarpingStep::new(i, i)).collect();
        assert_eq!(result.path.steps(), diag.as_slice());
    }

    #[test]
    fn hand_computed_2x2() {
        // a=[0,1], b=[1,0], |x - y| local cost
        // C[0][0] = 1
        // C[0][1] = 0 + 1 = 1
        // C[1][0] = 0 + 1 = 1
        // C[1][1] = 1 + min(C[0][0], C[0][1], C[1][0]) = 2
        let a = scalar(&[0.0, 1.0]);
        let b = scalar(&[1.0, 0.0]);
        let result = ExactDtw::new().align(view(&a), view(&b)).unwrap();
        assert!((result.distance.value() - 2.0).abs() < 1e-12);
        // Diagonal wins the three-way tie at (1, 1).
        assert_eq!(
            result.path.steps(),
            &[WarpingStep::new(0, 0), WarpingStep::new(1, 1)]
        );
    }

    #[test]
    fn ramp_offset_warps_instead_of_diagonal() {
        // b is a shifted by one value; warping realigns equal values.
        let a = scalar(&[0.0, 1.0, 2.0, 3.0]);
        let b = scalar(&[1.0, 2.0, 3.0, 4.0]);
        let result = ExactDtw::new().align(view(&a), view(&b)).unwrap();
        assert!((result.distance.value() - 2.0).abs() < 1e-12);
        assert_eq!(
            result.path.steps(),
            &[
                WarpingStep::new(0, 0),
                WarpingStep::new(1, 0),
                WarpingStep::new(2, 1),
                WarpingStep::new(3, 2),
                WarpingStep::new(3, 3),
            ]
        );
    }

    #[test]
    fn single_frame_against_many() {
        let a = scalar(&[5.0]);
        let b = scalar(&[3.0, 5.0, 7.0]);
        let result = ExactDtw::new().align(view(&a), view(&b)).unwrap();
        assert!((result.distance.value() - 4.0).abs() < 1e-12);
        assert_eq!(result.path.len(), 3);
        assert!(result.path.steps().iter().all(|s| s.a == 0));
    }

    #[test]
    fn rolling_distance_matches_path_distance() {
        let a = scalar(&[1.0, 3.0, 5.0, 2.0, 0.5]);
        let b = scalar(&[2.0, 4.0, 1.0]);
        let dtw = ExactDtw::new();
        let rolling = dtw.distance(view(&a), view(&b)).unwrap();
        let full = dtw.align(view(&a), view(&b)).unwrap().distance;
        assert_eq!(rolling.value(), full.value());
    }

    #[test]
    fn multichannel_euclidean() {
        // Two 2-D frames per sequence, constant offset (3, 4) → 5 per diagonal step.
        let a = [0.0, 0.0, 1.0, 1.0];
        let b = [3.0, 4.0, 4.0, 5.0];
        let va = FeatureView::new(&a, 2).unwrap();
        let vb = FeatureView::new(&b, 2).unwrap();
        let result = ExactDtw::new().align(va, vb).unwrap();
        assert!((result.distance.value() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn manhattan_metric() {
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        let va = FeatureView::new(&a, 2).unwrap();
        let vb = FeatureView::new(&b, 2).unwrap();
        let dtw = ExactDtw::new().with_metric(Manhattan);
        assert!((dtw.align(va, vb).unwrap().distance.value() - 7.0).abs() < 1e-12);
    }

    #[test]
    fn dimension_mismatch_rejected() {
        let a = [0.0, 0.0];
        let b = [1.0, 2.0, 3.0];
        let va = FeatureView::new(&a, 2).unwrap();
        let vb = FeatureView::new(&b, 3).unwrap();
        let result = ExactDtw::new().align(va, vb);
        assert!(matches!(
            result,
            Err(DtwError::DimensionMismatch {
                participant: 2,
                model: 3
            })
        ));
    }

    #[test]
    fn empty_view_rejected() {
        let a = [1.0];
        let empty = FeatureView::new_unchecked(&[], 1);
        assert!(matches!(
            ExactDtw::new().align(view(&a), empty),
            Err(DtwError::EmptySequence)
        ));
        assert!(matches!(
            ExactDtw::new().distance(empty, view(&a)),
            Err(DtwError::EmptySequence)
        ));
    }

    #[test]
    fn windowed_dp_respects_window() {
        // A narrow diagonal window forbids the cheaper warped path.
        let a = scalar(&[0.0, 1.0, 2.0, 3.0]);
        let b = scalar(&[1.0, 2.0, 3.0, 4.0]);
        let coarse = WarpingPath::new(vec![WarpingStep::new(0, 0), WarpingStep::new(1, 1)]);
        let wide = SearchWindow::around_coarse_path(&coarse, 1, 4, 4);
        let (wide_cost, _) = dtw_windowed(view(&a), view(&b), &wide, &Euclidean);
        assert!((wide_cost - 2.0).abs() < 1e-12);

        let diag_only = SearchWindow::around_coarse_path(&coarse, 0, 4, 4);
        let (narrow_cost, path) = dtw_windowed(view(&a), view(&b), &diag_only, &Euclidean);
        assert!(narrow_cost >= wide_cost);
        for step in &path {
            assert!(diag_only.contains(step.a, step.b));
        }
    }
}
