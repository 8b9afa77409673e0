//! Approximate multiresolution DTW (FastDTW).

use tracing::{debug, instrument};

use crate::coarsen::halve;
use crate::distance::DtwDistance;
use crate::dtw::dtw_windowed;
use crate::error::DtwError;
use crate::metric::{Euclidean, LocalDistance};
use crate::path::WarpingPath;
use crate::result::{check_inputs, AlignmentResult, Aligner};
use crate::series::FeatureView;
use crate::window::SearchWindow;

/// Approximate DTW in near-linear time (Salvador & Chan, 2007).
///
/// Both sequences are repeatedly halved until they are shorter than
/// `radius + 2` frames. The coarsest pair is aligned exactly, then each finer
/// level is solved exactly inside a window of `radius` cells around the
/// projection of the coarser path. Larger radii trade speed for accuracy and
/// converge to [`ExactDtw`](crate::ExactDtw).
///
/// The pyramid is built and solved iteratively, so recursion depth is not a
/// concern for long recordings. The returned path is always a valid warping
/// path; only its optimality is approximate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastDtw<M = Euclidean> {
    radius: usize,
    metric: M,
}

impl FastDtw<Euclidean> {
    /// Create an approximate aligner with Euclidean local distance.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::InvalidRadius`] | `radius` is zero |
    pub fn new(radius: usize) -> Result<Self, DtwError> {
        if radius == 0 {
            return Err(DtwError::InvalidRadius { radius });
        }
        Ok(Self {
            radius,
            metric: Euclidean,
        })
    }
}

impl<M> FastDtw<M> {
    /// Replace the local distance function.
    #[must_use]
    pub fn with_metric<N>(self, metric: N) -> FastDtw<N> {
        FastDtw {
            radius: self.radius,
            metric,
        }
    }

    /// Return the search radius.
    #[must_use]
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Return the local distance function.
    #[must_use]
    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// Below this length (in both sequences) the exact DP is used directly.
    fn min_size(&self) -> usize {
        self.radius + 2
    }
}

impl<M: LocalDistance> Aligner for FastDtw<M> {
    #[instrument(skip(self, a, b), fields(n = a.len(), m = b.len(), radius = self.radius))]
    fn align(&self, a: FeatureView<'_>, b: FeatureView<'_>) -> Result<AlignmentResult, DtwError> {
        check_inputs(a, b)?;
        let width = a.width();
        let min_size = self.min_size();

        // levels[k] holds the pair halved k + 1 times.
        let mut levels: Vec<(Vec<f64>, Vec<f64>)> = Vec::new();
        loop {
            let (la, lb) = match levels.last() {
                Some((x, y)) => (x.len() / width, y.len() / width),
                None => (a.len(), b.len()),
            };
            if la < min_size && lb < min_size {
                break;
            }
            let next = match levels.last() {
                Some((x, y)) => (halve(x, width), halve(y, width)),
                None => (halve(a.as_flat(), width), halve(b.as_flat(), width)),
            };
            levels.push(next);
        }

        let depth = levels.len();
        let (ca, cb) = level_views(a, b, &levels, depth);
        let (mut cost, mut steps) = dtw_windowed(
            ca,
            cb,
            &SearchWindow::full(ca.len(), cb.len()),
            &self.metric,
        );
        debug!(depth, coarse_n = ca.len(), coarse_m = cb.len(), "coarsest level solved");

        for level in (0..depth).rev() {
            let (fa, fb) = level_views(a, b, &levels, level);
            let coarse = WarpingPath::new(steps);
            let window = SearchWindow::around_coarse_path(&coarse, self.radius, fa.len(), fb.len());
            (cost, steps) = dtw_windowed(fa, fb, &window, &self.metric);
            debug!(level, cells = window.cell_count(), cost, "level refined");
        }

        Ok(AlignmentResult {
            distance: DtwDistance::new_unchecked(cost),
            path: WarpingPath::new(steps),
        })
    }
}

/// Views of the pair at pyramid `depth`; depth 0 is the input itself.
fn level_views<'a>(
    a: FeatureView<'a>,
    b: FeatureView<'a>,
    levels: &'a [(Vec<f64>, Vec<f64>)],
    depth: usize,
) -> (FeatureView<'a>, FeatureView<'a>) {
    match depth.checked_sub(1) {
        None => (a, b),
        Some(k) => {
            let (x, y) = &levels[k];
            (
                FeatureView::new_unchecked(x, a.width()),
                FeatureView::new_unchecked(y, b.width()),
            )
        }
    }
}
