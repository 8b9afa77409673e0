//! Exact and multiresolution DTW alignment of feature-frame sequences.
//!
//! Pure math library, zero I/O. Provides validated multichannel feature
//! sequences, pluggable local distances, exact DTW with path traceback and
//! the approximate FastDTW algorithm that refines a coarse alignment inside
//! a bounded search window.

mod coarsen;
mod distance;
mod dtw;
mod error;
mod fast;
mod metric;
mod path;
mod result;
mod series;
mod timing;
mod window;

pub use distance::DtwDistance;
pub use dtw::ExactDtw;
pub use error::DtwError;
pub use fast::FastDtw;
pub use metric::{Euclidean, LocalDistance, Manhattan, Metric, UnknownMetric};
pub use path::{WarpingPath, WarpingStep};
pub use result::{AlignmentResult, Aligner};
pub use series::{FeatureSequence, FeatureView};
pub use timing::FrameTiming;
pub use window::SearchWindow;
