//! Conversion of a warping path into a per-frame lag signal.

use entrain_dtw::{FrameTiming, WarpingPath, WarpingStep};
use tracing::{debug, instrument};

use crate::error::SyncError;

/// One point of a lag signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagSample {
    /// Participant frame index the sample came from.
    pub participant_frame: usize,
    /// Model frame index matched to `participant_frame`.
    pub model_frame: usize,
    /// Position on the time axis, taken from the model frame.
    pub time_seconds: f64,
    /// Model frame minus participant frame, in seconds. Negative when the
    /// participant trails the model.
    pub lag_seconds: f64,
}

/// Ordered lag samples with strictly increasing participant frames.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LagSeries(Vec<LagSample>);

impl LagSeries {
    /// An empty series, used for slots with no session.
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Build a series from samples loaded elsewhere.
    ///
    /// Samples are trusted to be in participant-frame order.
    #[must_use]
    pub fn from_samples(samples: Vec<LagSample>) -> Self {
        debug_assert!(
            samples
                .windows(2)
                .all(|w| w[0].participant_frame < w[1].participant_frame),
            "lag samples must have strictly increasing participant frames"
        );
        Self(samples)
    }

    #[must_use]
    pub fn samples(&self) -> &[LagSample] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Signed mean lag, or `None` for an empty series.
    #[must_use]
    pub fn mean_lag_seconds(&self) -> Option<f64> {
        self.mean_of(|s| s.lag_seconds)
    }

    /// Mean absolute lag, or `None` for an empty series.
    #[must_use]
    pub fn mean_abs_lag_seconds(&self) -> Option<f64> {
        self.mean_of(|s| s.lag_seconds.abs())
    }

    fn mean_of(&self, f: impl Fn(&LagSample) -> f64) -> Option<f64> {
        if self.0.is_empty() {
            return None;
        }
        Some(self.0.iter().map(f).sum::<f64>() / self.0.len() as f64)
    }
}

impl<'a> IntoIterator for &'a LagSeries {
    type Item = &'a LagSample;
    type IntoIter = std::slice::Iter<'a, LagSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Convert a warping path into a lag series.
///
/// Only the first step for each participant frame is kept, so a participant
/// frame matched to a run of model frames contributes one sample. Each kept
/// step `(a, b)` becomes `time = b * hop / sr` and `lag = (b - a) * hop / sr`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SyncError::EmptyPath`] | `path` has no steps |
#[instrument(skip(path), fields(steps = path.len(), %timing))]
pub fn extract_lag(path: &WarpingPath, timing: FrameTiming) -> Result<LagSeries, SyncError> {
    if path.is_empty() {
        return Err(SyncError::EmptyPath);
    }

    let mut samples: Vec<LagSample> = Vec::with_capacity(path.len());
    let mut last_a: Option<usize> = None;
    for &WarpingStep { a, b } in path {
        if last_a == Some(a) {
            continue;
        }
        last_a = Some(a);
        samples.push(LagSample {
            participant_frame: a,
            model_frame: b,
            time_seconds: timing.frames_to_seconds(b as i64),
            lag_seconds: timing.frames_to_seconds(b as i64 - a as i64),
        });
    }

    debug!(kept = samples.len(), "lag series extracted");
    Ok(LagSeries(samples))
}
