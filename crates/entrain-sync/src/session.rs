//! Session records: one aligned participant/model pair and its lag series.

use entrain_dtw::{Aligner, AlignmentResult, FeatureSequence, FrameTiming};
use tracing::{info, instrument};

use crate::error::SyncError;
use crate::key::SessionKey;
use crate::lag::{LagSeries, extract_lag};

/// Result of aligning one participant against the model for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    key: SessionKey,
    alignment: AlignmentResult,
    lag: LagSeries,
}

impl SessionRecord {
    /// Align `participant` against `model` and derive the lag series.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SyncError::TimingMismatch`] | The sequences have different frame timing |
    /// | [`SyncError::Dtw`] | Alignment rejected the inputs |
    #[instrument(skip_all, fields(session = %key, n = participant.len(), m = model.len()))]
    pub fn compute<A: Aligner + ?Sized>(
        key: SessionKey,
        participant: &FeatureSequence,
        model: &FeatureSequence,
        aligner: &A,
    ) -> Result<Self, SyncError> {
        if participant.timing() != model.timing() {
            return Err(SyncError::TimingMismatch {
                participant: participant.timing(),
                model: model.timing(),
            });
        }

        let alignment = aligner.align(participant.as_view(), model.as_view())?;
        let record = Self::from_alignment(key, alignment, participant.timing())?;
        info!(
            distance = record.alignment.distance.value(),
            path_len = record.alignment.path.len(),
            lag_samples = record.lag.len(),
            "session aligned"
        );
        Ok(record)
    }

    /// Rebuild a record from a stored distance and path.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SyncError::EmptyPath`] | The stored path has no steps |
    pub fn from_alignment(
        key: SessionKey,
        alignment: AlignmentResult,
        timing: FrameTiming,
    ) -> Result<Self, SyncError> {
        let lag = extract_lag(&alignment.path, timing)?;
        Ok(Self {
            key,
            alignment,
            lag,
        })
    }

    #[must_use]
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    #[must_use]
    pub fn alignment(&self) -> &AlignmentResult {
        &self.alignment
    }

    #[must_use]
    pub fn lag(&self) -> &LagSeries {
        &self.lag
    }
}

#[cfg(test)]
mod tests {
    use entrain_dtw::{DtwDistance, FastDtw, WarpingPath, WarpingStep};

    use super::*;
    use crate::key::{CohortCondition, Condition, ParticipantSlot};

    fn key() -> SessionKey {
        SessionKey::new(
            CohortCondition::new("A", Condition::new("Day 1", "S6")),
            ParticipantSlot::new(1).unwrap(),
        )
    }

    fn seq(values: &[f64], timing: FrameTiming) -> FeatureSequence {
        FeatureSequence::new(values.iter().map(|&v| vec![v]).collect(), timing).unwrap()
    }

    #[test]
    fn identical_sequences_have_zero_lag() {
        let timing = FrameTiming::new(110, 22050).unwrap();
        let a = seq(&[0.0, 1.0, 2.0], timing);
        let record = SessionRecord::compute(key(), &a, &a, &FastDtw::new(1).unwrap()).unwrap();
        assert_eq!(record.alignment().distance.value(), 0.0);
        assert_eq!(record.lag().len(), 3);
        assert!(record.lag().samples().iter().all(|s| s.lag_seconds == 0.0));
        assert_eq!(record.key(), &key());
    }

    #[test]
    fn constant_value_offset_gives_zero_lag() {
        // Lag measures index offset, not feature distance.
        let timing = FrameTiming::new(110, 22050).unwrap();
        let a = seq(&[0.0; 6], timing);
        let b = seq(&[5.0; 6], timing);
        let record = SessionRecord::compute(key(), &a, &b, &FastDtw::new(1).unwrap()).unwrap();
        assert!((record.alignment().distance.value() - 30.0).abs() < 1e-12);
        assert!(record.lag().samples().iter().all(|s| s.lag_seconds == 0.0));
    }

    #[test]
    fn timing_mismatch_rejected() {
        let a = seq(&[0.0, 1.0], FrameTiming::new(110, 22050).unwrap());
        let b = seq(&[0.0, 1.0], FrameTiming::new(512, 22050).unwrap());
        let result = SessionRecord::compute(key(), &a, &b, &FastDtw::new(1).unwrap());
        assert!(matches!(result, Err(SyncError::TimingMismatch { .. })));
    }

    #[test]
    fn dimension_mismatch_wrapped() {
        let timing = FrameTiming::new(110, 22050).unwrap();
        let a = FeatureSequence::new(vec![vec![0.0, 0.0]], timing).unwrap();
        let b = seq(&[0.0], timing);
        let result = SessionRecord::compute(key(), &a, &b, &FastDtw::new(1).unwrap());
        assert!(matches!(result, Err(SyncError::Dtw(_))));
    }

    #[test]
    fn rebuilt_from_stored_alignment() {
        let alignment = AlignmentResult {
            distance: DtwDistance::new(1.5).unwrap(),
            path: WarpingPath::from_steps(vec![WarpingStep::new(0, 0), WarpingStep::new(1, 2)])
                .unwrap(),
        };
        let timing = FrameTiming::new(1, 10).unwrap();
        let record = SessionRecord::from_alignment(key(), alignment, timing).unwrap();
        assert_eq!(record.lag().len(), 2);
        assert!((record.lag().samples()[1].lag_seconds - 0.1).abs() < 1e-12);
    }
}
