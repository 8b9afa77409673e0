//! Error type for lag extraction, session assembly and aggregation.

use entrain_dtw::{DtwError, FrameTiming};

use crate::key::{CohortCondition, ParticipantSlot};

/// Errors from lag extraction, session assembly and aggregation.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Returned when a lag series is requested for a path with no steps.
    #[error("cannot extract lag from an empty warping path")]
    EmptyPath,

    /// Returned when participant and model frames were extracted with
    /// different hop lengths or sample rates.
    #[error("participant timing ({participant}) differs from model timing ({model})")]
    TimingMismatch {
        /// Timing of the participant sequence.
        participant: FrameTiming,
        /// Timing of the model sequence.
        model: FrameTiming,
    },

    /// Returned when a record from another condition is passed to aggregation.
    #[error("record for {found} cannot be aggregated into {expected}")]
    ConditionMismatch {
        /// The condition being aggregated.
        expected: CohortCondition,
        /// The condition the record belongs to.
        found: CohortCondition,
    },

    /// Returned when a record's slot exceeds the configured slot count.
    #[error("slot {slot} is outside the {slot_count} configured participant slots")]
    SlotOutOfRange {
        /// The offending slot.
        slot: ParticipantSlot,
        /// Number of configured slots.
        slot_count: usize,
    },

    /// Returned when a participant slot number is zero.
    #[error("participant slots are 1-based, got {number}")]
    InvalidSlot {
        /// The rejected slot number.
        number: usize,
    },

    /// Wraps an alignment error.
    #[error("alignment failed: {0}")]
    Dtw(#[from] DtwError),
}
