//! Per-condition aggregation of session records across participant slots.

use entrain_dtw::DtwDistance;
use tracing::{info, instrument, warn};

use crate::error::SyncError;
use crate::key::{CohortCondition, ParticipantSlot};
use crate::lag::LagSeries;
use crate::session::SessionRecord;

/// Distances and lag series of every slot in one condition.
///
/// All per-slot vectors have length `slot_count` and are indexed by
/// [`ParticipantSlot::index`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSummary {
    cohort_condition: CohortCondition,
    distances: Vec<DtwDistance>,
    lags: Vec<LagSeries>,
    present: Vec<bool>,
}

impl ConditionSummary {
    #[must_use]
    pub fn cohort_condition(&self) -> &CohortCondition {
        &self.cohort_condition
    }

    /// Number of slots in the summary.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.distances.len()
    }

    /// Distance per slot; `0` for a missing session.
    #[must_use]
    pub fn distances(&self) -> &[DtwDistance] {
        &self.distances
    }

    /// Lag series per slot; empty for a missing session.
    #[must_use]
    pub fn lags(&self) -> &[LagSeries] {
        &self.lags
    }

    /// Whether each slot had a session.
    #[must_use]
    pub fn present(&self) -> &[bool] {
        &self.present
    }

    /// Iterate `(slot, distance, lag, present)` in slot order.
    pub fn slots(
        &self,
    ) -> impl Iterator<Item = (ParticipantSlot, DtwDistance, &LagSeries, bool)> + '_ {
        ParticipantSlot::all(self.slot_count()).map(move |slot| {
            let i = slot.index();
            (slot, self.distances[i], &self.lags[i], self.present[i])
        })
    }

    /// Number of slots that had a session.
    #[must_use]
    pub fn present_count(&self) -> usize {
        self.present.iter().filter(|&&p| p).count()
    }
}

/// Combine the sessions of one condition into a fixed-width summary.
///
/// Records may arrive in any order. A slot with no record gets distance `0`
/// and an empty lag series, and is flagged as absent. When several records
/// share a slot the first one is kept and the rest are skipped with a warning.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`SyncError::ConditionMismatch`] | A record belongs to another condition |
/// | [`SyncError::SlotOutOfRange`] | A record's slot exceeds `slot_count` |
#[instrument(skip(records), fields(condition = %cohort_condition, n_records = records.len()))]
pub fn aggregate(
    cohort_condition: &CohortCondition,
    records: &[SessionRecord],
    slot_count: usize,
) -> Result<ConditionSummary, SyncError> {
    let mut by_slot: Vec<Option<&SessionRecord>> = vec![None; slot_count];
    for record in records {
        let key = record.key();
        if key.cohort_condition != *cohort_condition {
            return Err(SyncError::ConditionMismatch {
                expected: cohort_condition.clone(),
                found: key.cohort_condition.clone(),
            });
        }
        if key.slot.number() > slot_count {
            return Err(SyncError::SlotOutOfRange {
                slot: key.slot,
                slot_count,
            });
        }
        let entry = &mut by_slot[key.slot.index()];
        if entry.is_some() {
            warn!(slot = %key.slot, "duplicate session record for slot; keeping the first");
            continue;
        }
        *entry = Some(record);
    }

    let mut distances = Vec::with_capacity(slot_count);
    let mut lags = Vec::with_capacity(slot_count);
    let mut present = Vec::with_capacity(slot_count);
    for (slot, record) in ParticipantSlot::all(slot_count).zip(by_slot) {
        match record {
            Some(record) => {
                distances.push(record.alignment().distance);
                lags.push(record.lag().clone());
                present.push(true);
            }
            None => {
                warn!(%slot, "session data missing; substituting zero distance and empty lag");
                distances.push(DtwDistance::ZERO);
                lags.push(LagSeries::empty());
                present.push(false);
            }
        }
    }

    let summary = ConditionSummary {
        cohort_condition: cohort_condition.clone(),
        distances,
        lags,
        present,
    };
    info!(
        present = summary.present_count(),
        slot_count, "condition aggregated"
    );
    Ok(summary)
}
