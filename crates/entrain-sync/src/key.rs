//! Identifiers for sessions, slots and conditions.

use std::fmt;

use crate::error::SyncError;

/// A participant position within a cohort. Wraps a 1-based slot number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticipantSlot(usize);

impl ParticipantSlot {
    /// Create a slot from its 1-based number.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SyncError::InvalidSlot`] | `number` is zero |
    pub fn new(number: usize) -> Result<Self, SyncError> {
        if number == 0 {
            return Err(SyncError::InvalidSlot { number });
        }
        Ok(Self(number))
    }

    /// Return the 1-based slot number.
    #[must_use]
    pub fn number(self) -> usize {
        self.0
    }

    /// Return the 0-based position of this slot in per-slot vectors.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 - 1
    }

    /// Iterate slots `1..=count` in order.
    pub fn all(count: usize) -> impl Iterator<Item = ParticipantSlot> {
        (1..=count).map(ParticipantSlot)
    }
}

impl fmt::Display for ParticipantSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Px{}", self.0)
    }
}

/// A recording condition: one day crossed with one script.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Condition {
    /// Day label, e.g. `Day 1`.
    pub day: String,
    /// Script label, e.g. `SCRIPT 6 (STIM)`.
    pub script: String,
}

impl Condition {
    pub fn new(day: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            day: day.into(),
            script: script.into(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.day, self.script)
    }
}

/// One condition of one cohort; the unit of aggregation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CohortCondition {
    pub cohort: String,
    pub condition: Condition,
}

impl CohortCondition {
    pub fn new(cohort: impl Into<String>, condition: Condition) -> Self {
        Self {
            cohort: cohort.into(),
            condition,
        }
    }
}

impl fmt::Display for CohortCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.cohort, self.condition)
    }
}

/// Identifies a single participant-versus-model session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionKey {
    pub cohort_condition: CohortCondition,
    pub slot: ParticipantSlot,
}

impl SessionKey {
    #[must_use]
    pub fn new(cohort_condition: CohortCondition, slot: ParticipantSlot) -> Self {
        Self {
            cohort_condition,
            slot,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.cohort_condition, self.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_zero_rejected() {
        assert!(matches!(
            ParticipantSlot::new(0),
            Err(SyncError::InvalidSlot { number: 0 })
        ));
    }

    #[test]
    fn slot_label_and_index() {
        let slot = ParticipantSlot::new(2).unwrap();
        assert_eq!(slot.to_string(), "Px2");
        assert_eq!(slot.number(), 2);
        assert_eq!(slot.index(), 1);
    }

    #[test]
    fn all_slots_in_order() {
        let labels: Vec<String> = ParticipantSlot::all(3).map(|s| s.to_string()).collect();
        assert_eq!(labels, ["Px1", "Px2", "Px3"]);
    }

    #[test]
    fn key_display() {
        let cc = CohortCondition::new("Group A", Condition::new("Day 1", "SCRIPT 6 (STIM)"));
        let key = SessionKey::new(cc, ParticipantSlot::new(1).unwrap());
        assert_eq!(key.to_string(), "Group A / Day 1 / SCRIPT 6 (STIM) / Px1");
    }

    #[test]
    fn keys_order_by_condition_then_slot() {
        let cc = CohortCondition::new("A", Condition::new("Day 1", "S"));
        let k1 = SessionKey::new(cc.clone(), ParticipantSlot::new(1).unwrap());
        let k2 = SessionKey::new(cc, ParticipantSlot::new(2).unwrap());
        assert!(k1 < k2);
    }
}
