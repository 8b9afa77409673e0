//! Parallel processing of independent sessions.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{error, info, instrument};

use crate::aggregate::{ConditionSummary, aggregate};
use crate::error::SyncError;
use crate::key::{CohortCondition, SessionKey};
use crate::session::SessionRecord;

/// A session that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFailure {
    pub key: SessionKey,
    /// Rendered error, including any context chain.
    pub message: String,
}

/// Everything produced by [`run_batch`]: successful records and failures,
/// each sorted by session key.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub records: Vec<SessionRecord>,
    pub failures: Vec<SessionFailure>,
}

impl BatchOutcome {
    /// Every condition touched by the batch, whether its sessions succeeded
    /// or failed, in sorted order.
    #[must_use]
    pub fn conditions(&self) -> Vec<CohortCondition> {
        let mut seen: Vec<CohortCondition> = self
            .records
            .iter()
            .map(|r| r.key().cohort_condition.clone())
            .chain(self.failures.iter().map(|f| f.key.cohort_condition.clone()))
            .collect();
        seen.sort();
        seen.dedup();
        seen
    }

    /// Aggregate every condition of the batch.
    ///
    /// A condition whose sessions all failed still yields a summary with
    /// every slot absent. Errors are reported per condition.
    #[instrument(skip(self), fields(n_records = self.records.len()))]
    pub fn summaries(
        &self,
        slot_count: usize,
    ) -> Vec<(CohortCondition, Result<ConditionSummary, SyncError>)> {
        let mut grouped: BTreeMap<CohortCondition, Vec<SessionRecord>> = self
            .conditions()
            .into_iter()
            .map(|cc| (cc, Vec::new()))
            .collect();
        for record in &self.records {
            if let Some(group) = grouped.get_mut(&record.key().cohort_condition) {
                group.push(record.clone());
            }
        }

        grouped
            .into_iter()
            .map(|(cc, records)| {
                let summary = aggregate(&cc, &records, slot_count);
                if let Err(e) = &summary {
                    error!(condition = %cc, error = %e, "aggregation failed");
                }
                (cc, summary)
            })
            .collect()
    }
}

/// Run `process` over every job in parallel.
///
/// Sessions share no state; a failing session is logged and recorded without
/// affecting the rest. Returns once every job has finished.
#[instrument(skip_all, fields(n_jobs = jobs.len()))]
pub fn run_batch<J, E, F>(jobs: Vec<(SessionKey, J)>, process: F) -> BatchOutcome
where
    J: Send,
    E: std::fmt::Display,
    F: Fn(&SessionKey, J) -> Result<SessionRecord, E> + Sync,
{
    let results: Vec<Result<SessionRecord, SessionFailure>> = jobs
        .into_par_iter()
        .map(|(key, job)| {
            process(&key, job).map_err(|e| {
                let message = format!("{e:#}");
                error!(session = %key, error = %message, "session failed");
                SessionFailure { key, message }
            })
        })
        .collect();

    let mut outcome = BatchOutcome::default();
    for result in results {
        match result {
            Ok(record) => outcome.records.push(record),
            Err(failure) => outcome.failures.push(failure),
        }
    }
    outcome.records.sort_by(|a, b| a.key().cmp(b.key()));
    outcome.failures.sort_by(|a, b| a.key.cmp(&b.key));

    info!(
        succeeded = outcome.records.len(),
        failed = outcome.failures.len(),
        "batch complete"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use entrain_dtw::{FastDtw, FeatureSequence, FrameTiming};

    use super::*;
    use crate::key::{Condition, ParticipantSlot};

    fn key(cohort: &str, slot: usize) -> SessionKey {
        SessionKey::new(
            CohortCondition::new(cohort, Condition::new("Day 1", "S6")),
            ParticipantSlot::new(slot).unwrap(),
        )
    }

    fn seq(values: &[f64]) -> FeatureSequence {
        FeatureSequence::new(
            values.iter().map(|&v| vec![v]).collect(),
            FrameTiming::new(110, 22050).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn failures_do_not_abort_other_sessions() {
        let fast = FastDtw::new(1).unwrap();
        let jobs = vec![
            (key("A", 2), (seq(&[0.0, 1.0]), seq(&[0.0, 1.0]))),
            (key("A", 1), (seq(&[0.0, 1.0, 2.0]), seq(&[1.0, 2.0]))),
            (
                key("A", 3),
                (
                    seq(&[0.0]),
                    FeatureSequence::new(
                        vec![vec![0.0]],
                        FrameTiming::new(512, 22050).unwrap(),
                    )
                    .unwrap(),
                ),
            ),
        ];
        let outcome = run_batch(jobs, |key, (p, m)| {
            SessionRecord::compute(key.clone(), &p, &m, &fast)
        });

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].key(), &key("A", 1));
        assert_eq!(outcome.records[1].key(), &key("A", 2));
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].key, key("A", 3));
        assert!(outcome.failures[0].message.contains("timing"));
    }

    #[test]
    fn summaries_cover_every_condition() {
        let fast = FastDtw::new(1).unwrap();
        let jobs = vec![
            (key("A", 1), seq(&[0.0, 1.0])),
            (key("B", 2), seq(&[0.0, 1.0])),
        ];
        let outcome = run_batch(jobs, |key, s| {
            SessionRecord::compute(key.clone(), &s, &s, &fast)
        });
        let summaries = outcome.summaries(3);
        assert_eq!(summaries.len(), 2);

        let (cc_a, summary_a) = &summaries[0];
        assert_eq!(cc_a.cohort, "A");
        assert_eq!(summary_a.as_ref().unwrap().present(), &[true, false, false]);

        let (cc_b, summary_b) = &summaries[1];
        assert_eq!(cc_b.cohort, "B");
        assert_eq!(summary_b.as_ref().unwrap().present(), &[false, true, false]);
    }

    #[test]
    fn fully_failed_condition_still_summarised() {
        let outcome = BatchOutcome {
            records: Vec::new(),
            failures: vec![SessionFailure {
                key: key("C", 1),
                message: "boom".to_string(),
            }],
        };
        let summaries = outcome.summaries(3);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].1.as_ref().unwrap().present_count(), 0);
    }
}
