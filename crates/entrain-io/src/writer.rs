//! Per-session and per-condition result writer.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use entrain_sync::{ConditionSummary, SessionRecord};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::config::FileNaming;
use crate::tables::{write_condition_lag, write_distance, write_lag, write_path, write_summary};

/// Files written for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutputs {
    pub distance: PathBuf,
    pub path: PathBuf,
    pub lag: PathBuf,
}

/// Files written for one condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionOutputs {
    pub summary: PathBuf,
    pub lag: PathBuf,
}

/// Writes result tables into one directory using the study's file naming.
///
/// Creates the output directory on construction if it does not exist. Every
/// table is replaced atomically, so rerunning a study overwrites earlier
/// results.
pub struct ResultWriter {
    output_dir: PathBuf,
    naming: FileNaming,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display()))]
    pub fn new(output_dir: &Path, naming: FileNaming) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            naming,
        })
    }

    /// Write the distance, path and lag tables of one session as
    /// `<stem><suffix>` files.
    ///
    /// The distance table marks a complete session: any previous one is
    /// removed first and the new one is written last. A failed rewrite
    /// therefore leaves no distance table, and the session is not picked up
    /// by [`StudyLayout::stored_sessions`](crate::StudyLayout::stored_sessions).
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if a table cannot be written or the
    /// previous distance table cannot be removed.
    #[instrument(skip(self, record), fields(session = %record.key()))]
    pub fn write_session(&self, stem: &str, record: &SessionRecord) -> Result<SessionOutputs, IoError> {
        let naming = &self.naming;
        let outputs = SessionOutputs {
            distance: naming.session_file(&self.output_dir, stem, &naming.distance_suffix),
            path: naming.session_file(&self.output_dir, stem, &naming.path_suffix),
            lag: naming.session_file(&self.output_dir, stem, &naming.lag_suffix),
        };

        match fs::remove_file(&outputs.distance) {
            Ok(()) => debug!("previous distance table removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(IoError::WriteFile {
                    path: outputs.distance.clone(),
                    source: e,
                });
            }
        }
        write_path(&outputs.path, &record.alignment().path)?;
        write_lag(&outputs.lag, record.lag())?;
        write_distance(&outputs.distance, record.alignment().distance)?;

        info!(dir = %self.output_dir.display(), "session results written");
        Ok(outputs)
    }

    /// Write the distance summary and combined lag table of one condition.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if a table cannot be written.
    #[instrument(skip_all, fields(condition = %summary.cohort_condition()))]
    pub fn write_condition(&self, summary: &ConditionSummary) -> Result<ConditionOutputs, IoError> {
        let outputs = ConditionOutputs {
            summary: self.output_dir.join(&self.naming.summary_file),
            lag: self.output_dir.join(&self.naming.condition_lag_file),
        };

        write_summary(&outputs.summary, summary)?;
        write_condition_lag(&outputs.lag, summary)?;

        info!(
            dir = %self.output_dir.display(),
            present = summary.present_count(),
            "condition results written"
        );
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entrain_dtw::{AlignmentResult, DtwDistance, FrameTiming, WarpingPath, WarpingStep};
    use entrain_sync::{CohortCondition, Condition, ParticipantSlot, SessionKey, aggregate};
    use tempfile::TempDir;

    use crate::config::StudyLayout;
    use crate::layout::ConditionDir;
    use crate::tables::{read_distance, read_path};

    fn record(slot: usize, distance: f64) -> SessionRecord {
        let cc = CohortCondition::new("A", Condition::new("Day 1", "S6"));
        let alignment = AlignmentResult {
            distance: DtwDistance::new(distance).unwrap(),
            path: WarpingPath::from_steps(vec![
                WarpingStep::new(0, 0),
                WarpingStep::new(1, 1),
                WarpingStep::new(1, 2),
            ])
            .unwrap(),
        };
        SessionRecord::from_alignment(
            SessionKey::new(cc, ParticipantSlot::new(slot).unwrap()),
            alignment,
            FrameTiming::new(1, 10).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn session_files_named_from_stem() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), FileNaming::default()).unwrap();
        let outputs = writer.write_session("Px1_", &record(1, 2.5)).unwrap();

        assert_eq!(outputs.distance, dir.path().join("Px1_distance.csv"));
        assert_eq!(outputs.path, dir.path().join("Px1_path.csv"));
        assert_eq!(outputs.lag, dir.path().join("Px1_lag.csv"));
        assert_eq!(
            fs::read_to_string(&outputs.path).unwrap(),
            "0,0\n1,1\n1,2\n"
        );
    }

    #[test]
    fn rerun_overwrites_instead_of_appending() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), FileNaming::default()).unwrap();
        writer.write_session("Px1_", &record(1, 2.5)).unwrap();
        let outputs = writer.write_session("Px1_", &record(1, 7.0)).unwrap();

        assert_eq!(
            fs::read_to_string(&outputs.distance).unwrap(),
            "DTW Distance: ,7\n"
        );
        assert_eq!(fs::read_to_string(&outputs.path).unwrap().lines().count(), 3);
    }

    #[test]
    fn failed_rewrite_leaves_no_distance_table() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), FileNaming::default()).unwrap();
        let first = writer.write_session("Px1_", &record(1, 2.5)).unwrap();

        // A directory in place of the lag table makes the rename fail.
        fs::remove_file(&first.lag).unwrap();
        fs::create_dir(&first.lag).unwrap();
        assert!(writer.write_session("Px1_", &record(1, 7.0)).is_err());
        assert!(!first.distance.exists());

        let cond = ConditionDir {
            cohort_condition: record(1, 0.0).key().cohort_condition.clone(),
            path: dir.path().to_path_buf(),
        };
        let stored = StudyLayout::default().stored_sessions(&cond).unwrap();
        assert!(stored.is_empty());
    }

    #[test]
    fn completed_rewrite_reads_back_consistently() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), FileNaming::default()).unwrap();
        writer.write_session("Px1_", &record(1, 2.5)).unwrap();
        let outputs = writer.write_session("Px1_", &record(1, 7.0)).unwrap();

        assert_eq!(read_distance(&outputs.distance).unwrap().value(), 7.0);
        assert_eq!(read_path(&outputs.path).unwrap().len(), 3);
    }

    #[test]
    fn condition_tables() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), FileNaming::default()).unwrap();
        let records = [record(3, 3.25), record(1, 1.5)];
        let cc = records[0].key().cohort_condition.clone();
        let summary = aggregate(&cc, &records, 3).unwrap();
        let outputs = writer.write_condition(&summary).unwrap();

        assert_eq!(outputs.summary, dir.path().join("overallDistance.csv"));
        assert_eq!(
            fs::read_to_string(&outputs.summary).unwrap(),
            "Px1,Px2,Px3\n1.5,0,3.25\n"
        );
        assert_eq!(
            fs::read_to_string(&outputs.lag).unwrap(),
            "slot,time_seconds,lag_seconds\nPx1,0,0\nPx1,0.1,0\nPx3,0,0\nPx3,0.1,0\n"
        );
    }

    #[test]
    fn creates_nested_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("deep");
        ResultWriter::new(&nested, FileNaming::default()).unwrap();
        assert!(nested.is_dir());
    }
}
