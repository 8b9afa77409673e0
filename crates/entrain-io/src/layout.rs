//! Discovery of cohorts, condition directories and session files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use entrain_sync::{CohortCondition, Condition, ParticipantSlot, SessionKey};
use tracing::{debug, info, instrument, warn};

use crate::IoError;
use crate::config::{FileNaming, StudyLayout};

/// An existing `<base>/<cohort>/<day>/<script>/` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionDir {
    pub cohort_condition: CohortCondition,
    pub path: PathBuf,
}

/// Feature files for one session, ready to align.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInputs {
    pub key: SessionKey,
    /// Directory holding the inputs; outputs are written next to them.
    pub directory: PathBuf,
    /// File-name prefix shared by all of the session's files.
    pub stem: String,
    pub participant: PathBuf,
    pub model: PathBuf,
}

/// Persisted results of one session, ready to aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub key: SessionKey,
    pub stem: String,
    pub distance: PathBuf,
    pub path: PathBuf,
}

/// Parse the participant slot from a file stem: the digits right after the
/// first occurrence of `marker`.
#[must_use]
pub fn parse_slot(stem: &str, marker: &str) -> Option<ParticipantSlot> {
    let start = stem.find(marker)? + marker.len();
    let digits: String = stem[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok().and_then(|n| ParticipantSlot::new(n).ok())
}

impl FileNaming {
    /// Path of `<stem><suffix>` inside `dir`.
    #[must_use]
    pub fn session_file(&self, dir: &Path, stem: &str, suffix: &str) -> PathBuf {
        dir.join(format!("{stem}{suffix}"))
    }
}

impl StudyLayout {
    /// Cohort directories under the base directory, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::ReadDir`] if the base directory cannot be listed.
    pub fn cohorts(&self) -> Result<Vec<(String, PathBuf)>, IoError> {
        let mut cohorts: Vec<(String, PathBuf)> = list_dir(&self.base_directory)?
            .into_iter()
            .filter(|path| path.is_dir())
            .filter_map(|path| Some((path.file_name()?.to_str()?.to_string(), path)))
            .collect();
        cohorts.sort();
        Ok(cohorts)
    }

    /// Every existing condition directory, in cohort, day, script order.
    ///
    /// Day and script directories that do not exist are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::ReadDir`] if the base directory cannot be listed.
    #[instrument(skip(self), fields(base = %self.base_directory.display()))]
    pub fn condition_dirs(&self) -> Result<Vec<ConditionDir>, IoError> {
        let mut dirs = Vec::new();
        for (cohort, cohort_path) in self.cohorts()? {
            for day in &self.day_labels {
                for script in &self.script_labels {
                    let path = cohort_path.join(day).join(script);
                    if !path.is_dir() {
                        debug!(path = %path.display(), "condition directory absent");
                        continue;
                    }
                    dirs.push(ConditionDir {
                        cohort_condition: CohortCondition::new(
                            cohort.clone(),
                            Condition::new(day.clone(), script.clone()),
                        ),
                        path,
                    });
                }
            }
        }
        info!(n_conditions = dirs.len(), "condition directories found");
        Ok(dirs)
    }

    /// Every session with both a participant and a model feature file.
    ///
    /// Files whose slot cannot be parsed, participants without a model file
    /// and duplicate slots within a condition are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::ReadDir`] if a directory cannot be listed.
    #[instrument(skip(self), fields(base = %self.base_directory.display()))]
    pub fn discover_sessions(&self) -> Result<Vec<SessionInputs>, IoError> {
        let naming = &self.naming;
        let mut sessions = Vec::new();
        for dir in self.condition_dirs()? {
            for (slot, stem) in self.slot_stems(&dir, &naming.participant_suffix)? {
                let model = naming.session_file(&dir.path, &stem, &naming.model_suffix);
                if !model.is_file() {
                    warn!(
                        condition = %dir.cohort_condition,
                        %slot,
                        model = %model.display(),
                        "participant features without model features; skipping"
                    );
                    continue;
                }
                sessions.push(SessionInputs {
                    key: SessionKey::new(dir.cohort_condition.clone(), slot),
                    directory: dir.path.clone(),
                    participant: naming.session_file(&dir.path, &stem, &naming.participant_suffix),
                    model,
                    stem,
                });
            }
        }
        info!(n_sessions = sessions.len(), "sessions discovered");
        Ok(sessions)
    }

    /// Persisted session results of one condition directory, in slot order.
    ///
    /// A distance table without a matching path table is skipped with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::ReadDir`] if the directory cannot be listed.
    #[instrument(skip(self, dir), fields(condition = %dir.cohort_condition))]
    pub fn stored_sessions(&self, dir: &ConditionDir) -> Result<Vec<StoredSession>, IoError> {
        let naming = &self.naming;
        let mut stored = Vec::new();
        for (slot, stem) in self.slot_stems(dir, &naming.distance_suffix)? {
            let path = naming.session_file(&dir.path, &stem, &naming.path_suffix);
            if !path.is_file() {
                warn!(%slot, path = %path.display(), "distance table without path table; skipping");
                continue;
            }
            stored.push(StoredSession {
                key: SessionKey::new(dir.cohort_condition.clone(), slot),
                distance: naming.session_file(&dir.path, &stem, &naming.distance_suffix),
                path,
                stem,
            });
        }
        Ok(stored)
    }

    /// Stems of files in `dir` ending with `suffix`, keyed by slot.
    fn slot_stems(
        &self,
        dir: &ConditionDir,
        suffix: &str,
    ) -> Result<BTreeMap<ParticipantSlot, String>, IoError> {
        let mut names: Vec<String> = list_dir(&dir.path)?
            .into_iter()
            .filter(|path| path.is_file())
            .filter_map(|path| Some(path.file_name()?.to_str()?.to_string()))
            .collect();
        names.sort();

        let mut stems: BTreeMap<ParticipantSlot, String> = BTreeMap::new();
        for name in names {
            let Some(stem) = name.strip_suffix(suffix) else {
                continue;
            };
            let Some(slot) = parse_slot(stem, &self.naming.slot_marker) else {
                warn!(file = %name, marker = %self.naming.slot_marker, "no participant slot in file name; skipping");
                continue;
            };
            if let Some(first) = stems.get(&slot) {
                warn!(file = %name, %slot, kept = %first, "duplicate participant slot; skipping");
                continue;
            }
            stems.insert(slot, stem.to_string());
        }
        Ok(stems)
    }
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, IoError> {
    let read_dir_error = |source| IoError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    fs::read_dir(dir)
        .map_err(read_dir_error)?
        .map(|entry| entry.map(|e| e.path()).map_err(read_dir_error))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "0\n").unwrap();
    }

    fn layout(base: &Path) -> StudyLayout {
        StudyLayout {
            base_directory: base.to_path_buf(),
            ..StudyLayout::default()
        }
    }

    #[test]
    fn slot_parsing() {
        assert_eq!(parse_slot("Px2_", "Px").map(|s| s.number()), Some(2));
        assert_eq!(parse_slot("session Px12 ", "Px").map(|s| s.number()), Some(12));
        assert_eq!(parse_slot("P3_", "Px"), None);
        assert_eq!(parse_slot("Px_", "Px"), None);
        assert_eq!(parse_slot("Px0", "Px"), None);
    }

    #[test]
    fn condition_dirs_skip_missing_days() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("B/Day 1/SCRIPT 6 (STIM)")).unwrap();
        fs::create_dir_all(tmp.path().join("A/Day 3/SCRIPT 10 (POST STIM)")).unwrap();
        fs::create_dir_all(tmp.path().join("A/Day 1/SCRIPT 6 (STIM)")).unwrap();
        touch(&tmp.path().join("notes.txt"));

        let dirs = layout(tmp.path()).condition_dirs().unwrap();
        let names: Vec<String> = dirs.iter().map(|d| d.cohort_condition.to_string()).collect();
        assert_eq!(
            names,
            [
                "A / Day 1 / SCRIPT 6 (STIM)",
                "A / Day 3 / SCRIPT 10 (POST STIM)",
                "B / Day 1 / SCRIPT 6 (STIM)",
            ]
        );
    }

    #[test]
    fn sessions_pair_participant_and_model() {
        let tmp = TempDir::new().unwrap();
        let cond = tmp.path().join("A/Day 1/SCRIPT 6 (STIM)");
        touch(&cond.join("Px1_left.csv"));
        touch(&cond.join("Px1_right.csv"));
        touch(&cond.join("Px3_left.csv"));
        touch(&cond.join("Px3_right.csv"));
        // No model partner.
        touch(&cond.join("Px2_left.csv"));
        // No slot number.
        touch(&cond.join("intro_left.csv"));
        touch(&cond.join("intro_right.csv"));

        let sessions = layout(tmp.path()).discover_sessions().unwrap();
        let slots: Vec<usize> = sessions.iter().map(|s| s.key.slot.number()).collect();
        assert_eq!(slots, [1, 3]);
        assert_eq!(sessions[0].stem, "Px1_");
        assert_eq!(sessions[0].participant, cond.join("Px1_left.csv"));
        assert_eq!(sessions[0].model, cond.join("Px1_right.csv"));
        assert_eq!(sessions[0].directory, cond);
    }

    #[test]
    fn duplicate_slot_keeps_first_name() {
        let tmp = TempDir::new().unwrap();
        let cond = tmp.path().join("A/Day 1/SCRIPT 6 (STIM)");
        for name in ["Px1a_left.csv", "Px1a_right.csv", "Px1b_left.csv", "Px1b_right.csv"] {
            touch(&cond.join(name));
        }
        let sessions = layout(tmp.path()).discover_sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].stem, "Px1a_");
    }

    #[test]
    fn stored_sessions_need_both_tables() {
        let tmp = TempDir::new().unwrap();
        let cond = tmp.path().join("A/Day 2/SCRIPT 6 (STIM)");
        touch(&cond.join("Px1_distance.csv"));
        touch(&cond.join("Px1_path.csv"));
        touch(&cond.join("Px2_distance.csv"));

        let layout = layout(tmp.path());
        let dirs = layout.condition_dirs().unwrap();
        let stored = layout.stored_sessions(&dirs[0]).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].key.slot.number(), 1);
        assert_eq!(stored[0].path, cond.join("Px1_path.csv"));
    }

    #[test]
    fn missing_base_directory_reported() {
        let tmp = TempDir::new().unwrap();
        let result = layout(&tmp.path().join("absent")).condition_dirs();
        assert!(matches!(result, Err(IoError::ReadDir { .. })));
    }
}
