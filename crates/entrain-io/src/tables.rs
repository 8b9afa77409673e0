//! Typed CSV schemas for per-session and per-condition results.
//!
//! | Table | Layout |
//! |---|---|
//! | features | headerless, one row per frame |
//! | distance | one row: `DTW Distance: ,<distance>` |
//! | path | headerless, one `a,b` row per step |
//! | lag | `participant_frame,model_frame,time_seconds,lag_seconds` |
//! | summary | slot labels `Px1..PxN`, then one row of distances |
//! | condition lag | `slot,time_seconds,lag_seconds`, present slots in order |

use std::fs::File;
use std::path::Path;

use entrain_dtw::{DtwDistance, FeatureSequence, WarpingPath, WarpingStep};
use entrain_sync::{ConditionSummary, LagSample, LagSeries, ParticipantSlot};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::IoError;
use crate::atomic::write_csv_atomic;

/// Row label of the distance table.
pub const DISTANCE_LABEL: &str = "DTW Distance: ";

/// Header of the per-session lag table.
pub const LAG_HEADER: [&str; 4] = [
    "participant_frame",
    "model_frame",
    "time_seconds",
    "lag_seconds",
];

/// Header of the per-condition lag table.
pub const CONDITION_LAG_HEADER: [&str; 3] = ["slot", "time_seconds", "lag_seconds"];

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Open a CSV file. Rows may vary in width so that schema checks, not the
/// parser, report inconsistent rows.
pub(crate) fn open_csv(path: &Path, has_headers: bool) -> Result<csv::Reader<File>, IoError> {
    let file = File::open(path).map_err(|e| IoError::FileNotFound {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(file))
}

pub(crate) fn csv_error(path: &Path, e: csv::Error) -> IoError {
    IoError::CsvParse {
        path: path.to_path_buf(),
        offset: e.position().map_or(0, |p| p.byte()),
        source: e,
    }
}

fn check_header(rdr: &mut csv::Reader<File>, path: &Path, expected: &[&str]) -> Result<(), IoError> {
    let header = rdr.headers().map_err(|e| csv_error(path, e))?;
    if header.iter().ne(expected.iter().copied()) {
        return Err(IoError::UnexpectedHeader {
            path: path.to_path_buf(),
            expected: expected.join(","),
            got: header.iter().collect::<Vec<_>>().join(","),
        });
    }
    Ok(())
}

fn joined(record: &csv::StringRecord) -> String {
    record.iter().collect::<Vec<_>>().join(",")
}

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

/// Write a feature sequence as a headerless table, one row per frame.
///
/// # Errors
///
/// Returns [`IoError::WriteFile`] if the file cannot be written.
#[instrument(skip(features), fields(path = %path.display(), n_frames = features.len()))]
pub fn write_features(path: &Path, features: &FeatureSequence) -> Result<(), IoError> {
    write_csv_atomic(path, |w| {
        for frame in features.frames() {
            w.write_record(frame.iter().map(f64::to_string))?;
        }
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Distance
// ---------------------------------------------------------------------------

/// Write the single-row distance table.
///
/// # Errors
///
/// Returns [`IoError::WriteFile`] if the file cannot be written.
#[instrument(fields(path = %path.display()))]
pub fn write_distance(path: &Path, distance: DtwDistance) -> Result<(), IoError> {
    let value = distance.value().to_string();
    write_csv_atomic(path, |w| w.write_record([DISTANCE_LABEL, value.as_str()]))
}

/// Read the distance from the first row of a distance table.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::EmptyTable`] | No rows |
/// | [`IoError::MalformedDistance`] | Second column missing, unparseable, negative or non-finite |
#[instrument(fields(path = %path.display()))]
pub fn read_distance(path: &Path) -> Result<DtwDistance, IoError> {
    let mut rdr = open_csv(path, false)?;
    let record = match rdr.records().next() {
        Some(result) => result.map_err(|e| csv_error(path, e))?,
        None => {
            return Err(IoError::EmptyTable {
                path: path.to_path_buf(),
            });
        }
    };

    record
        .get(1)
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .and_then(|value| DtwDistance::new(value).ok())
        .ok_or_else(|| IoError::MalformedDistance {
            path: path.to_path_buf(),
            raw: joined(&record),
        })
}

// ---------------------------------------------------------------------------
// Path
// ---------------------------------------------------------------------------

/// Write a warping path, one `a,b` row per step.
///
/// # Errors
///
/// Returns [`IoError::WriteFile`] if the file cannot be written.
#[instrument(skip(warping), fields(path = %path.display(), steps = warping.len()))]
pub fn write_path(path: &Path, warping: &WarpingPath) -> Result<(), IoError> {
    write_csv_atomic(path, |w| {
        for step in warping {
            w.write_record([step.a.to_string(), step.b.to_string()])?;
        }
        Ok(())
    })
}

/// Read and validate a stored warping path.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::EmptyTable`] | No rows |
/// | [`IoError::MalformedPathRow`] | Row is not two non-negative integers |
/// | [`IoError::InvalidPath`] | Steps do not start at `(0, 0)` or are not monotone |
#[instrument(fields(path = %path.display()))]
pub fn read_path(path: &Path) -> Result<WarpingPath, IoError> {
    let mut rdr = open_csv(path, false)?;
    let mut steps = Vec::new();

    for (row_index, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| csv_error(path, e))?;
        let parse = |i: usize| record.get(i).and_then(|raw| raw.trim().parse::<usize>().ok());
        let step = match (record.len(), parse(0), parse(1)) {
            (2, Some(a), Some(b)) => WarpingStep::new(a, b),
            _ => {
                return Err(IoError::MalformedPathRow {
                    path: path.to_path_buf(),
                    row_index,
                    raw: joined(&record),
                });
            }
        };
        steps.push(step);
    }

    if steps.is_empty() {
        return Err(IoError::EmptyTable {
            path: path.to_path_buf(),
        });
    }
    debug!(steps = steps.len(), "path rows parsed");

    WarpingPath::from_steps(steps).map_err(|source| IoError::InvalidPath {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Lag
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct LagRow {
    participant_frame: usize,
    model_frame: usize,
    time_seconds: f64,
    lag_seconds: f64,
}

impl From<&LagSample> for LagRow {
    fn from(s: &LagSample) -> Self {
        Self {
            participant_frame: s.participant_frame,
            model_frame: s.model_frame,
            time_seconds: s.time_seconds,
            lag_seconds: s.lag_seconds,
        }
    }
}

/// Write a session's lag series with a header row.
///
/// # Errors
///
/// Returns [`IoError::WriteFile`] if the file cannot be written.
#[instrument(skip(lag), fields(path = %path.display(), samples = lag.len()))]
pub fn write_lag(path: &Path, lag: &LagSeries) -> Result<(), IoError> {
    write_csv_atomic(path, |w| {
        w.write_record(LAG_HEADER)?;
        for sample in lag {
            w.serialize(LagRow::from(sample))?;
        }
        Ok(())
    })
}

/// Read a session's lag series.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::UnexpectedHeader`] | Header differs from [`LAG_HEADER`] |
/// | [`IoError::CsvParse`] | Row does not match the schema |
/// | [`IoError::NonFiniteValue`] | A time or lag is NaN or infinite |
/// | [`IoError::UnorderedRows`] | Participant frames are not strictly increasing |
#[instrument(fields(path = %path.display()))]
pub fn read_lag(path: &Path) -> Result<LagSeries, IoError> {
    let mut rdr = open_csv(path, true)?;
    check_header(&mut rdr, path, &LAG_HEADER)?;

    let mut samples: Vec<LagSample> = Vec::new();
    for (row_index, result) in rdr.deserialize::<LagRow>().enumerate() {
        let row = result.map_err(|e| csv_error(path, e))?;
        for (col_index, value) in [(2, row.time_seconds), (3, row.lag_seconds)] {
            if !value.is_finite() {
                return Err(IoError::NonFiniteValue {
                    path: path.to_path_buf(),
                    row_index,
                    col_index,
                    raw: value.to_string(),
                });
            }
        }
        if samples
            .last()
            .is_some_and(|prev| prev.participant_frame >= row.participant_frame)
        {
            return Err(IoError::UnorderedRows {
                path: path.to_path_buf(),
                row_index,
            });
        }
        samples.push(LagSample {
            participant_frame: row.participant_frame,
            model_frame: row.model_frame,
            time_seconds: row.time_seconds,
            lag_seconds: row.lag_seconds,
        });
    }

    Ok(LagSeries::from_samples(samples))
}

// ---------------------------------------------------------------------------
// Condition summary
// ---------------------------------------------------------------------------

/// Write the per-condition distance summary: slot labels, then distances.
///
/// Missing slots appear with distance `0`.
///
/// # Errors
///
/// Returns [`IoError::WriteFile`] if the file cannot be written.
#[instrument(skip(summary), fields(path = %path.display(), condition = %summary.cohort_condition()))]
pub fn write_summary(path: &Path, summary: &ConditionSummary) -> Result<(), IoError> {
    write_csv_atomic(path, |w| {
        w.write_record(ParticipantSlot::all(summary.slot_count()).map(|s| s.to_string()))?;
        w.write_record(summary.distances().iter().map(|d| d.value().to_string()))
    })
}

/// Read a per-condition distance summary, one distance per slot.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::UnexpectedHeader`] | Header is not `Px1..PxN` |
/// | [`IoError::EmptyTable`] | No distance row |
/// | [`IoError::InconsistentRowLength`] | Distance row width differs from the header |
/// | [`IoError::NonFiniteValue`] | A distance is unparseable, negative or non-finite |
#[instrument(fields(path = %path.display()))]
pub fn read_summary(path: &Path) -> Result<Vec<DtwDistance>, IoError> {
    let mut rdr = open_csv(path, true)?;
    let n_slots = rdr.headers().map_err(|e| csv_error(path, e))?.len();
    let labels: Vec<String> = ParticipantSlot::all(n_slots).map(|s| s.to_string()).collect();
    let expected: Vec<&str> = labels.iter().map(String::as_str).collect();
    check_header(&mut rdr, path, &expected)?;

    let record = match rdr.records().next() {
        Some(result) => result.map_err(|e| csv_error(path, e))?,
        None => {
            return Err(IoError::EmptyTable {
                path: path.to_path_buf(),
            });
        }
    };
    if record.len() != n_slots {
        return Err(IoError::InconsistentRowLength {
            path: path.to_path_buf(),
            row_index: 0,
            expected: n_slots,
            got: record.len(),
        });
    }

    record
        .iter()
        .enumerate()
        .map(|(col_index, raw)| {
            raw.trim()
                .parse::<f64>()
                .ok()
                .and_then(|v| DtwDistance::new(v).ok())
                .ok_or_else(|| IoError::NonFiniteValue {
                    path: path.to_path_buf(),
                    row_index: 0,
                    col_index,
                    raw: raw.to_string(),
                })
        })
        .collect()
}

/// Write the lag series of every present slot into one long-format table.
///
/// # Errors
///
/// Returns [`IoError::WriteFile`] if the file cannot be written.
#[instrument(skip(summary), fields(path = %path.display(), condition = %summary.cohort_condition()))]
pub fn write_condition_lag(path: &Path, summary: &ConditionSummary) -> Result<(), IoError> {
    write_csv_atomic(path, |w| {
        w.write_record(CONDITION_LAG_HEADER)?;
        for (slot, _, lag, present) in summary.slots() {
            if !present {
                continue;
            }
            let label = slot.to_string();
            for sample in lag {
                w.write_record([
                    label.clone(),
                    sample.time_seconds.to_string(),
                    sample.lag_seconds.to_string(),
                ])?;
            }
        }
        Ok(())
    })
}
