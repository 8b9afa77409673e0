//! CSV feature-frame reader with full input validation.

use std::path::{Path, PathBuf};

use entrain_dtw::{FeatureSequence, FrameTiming};
use tracing::{debug, info, instrument};

use crate::IoError;

/// Reads a feature-frame sequence from a headerless CSV file.
///
/// Expected CSV format:
/// - No header row
/// - One row per frame, one column per coefficient
/// - All rows must have the same number of columns
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyTable`] | Zero rows |
/// | [`IoError::InconsistentRowLength`] | Row has a different column count than the first row |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable float |
pub struct FeatureReader {
    path: PathBuf,
    timing: FrameTiming,
}

impl FeatureReader {
    /// Create a reader for frames extracted with the given timing.
    pub fn new(path: &Path, timing: FrameTiming) -> Self {
        Self {
            path: path.to_path_buf(),
            timing,
        }
    }

    /// Read and validate the CSV file, returning a [`FeatureSequence`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<FeatureSequence, IoError> {
        let mut rdr = crate::tables::open_csv(&self.path, false)?;

        let mut data: Vec<f64> = Vec::new();
        let mut width: Option<usize> = None;
        let mut n_frames = 0usize;

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| crate::tables::csv_error(&self.path, e))?;

            let expected = *width.get_or_insert(record.len());
            if record.len() != expected {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected,
                    got: record.len(),
                });
            }

            for (col_index, raw) in record.iter().enumerate() {
                let value = raw
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        col_index,
                        raw: raw.to_string(),
                    })?;
                data.push(value);
            }
            n_frames += 1;
        }

        let Some(width) = width else {
            return Err(IoError::EmptyTable {
                path: self.path.clone(),
            });
        };
        debug!(width, "feature rows parsed");

        let sequence =
            FeatureSequence::from_flat(data, width, self.timing).map_err(|source| {
                IoError::InvalidFeatures {
                    path: self.path.clone(),
                    source,
                }
            })?;

        info!(n_frames, width, "features loaded");
        Ok(sequence)
    }
}
