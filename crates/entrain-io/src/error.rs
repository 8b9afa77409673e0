//! I/O error types for entrain-io.

use std::path::PathBuf;

use entrain_dtw::DtwError;

/// Errors from table I/O, study configuration and session discovery.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}: {source}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a table has no data rows.
    #[error("empty table (no data rows) in {path}")]
    EmptyTable {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a row has a different number of columns than expected.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding any header).
        row_index: usize,
        /// Expected number of columns.
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a cell value is NaN, Inf, or otherwise not a finite float.
    #[error("non-finite value in {path}: row {row_index}, column {col_index}, raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding any header).
        row_index: usize,
        /// Zero-based column index.
        col_index: usize,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when a distance file does not hold a single `label,distance` row
    /// with a non-negative finite distance.
    #[error("malformed distance in {path}: \"{raw}\"")]
    MalformedDistance {
        /// Path to the distance file.
        path: PathBuf,
        /// The offending row, joined with commas.
        raw: String,
    },

    /// Returned when a path row is not a pair of non-negative integers.
    #[error("malformed path row in {path}: row {row_index}, raw value \"{raw}\"")]
    MalformedPathRow {
        /// Path to the path file.
        path: PathBuf,
        /// Zero-based row index.
        row_index: usize,
        /// The offending row, joined with commas.
        raw: String,
    },

    /// Returned when rows that must be strictly ordered are not.
    #[error("rows out of order in {path} at row {row_index}")]
    UnorderedRows {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding the header).
        row_index: usize,
    },

    /// Returned when a table header does not match its schema.
    #[error("unexpected header in {path}: expected \"{expected}\", got \"{got}\"")]
    UnexpectedHeader {
        /// Path to the CSV file.
        path: PathBuf,
        /// The schema's header, joined with commas.
        expected: String,
        /// The header found, joined with commas.
        got: String,
    },

    /// Returned when stored steps do not form a valid warping path.
    #[error("invalid warping path in {path}: {source}")]
    InvalidPath {
        /// Path to the path file.
        path: PathBuf,
        /// Validation failure.
        source: DtwError,
    },

    /// Returned when feature rows do not form a valid feature sequence.
    #[error("invalid feature data in {path}: {source}")]
    InvalidFeatures {
        /// Path to the feature file.
        path: PathBuf,
        /// Validation failure.
        source: DtwError,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a table cannot be written or moved into place.
    #[error("cannot write file {path}: {source}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the study configuration cannot be parsed.
    #[error("invalid study configuration in {path}: {source}")]
    ConfigParse {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// Returned when the study configuration cannot be rendered as TOML.
    #[error("cannot serialize study configuration: {source}")]
    ConfigSerialize {
        /// Underlying TOML error.
        source: toml::ser::Error,
    },

    /// Returned when a configuration value is out of range.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        /// Dotted name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// Returned when a study directory cannot be listed.
    #[error("cannot read directory {path}")]
    ReadDir {
        /// Directory that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
