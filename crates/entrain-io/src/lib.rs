//! File I/O, validation, and configuration for the entrain pipeline.
//!
//! Reads feature tables, persists per-session and per-condition results as
//! CSV with atomic replacement, loads the TOML study configuration and
//! discovers sessions in the study directory tree.

mod atomic;
mod config;
mod error;
mod layout;
mod reader;
mod tables;
mod writer;

pub use config::{AnalysisConfig, FileNaming, MetricName, StudyConfig, StudyLayout};
pub use error::IoError;
pub use layout::{ConditionDir, SessionInputs, StoredSession, parse_slot};
pub use reader::FeatureReader;
pub use tables::{
    CONDITION_LAG_HEADER, DISTANCE_LABEL, LAG_HEADER, read_distance, read_lag, read_path,
    read_summary, write_condition_lag, write_distance, write_features, write_lag, write_path,
    write_summary,
};
pub use writer::{ConditionOutputs, ResultWriter, SessionOutputs};
