//! Speech synchrony from DTW alignments.
//!
//! Converts warping paths into lag signals, bundles per-session results and
//! aggregates them across the participant slots of a recording condition.
//! Sessions are processed in parallel with rayon. No file I/O.

mod aggregate;
mod batch;
mod error;
mod key;
mod lag;
mod session;

pub use aggregate::{ConditionSummary, aggregate};
pub use batch::{BatchOutcome, SessionFailure, run_batch};
pub use error::SyncError;
pub use key::{CohortCondition, Condition, ParticipantSlot, SessionKey};
pub use lag::{LagSample, LagSeries, extract_lag};
pub use session::SessionRecord;
