use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info, warn};

use entrain_dtw::{Aligner, AlignmentResult, ExactDtw, FastDtw, FrameTiming, Metric};
use entrain_io::{
    ConditionDir, FeatureReader, FileNaming, ResultWriter, SessionInputs, StoredSession,
    StudyConfig, parse_slot, read_distance, read_path,
};
use entrain_sync::{
    CohortCondition, Condition, ConditionSummary, ParticipantSlot, SessionFailure, SessionKey,
    SessionRecord, aggregate, run_batch,
};

#[derive(Parser)]
#[command(name = "entrain")]
#[command(about = "Speech synchrony between participant and model recordings via FastDTW")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Alignment parameters that override the study configuration.
#[derive(Args, Debug, Clone)]
struct AlignmentArgs {
    /// FastDTW search radius (at least 1)
    #[arg(long)]
    radius: Option<usize>,

    /// Local distance between frames: "euclidean" or "manhattan"
    #[arg(long)]
    metric: Option<String>,

    /// Use exact full-matrix DTW instead of FastDTW
    #[arg(long, default_value_t = false)]
    exact: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Align one participant/model pair and write its distance, path and lag tables
    Align {
        /// Participant feature CSV (one row per frame)
        #[arg(long)]
        participant: PathBuf,

        /// Model feature CSV (one row per frame)
        #[arg(long)]
        model: PathBuf,

        /// Output directory for result tables
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// File-name prefix for the result tables, e.g. "Px1_"
        #[arg(long)]
        stem: String,

        /// Samples between feature frames
        #[arg(long, default_value_t = 110)]
        hop_length: u32,

        /// Sample rate the features were extracted at, in Hz
        #[arg(long, default_value_t = 22050)]
        sample_rate: u32,

        #[command(flatten)]
        alignment: AlignmentArgs,
    },

    /// Align every session of a study in parallel, then aggregate each condition
    Batch {
        /// Study configuration TOML file
        #[arg(long)]
        config: PathBuf,

        #[command(flatten)]
        alignment: AlignmentArgs,
    },

    /// Rebuild condition summaries from persisted distance and path tables
    Aggregate {
        /// Study configuration TOML file
        #[arg(long)]
        config: PathBuf,
    },

    /// Write a study configuration file with default values
    InitConfig {
        /// Destination of the configuration file
        #[arg(long, default_value = "study.toml")]
        output: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct AlignOutput {
    participant_frames: usize,
    model_frames: usize,
    participant_seconds: f64,
    model_seconds: f64,
    method: &'static str,
    distance: f64,
    path_len: usize,
    lag_samples: usize,
    mean_lag_seconds: Option<f64>,
    mean_abs_lag_seconds: Option<f64>,
    distance_file: PathBuf,
    path_file: PathBuf,
    lag_file: PathBuf,
}

#[derive(Serialize)]
struct FailureOutput {
    session: String,
    error: String,
}

impl From<&SessionFailure> for FailureOutput {
    fn from(f: &SessionFailure) -> Self {
        Self {
            session: f.key.to_string(),
            error: f.message.clone(),
        }
    }
}

#[derive(Serialize)]
struct ConditionOutput {
    cohort: String,
    day: String,
    script: String,
    distances: Vec<f64>,
    present: Vec<bool>,
    mean_lag_seconds: Vec<Option<f64>>,
}

impl From<&ConditionSummary> for ConditionOutput {
    fn from(s: &ConditionSummary) -> Self {
        let cc = s.cohort_condition();
        Self {
            cohort: cc.cohort.clone(),
            day: cc.condition.day.clone(),
            script: cc.condition.script.clone(),
            distances: s.distances().iter().map(|d| d.value()).collect(),
            present: s.present().to_vec(),
            mean_lag_seconds: s.lags().iter().map(|l| l.mean_lag_seconds()).collect(),
        }
    }
}

#[derive(Serialize)]
struct BatchOutput {
    n_sessions: usize,
    n_succeeded: usize,
    n_failed: usize,
    failures: Vec<FailureOutput>,
    conditions: Vec<ConditionOutput>,
}

#[derive(Serialize)]
struct AggregateOutput {
    n_conditions: usize,
    failures: Vec<FailureOutput>,
    conditions: Vec<ConditionOutput>,
}

#[derive(Serialize)]
struct InitConfigOutput {
    config: PathBuf,
}

/// Aligner chosen at runtime from CLI flags.
type DynAligner = Box<dyn Aligner + Sync>;

fn build_aligner(
    radius: usize,
    metric: Metric,
    exact: bool,
) -> Result<(DynAligner, &'static str)> {
    if exact {
        return Ok((Box::new(ExactDtw::new().with_metric(metric)), "exact"));
    }
    let fast = FastDtw::new(radius)
        .context("invalid search radius")?
        .with_metric(metric);
    Ok((Box::new(fast), "fastdtw"))
}

fn parse_metric(name: Option<&str>, default: Metric) -> Result<Metric> {
    match name {
        Some(name) => Ok(Metric::from_str(name)?),
        None => Ok(default),
    }
}

/// Read one session's features, align them and write the session tables.
fn process_session(
    inputs: SessionInputs,
    timing: FrameTiming,
    aligner: &(dyn Aligner + Sync),
    config: &StudyConfig,
) -> Result<SessionRecord> {
    let participant = FeatureReader::new(&inputs.participant, timing)
        .read()
        .context("failed to read participant features")?;
    let model = FeatureReader::new(&inputs.model, timing)
        .read()
        .context("failed to read model features")?;
    let record = SessionRecord::compute(inputs.key, &participant, &model, aligner)?;
    ResultWriter::new(&inputs.directory, config.layout.naming.clone())?
        .write_session(&inputs.stem, &record)?;
    Ok(record)
}

/// Rebuild a session record from its persisted distance and path tables.
fn load_session(stored: StoredSession, timing: FrameTiming) -> Result<SessionRecord> {
    let alignment = AlignmentResult {
        distance: read_distance(&stored.distance)?,
        path: read_path(&stored.path)?,
    };
    Ok(SessionRecord::from_alignment(stored.key, alignment, timing)?)
}

fn write_condition(
    config: &StudyConfig,
    dir: &ConditionDir,
    summary: &ConditionSummary,
) -> Result<()> {
    ResultWriter::new(&dir.path, config.layout.naming.clone())?
        .write_condition(summary)
        .with_context(|| format!("failed to write results for {}", dir.cohort_condition))?;
    Ok(())
}

fn condition_failure(cc: &CohortCondition, err: &anyhow::Error) -> FailureOutput {
    error!(condition = %cc, error = %format!("{err:#}"), "condition failed");
    FailureOutput {
        session: cc.to_string(),
        error: format!("{err:#}"),
    }
}

fn load_config(path: &Path, alignment: Option<&AlignmentArgs>) -> Result<StudyConfig> {
    let mut config = StudyConfig::load(path)
        .with_context(|| format!("failed to load study configuration {}", path.display()))?;
    if let Some(radius) = alignment.and_then(|a| a.radius) {
        config.analysis.radius = radius;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Align {
            participant,
            model,
            output_dir,
            stem,
            hop_length,
            sample_rate,
            alignment,
        } => {
            let timing = FrameTiming::new(hop_length, sample_rate)?;
            let metric = parse_metric(alignment.metric.as_deref(), Metric::default())?;
            let (aligner, method) =
                build_aligner(alignment.radius.unwrap_or(1), metric, alignment.exact)?;

            let participant_seq = FeatureReader::new(&participant, timing)
                .read()
                .context("failed to read participant features")?;
            let model_seq = FeatureReader::new(&model, timing)
                .read()
                .context("failed to read model features")?;

            // Single sessions have no study position; record them under the stem.
            let naming = FileNaming::default();
            let slot = match parse_slot(&stem, &naming.slot_marker) {
                Some(slot) => slot,
                None => ParticipantSlot::new(1)?,
            };
            let key = SessionKey::new(
                CohortCondition::new(stem.clone(), Condition::new("", "")),
                slot,
            );
            let record = SessionRecord::compute(key, &participant_seq, &model_seq, &*aligner)
                .context("alignment failed")?;

            let writer = ResultWriter::new(&output_dir, naming)?;
            let outputs = writer.write_session(&stem, &record)?;

            let output = AlignOutput {
                participant_frames: participant_seq.len(),
                model_frames: model_seq.len(),
                participant_seconds: participant_seq.duration_seconds(),
                model_seconds: model_seq.duration_seconds(),
                method,
                distance: record.alignment().distance.value(),
                path_len: record.alignment().path.len(),
                lag_samples: record.lag().len(),
                mean_lag_seconds: record.lag().mean_lag_seconds(),
                mean_abs_lag_seconds: record.lag().mean_abs_lag_seconds(),
                distance_file: outputs.distance,
                path_file: outputs.path,
                lag_file: outputs.lag,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Batch { config, alignment } => {
            let config = load_config(&config, Some(&alignment))?;
            let timing = config.analysis.timing()?;
            let metric = parse_metric(alignment.metric.as_deref(), config.analysis.metric.into())?;
            let (aligner, method) = build_aligner(config.analysis.radius, metric, alignment.exact)?;
            info!(method, radius = config.analysis.radius, %metric, "aligner ready");

            let sessions = config
                .layout
                .discover_sessions()
                .context("failed to discover sessions")?;
            let n_sessions = sessions.len();
            let jobs: Vec<(SessionKey, SessionInputs)> = sessions
                .into_iter()
                .map(|inputs| (inputs.key.clone(), inputs))
                .collect();

            let outcome = run_batch(jobs, |_, inputs| {
                process_session(inputs, timing, aligner.as_ref(), &config)
            });

            // Aggregation starts only after every session has finished.
            let slot_count = config.layout.participant_slot_count;
            let mut summaries: BTreeMap<CohortCondition, _> =
                outcome.summaries(slot_count).into_iter().collect();
            let mut failures: Vec<FailureOutput> =
                outcome.failures.iter().map(FailureOutput::from).collect();
            let mut conditions = Vec::new();

            for dir in config.layout.condition_dirs()? {
                let summary = match summaries.remove(&dir.cohort_condition) {
                    Some(summary) => summary,
                    None => aggregate(&dir.cohort_condition, &[], slot_count),
                };
                let written = summary
                    .map_err(anyhow::Error::from)
                    .and_then(|s| write_condition(&config, &dir, &s).map(|()| s));
                match written {
                    Ok(summary) => conditions.push(ConditionOutput::from(&summary)),
                    Err(e) => failures.push(condition_failure(&dir.cohort_condition, &e)),
                }
            }

            let output = BatchOutput {
                n_sessions,
                n_succeeded: outcome.records.len(),
                n_failed: outcome.failures.len(),
                failures,
                conditions,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Aggregate { config } => {
            let config = load_config(&config, None)?;
            let timing = config.analysis.timing()?;
            let slot_count = config.layout.participant_slot_count;

            let mut failures = Vec::new();
            let mut conditions = Vec::new();
            for dir in config.layout.condition_dirs()? {
                let mut records = Vec::new();
                for stored in config.layout.stored_sessions(&dir)? {
                    let key = stored.key.clone();
                    match load_session(stored, timing) {
                        Ok(record) => records.push(record),
                        Err(e) => {
                            warn!(session = %key, error = %format!("{e:#}"), "stored session unreadable; treating as missing");
                            failures.push(FailureOutput {
                                session: key.to_string(),
                                error: format!("{e:#}"),
                            });
                        }
                    }
                }

                let written = aggregate(&dir.cohort_condition, &records, slot_count)
                    .map_err(anyhow::Error::from)
                    .and_then(|s| write_condition(&config, &dir, &s).map(|()| s));
                match written {
                    Ok(summary) => conditions.push(ConditionOutput::from(&summary)),
                    Err(e) => failures.push(condition_failure(&dir.cohort_condition, &e)),
                }
            }

            let output = AggregateOutput {
                n_conditions: conditions.len(),
                failures,
                conditions,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::InitConfig { output } => {
            StudyConfig::default()
                .save(&output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!(path = %output.display(), "default configuration written");
            println!(
                "{}",
                serde_json::to_string_pretty(&InitConfigOutput { config: output })?
            );
        }
    }

    Ok(())
}
