//! Feedback sources.
//!
//! A [`FeedbackSource`] is chosen once from the input path and then
//! yields one [`FeedbackBlob`] per student who has final feedback.
//! Students without submission data are skipped and counted.

pub mod directory;
pub mod export;

use crate::config::{GeneralConfig, SourceConfig};
use crate::models::{FeedbackBlob, SubmissionMode};
use crate::progress::{ProgressSink, ProgressTicker};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub use directory::DirectorySource;
pub use export::{AttemptExport, ChallengeExport};

/// Errors raised while opening or reading a feedback source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse submission export {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} is neither a challenge export (\"users\") nor an attempt export (\"attempts\")")]
    UnknownExport { path: PathBuf },

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Settings shared by all sources.
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Course role whose submissions are counted.
    pub student_role: String,
    /// Notify progress every this many students.
    pub progress_every: usize,
    /// Files read concurrently by the directory source.
    pub concurrency: usize,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            student_role: "student".to_string(),
            progress_every: 10,
            concurrency: 8,
        }
    }
}

impl SourceOptions {
    pub fn from_config(general: &GeneralConfig, source: &SourceConfig) -> Self {
        Self {
            student_role: source.student_role.clone(),
            progress_every: source.progress_every,
            concurrency: general.concurrency,
        }
    }
}

/// Feedback collected from a source.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// One blob per student with final feedback, in roster order.
    pub blobs: Vec<FeedbackBlob>,
    /// Students considered.
    pub roster_size: usize,
    /// Students with missing submission data.
    pub skipped: usize,
}

/// Where per-student feedback comes from.
#[derive(Debug)]
pub enum FeedbackSource {
    Directory(DirectorySource),
    Challenge(ChallengeExport),
    Attempt(AttemptExport),
}

impl FeedbackSource {
    /// Open `path`, using `mode` or detecting it from the input.
    pub async fn open(
        path: &Path,
        mode: Option<SubmissionMode>,
        options: SourceOptions,
    ) -> Result<Self, SourceError> {
        let mode = match mode {
            Some(mode) => mode,
            None if path.is_dir() => SubmissionMode::Directory,
            None => return Self::open_export(path, None, options).await,
        };

        match mode {
            SubmissionMode::Directory => Ok(Self::Directory(DirectorySource::new(
                path.to_path_buf(),
                options,
            ))),
            export_mode => Self::open_export(path, Some(export_mode), options).await,
        }
    }

    async fn open_export(
        path: &Path,
        mode: Option<SubmissionMode>,
        options: SourceOptions,
    ) -> Result<Self, SourceError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SourceError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let json_err = |source| SourceError::Json {
            path: path.to_path_buf(),
            source,
        };
        let value: Value = serde_json::from_str(&content).map_err(json_err)?;

        let mode = match mode {
            Some(mode) => mode,
            None => detect_export_mode(&value).ok_or_else(|| SourceError::UnknownExport {
                path: path.to_path_buf(),
            })?,
        };
        debug!("Reading {} as a {} export", path.display(), mode);

        let source = match mode {
            SubmissionMode::Attempt => {
                Self::Attempt(AttemptExport::from_value(value, options).map_err(json_err)?)
            }
            _ => Self::Challenge(ChallengeExport::from_value(value, options).map_err(json_err)?),
        };
        Ok(source)
    }

    pub fn mode(&self) -> SubmissionMode {
        match self {
            FeedbackSource::Directory(_) => SubmissionMode::Directory,
            FeedbackSource::Challenge(_) => SubmissionMode::Challenge,
            FeedbackSource::Attempt(_) => SubmissionMode::Attempt,
        }
    }

    /// Collect the final feedback of every student.
    pub async fn fetch(&self, sink: &dyn ProgressSink) -> Result<FetchOutcome, SourceError> {
        let outcome = match self {
            FeedbackSource::Directory(source) => source.fetch(sink).await?,
            FeedbackSource::Challenge(export) => export.fetch(sink),
            FeedbackSource::Attempt(export) => export.fetch(sink),
        };

        info!(
            "Collected feedback for {} of {} students ({} skipped)",
            outcome.blobs.len(),
            outcome.roster_size,
            outcome.skipped
        );
        Ok(outcome)
    }
}

/// Guess the export kind from its top-level keys.
fn detect_export_mode(value: &Value) -> Option<SubmissionMode> {
    let object = value.as_object()?;
    if object.contains_key("attempts") {
        Some(SubmissionMode::Attempt)
    } else if object.contains_key("users") {
        Some(SubmissionMode::Challenge)
    } else {
        None
    }
}

/// Walk a roster of `(student, final feedback)` pairs in order.
///
/// `None` feedback means the student's submission data is missing.
pub(crate) fn collect_roster(
    roster: Vec<(String, Option<String>)>,
    every: usize,
    sink: &dyn ProgressSink,
) -> FetchOutcome {
    let ticker = ProgressTicker::new(sink, every, roster.len());
    let mut outcome = FetchOutcome {
        roster_size: roster.len(),
        ..FetchOutcome::default()
    };

    for (index, (student, feedback)) in roster.into_iter().enumerate() {
        ticker.tick(index);

        match feedback {
            Some(content) => outcome.blobs.push(FeedbackBlob::new(student, content)),
            None => {
                debug!("No final feedback for student {}, skipping", student);
                outcome.skipped += 1;
            }
        }
    }

    ticker.finish();
    outcome
}
