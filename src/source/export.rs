//! Submission exports from the course platform.
//!
//! Two shapes exist, one per grading context:
//!
//! - challenge: `{"users": [...], "submissions": {"<user id>": [...]}}`
//! - attempt: `{"attempts": [{..., "submissions": [...]}]}`
//!
//! In both, a submission list is newest first and the final feedback is
//! `submissions[0].feedback.content`.

use crate::progress::ProgressSink;
use crate::source::{collect_roster, FetchOutcome, SourceOptions};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Platform user id, numeric or textual depending on the export.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(u64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Number(n) => write!(f, "{}", n),
            UserId::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub feedback: Option<Feedback>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Feedback {
    #[serde(default)]
    pub content: Option<String>,
}

/// Newest-first submission list; entries may be null.
pub type Submissions = Option<Vec<Option<Submission>>>;

/// Final feedback text, or `None` if any level is missing.
fn final_feedback(submissions: Option<&Submissions>) -> Option<String> {
    submissions?
        .as_ref()?
        .first()?
        .as_ref()?
        .feedback
        .as_ref()?
        .content
        .clone()
}

/// A user enrolled in a challenge.
#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeUser {
    pub id: UserId,
    #[serde(default)]
    pub course_role: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChallengeData {
    users: Vec<ChallengeUser>,
    #[serde(default)]
    submissions: HashMap<String, Submissions>,
}

/// Export of a role-graded challenge.
#[derive(Debug)]
pub struct ChallengeExport {
    data: ChallengeData,
    options: SourceOptions,
}

impl ChallengeExport {
    pub fn from_value(value: Value, options: SourceOptions) -> Result<Self, serde_json::Error> {
        Ok(Self {
            data: serde_json::from_value(value)?,
            options,
        })
    }

    pub fn fetch(&self, sink: &dyn ProgressSink) -> FetchOutcome {
        let roster = self
            .data
            .users
            .iter()
            .filter(|user| user.course_role == self.options.student_role)
            .map(|user| {
                let id = user.id.to_string();
                let feedback = final_feedback(self.data.submissions.get(&id));
                (id, feedback)
            })
            .collect();

        collect_roster(roster, self.options.progress_every, sink)
    }
}

/// One student's results for a lesson.
///
/// Contact fields such as `email` are ignored so they never reach a report.
#[derive(Debug, Clone, Deserialize)]
pub struct AttemptResult {
    pub user_id: UserId,
    #[serde(default)]
    pub course_role: String,
    #[serde(default)]
    pub submissions: Submissions,
}

#[derive(Debug, Clone, Deserialize)]
struct AttemptData {
    attempts: Vec<AttemptResult>,
}

/// Export of rubric-graded lesson attempts.
#[derive(Debug)]
pub struct AttemptExport {
    data: AttemptData,
    options: SourceOptions,
}

impl AttemptExport {
    pub fn from_value(value: Value, options: SourceOptions) -> Result<Self, serde_json::Error> {
        Ok(Self {
            data: serde_json::from_value(value)?,
            options,
        })
    }

    pub fn fetch(&self, sink: &dyn ProgressSink) -> FetchOutcome {
        let roster = self
            .data
            .attempts
            .iter()
            .filter(|attempt| attempt.course_role == self.options.student_role)
            .map(|attempt| {
                (
                    attempt.user_id.to_string(),
                    final_feedback(Some(&attempt.submissions)),
                )
            })
            .collect();

        collect_roster(roster, self.options.progress_every, sink)
    }
}
