//! Data models for the deductions checker.
//!
//! This module contains the core data structures shared by the extractor,
//! the aggregator, and the report generator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Raw text of one student's final feedback box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackBlob {
    /// Opaque identifier of the owning student.
    pub student: String,
    /// Feedback text as written by the grader.
    pub content: String,
}

impl FeedbackBlob {
    pub fn new(student: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            student: student.into(),
            content: content.into(),
        }
    }
}

/// A single trimmed deduction bullet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionLine {
    /// Student whose feedback produced this line.
    pub student: String,
    /// Trimmed bullet text.
    pub text: String,
}

impl AsRef<str> for DeductionLine {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Count of deduction lines per category key.
///
/// Backed by an ordered map so iteration and serialization order only
/// depend on the keys, never on the order lines were recorded in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeductionTally {
    counts: BTreeMap<String, u64>,
}

impl DeductionTally {
    /// Creates an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one occurrence of `key`.
    pub fn record(&mut self, key: impl Into<String>) {
        self.add(key, 1);
    }

    /// Adds `count` occurrences of `key`.
    pub fn add(&mut self, key: impl Into<String>, count: u64) {
        *self.counts.entry(key.into()).or_insert(0) += count;
    }

    /// Folds another tally into this one by summing counts per key.
    pub fn merge(mut self, other: DeductionTally) -> Self {
        // Iterate the smaller map.
        let (mut into, from) = if self.counts.len() >= other.counts.len() {
            (std::mem::take(&mut self.counts), other.counts)
        } else {
            (other.counts, std::mem::take(&mut self.counts))
        };
        for (key, count) in from {
            *into.entry(key).or_insert(0) += count;
        }
        Self { counts: into }
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.counts.get(key).copied()
    }

    /// Number of distinct categories.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Entries sorted by count (highest first), ties broken by key.
    pub fn ranked(&self) -> Vec<(&str, u64)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }
}

impl<K: Into<String>> FromIterator<(K, u64)> for DeductionTally {
    fn from_iter<T: IntoIterator<Item = (K, u64)>>(iter: T) -> Self {
        let mut tally = Self::new();
        for (key, count) in iter {
            tally.add(key, count);
        }
        tally
    }
}

/// How a deduction line is turned into a category key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KeyPolicy {
    /// Leading label before the delimiter, after stripping bullets and points.
    #[default]
    Label,
    /// The whole line, case- and whitespace-normalized.
    Line,
}

impl fmt::Display for KeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPolicy::Label => write!(f, "label"),
            KeyPolicy::Line => write!(f, "line"),
        }
    }
}

/// Grading context the feedback was exported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionMode {
    /// One feedback text file per student.
    Directory,
    /// Role-graded challenge export.
    Challenge,
    /// Rubric-graded lesson attempt export.
    Attempt,
}

impl fmt::Display for SubmissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionMode::Directory => write!(f, "Directory"),
            SubmissionMode::Challenge => write!(f, "Challenge"),
            SubmissionMode::Attempt => write!(f, "Attempt"),
        }
    }
}

/// Metadata about a deductions report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Path the feedback was read from.
    pub source: String,
    /// Submission mode used to read the source.
    pub mode: SubmissionMode,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Students on the roster.
    pub roster_size: usize,
    /// Students whose feedback was read.
    pub students_with_feedback: usize,
    /// Students skipped for missing submission data.
    pub students_skipped: usize,
    /// Total deduction lines extracted.
    pub deduction_lines: usize,
    /// Key policy used for grouping.
    pub key_policy: KeyPolicy,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete deductions report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// Count per category key.
    pub tally: DeductionTally,
    /// Distinct students with at least one line per category key.
    pub students: BTreeMap<String, usize>,
    /// Sample lines per category key, for tracing a count back to students.
    pub examples: BTreeMap<String, Vec<DeductionLine>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_record_and_total() {
        let mut tally = DeductionTally::new();
        tally.record("late");
        tally.record("late");
        tally.record("style");

        assert_eq!(tally.get("late"), Some(2));
        assert_eq!(tally.get("style"), Some(1));
        assert_eq!(tally.get("missing"), None);
        assert_eq!(tally.len(), 2);
        assert_eq!(tally.total(), 3);
    }

    #[test]
    fn test_tally_merge_sums_counts() {
        let a: DeductionTally = [("late", 2), ("style", 1)].into_iter().collect();
        let b: DeductionTally = [("late", 1), ("tests", 4)].into_iter().collect();

        let merged = a.clone().merge(b.clone());
        assert_eq!(merged.get("late"), Some(3));
        assert_eq!(merged.get("style"), Some(1));
        assert_eq!(merged.get("tests"), Some(4));

        // Commutative.
        assert_eq!(merged, b.merge(a));
    }

    #[test]
    fn test_tally_merge_associative() {
        let a: DeductionTally = [("x", 1)].into_iter().collect();
        let b: DeductionTally = [("x", 2), ("y", 1)].into_iter().collect();
        let c: DeductionTally = [("y", 5), ("z", 1)].into_iter().collect();

        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = a.merge(b.merge(c));
        assert_eq!(left, right);
    }

    #[test]
    fn test_tally_merge_with_empty() {
        let a: DeductionTally = [("late", 2)].into_iter().collect();
        assert_eq!(a.clone().merge(DeductionTally::new()), a);
        assert_eq!(DeductionTally::new().merge(a.clone()), a);
    }

    #[test]
    fn test_tally_ranked() {
        let tally: DeductionTally = [("b", 2), ("a", 2), ("c", 5)].into_iter().collect();
        let ranked = tally.ranked();
        assert_eq!(ranked, vec![("c", 5), ("a", 2), ("b", 2)]);
    }

    #[test]
    fn test_tally_serializes_as_map() {
        let tally: DeductionTally = [("late", 2)].into_iter().collect();
        let json = serde_json::to_string(&tally).unwrap();
        assert_eq!(json, r#"{"late":2}"#);
    }

    #[test]
    fn test_key_policy_display() {
        assert_eq!(KeyPolicy::Label.to_string(), "label");
        assert_eq!(KeyPolicy::Line.to_string(), "line");
        assert_eq!(KeyPolicy::default(), KeyPolicy::Label);
    }
}
