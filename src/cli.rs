//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{KeyPolicy, SubmissionMode};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Deductions Checker - tally grader deductions from student feedback
///
/// Reads each student's final feedback box from an exported challenge or
/// lesson-attempt roster (or a directory of feedback files), pulls out the
/// deduction bullets, and counts them per category.
///
/// Examples:
///   deductions-checker ./feedback/
///   deductions-checker challenge_export.json --format json -o tally.json
///   deductions-checker attempts.json --mode attempt --key-policy line
///   deductions-checker ./feedback/ --dry-run
///   deductions-checker --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Feedback to read: a JSON submission export or a directory of
    /// per-student feedback files
    #[arg(value_name = "INPUT", required_unless_present = "init_config")]
    pub input: Option<PathBuf>,

    /// Submission mode of the input
    ///
    /// Detected from the input when omitted: directories are read as one
    /// file per student, JSON exports by their top-level shape.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<SubmissionMode>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// How deduction lines are grouped into categories
    ///
    /// label: text before the delimiter, ignoring bullets and point values.
    /// line: the whole line.
    #[arg(long, value_name = "POLICY")]
    pub key_policy: Option<KeyPolicy>,

    /// Delimiter ending a category label (label policy)
    #[arg(long, value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Example lines to list per category in the report
    #[arg(long, value_name = "COUNT")]
    pub max_examples: Option<usize>,

    /// Course role whose submissions are counted
    #[arg(long, value_name = "ROLE")]
    pub student_role: Option<String>,

    /// Report progress every N students
    #[arg(long, value_name = "N")]
    pub progress_every: Option<usize>,

    /// Number of feedback files read concurrently
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .deductions.toml in the current directory
    #[arg(short, long, value_name = "FILE", env = "DEDUCTIONS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: print the extracted deduction lines per student and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .deductions.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the input path (should be validated first).
    pub fn input_path(&self) -> PathBuf {
        self.input.clone().unwrap_or_default()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        match self.input {
            None => return Err("An input path is required".to_string()),
            Some(ref input) if !input.exists() => {
                return Err(format!("Input does not exist: {}", input.display()));
            }
            Some(ref input) => {
                if input.is_dir() && matches!(self.mode, Some(m) if m != SubmissionMode::Directory)
                {
                    return Err(format!(
                        "{} is a directory; only --mode directory can read it",
                        input.display()
                    ));
                }
                if input.is_file() && self.mode == Some(SubmissionMode::Directory) {
                    return Err(format!("{} is not a directory", input.display()));
                }
            }
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.progress_every == Some(0) {
            return Err("Progress interval must be at least 1".to_string());
        }

        if let Some(delimiter) = self.delimiter {
            if delimiter.is_whitespace() {
                return Err("Delimiter cannot be whitespace".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Arguments for `input` with every option left unset.
    #[cfg(test)]
    pub fn for_input(input: PathBuf) -> Self {
        Self {
            input: Some(input),
            mode: None,
            output: None,
            format: None,
            key_policy: None,
            delimiter: None,
            max_examples: None,
            student_role: None,
            progress_every: None,
            concurrency: None,
            config: None,
            verbose: false,
            quiet: false,
            dry_run: false,
            init_config: false,
        }
    }
}
