//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.deductions.toml` files.

use crate::cli::OutputFormat;
use crate::models::{KeyPolicy, SubmissionMode};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".deductions.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Feedback source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub aggregate: AggregateConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Number of feedback files read concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_output() -> String {
    "deductions_report.md".to_string()
}

fn default_concurrency() -> usize {
    8
}

/// Feedback source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Submission mode; detected from the input when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SubmissionMode>,

    /// Course role whose submissions are counted.
    #[serde(default = "default_student_role")]
    pub student_role: String,

    /// Report progress every this many students.
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: None,
            student_role: default_student_role(),
            progress_every: default_progress_every(),
        }
    }
}

fn default_student_role() -> String {
    "student".to_string()
}

fn default_progress_every() -> usize {
    10
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// How lines are mapped to category keys.
    #[serde(default)]
    pub key_policy: KeyPolicy,

    /// Separator between a category label and the rest of the line.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Key collecting lines that fit no category.
    #[serde(default = "default_unclassified_key")]
    pub unclassified_key: String,

    /// Tally students in parallel shards.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            key_policy: KeyPolicy::default(),
            delimiter: default_delimiter(),
            unclassified_key: default_unclassified_key(),
            parallel: true,
        }
    }
}

fn default_delimiter() -> char {
    ':'
}

fn default_unclassified_key() -> String {
    crate::analysis::keys::UNCLASSIFIED_KEY.to_string()
}

fn default_true() -> bool {
    true
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Example lines listed per category.
    #[serde(default = "default_max_examples")]
    pub max_examples: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            max_examples: default_max_examples(),
        }
    }
}

fn default_max_examples() -> usize {
    3
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Reject settings that would hide or break categories.
    pub fn validate(&self) -> Result<()> {
        if self.aggregate.unclassified_key.trim().is_empty() {
            bail!("aggregate.unclassified_key must not be empty");
        }
        if self.aggregate.delimiter.is_whitespace() {
            bail!("aggregate.delimiter must not be whitespace");
        }
        Ok(())
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence, but only when given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if args.verbose {
            self.general.verbose = true;
        }
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if args.mode.is_some() {
            self.source.mode = args.mode;
        }
        if let Some(ref role) = args.student_role {
            self.source.student_role = role.clone();
        }
        if let Some(every) = args.progress_every {
            self.source.progress_every = every;
        }

        if let Some(policy) = args.key_policy {
            self.aggregate.key_policy = policy;
        }
        if let Some(delimiter) = args.delimiter {
            self.aggregate.delimiter = delimiter;
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(max) = args.max_examples {
            self.report.max_examples = max;
        }
    }

    /// Log level after merging; `--quiet` overrides a verbose config.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use std::path::PathBuf;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.output, "deductions_report.md");
        assert!(!config.general.verbose);
        assert_eq!(config.source.student_role, "student");
        assert_eq!(config.source.progress_every, 10);
        assert_eq!(config.aggregate.key_policy, KeyPolicy::Label);
        assert_eq!(config.aggregate.delimiter, ':');
        assert_eq!(config.aggregate.unclassified_key, "unclassified");
        assert!(config.aggregate.parallel);
        assert!(config.source.mode.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "custom_report.md"
verbose = true
concurrency = 2

[source]
mode = "attempt"
progress_every = 25

[aggregate]
key_policy = "line"
delimiter = "|"
unclassified_key = "other"
parallel = false

[report]
format = "json"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "custom_report.md");
        assert_eq!(config.general.concurrency, 2);
        assert!(config.general.verbose);
        assert_eq!(config.source.mode, Some(SubmissionMode::Attempt));
        assert_eq!(config.source.progress_every, 25);
        assert_eq!(config.source.student_role, "student");
        assert_eq!(config.aggregate.key_policy, KeyPolicy::Line);
        assert_eq!(config.aggregate.delimiter, '|');
        assert_eq!(config.aggregate.unclassified_key, "other");
        assert!(!config.aggregate.parallel);
        assert_eq!(config.report.format, OutputFormat::Json);
        assert_eq!(config.report.max_examples, 3);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[source]"));
        assert!(toml_str.contains("[aggregate]"));
        assert!(toml_str.contains("[report]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.aggregate.delimiter, ':');
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[aggregate]\nkey_policy = \"line\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.aggregate.key_policy, KeyPolicy::Line);
        assert_eq!(config.general.concurrency, 8);
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[aggregate\n").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_merge_with_args_only_overrides_explicit_values() {
        let mut config = Config::default();
        config.aggregate.key_policy = KeyPolicy::Line;
        config.source.progress_every = 50;

        let mut args = Args::for_input(PathBuf::from("feedback"));
        args.format = Some(OutputFormat::Json);
        args.delimiter = Some('-');
        config.merge_with_args(&args);

        assert_eq!(config.aggregate.key_policy, KeyPolicy::Line);
        assert_eq!(config.source.progress_every, 50);
        assert_eq!(config.report.format, OutputFormat::Json);
        assert_eq!(config.aggregate.delimiter, '-');
    }

    #[test]
    fn test_load_rejects_empty_unclassified_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[aggregate]\nunclassified_key = \"  \"\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("unclassified_key"));
    }

    #[test]
    fn test_load_rejects_whitespace_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[aggregate]\ndelimiter = \" \"\n").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_verbose_merge_and_log_level() {
        let mut config = Config::default();
        assert_eq!(config.log_level(false), tracing::Level::INFO);

        let mut args = Args::for_input(PathBuf::from("feedback"));
        config.merge_with_args(&args);
        assert!(!config.general.verbose);

        args.verbose = true;
        config.merge_with_args(&args);
        assert!(config.general.verbose);
        assert_eq!(config.log_level(false), tracing::Level::DEBUG);
        assert_eq!(config.log_level(true), tracing::Level::ERROR);

        // A verbose config file stays verbose without the flag.
        let mut config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        config.merge_with_args(&Args::for_input(PathBuf::from("feedback")));
        assert_eq!(config.log_level(false), tracing::Level::DEBUG);
    }
}
