//! Deductions Checker - tally grader deductions from student feedback
//!
//! A CLI tool that reads each student's final feedback box from an
//! exported submission roster, extracts the deduction bullets, and
//! counts them per category.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (unreadable input, invalid export, config error, etc.)

mod analysis;
mod cli;
mod config;
mod extract;
mod models;
mod progress;
mod report;
mod source;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use models::{DeductionLine, ReportMetadata};
use progress::{BarProgress, NoProgress, ProgressSink};
use source::{FeedbackSource, SourceOptions};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config decides the log level, so it is loaded before logging starts
    let (mut config, config_origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(config.log_level(args.quiet));

    info!("Deductions Checker v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match config_origin {
        ConfigOrigin::File(path) => info!("Loaded config from: {}", path.display()),
        ConfigOrigin::Defaults => debug!("No config file found, using defaults"),
        ConfigOrigin::Fallback(e) => warn!("Failed to load config, using defaults: {:#}", e),
    }

    if let Err(e) = run(args, config).await {
        error!("Run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .deductions.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize grouping, roles, and report output.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Collect feedback, tally deductions, and write the report.
async fn run(args: Args, config: Config) -> Result<()> {
    let start_time = Instant::now();

    let input = args.input_path();
    let options = SourceOptions::from_config(&config.general, &config.source);
    let rule = analysis::KeyRule::from(&config.aggregate);

    // Step 1: Collect feedback
    println!("📥 Reading feedback from: {}", input.display());
    let source = FeedbackSource::open(&input, config.source.mode, options)
        .await
        .with_context(|| format!("Failed to open {}", input.display()))?;
    println!("   Mode: {}", source.mode());

    let sink: Box<dyn ProgressSink> = if args.quiet {
        Box::new(NoProgress)
    } else {
        Box::new(BarProgress::new())
    };
    let outcome = source.fetch(sink.as_ref()).await?;

    // Step 2: Extract deduction lines
    let per_student = extract::extract_all(&outcome.blobs);

    if args.dry_run {
        print_dry_run(&per_student);
        return Ok(());
    }

    // Step 3: Tally
    let tally = if config.aggregate.parallel {
        analysis::aggregate_parallel(&per_student, &rule)
    } else {
        analysis::aggregate(&per_student, &rule)
    };
    let lines: Vec<DeductionLine> = per_student.into_iter().flatten().collect();

    if let Some(unclassified) = tally.get(&rule.unclassified) {
        warn!(
            "{} deduction lines matched no category and were counted as '{}'",
            unclassified, rule.unclassified
        );
    }

    // Step 4: Build and save the report
    println!("\n📝 Generating report...");

    let metadata = ReportMetadata {
        source: input.display().to_string(),
        mode: source.mode(),
        generated_at: Utc::now(),
        roster_size: outcome.roster_size,
        students_with_feedback: outcome.blobs.len(),
        students_skipped: outcome.skipped,
        deduction_lines: lines.len(),
        key_policy: rule.policy,
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };

    let report = report::build_report(report::ReportInput {
        metadata,
        tally,
        lines: &lines,
        rule: &rule,
        max_examples: config.report.max_examples,
    });

    let output = match config.report.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    let output_path = PathBuf::from(&config.general.output);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    println!("\n📊 Deduction Summary:");
    println!(
        "   Students: {} ({} skipped)",
        report.metadata.roster_size, report.metadata.students_skipped
    );
    println!(
        "   Deduction lines: {} in {} categories",
        report.tally.total(),
        report.tally.len()
    );
    for (category, count) in report.tally.ranked().into_iter().take(5) {
        println!("   - {}: {}", category, count);
    }
    println!("   Duration: {:.1}s", report.metadata.duration_seconds);
    println!("\n✅ Done! Report saved to: {}", output_path.display());

    Ok(())
}

/// Handle --dry-run: print extracted lines per student, no report.
fn print_dry_run(per_student: &[Vec<DeductionLine>]) {
    println!("\n🔍 Dry run: extracted deduction lines\n");

    for lines in per_student {
        let Some(first) = lines.first() else {
            continue;
        };
        println!("   👤 {}", first.student);
        for line in lines {
            println!("      {}", line.text);
        }
    }

    let total: usize = per_student.iter().map(Vec::len).sum();
    println!("\n   Total: {} lines from {} students", total, per_student.len());
    println!("\n✅ Dry run complete. No report was written.");
}

/// Where the active configuration came from.
enum ConfigOrigin {
    File(PathBuf),
    Defaults,
    /// The default config file exists but could not be used.
    Fallback(anyhow::Error),
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up; the origin is logged afterwards.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigOrigin::File(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigOrigin::File(PathBuf::from(CONFIG_FILE_NAME)))),
        Ok(None) => Ok((Config::default(), ConfigOrigin::Defaults)),
        Err(e) => Ok((Config::default(), ConfigOrigin::Fallback(e))),
    }
}
