//! Markdown and JSON report generation.
//!
//! This module assembles a [`Report`] from a finished tally and renders
//! it for graders.

use crate::analysis::{group_lines, students_per_key, KeyRule};
use crate::models::{DeductionLine, DeductionTally, Report, ReportMetadata};
use anyhow::Result;

/// Everything needed to assemble a report.
pub struct ReportInput<'a> {
    pub metadata: ReportMetadata,
    pub tally: DeductionTally,
    /// All extracted lines, used for examples and student counts.
    pub lines: &'a [DeductionLine],
    pub rule: &'a KeyRule,
    /// Example lines kept per category.
    pub max_examples: usize,
}

/// Assemble the report, attaching example lines to each category.
pub fn build_report(input: ReportInput<'_>) -> Report {
    let examples = group_lines(input.lines, input.rule)
        .into_iter()
        .map(|(key, mut lines)| {
            lines.truncate(input.max_examples);
            (key, lines)
        })
        .filter(|(_, lines)| !lines.is_empty())
        .collect();

    Report {
        metadata: input.metadata,
        tally: input.tally,
        students: students_per_key(input.lines, input.rule),
        examples,
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# Deductions Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(report));
    output.push_str(&generate_examples_section(report));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** `{}`\n", metadata.source));
    section.push_str(&format!("- **Mode:** {}\n", metadata.mode));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Students:** {}\n", metadata.roster_size));
    section.push_str(&format!(
        "- **With Feedback:** {}\n",
        metadata.students_with_feedback
    ));
    if metadata.students_skipped > 0 {
        section.push_str(&format!(
            "- **Skipped (no submission):** {}\n",
            metadata.students_skipped
        ));
    }
    section.push_str(&format!(
        "- **Deduction Lines:** {}\n",
        metadata.deduction_lines
    ));
    section.push_str(&format!("- **Grouped By:** {}\n", metadata.key_policy));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the category summary table.
fn generate_summary_section(report: &Report) -> String {
    let mut section = String::new();

    section.push_str("## Deductions by Category\n\n");

    if report.tally.is_empty() {
        section.push_str("No deductions were found.\n\n");
        return section;
    }

    section.push_str("| Category | Count | Students |\n");
    section.push_str("|:---|:---:|:---:|\n");

    for (category, count) in report.tally.ranked() {
        let students = report.students.get(category).copied().unwrap_or(0);
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            escape_cell(category),
            count,
            students
        ));
    }
    section.push_str(&format!("| **Total** | **{}** | |\n\n", report.tally.total()));

    section
}

/// Generate example lines per category, in summary order.
fn generate_examples_section(report: &Report) -> String {
    if report.examples.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Examples\n\n");

    for (category, _) in report.tally.ranked() {
        let Some(lines) = report.examples.get(category) else {
            continue;
        };

        section.push_str(&format!("### {}\n\n", category));
        for line in lines {
            section.push_str(&format!("- `{}`: {}\n", line.student, line.text));
        }
        section.push('\n');
    }

    section
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by deductions-checker*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
