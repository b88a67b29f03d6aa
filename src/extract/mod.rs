//! Deduction line extraction.
//!
//! Strips the structural headers graders put in the feedback box and
//! splits what remains into one string per deduction bullet.

use crate::models::{DeductionLine, FeedbackBlob};
use rayon::prelude::*;
use regex::Regex;
use std::sync::LazyLock;

/// Everything from the start of the text through the first
/// `General Deductions:` marker, plus the whitespace after it.
static GENERAL_DEDUCTIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A.*?General Deductions:\s*").unwrap());

/// The `Creative Extension:` marker and trailing spaces on the same line.
static CREATIVE_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Creative Extension:[^\S\r\n]*").unwrap());

/// The `Testing/Reflection:` marker and everything after it.
static TESTING_REFLECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Testing/Reflection:.*\z").unwrap());

/// Extract deduction bullets from one feedback text.
///
/// Missing markers are no-ops, so text without any headers comes back
/// split into trimmed, non-empty lines.
pub fn extract(text: &str) -> Vec<String> {
    let trimmed = GENERAL_DEDUCTIONS.replacen(text, 1, "");
    let trimmed = CREATIVE_EXTENSION.replacen(&trimmed, 1, "");
    let trimmed = TESTING_REFLECTION.replacen(&trimmed, 1, "");

    trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Extract deduction lines from a blob, tagging each with its student.
pub fn extract_blob(blob: &FeedbackBlob) -> Vec<DeductionLine> {
    extract(&blob.content)
        .into_iter()
        .map(|text| DeductionLine {
            student: blob.student.clone(),
            text,
        })
        .collect()
}

/// Extract every blob in parallel, one line list per blob, in input order.
pub fn extract_all(blobs: &[FeedbackBlob]) -> Vec<Vec<DeductionLine>> {
    blobs.par_iter().map(extract_blob).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_worked_example() {
        let text = "General Deductions: -2 late\n-1 missing test\nTesting/Reflection: great job";
        assert_eq!(extract(text), vec!["-2 late", "-1 missing test"]);
    }

    #[test]
    fn test_extract_without_markers_splits_lines() {
        let text = "  -1 naming  \n\n\t-2 no comments\r\n   \n-1 long method";
        assert_eq!(
            extract(text),
            vec!["-1 naming", "-2 no comments", "-1 long method"]
        );
    }

    #[test]
    fn test_extract_drops_text_before_general_deductions() {
        let text = "Overall: nice work!\nScore: 18/20\nGeneral Deductions:\n-1 spacing\n-1 magic number";
        assert_eq!(extract(text), vec!["-1 spacing", "-1 magic number"]);
    }

    #[test]
    fn test_extract_only_first_general_marker_is_anchor() {
        let text = "intro General Deductions: -1 a\nGeneral Deductions: -2 b";
        assert_eq!(extract(text), vec!["-1 a", "General Deductions: -2 b"]);
    }

    #[test]
    fn test_extract_removes_creative_marker_only() {
        let text = "General Deductions:\n-1 spacing\nCreative Extension: -1 missing feature\n-2 crash";
        assert_eq!(
            extract(text),
            vec!["-1 spacing", "-1 missing feature", "-2 crash"]
        );
    }

    #[test]
    fn test_extract_creative_marker_does_not_join_lines() {
        let text = "-1 spacing\nCreative Extension:\n-1 missing feature";
        assert_eq!(extract(text), vec!["-1 spacing", "-1 missing feature"]);
    }

    #[test]
    fn test_extract_drops_everything_after_testing_reflection() {
        let text = "-1 spacing\nTesting/Reflection: fine\n-3 looks like a deduction\n-4 another";
        assert_eq!(extract(text), vec!["-1 spacing"]);
    }

    #[test]
    fn test_extract_testing_reflection_mid_line() {
        let text = "-1 spacing Testing/Reflection: -5 hidden";
        assert_eq!(extract(text), vec!["-1 spacing"]);
    }

    #[test]
    fn test_extract_markers_are_case_sensitive() {
        let text = "general deductions: -1 a\ntesting/reflection: -2 b";
        assert_eq!(
            extract(text),
            vec!["general deductions: -1 a", "testing/reflection: -2 b"]
        );
    }

    #[test]
    fn test_extract_empty_inputs() {
        assert!(extract("").is_empty());
        assert!(extract("   \n\t\n").is_empty());
        assert!(extract("General Deductions:   \n  ").is_empty());
        assert!(extract("Testing/Reflection: all good").is_empty());
    }

    #[test]
    fn test_extract_fixture_feedback() {
        let text = include_str!("../../fixtures/feedback/alice.txt");
        assert_eq!(
            extract(text),
            vec![
                "- Style: inconsistent indentation (-1)",
                "- Late: submitted 2 days late (-2)",
                "- Testing: missing edge case tests (-1)",
            ]
        );
    }

    #[test]
    fn test_extract_blob_tags_student() {
        let blob = FeedbackBlob::new("42", "General Deductions: -1 a\n-2 b");
        let lines = extract_blob(&blob);
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.student == "42"));
        assert_eq!(lines[1].text, "-2 b");
    }

    #[test]
    fn test_extract_all_keeps_blob_order() {
        let blobs: Vec<FeedbackBlob> = (0..50)
            .map(|i| FeedbackBlob::new(i.to_string(), format!("- Item: {}\n- Other: x", i)))
            .collect();

        let all = extract_all(&blobs);
        assert_eq!(all.len(), 50);
        for (i, lines) in all.iter().enumerate() {
            assert_eq!(lines.len(), 2);
            assert_eq!(lines[0].student, i.to_string());
        }
    }
}
