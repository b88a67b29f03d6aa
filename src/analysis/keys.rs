//! Category key derivation for deduction lines.

use crate::config::AggregateConfig;
use crate::models::KeyPolicy;
use regex::Regex;
use std::sync::LazyLock;

/// Default key for lines that carry no recognizable category.
pub const UNCLASSIFIED_KEY: &str = "unclassified";

/// A leading bullet: a dash followed by whitespace, or a star/dot glyph.
static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:-\s+|[*•·]\s*)").unwrap());

/// A leading point value such as `-2`, `(-1.5 pts)`, `[3]` or `2 pts`.
///
/// An unsigned, unbracketed number only counts with a unit, so labels
/// like `2D arrays` keep their digits. Number and unit must end on a
/// word boundary.
static POINTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^(?:
            [(\[] \s* [-+]? \d+(?:\.\d+)? (?:\s*(?:pts?|points?)\b)? \s* [)\]]
          | [-+] \d+(?:\.\d+)? (?:\s*(?:pts?|points?)\b | \b)
          | \d+(?:\.\d+)? \s*(?:pts?|points?)\b
        )
        [\s.)\]]*",
    )
    .unwrap()
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Rule turning a deduction line into a category key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRule {
    pub policy: KeyPolicy,
    /// Separator between a label and the rest of a line.
    pub delimiter: char,
    /// Key that collects lines with no recognizable category.
    pub unclassified: String,
}

impl Default for KeyRule {
    fn default() -> Self {
        Self {
            policy: KeyPolicy::Label,
            delimiter: ':',
            unclassified: UNCLASSIFIED_KEY.to_string(),
        }
    }
}

impl From<&AggregateConfig> for KeyRule {
    fn from(config: &AggregateConfig) -> Self {
        Self {
            policy: config.key_policy,
            delimiter: config.delimiter,
            unclassified: config.unclassified_key.clone(),
        }
    }
}

impl KeyRule {
    /// Rule with the given policy and default delimiter.
    #[cfg(test)]
    pub fn with_policy(policy: KeyPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Derive the category key for one line.
    ///
    /// Always returns a key; lines that do not fit the policy get the
    /// unclassified key.
    pub fn key_for(&self, line: &str) -> String {
        let key = match self.policy {
            KeyPolicy::Label => self.label_of(line),
            KeyPolicy::Line => Some(normalize(line)),
        };

        match key {
            Some(key) if key.chars().any(char::is_alphanumeric) => key,
            _ => self.unclassified.clone(),
        }
    }

    fn label_of(&self, line: &str) -> Option<String> {
        let rest = BULLET.replace(line.trim(), "");
        let rest = POINTS.replace(&rest, "");
        let (label, _) = rest.split_once(self.delimiter)?;
        Some(normalize(label))
    }
}

/// Lowercase, trim and collapse internal whitespace.
fn normalize(text: &str) -> String {
    WHITESPACE
        .replace_all(text.trim(), " ")
        .to_lowercase()
}
