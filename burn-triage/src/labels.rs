//! Model label list and mapping onto the fixed burn-degree labels.

use crate::error::{EngineError, EngineResult};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Raw labels that explicitly mean "this is not a burn".
pub const NON_BURN_SYNONYMS: [&str; 10] = [
    "other",
    "non-burn",
    "nonburn",
    "background",
    "bg",
    "not burn",
    "not_burn",
    "no burn",
    "negative",
    "none",
];

/// Number of canonical severity labels; label files of this length map by index.
pub const CANONICAL_COUNT: usize = 3;

/// User-facing burn degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CanonicalLabel {
    #[serde(rename = "First-degree burn")]
    FirstDegree,
    #[serde(rename = "Second-degree burn")]
    SecondDegree,
    #[serde(rename = "Third-degree burn")]
    ThirdDegree,
}

impl CanonicalLabel {
    /// Ordinal order; position equals the model class index for 3-label files.
    pub const ALL: [CanonicalLabel; CANONICAL_COUNT] = [
        CanonicalLabel::FirstDegree,
        CanonicalLabel::SecondDegree,
        CanonicalLabel::ThirdDegree,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalLabel::FirstDegree => "First-degree burn",
            CanonicalLabel::SecondDegree => "Second-degree burn",
            CanonicalLabel::ThirdDegree => "Third-degree burn",
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Exact (case-insensitive) name match, then "1st"/"first"-style cues.
    pub fn from_text(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if let Some(exact) = Self::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(trimmed))
        {
            return Some(exact);
        }

        let lower = trimmed.to_lowercase();
        if lower.contains("1st") || lower.contains("first") {
            Some(CanonicalLabel::FirstDegree)
        } else if lower.contains("2nd") || lower.contains("second") {
            Some(CanonicalLabel::SecondDegree)
        } else if lower.contains("3rd") || lower.contains("third") {
            Some(CanonicalLabel::ThirdDegree)
        } else {
            None
        }
    }
}

impl fmt::Display for CanonicalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_non_burn(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    NON_BURN_SYNONYMS.contains(&lower.as_str())
}

/// Map the model's top class to a canonical label.
///
/// A non-burn synonym always rejects. Otherwise a label list of exactly
/// [`CANONICAL_COUNT`] entries is trusted positionally; any other length
/// falls back to matching the raw text.
pub fn canonicalize(
    top_index: usize,
    raw_label: Option<&str>,
    label_count: usize,
) -> Option<CanonicalLabel> {
    if raw_label.is_some_and(is_non_burn) {
        return None;
    }
    if label_count == CANONICAL_COUNT {
        if let Some(label) = CanonicalLabel::from_index(top_index) {
            return Some(label);
        }
    }
    raw_label.and_then(CanonicalLabel::from_text)
}

/// Ordered class names read from the model's label file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    pub fn new(labels: Vec<String>) -> EngineResult<Self> {
        if labels.is_empty() {
            return Err(EngineError::configuration("label list is empty"));
        }
        Ok(Self { labels })
    }

    /// One label per line; surrounding whitespace and blank lines are dropped.
    pub fn parse(text: &str) -> EngineResult<Self> {
        let labels = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(labels)
    }

    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            EngineError::configuration(format!("cannot read labels {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Trimmed label text for a class index, `None` when out of range.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(|s| s.trim())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}
