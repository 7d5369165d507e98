//! Constraint types: the validated `ConstraintSet` consumed by query
//! synthesis, and the lenient `RawConstraints` shape that extraction
//! (LLM or fallback) produces before validation.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Position selector for questions about ordered event sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceSelector {
    First,
    Last,
    #[default]
    All,
}

impl SequenceSelector {
    /// Map a free-text keyword to a selector.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "first" | "earliest" | "initial" | "oldest" => Some(Self::First),
            "last" | "latest" | "newest" | "final" | "most_recent" => Some(Self::Last),
            "all" | "every" => Some(Self::All),
            _ => None,
        }
    }
}

/// High-level shape of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    SingleEvent,
    #[default]
    EventSequence,
    Comparison,
    Aggregate,
}

impl Intent {
    /// Map a free-text keyword to an intent.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "single_event" | "single" | "fact" | "when" => Some(Self::SingleEvent),
            "event_sequence" | "sequence" | "timeline" | "history" => Some(Self::EventSequence),
            "comparison" | "compare" | "versus" => Some(Self::Comparison),
            "aggregate" | "count" | "total" => Some(Self::Aggregate),
            _ => None,
        }
    }
}

/// A field the LLM may return either as a scalar or as a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::One(s) => s.is_empty(),
            Self::Many(v) => v.is_empty(),
        }
    }

    /// Append additional values, preserving existing ones.
    pub fn extend_from<I: IntoIterator<Item = String>>(&mut self, extra: I) {
        let mut merged = std::mem::take(self).into_vec();
        merged.extend(extra);
        *self = Self::Many(merged);
    }
}

impl From<Vec<String>> for OneOrMany {
    fn from(v: Vec<String>) -> Self {
        Self::Many(v)
    }
}

/// Unvalidated time window; ends are free-text timestamps.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTimeRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Pre-validation constraint shape.
///
/// This is what the extractor decodes out of the LLM reply (every field
/// optional, scalar-or-list tolerated) and what the fallback parser emits.
/// Only `Vocabulary::validate` turns it into a `ConstraintSet`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConstraints {
    pub entities: OneOrMany,
    pub event_types: OneOrMany,
    pub sequence: Option<String>,
    pub comparison: Option<bool>,
    pub intent: Option<String>,
    pub time_range: Option<RawTimeRange>,
}

/// Validated, immutable intent of one question.
///
/// Every value in here has passed the vocabulary filter; this is the only
/// shape the query layer ever sees. Invariant: `is_comparison` implies at
/// least two entity ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintSet {
    pub entity_ids: BTreeSet<String>,
    pub event_types: BTreeSet<String>,
    pub sequence_selector: SequenceSelector,
    pub is_comparison: bool,
    pub temporal_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub intent: Intent,
}

impl Default for ConstraintSet {
    fn default() -> Self {
        Self {
            entity_ids: BTreeSet::new(),
            event_types: BTreeSet::new(),
            sequence_selector: SequenceSelector::All,
            is_comparison: false,
            temporal_range: None,
            intent: Intent::EventSequence,
        }
    }
}

impl ConstraintSet {
    /// Entity ids in sorted order, for array parameter binding.
    pub fn entity_list(&self) -> Vec<String> {
        self.entity_ids.iter().cloned().collect()
    }

    /// Event types in sorted order, for array parameter binding.
    pub fn event_type_list(&self) -> Vec<String> {
        self.event_types.iter().cloned().collect()
    }
}

/// Parse a timestamp in the formats the graph store and the LLM produce:
/// RFC 3339, `YYYY-MM-DDTHH:MM[:SS]`, or a bare `YYYY-MM-DD` date.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_or_many_scalar_decodes() {
        let raw: RawConstraints =
            serde_json::from_str(r#"{"entities": "CUST001", "event_types": ["Purchase"]}"#)
                .unwrap();
        assert_eq!(raw.entities.into_vec(), vec!["CUST001".to_string()]);
        assert_eq!(raw.event_types.into_vec(), vec!["Purchase".to_string()]);
    }

    #[test]
    fn test_raw_constraints_all_fields_optional() {
        let raw: RawConstraints = serde_json::from_str("{}").unwrap();
        assert!(raw.entities.is_empty());
        assert!(raw.sequence.is_none());
        assert!(raw.time_range.is_none());
    }

    #[test]
    fn test_sequence_selector_keywords() {
        assert_eq!(
            SequenceSelector::from_keyword("earliest"),
            Some(SequenceSelector::First)
        );
        assert_eq!(
            SequenceSelector::from_keyword("Latest"),
            Some(SequenceSelector::Last)
        );
        assert_eq!(SequenceSelector::from_keyword("sideways"), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2023-06-15T10:30:00Z").is_some());
        assert!(parse_timestamp("2023-06-15T10:30").is_some());
        assert!(parse_timestamp("2023-06-15").is_some());
        assert!(parse_timestamp("June 15th").is_none());
    }

    #[test]
    fn test_default_intent_is_sequence() {
        assert_eq!(ConstraintSet::default().intent, Intent::EventSequence);
    }
}
