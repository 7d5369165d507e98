//! Closed vocabularies and the constraint validator.
//!
//! The vocabulary is loaded once at engine construction (from TOML or the
//! compiled-in default) and is the engine's sole injection boundary: every
//! value capable of reaching query text is filtered here against closed
//! sets, so free-form language can never leak into Cypher.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::CoreResult;
use crate::types::{
    ConstraintSet, Intent, RawConstraints, SequenceSelector, parse_timestamp,
};

/// Fixed vocabulary: valid event types, recognized entity-id prefixes and
/// the synonym table the fallback parser maps phrases through.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub event_types: BTreeSet<String>,
    pub entity_prefixes: Vec<String>,
    pub synonyms: BTreeMap<String, String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        let event_types = [
            "Signup",
            "Purchase",
            "Upgrade",
            "Cancellation",
            "Refund",
            "Filing10K",
            "Filing10Q",
            "Filing8K",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let synonyms = [
            ("sign up", "Signup"),
            ("signed up", "Signup"),
            ("signup", "Signup"),
            ("registered", "Signup"),
            ("purchase", "Purchase"),
            ("purchased", "Purchase"),
            ("bought", "Purchase"),
            ("buy", "Purchase"),
            ("upgrade", "Upgrade"),
            ("upgraded", "Upgrade"),
            ("cancel", "Cancellation"),
            ("cancelled", "Cancellation"),
            ("canceled", "Cancellation"),
            ("cancellation", "Cancellation"),
            ("refund", "Refund"),
            ("refunded", "Refund"),
            ("annual report", "Filing10K"),
            ("annual filing", "Filing10K"),
            ("10-k", "Filing10K"),
            ("quarterly report", "Filing10Q"),
            ("10-q", "Filing10Q"),
            ("8-k", "Filing8K"),
            ("current report", "Filing8K"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            event_types,
            entity_prefixes: vec!["CUST".to_string(), "COMP".to_string(), "FIL".to_string()],
            synonyms,
        }
    }
}

impl Vocabulary {
    /// Parse a vocabulary from TOML text.
    pub fn from_toml_str(text: &str) -> CoreResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a vocabulary from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Whether a token is exactly one of the valid event types.
    pub fn is_known_event_type(&self, token: &str) -> bool {
        self.event_types.contains(token)
    }

    /// Whether a token matches a recognized entity-id pattern:
    /// a known uppercase prefix followed by one or more digits.
    pub fn is_entity_id(&self, token: &str) -> bool {
        self.entity_prefixes.iter().any(|prefix| {
            token
                .strip_prefix(prefix.as_str())
                .map(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
                .unwrap_or(false)
        })
    }

    /// Map a raw event-type token through the vocabulary: exact match first
    /// (case-insensitive), then the synonym table. `None` means unknown.
    pub fn canonical_event_type(&self, token: &str) -> Option<String> {
        let trimmed = token.trim();
        if self.event_types.contains(trimmed) {
            return Some(trimmed.to_string());
        }
        let lowered = trimmed.to_ascii_lowercase();
        if let Some(exact) = self
            .event_types
            .iter()
            .find(|t| t.to_ascii_lowercase() == lowered)
        {
            return Some(exact.clone());
        }
        self.synonyms.get(&lowered).cloned()
    }

    /// Validate and sanitize raw constraints into a `ConstraintSet`.
    ///
    /// Defensive by construction: scalars were already coerced to lists by
    /// the `OneOrMany` decode, unknown event types and malformed entity ids
    /// are dropped with a warning, absent fields get safe defaults, and the
    /// comparison flag is cleared unless two entities survive filtering.
    pub fn validate(&self, raw: RawConstraints) -> ConstraintSet {
        let mut entity_ids = BTreeSet::new();
        for token in raw.entities.into_vec() {
            let id = token.trim().to_ascii_uppercase();
            if self.is_entity_id(&id) {
                entity_ids.insert(id);
            } else if !token.trim().is_empty() {
                warn!(token = %token, "Dropping unrecognized entity id");
            }
        }

        let mut event_types = BTreeSet::new();
        for token in raw.event_types.into_vec() {
            match self.canonical_event_type(&token) {
                Some(canonical) => {
                    event_types.insert(canonical);
                }
                None if !token.trim().is_empty() => {
                    warn!(token = %token, "Dropping event type outside vocabulary");
                }
                None => {}
            }
        }

        let sequence_selector = raw
            .sequence
            .as_deref()
            .and_then(SequenceSelector::from_keyword)
            .unwrap_or_default();

        let mut intent = raw
            .intent
            .as_deref()
            .and_then(Intent::from_keyword)
            .unwrap_or_default();

        let mut is_comparison =
            raw.comparison.unwrap_or(false) || intent == Intent::Comparison;
        if is_comparison && entity_ids.len() < 2 {
            warn!(
                entities = entity_ids.len(),
                "Clearing comparison flag: needs at least two entities"
            );
            is_comparison = false;
            if intent == Intent::Comparison {
                intent = Intent::EventSequence;
            }
        }
        if is_comparison {
            intent = Intent::Comparison;
        }

        let temporal_range = raw.time_range.and_then(|range| {
            let start = range.start.as_deref().and_then(parse_timestamp);
            let end = range.end.as_deref().and_then(parse_timestamp);
            match (start, end) {
                (Some(s), Some(e)) if s <= e => Some((s, e)),
                (Some(_), Some(_)) => {
                    warn!("Dropping inverted temporal range");
                    None
                }
                _ => None,
            }
        });

        ConstraintSet {
            entity_ids,
            event_types,
            sequence_selector,
            is_comparison,
            temporal_range,
            intent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OneOrMany, RawTimeRange};

    #[test]
    fn test_entity_id_pattern() {
        let vocab = Vocabulary::default();
        assert!(vocab.is_entity_id("CUST001"));
        assert!(vocab.is_entity_id("COMP42"));
        assert!(!vocab.is_entity_id("CUST"));
        assert!(!vocab.is_entity_id("CUST00A"));
        assert!(!vocab.is_entity_id("ROBERT"));
    }

    #[test]
    fn test_unknown_event_type_dropped() {
        let vocab = Vocabulary::default();
        let raw = RawConstraints {
            entities: OneOrMany::One("CUST001".to_string()),
            event_types: vec!["Purchase".to_string(), "Teleportation".to_string()].into(),
            ..Default::default()
        };
        let set = vocab.validate(raw);
        assert_eq!(set.event_type_list(), vec!["Purchase".to_string()]);
    }

    #[test]
    fn test_synonym_mapping() {
        let vocab = Vocabulary::default();
        assert_eq!(
            vocab.canonical_event_type("signed up"),
            Some("Signup".to_string())
        );
        assert_eq!(
            vocab.canonical_event_type("annual report"),
            Some("Filing10K".to_string())
        );
        assert_eq!(vocab.canonical_event_type("purchse"), None);
    }

    #[test]
    fn test_scalar_coerced_to_singleton() {
        let vocab = Vocabulary::default();
        let raw = RawConstraints {
            entities: OneOrMany::One("cust001".to_string()),
            ..Default::default()
        };
        let set = vocab.validate(raw);
        assert_eq!(set.entity_list(), vec!["CUST001".to_string()]);
    }

    #[test]
    fn test_comparison_needs_two_entities() {
        let vocab = Vocabulary::default();
        let raw = RawConstraints {
            entities: OneOrMany::One("CUST001".to_string()),
            comparison: Some(true),
            intent: Some("comparison".to_string()),
            ..Default::default()
        };
        let set = vocab.validate(raw);
        assert!(!set.is_comparison);
        assert_eq!(set.intent, Intent::EventSequence);
    }

    #[test]
    fn test_comparison_with_two_entities_kept() {
        let vocab = Vocabulary::default();
        let raw = RawConstraints {
            entities: vec!["CUST001".to_string(), "CUST002".to_string()].into(),
            comparison: Some(true),
            ..Default::default()
        };
        let set = vocab.validate(raw);
        assert!(set.is_comparison);
        assert_eq!(set.intent, Intent::Comparison);
    }

    #[test]
    fn test_inverted_range_dropped() {
        let vocab = Vocabulary::default();
        let raw = RawConstraints {
            time_range: Some(RawTimeRange {
                start: Some("2024-01-01".to_string()),
                end: Some("2023-01-01".to_string()),
            }),
            ..Default::default()
        };
        assert!(vocab.validate(raw).temporal_range.is_none());
    }

    #[test]
    fn test_intent_defaults_to_sequence() {
        let vocab = Vocabulary::default();
        let set = vocab.validate(RawConstraints::default());
        assert_eq!(set.intent, Intent::EventSequence);
    }

    #[test]
    fn test_from_toml() {
        let vocab = Vocabulary::from_toml_str(
            r#"
            event_types = ["Signup", "Purchase"]
            entity_prefixes = ["CUST"]

            [synonyms]
            "joined" = "Signup"
            "#,
        )
        .unwrap();
        assert!(vocab.is_known_event_type("Signup"));
        assert!(!vocab.is_known_event_type("Filing10K"));
        assert_eq!(
            vocab.canonical_event_type("joined"),
            Some("Signup".to_string())
        );
    }
}
