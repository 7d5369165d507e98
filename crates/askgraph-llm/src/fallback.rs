//! Heuristic fallback parser.
//!
//! Used whenever the LLM path fails. Scans the raw question for vocabulary
//! entity-id patterns, event-type synonyms, ordering words and disjunctive
//! phrasing. Total by construction: it never errors, worst case is an
//! empty `RawConstraints`.

use std::collections::BTreeSet;

use askgraph_core::{RawConstraints, RawTimeRange, SequenceSelector, Vocabulary};

/// Best-effort constraint extraction without the LLM.
pub fn fallback_parse(query: &str, vocab: &Vocabulary) -> RawConstraints {
    let lowered = query.to_lowercase();

    let entities = scan_entities(query, vocab);
    let event_types = scan_event_types(&lowered, vocab);
    let sequence = scan_sequence(&lowered);
    let is_comparison = entities.len() >= 2 && has_disjunction(&lowered);
    let is_aggregate = has_aggregate_phrasing(&lowered);

    let intent = if is_comparison {
        Some("comparison".to_string())
    } else if is_aggregate {
        Some("aggregate".to_string())
    } else if matches!(
        sequence.as_deref().and_then(SequenceSelector::from_keyword),
        Some(SequenceSelector::First) | Some(SequenceSelector::Last)
    ) {
        Some("single_event".to_string())
    } else {
        None
    };

    RawConstraints {
        entities: entities.into(),
        event_types: event_types.into(),
        sequence,
        comparison: Some(is_comparison),
        intent,
        time_range: scan_years(query),
    }
}

fn scan_entities(query: &str, vocab: &Vocabulary) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for token in query.split(|c: char| !c.is_ascii_alphanumeric()) {
        let candidate = token.to_ascii_uppercase();
        if vocab.is_entity_id(&candidate) && seen.insert(candidate.clone()) {
            out.push(candidate);
        }
    }
    out
}

fn scan_event_types(lowered: &str, vocab: &Vocabulary) -> Vec<String> {
    let mut found = BTreeSet::new();
    for (phrase, canonical) in &vocab.synonyms {
        if lowered.contains(phrase.as_str()) {
            found.insert(canonical.clone());
        }
    }
    for event_type in &vocab.event_types {
        if lowered.contains(&event_type.to_lowercase()) {
            found.insert(event_type.clone());
        }
    }
    found.into_iter().collect()
}

fn scan_sequence(lowered: &str) -> Option<String> {
    for word in lowered.split(|c: char| !c.is_ascii_alphanumeric()) {
        if SequenceSelector::from_keyword(word).is_some() {
            return Some(word.to_string());
        }
    }
    None
}

fn has_disjunction(lowered: &str) -> bool {
    lowered.contains(" or ")
        || lowered.contains(" vs ")
        || lowered.contains(" vs. ")
        || lowered.contains("versus")
        || lowered.contains("compar")
}

fn has_aggregate_phrasing(lowered: &str) -> bool {
    lowered.contains("how many")
        || lowered.contains("number of")
        || lowered.contains("count of")
        || lowered.starts_with("count ")
}

/// Pull a time window out of bare year mentions ("in 2023",
/// "between 2021 and 2023"). One year means that calendar year; two or
/// more mean the span from the earliest to the latest. Only standalone
/// four-digit tokens count: digits embedded in a larger token (an entity
/// id like CUST2023) are not years.
fn scan_years(query: &str) -> Option<RawTimeRange> {
    let mut years: Vec<i32> = query
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() == 4 && t.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|t| t.parse().ok())
        .filter(|y| (1900..=2100).contains(y))
        .collect();
    years.sort_unstable();
    let first = *years.first()?;
    let last = *years.last()?;
    Some(RawTimeRange {
        start: Some(format!("{first}-01-01")),
        end: Some(format!("{last}-12-31")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use askgraph_core::Intent;

    fn vocab() -> Vocabulary {
        Vocabulary::default()
    }

    #[test]
    fn test_scenario_first_purchase() {
        let raw = fallback_parse("When did CUST001 make their first purchase?", &vocab());
        let set = vocab().validate(raw);
        assert_eq!(set.entity_list(), vec!["CUST001".to_string()]);
        assert_eq!(set.event_type_list(), vec!["Purchase".to_string()]);
        assert_eq!(set.sequence_selector, SequenceSelector::First);
        assert_eq!(set.intent, Intent::SingleEvent);
    }

    #[test]
    fn test_scenario_comparison() {
        let raw = fallback_parse("Who signed up first, CUST001 or CUST002?", &vocab());
        let set = vocab().validate(raw);
        assert!(set.is_comparison);
        assert_eq!(
            set.entity_list(),
            vec!["CUST001".to_string(), "CUST002".to_string()]
        );
        assert!(set.event_types.contains("Signup"));
    }

    #[test]
    fn test_aggregate_phrasing() {
        let raw = fallback_parse("How many purchases did CUST007 make?", &vocab());
        assert_eq!(raw.intent.as_deref(), Some("aggregate"));
    }

    #[test]
    fn test_single_entity_never_comparison() {
        let raw = fallback_parse("Did CUST001 upgrade or cancel?", &vocab());
        assert_eq!(raw.comparison, Some(false));
    }

    #[test]
    fn test_year_window() {
        let raw = fallback_parse("What did COMP12 file between 2021 and 2023?", &vocab());
        let range = raw.time_range.unwrap();
        assert_eq!(range.start.as_deref(), Some("2021-01-01"));
        assert_eq!(range.end.as_deref(), Some("2023-12-31"));
    }

    #[test]
    fn test_entity_id_digits_are_not_a_year() {
        let raw = fallback_parse("When did CUST2023 sign up?", &vocab());
        assert!(raw.time_range.is_none());
        assert_eq!(raw.entities.clone().into_vec(), vec!["CUST2023".to_string()]);

        // A standalone year next to such an id still opens a window.
        let raw = fallback_parse("What did CUST2023 buy in 2022?", &vocab());
        let range = raw.time_range.unwrap();
        assert_eq!(range.start.as_deref(), Some("2022-01-01"));
        assert_eq!(range.end.as_deref(), Some("2022-12-31"));
    }

    #[test]
    fn test_garbage_yields_empty_constraints() {
        for garbage in ["", "???", "\u{0}\u{1}", "¯\\_(ツ)_/¯", "   \n\t  "] {
            let raw = fallback_parse(garbage, &vocab());
            assert!(raw.entities.is_empty());
            assert!(raw.event_types.is_empty());
        }
    }

    #[test]
    fn test_latest_maps_to_last() {
        let raw = fallback_parse("What was the latest filing by COMP3?", &vocab());
        assert_eq!(raw.sequence.as_deref(), Some("latest"));
        let set = vocab().validate(raw);
        assert_eq!(set.sequence_selector, SequenceSelector::Last);
    }
}
