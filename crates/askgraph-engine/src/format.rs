//! Per-intent result rendering.
//!
//! One strategy per template id. Formatters degrade gracefully: missing
//! optional fields render as "unknown", zero records produce an explicit
//! no-data sentence, and no path returns an empty string.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use askgraph_core::{ConstraintSet, SequenceSelector};
use askgraph_graph::{GraphRecord, TemplateId};

/// Render an executed query's records for the original question.
pub fn format_records(
    records: &[GraphRecord],
    constraints: &ConstraintSet,
    template_id: TemplateId,
) -> String {
    match template_id {
        TemplateId::SingleEvent => format_single_event(records, constraints),
        TemplateId::Comparison => format_comparison(records, constraints),
        TemplateId::EventSequence => format_sequence(records, constraints),
        TemplateId::Aggregate => format_aggregate(records, constraints),
    }
}

fn no_match_sentence(constraints: &ConstraintSet) -> String {
    if constraints.entity_ids.is_empty() {
        "No matching events were found.".to_string()
    } else {
        format!(
            "No matching events were found for {}.",
            constraints.entity_list().join(", ")
        )
    }
}

fn display_entity(record: &GraphRecord) -> String {
    let id = record.get_str("entity_id").filter(|s| !s.is_empty());
    let name = record.get_str("entity_name").filter(|s| !s.is_empty());
    match (name, id) {
        (Some(name), Some(id)) => format!("{name} ({id})"),
        (None, Some(id)) => id,
        (Some(name), None) => name,
        (None, None) => "unknown".to_string(),
    }
}

fn display_time(record: &GraphRecord) -> String {
    match record.get_time("timestamp") {
        Some(t) => t.format("%Y-%m-%d %H:%M").to_string(),
        None => record
            .get_str("timestamp")
            .unwrap_or_else(|| "unknown".to_string()),
    }
}

fn display_type(record: &GraphRecord) -> String {
    record
        .get_str("event_type")
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn format_single_event(records: &[GraphRecord], constraints: &ConstraintSet) -> String {
    let Some(record) = records.first() else {
        return no_match_sentence(constraints);
    };

    let sequence_word = match constraints.sequence_selector {
        SequenceSelector::Last => "last",
        _ => "first",
    };
    let mut sentence = format!(
        "{}: {} {} at {}",
        display_entity(record),
        sequence_word,
        display_type(record),
        display_time(record),
    );
    if let Some(details) = record.get_str("details").filter(|s| !s.is_empty()) {
        sentence.push_str(&format!("; details: {details}"));
    }
    sentence.push('.');
    sentence
}

/// Earliest timestamp seen per entity id, keeping the first record's
/// display fields. Records without a parseable timestamp are skipped for
/// ranking but reported as lacking data.
fn earliest_per_entity(
    records: &[GraphRecord],
) -> BTreeMap<String, (DateTime<Utc>, GraphRecord)> {
    let mut earliest: BTreeMap<String, (DateTime<Utc>, GraphRecord)> = BTreeMap::new();
    for record in records {
        let Some(id) = record.get_str("entity_id").filter(|s| !s.is_empty()) else {
            continue;
        };
        let Some(t) = record.get_time("timestamp") else {
            continue;
        };
        match earliest.get(&id) {
            Some((best, _)) if *best <= t => {}
            _ => {
                earliest.insert(id, (t, record.clone()));
            }
        }
    }
    earliest
}

fn format_comparison(records: &[GraphRecord], constraints: &ConstraintSet) -> String {
    let earliest = earliest_per_entity(records);
    if earliest.len() < 2 {
        let mut sentence = format!(
            "No comparison is possible for {}",
            constraints.entity_list().join(", ")
        );
        match earliest.keys().next() {
            Some(only) => sentence.push_str(&format!(": only {only} has matching events.")),
            None => sentence.push_str(": no matching events were found."),
        }
        return sentence;
    }

    // Stable winner on timestamp ties: BTreeMap iteration gives the
    // lexicographically first entity id.
    let Some((winner_id, (winner_time, winner_record))) =
        earliest.iter().min_by_key(|(_, (t, _))| *t)
    else {
        return no_match_sentence(constraints);
    };

    let others: Vec<String> = earliest
        .iter()
        .filter(|(id, _)| id != &winner_id)
        .map(|(_, (t, record))| {
            format!("{} ({})", display_entity(record), t.format("%Y-%m-%d %H:%M"))
        })
        .collect();

    let tied = earliest
        .values()
        .filter(|(t, _)| t == winner_time)
        .count()
        > 1;
    if tied {
        let ids: Vec<String> = earliest
            .iter()
            .filter(|(_, (t, _))| t == winner_time)
            .map(|(id, _)| id.clone())
            .collect();
        return format!(
            "{} occurred at the same time: {} at {}.",
            ids.join(" and "),
            display_type(winner_record),
            winner_time.format("%Y-%m-%d %H:%M"),
        );
    }

    format!(
        "{} was first: {} at {}, ahead of {}.",
        display_entity(winner_record),
        display_type(winner_record),
        winner_time.format("%Y-%m-%d %H:%M"),
        others.join(", "),
    )
}

fn format_sequence(records: &[GraphRecord], constraints: &ConstraintSet) -> String {
    if records.is_empty() {
        return no_match_sentence(constraints);
    }

    // Group by entity, keeping store order inside a group. The store sorts
    // ascending by timestamp; on ties the earlier-returned record stays
    // first (stable by construction).
    let mut groups: Vec<(String, Vec<&GraphRecord>)> = Vec::new();
    for record in records {
        let id = record
            .get_str("entity_id")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        match groups.last_mut() {
            Some((current, members)) if *current == id => members.push(record),
            _ => groups.push((id, vec![record])),
        }
    }

    let mut out = String::new();
    for (_, members) in &groups {
        let header = display_entity(members[0]);
        out.push_str(&format!("{header}:\n"));
        for record in members {
            let mut line = format!("  - {}: {}", display_time(record), display_type(record));
            if let Some(details) = record.get_str("details").filter(|s| !s.is_empty()) {
                line.push_str(&format!(" ({details})"));
            }
            line.push('\n');
            out.push_str(&line);
        }
    }
    out.trim_end().to_string()
}

fn format_aggregate(records: &[GraphRecord], constraints: &ConstraintSet) -> String {
    if records.is_empty() {
        return no_match_sentence(constraints);
    }

    let mut parts = Vec::new();
    let mut total: i64 = 0;
    for record in records {
        let count = record.get_int("event_count").unwrap_or(0);
        total += count;
        let id = record
            .get_str("entity_id")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        let noun = if count == 1 { "event" } else { "events" };
        parts.push(format!("{} has {} {} {}", id, count, display_type(record), noun));
    }

    format!("{}. Total: {} event(s).", parts.join("; "), total)
}
