//! The closed Cypher template set and the intent-to-template selector.
//!
//! Graph schema: `(e:Entity {id, name})-[:PERFORMED]->(ev:Event {type,
//! timestamp, details})`, with timestamps stored as sortable
//! `YYYY-MM-DDTHH:MM:SS` strings.
//!
//! Every query the engine can ever run is a constant in this module.
//! Optional clauses (event-type filter, time window) are handled by
//! selecting among pre-written variants; nothing is ever spliced into
//! query text at runtime.

use askgraph_core::{ConstraintSet, Intent, SequenceSelector};

/// The four structurally different query shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateId {
    SingleEvent,
    Comparison,
    EventSequence,
    Aggregate,
}

/// Sort direction for the single-event shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    Asc,
    Desc,
}

/// Which optional clauses a template carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateVariant {
    pub order: Order,
    pub typed: bool,
    pub windowed: bool,
}

impl TemplateVariant {
    /// Derive the variant from which optional constraints are present.
    pub fn for_constraints(constraints: &ConstraintSet) -> Self {
        Self {
            order: match constraints.sequence_selector {
                SequenceSelector::Last => Order::Desc,
                _ => Order::Asc,
            },
            typed: !constraints.event_types.is_empty(),
            windowed: constraints.temporal_range.is_some(),
        }
    }
}

/// Pick the template for a validated constraint set.
///
/// Pure decision table, priority ordered; unsupported shapes resolve to the
/// timeline template rather than erroring.
pub fn select_template(constraints: &ConstraintSet) -> TemplateId {
    if constraints.is_comparison && constraints.entity_ids.len() >= 2 {
        return TemplateId::Comparison;
    }
    if constraints.intent == Intent::SingleEvent
        && matches!(
            constraints.sequence_selector,
            SequenceSelector::First | SequenceSelector::Last
        )
    {
        return TemplateId::SingleEvent;
    }
    if constraints.intent == Intent::Aggregate {
        return TemplateId::Aggregate;
    }
    TemplateId::EventSequence
}

const SINGLE_FIRST: &str = "\
MATCH (e:Entity)-[:PERFORMED]->(ev:Event)
WHERE e.id IN $entity_ids
RETURN e.id AS entity_id, COALESCE(e.name, '') AS entity_name,
       ev.type AS event_type, ev.timestamp AS timestamp,
       COALESCE(ev.details, '') AS details
ORDER BY ev.timestamp ASC
LIMIT 1";

const SINGLE_FIRST_TYPED: &str = "\
MATCH (e:Entity)-[:PERFORMED]->(ev:Event)
WHERE e.id IN $entity_ids AND ev.type IN $event_types
RETURN e.id AS entity_id, COALESCE(e.name, '') AS entity_name,
       ev.type AS event_type, ev.timestamp AS timestamp,
       COALESCE(ev.details, '') AS details
ORDER BY ev.timestamp ASC
LIMIT 1";

const SINGLE_FIRST_WINDOWED: &str = "\
MATCH (e:Entity)-[:PERFORMED]->(ev:Event)
WHERE e.id IN $entity_ids
  AND ev.timestamp >= $window_start AND ev.timestamp <= $window_end
RETURN e.id AS entity_id, COALESCE(e.name, '') AS entity_name,
       ev.type AS event_type, ev.timestamp AS timestamp,
       COALESCE(ev.details, '') AS details
ORDER BY ev.timestamp ASC
LIMIT 1";

const SINGLE_FIRST_TYPED_WINDOWED: &str = "\
MATCH (e:Entity)-[:PERFORMED]->(ev:Event)
WHERE e.id IN $entity_ids AND ev.type IN $event_types
  AND ev.timestamp >= $window_start AND ev.timestamp <= $window_end
RETURN e.id AS entity_id, COALESCE(e.name, '') AS entity_name,
       ev.type AS event_type, ev.timestamp AS timestamp,
       COALESCE(ev.details, '') AS details
ORDER BY ev.timestamp ASC
LIMIT 1";

const SINGLE_LAST: &str = "\
MATCH (e:Entity)-[:PERFORMED]->(ev:Event)
WHERE e.id IN $entity_ids
RETURN e.id AS entity_id, COALESCE(e.name, '') AS entity_name,
       ev.type AS event_type, ev.timestamp AS timestamp,
       COALESCE(ev.details, '') AS details
ORDER BY ev.timestamp DESC
LIMIT 1";

const SINGLE_LAST_TYPED: &str = "\
MATCH (e:Entity)-[:PERFORMED]->(ev:Event)
WHERE e.id IN $entity_ids AND ev.type IN $event_types
RETURN e.id AS entity_id, COALESCE(e.name, '') AS entity_name,
       ev.type AS event_type, ev.timestamp AS timestamp,
       COALESCE(ev.details, '') AS details
ORDER BY ev.timestamp DESC
LIMIT 1";

const SINGLE_LAST_WINDOWED: &str = "\
MATCH (e:Entity)-[:PERFORMED]->(ev:Event)
WHERE e.id IN $entity_ids
  AND ev.timestamp >= $window_start AND ev.timestamp <= $window_end
RETURN e.id AS entity_id, COALESCE(e.name, '') AS entity_name,
       ev.type AS event_type, ev.timestamp AS timestamp,
       COALESCE(ev.details, '') AS details
ORDER BY ev.timestamp DESC
LIMIT 1";

const SINGLE_LAST_TYPED_WINDOWED: &str = "\
MATCH (e:Entity)-[:PERFORMED]->(ev:Event)
WHERE e.id IN $entity_ids AND ev.type IN $event_types
  AND ev.timestamp >= $window_start AND ev.timestamp <= $window_end
RETURN e.id AS entity_id, COALESCE(e.name, '') AS entity_name,
       ev.type AS event_type, ev.timestamp AS timestamp,
       COALESCE(ev.details, '') AS details
ORDER BY ev.timestamp DESC
LIMIT 1";

const COMPARISON: &str = "\
MATCH (e:Entity)-[:PERFORMED]->(ev:Event)
WHERE e.id IN $entity_ids
RETURN e.id AS entity_id, COALESCE(e.name, '') AS entity_name,
       ev.type AS event_type, min(ev.timestamp) AS timestamp
ORDER BY timestamp ASC";

const COMPARISON_TYPED: &str = "\
MATCH (e:Entity)-[:PERFORMED]->(ev:Event)
WHERE e.id IN $entity_ids AND ev.type IN $event_types
RETURN e.id AS entity_id, COALESCE(e.name, '') AS entity_name,
       ev.type AS event_type, min(ev.timestamp) AS timestamp
ORDER BY timestamp ASC";

const COMPARISON_WINDOWED: &str = "\
MATCH (e:Entity)-[:PERFORMED]->(ev:Event)
WHERE e.id IN $entity_ids
  AND ev.timestamp >= $window_start AND ev.timestamp <= $window_end
RETURN e.id AS entity_id, COALESCE(e.name, '') AS entity_name,
       ev.type AS event_type, min(ev.timestamp) AS timestamp
ORDER BY timestamp ASC";

const COMPARISON_TYPED_WINDOWED: &str = "\
MATCH (e:Entity)-[:PERFORMED]->(ev:Event)
WHERE e.id IN $entity_ids AND ev.type IN $event_types
  AND ev.timestamp >= $window_start AND ev.timestamp <= $window_end
RETURN e.id AS entity_id, COALESCE(e.name, '') AS entity_name,
       ev.type AS event_type, min(ev.timestamp) AS timestamp
ORDER BY timestamp ASC";

const SEQUENCE: &str = "\
MATCH (e:Entity)-[:PERFORMED]->(ev:Event)
WHERE e.id IN $entity_ids
RETURN e.id AS entity_id, COALESCE(e.name, '') AS entity_name,
       ev.type AS event_type, ev.timestamp AS timestamp,
       COALESCE(ev.details, '') AS details
ORDER BY e.id, ev.timestamp ASC";

const SEQUENCE_TYPED: &str = "\
MATCH (e:Entity)-[:PERFORMED]->(ev:Event)
WHERE e.id IN $entity_ids AND ev.type IN $event_types
RETURN e.id AS entity_id, COALESCE(e.name, '') AS entity_name,
       ev.type AS event_type, ev.timestamp AS timestamp,
       COALESCE(ev.details, '') AS details
ORDER BY e.id, ev.timestamp ASC";

const SEQUENCE_WINDOWED: &str = "\
MATCH (e:Entity)-[:PERFORMED]->(ev:Event)
WHERE e.id IN $entity_ids
  AND ev.timestamp >= $window_start AND ev.timestamp <= $window_end
RETURN e.id AS entity_id, COALESCE(e.name, '') AS entity_name,
       ev.type AS event_type, ev.timestamp AS timestamp,
       COALESCE(ev.details, '') AS details
ORDER BY e.id, ev.timestamp ASC";

const SEQUENCE_TYPED_WINDOWED: &str = "\
MATCH (e:Entity)-[:PERFORMED]->(ev:Event)
WHERE e.id IN $entity_ids AND ev.type IN $event_types
  AND ev.timestamp >= $window_start AND ev.timestamp <= $window_end
RETURN e.id AS entity_id, COALESCE(e.name, '') AS entity_name,
       ev.type AS event_type, ev.timestamp AS timestamp,
       COALESCE(ev.details, '') AS details
ORDER BY e.id, ev.timestamp ASC";

const AGGREGATE: &str = "\
MATCH (e:Entity)-[:PERFORMED]->(ev:Event)
WHERE e.id IN $entity_ids
RETURN e.id AS entity_id, ev.type AS event_type, count(ev) AS event_count
ORDER BY entity_id, event_type";

const AGGREGATE_TYPED: &str = "\
MATCH (e:Entity)-[:PERFORMED]->(ev:Event)
WHERE e.id IN $entity_ids AND ev.type IN $event_types
RETURN e.id AS entity_id, ev.type AS event_type, count(ev) AS event_count
ORDER BY entity_id, event_type";

const AGGREGATE_WINDOWED: &str = "\
MATCH (e:Entity)-[:PERFORMED]->(ev:Event)
WHERE e.id IN $entity_ids
  AND ev.timestamp >= $window_start AND ev.timestamp <= $window_end
RETURN e.id AS entity_id, ev.type AS event_type, count(ev) AS event_count
ORDER BY entity_id, event_type";

const AGGREGATE_TYPED_WINDOWED: &str = "\
MATCH (e:Entity)-[:PERFORMED]->(ev:Event)
WHERE e.id IN $entity_ids AND ev.type IN $event_types
  AND ev.timestamp >= $window_start AND ev.timestamp <= $window_end
RETURN e.id AS entity_id, ev.type AS event_type, count(ev) AS event_count
ORDER BY entity_id, event_type";

/// Look up the static Cypher text for a template and its variant.
pub fn template_text(id: TemplateId, variant: TemplateVariant) -> &'static str {
    match (id, variant.order, variant.typed, variant.windowed) {
        (TemplateId::SingleEvent, Order::Asc, false, false) => SINGLE_FIRST,
        (TemplateId::SingleEvent, Order::Asc, true, false) => SINGLE_FIRST_TYPED,
        (TemplateId::SingleEvent, Order::Asc, false, true) => SINGLE_FIRST_WINDOWED,
        (TemplateId::SingleEvent, Order::Asc, true, true) => SINGLE_FIRST_TYPED_WINDOWED,
        (TemplateId::SingleEvent, Order::Desc, false, false) => SINGLE_LAST,
        (TemplateId::SingleEvent, Order::Desc, true, false) => SINGLE_LAST_TYPED,
        (TemplateId::SingleEvent, Order::Desc, false, true) => SINGLE_LAST_WINDOWED,
        (TemplateId::SingleEvent, Order::Desc, true, true) => SINGLE_LAST_TYPED_WINDOWED,
        (TemplateId::Comparison, _, false, false) => COMPARISON,
        (TemplateId::Comparison, _, true, false) => COMPARISON_TYPED,
        (TemplateId::Comparison, _, false, true) => COMPARISON_WINDOWED,
        (TemplateId::Comparison, _, true, true) => COMPARISON_TYPED_WINDOWED,
        (TemplateId::EventSequence, _, false, false) => SEQUENCE,
        (TemplateId::EventSequence, _, true, false) => SEQUENCE_TYPED,
        (TemplateId::EventSequence, _, false, true) => SEQUENCE_WINDOWED,
        (TemplateId::EventSequence, _, true, true) => SEQUENCE_TYPED_WINDOWED,
        (TemplateId::Aggregate, _, false, false) => AGGREGATE,
        (TemplateId::Aggregate, _, true, false) => AGGREGATE_TYPED,
        (TemplateId::Aggregate, _, false, true) => AGGREGATE_WINDOWED,
        (TemplateId::Aggregate, _, true, true) => AGGREGATE_TYPED_WINDOWED,
    }
}

/// Every template constant, for closed-set assertions.
pub fn all_templates() -> Vec<&'static str> {
    let mut out = Vec::new();
    for id in [
        TemplateId::SingleEvent,
        TemplateId::Comparison,
        TemplateId::EventSequence,
        TemplateId::Aggregate,
    ] {
        for order in [Order::Asc, Order::Desc] {
            for typed in [false, true] {
                for windowed in [false, true] {
                    out.push(template_text(
                        id,
                        TemplateVariant {
                            order,
                            typed,
                            windowed,
                        },
                    ));
                }
            }
        }
    }
    out.sort_unstable();
    out.dedup();
    out
}
