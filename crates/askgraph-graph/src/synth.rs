//! Query synthesis: constraints + template -> bound query.
//!
//! The only place parameters are attached to query text. Cypher text is
//! always one of the `templates` constants; constraint values travel as
//! named parameters (lists as array parameters), never inside the string.

use chrono::{DateTime, Utc};

use askgraph_core::ConstraintSet;

use crate::templates::{TemplateId, TemplateVariant, template_text};

/// A value bound to a named query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    StrList(Vec<String>),
    Int(i64),
}

/// The only artifact ever sent to the graph store.
#[derive(Debug, Clone)]
pub struct BoundQuery {
    pub template_id: TemplateId,
    pub variant: TemplateVariant,
    pub cypher: &'static str,
    pub params: Vec<(String, ParamValue)>,
}

/// Timestamps are bound in the store's sortable string format.
fn window_param(t: DateTime<Utc>) -> ParamValue {
    ParamValue::Str(t.format("%Y-%m-%dT%H:%M:%S").to_string())
}

/// Bind a validated constraint set into the chosen template.
pub fn synthesize(constraints: &ConstraintSet, template_id: TemplateId) -> BoundQuery {
    let variant = TemplateVariant::for_constraints(constraints);
    let cypher = template_text(template_id, variant);

    let mut params = vec![(
        "entity_ids".to_string(),
        ParamValue::StrList(constraints.entity_list()),
    )];
    if variant.typed {
        params.push((
            "event_types".to_string(),
            ParamValue::StrList(constraints.event_type_list()),
        ));
    }
    if let Some((start, end)) = constraints.temporal_range {
        params.push(("window_start".to_string(), window_param(start)));
        params.push(("window_end".to_string(), window_param(end)));
    }

    BoundQuery {
        template_id,
        variant,
        cypher,
        params,
    }
}
