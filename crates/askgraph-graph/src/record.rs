//! Flat result records returned by the execution client.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use askgraph_core::parse_timestamp;

/// A single field value in a graph record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Float(f64),
    Time(DateTime<Utc>),
    Null,
}

/// One matched graph element: field name to value.
///
/// A response is an ordered `Vec<GraphRecord>`; the store's return order is
/// preserved because timelines depend on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl GraphRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// String view of a field; numbers are rendered, null/missing is `None`.
    pub fn get_str(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            FieldValue::Str(s) => Some(s.clone()),
            FieldValue::Int(i) => Some(i.to_string()),
            FieldValue::Float(f) => Some(f.to_string()),
            FieldValue::Time(t) => Some(t.to_rfc3339()),
            FieldValue::Null => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.fields.get(name)? {
            FieldValue::Int(i) => Some(*i),
            FieldValue::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    /// Timestamp view of a field; string timestamps are parsed leniently.
    pub fn get_time(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.fields.get(name)? {
            FieldValue::Time(t) => Some(*t),
            FieldValue::Str(s) => parse_timestamp(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Convenience constructor used by tests and adapters.
impl<S: Into<String>> FromIterator<(S, FieldValue)> for GraphRecord {
    fn from_iter<I: IntoIterator<Item = (S, FieldValue)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}
