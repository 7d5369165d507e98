//! # Askgraph Graph
//!
//! The query side of the engine: the closed set of Cypher templates, the
//! pure intent-to-template selector, the synthesizer that binds constraints
//! as named parameters, and the Neo4j execution adapter.

pub mod client;
pub mod error;
pub mod record;
pub mod synth;
pub mod templates;

pub use client::{GraphConfig, GraphStore, Neo4jStore};
pub use error::StoreError;
pub use record::{FieldValue, GraphRecord};
pub use synth::{BoundQuery, ParamValue, synthesize};
pub use templates::{Order, TemplateId, TemplateVariant, select_template, template_text};
