//! # Askgraph Engine
//!
//! The top-level `Answer(query, context) -> text` surface: composes the
//! extractor, validator, template selector, synthesizer, execution client
//! and formatter into one blocking chain per request. No failure escapes
//! `answer`; every path terminates in a returned, non-empty string.

pub mod answerer;
pub mod engine;
pub mod format;

pub use answerer::QuestionAnswerer;
pub use engine::{Engine, EngineConfig};
pub use format::format_records;
