//! # Askgraph Core
//!
//! Constraint model for the natural-language-to-graph translation engine:
//! the typed `ConstraintSet`, the loosely-typed `RawConstraints` shape that
//! extraction produces, the closed `Vocabulary` that sanitizes one into the
//! other, and per-session conversation context.

pub mod context;
pub mod error;
pub mod types;
pub mod vocabulary;

pub use context::{ConversationContext, SessionStore};
pub use error::{CoreError, CoreResult};
pub use types::{
    ConstraintSet, Intent, OneOrMany, RawConstraints, RawTimeRange, SequenceSelector,
    parse_timestamp,
};
pub use vocabulary::Vocabulary;
