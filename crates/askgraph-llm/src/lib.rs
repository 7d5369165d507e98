//! # Askgraph LLM
//!
//! Constraint extraction: the primary LLM-backed path and the local
//! heuristic fallback that takes over whenever the collaborator is
//! unreachable, slow, or returns something unparseable.

pub mod client;
pub mod extract;
pub mod fallback;

pub use client::{LlmClient, LlmConfig, OllamaClient};
pub use extract::Extractor;
pub use fallback::fallback_parse;
