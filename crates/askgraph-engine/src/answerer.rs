//! Narrow capability interface for external runtimes.
//!
//! Callers (agent frameworks, evaluation harnesses) depend on this trait
//! only; the engine carries no dependency on any particular runtime.

use async_trait::async_trait;

use crate::engine::Engine;

/// `Answer(query, context) -> text`: the engine's entire inbound surface.
#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    async fn answer(&self, query: &str, context_id: Option<&str>) -> String;
}

#[async_trait]
impl QuestionAnswerer for Engine {
    async fn answer(&self, query: &str, context_id: Option<&str>) -> String {
        Engine::answer(self, query, context_id).await
    }
}
