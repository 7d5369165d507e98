//! The engine: one `answer(query, context_id)` chain per request.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use askgraph_core::{SessionStore, Vocabulary};
use askgraph_graph::{GraphStore, select_template, synthesize};
use askgraph_llm::{Extractor, LlmClient};

use crate::format::format_records;

/// Engine-level tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ceiling on the LLM extraction call; on expiry the fallback parser
    /// takes over.
    pub llm_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            llm_timeout_secs: 20,
        }
    }
}

/// The question-answering engine.
///
/// Holds no mutable state across requests beyond the read-only vocabulary
/// and the per-session context map, so any number of requests may run
/// concurrently. Concurrent calls for the *same* session id are the
/// caller's responsibility to serialize.
pub struct Engine {
    extractor: Extractor,
    store: Arc<dyn GraphStore>,
    vocab: Arc<Vocabulary>,
    sessions: SessionStore,
}

impl Engine {
    /// Build an engine from injected collaborators and a vocabulary.
    pub fn new(llm: Arc<dyn LlmClient>, store: Arc<dyn GraphStore>, vocab: Vocabulary) -> Self {
        Self::with_config(llm, store, vocab, EngineConfig::default())
    }

    pub fn with_config(
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn GraphStore>,
        vocab: Vocabulary,
        config: EngineConfig,
    ) -> Self {
        let vocab = Arc::new(vocab);
        let extractor = Extractor::new(
            llm,
            Arc::clone(&vocab),
            Duration::from_secs(config.llm_timeout_secs),
        );
        Self {
            extractor,
            store,
            vocab,
            sessions: SessionStore::new(),
        }
    }

    /// Answer a free-text question against the event graph.
    ///
    /// Never fails and never returns an empty string: extraction failures
    /// are recovered by the fallback parser, vocabulary violations are
    /// dropped in validation, an empty result renders an explicit no-data
    /// sentence, and a store failure renders a single human-readable
    /// failure sentence.
    pub async fn answer(&self, query: &str, context_id: Option<&str>) -> String {
        let raw = self.extractor.extract(query).await;
        let raw = match context_id {
            Some(session) => self.sessions.merge_for(session, raw),
            None => raw,
        };

        let constraints = self.vocab.validate(raw);
        if let Some(session) = context_id {
            self.sessions.absorb(session, &constraints);
        }

        let template_id = select_template(&constraints);
        let bound = synthesize(&constraints, template_id);
        debug!(?template_id, entities = constraints.entity_ids.len(), "Running bound query");

        match self.store.run(&bound).await {
            Ok(records) => {
                debug!(records = records.len(), "Query returned");
                format_records(&records, &constraints, template_id)
            }
            Err(e) => {
                warn!(error = %e, "Graph execution failed");
                format!("The question could not be answered: {e}.")
            }
        }
    }

    /// Drop a session's accumulated conversation context.
    pub fn end_session(&self, context_id: &str) {
        self.sessions.end_session(context_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use anyhow::Result;
    use async_trait::async_trait;

    use askgraph_graph::{BoundQuery, FieldValue, GraphRecord, ParamValue, StoreError};

    struct CannedLlm(String);

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct BrokenLlm;

    #[async_trait]
    impl LlmClient for BrokenLlm {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            anyhow::bail!("model unavailable")
        }
    }

    struct MockStore {
        records: Vec<GraphRecord>,
        last: Mutex<Option<BoundQuery>>,
    }

    impl MockStore {
        fn with(records: Vec<GraphRecord>) -> Arc<Self> {
            Arc::new(Self {
                records,
                last: Mutex::new(None),
            })
        }

        fn empty() -> Arc<Self> {
            Self::with(Vec::new())
        }
    }

    #[async_trait]
    impl GraphStore for MockStore {
        async fn run(&self, query: &BoundQuery) -> Result<Vec<GraphRecord>, StoreError> {
            *self.last.lock().unwrap() = Some(query.clone());
            Ok(self.records.clone())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl GraphStore for FailingStore {
        async fn run(&self, _query: &BoundQuery) -> Result<Vec<GraphRecord>, StoreError> {
            Err(StoreError::Query("connection reset".to_string()))
        }
    }

    fn event(id: &str, event_type: &str, ts: &str) -> GraphRecord {
        [
            ("entity_id", FieldValue::Str(id.to_string())),
            ("event_type", FieldValue::Str(event_type.to_string())),
            ("timestamp", FieldValue::Str(ts.to_string())),
        ]
        .into_iter()
        .collect()
    }

    fn engine(llm: Arc<dyn LlmClient>, store: Arc<dyn GraphStore>) -> Engine {
        Engine::new(llm, store, Vocabulary::default())
    }

    #[tokio::test]
    async fn test_first_purchase_question() {
        let store = MockStore::with(vec![event("CUST001", "Purchase", "2023-06-15T10:30:00")]);
        let engine = engine(Arc::new(BrokenLlm), store);
        let text = engine
            .answer("When did CUST001 make their first purchase?", None)
            .await;
        assert!(text.contains("CUST001"));
        assert!(text.contains("Purchase"));
        assert!(text.contains("2023-06-15"));
    }

    #[tokio::test]
    async fn test_comparison_question() {
        let store = MockStore::with(vec![
            event("CUST001", "Signup", "2023-01-15T00:00:00"),
            event("CUST002", "Signup", "2023-01-20T00:00:00"),
        ]);
        let engine = engine(Arc::new(BrokenLlm), store);
        let text = engine
            .answer("Who signed up first, CUST001 or CUST002?", None)
            .await;
        assert!(text.contains("CUST001"));
        assert!(text.contains("CUST002"));
        assert!(text.contains("CUST001 was first"));
    }

    #[tokio::test]
    async fn test_empty_store_gives_no_data_sentence() {
        let engine = engine(Arc::new(BrokenLlm), MockStore::empty());
        let text = engine
            .answer("When did CUST001 make their first purchase?", None)
            .await;
        assert!(text.contains("No matching events"));
        assert!(text.contains("CUST001"));
    }

    #[tokio::test]
    async fn test_fallback_matches_llm_path() {
        let records = vec![event("CUST001", "Purchase", "2023-06-15T10:30:00")];
        let question = "When did CUST001 make their first purchase?";

        let llm_reply = r#"{"entities": ["CUST001"], "event_types": ["Purchase"],
            "sequence": "first", "comparison": false, "intent": "single_event"}"#;
        let via_llm = engine(
            Arc::new(CannedLlm(llm_reply.to_string())),
            MockStore::with(records.clone()),
        )
        .answer(question, None)
        .await;

        let via_fallback = engine(Arc::new(BrokenLlm), MockStore::with(records))
            .answer(question, None)
            .await;

        assert_eq!(via_llm, via_fallback);
    }

    #[tokio::test]
    async fn test_typo_event_type_dropped_not_fatal() {
        // The LLM hands back an event type outside the vocabulary; the
        // validator drops it and selection falls through to the timeline.
        let reply = r#"{"entities": ["CUST001"], "event_types": ["Purchse"]}"#;
        let store = MockStore::with(vec![event("CUST001", "Purchase", "2023-06-15T10:30:00")]);
        let engine = engine(Arc::new(CannedLlm(reply.to_string())), store.clone());
        let text = engine.answer("CUST001 purchse history?", None).await;
        assert!(text.contains("CUST001"));

        let bound = store.last.lock().unwrap().clone().unwrap();
        assert!(!bound.params.iter().any(|(n, _)| n == "event_types"));
    }

    #[tokio::test]
    async fn test_store_failure_is_single_readable_sentence() {
        let engine = engine(Arc::new(BrokenLlm), Arc::new(FailingStore));
        let text = engine.answer("When did CUST001 sign up?", None).await;
        assert!(text.contains("could not be answered"));
        assert!(text.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_answer_never_empty() {
        let engine = engine(Arc::new(BrokenLlm), MockStore::empty());
        for q in ["", "???", "tell me everything", "CUST001", "\u{0}"] {
            assert!(!engine.answer(q, None).await.is_empty());
        }
    }

    #[tokio::test]
    async fn test_answer_is_stable() {
        let store = MockStore::with(vec![event("CUST001", "Purchase", "2023-06-15T10:30:00")]);
        let engine = engine(Arc::new(BrokenLlm), store);
        let q = "When did CUST001 make their first purchase?";
        assert_eq!(engine.answer(q, None).await, engine.answer(q, None).await);
    }

    #[tokio::test]
    async fn test_session_carries_entities_forward() {
        let store = MockStore::empty();
        let engine = engine(Arc::new(BrokenLlm), store.clone());

        engine.answer("When did CUST001 sign up?", Some("s1")).await;
        engine.answer("And when did they cancel?", Some("s1")).await;

        let bound = store.last.lock().unwrap().clone().unwrap();
        let (_, value) = bound
            .params
            .iter()
            .find(|(n, _)| n == "entity_ids")
            .unwrap();
        assert_eq!(*value, ParamValue::StrList(vec!["CUST001".to_string()]));

        engine.end_session("s1");
        engine.answer("Anything new?", Some("s1")).await;
        let bound = store.last.lock().unwrap().clone().unwrap();
        let (_, value) = bound
            .params
            .iter()
            .find(|(n, _)| n == "entity_ids")
            .unwrap();
        assert_eq!(*value, ParamValue::StrList(Vec::new()));
    }
}
