//! Constraint extraction: LLM primary path, heuristic fallback.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use askgraph_core::{RawConstraints, Vocabulary};

use crate::client::LlmClient;
use crate::fallback::fallback_parse;

/// System instruction sent with every extraction request. Demands a strict
/// JSON object so the reply can be decoded into `RawConstraints`.
const EXTRACTION_SYSTEM_PROMPT: &str = "\
You translate questions about timestamped events into a JSON object. \
Respond with ONLY a JSON object, no prose, of this exact shape:
{
  \"entities\": [\"entity ids mentioned, e.g. CUST001\"],
  \"event_types\": [\"event types mentioned, e.g. Purchase, Signup\"],
  \"sequence\": \"first\" | \"last\" | \"all\",
  \"comparison\": true | false,
  \"intent\": \"single_event\" | \"event_sequence\" | \"comparison\" | \"aggregate\",
  \"time_range\": {\"start\": \"YYYY-MM-DD\", \"end\": \"YYYY-MM-DD\"} | null
}
Omit fields you cannot infer. Never invent entity ids.";

/// The constraint extractor: asks the LLM for a structured shape and falls
/// back to local heuristics on any failure.
///
/// `extract` is total. Whatever the collaborator does (error, timeout,
/// garbage output), the caller always receives a well-formed
/// `RawConstraints`.
pub struct Extractor {
    llm: Arc<dyn LlmClient>,
    vocab: Arc<Vocabulary>,
    llm_timeout: Duration,
}

impl Extractor {
    pub fn new(llm: Arc<dyn LlmClient>, vocab: Arc<Vocabulary>, llm_timeout: Duration) -> Self {
        Self {
            llm,
            vocab,
            llm_timeout,
        }
    }

    /// Extract raw constraints from a free-text question.
    pub async fn extract(&self, query: &str) -> RawConstraints {
        match timeout(
            self.llm_timeout,
            self.llm.complete(EXTRACTION_SYSTEM_PROMPT, query),
        )
        .await
        {
            Ok(Ok(reply)) => {
                if let Some(raw) = decode_reply(&reply) {
                    debug!("LLM extraction succeeded");
                    return raw;
                }
                warn!("LLM reply not parseable, using fallback parser");
            }
            Ok(Err(e)) => {
                warn!(error = %e, "LLM extraction failed, using fallback parser");
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.llm_timeout.as_millis() as u64,
                    "LLM extraction timed out, using fallback parser"
                );
            }
        }
        fallback_parse(query, &self.vocab)
    }
}

/// Decode an LLM reply into `RawConstraints`.
///
/// Models wrap JSON in code fences or prose often enough that we salvage
/// the outermost `{...}` object before decoding. Anything that still does
/// not decode returns `None` and takes the fallback path.
pub fn decode_reply(reply: &str) -> Option<RawConstraints> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&reply[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

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
            anyhow::bail!("connection refused")
        }
    }

    fn extractor(llm: Arc<dyn LlmClient>) -> Extractor {
        Extractor::new(
            llm,
            Arc::new(Vocabulary::default()),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_decode_plain_json() {
        let raw = decode_reply(r#"{"entities": ["CUST001"], "sequence": "first"}"#).unwrap();
        assert_eq!(raw.entities.into_vec(), vec!["CUST001".to_string()]);
        assert_eq!(raw.sequence.as_deref(), Some("first"));
    }

    #[test]
    fn test_decode_fenced_json() {
        let reply = "Here you go:\n```json\n{\"entities\": \"CUST001\"}\n```\nHope that helps!";
        let raw = decode_reply(reply).unwrap();
        assert_eq!(raw.entities.into_vec(), vec!["CUST001".to_string()]);
    }

    #[test]
    fn test_decode_garbage_is_none() {
        assert!(decode_reply("I don't know").is_none());
        assert!(decode_reply("}{").is_none());
        assert!(decode_reply("").is_none());
    }

    #[tokio::test]
    async fn test_broken_llm_takes_fallback() {
        let raw = extractor(Arc::new(BrokenLlm))
            .extract("When did CUST001 make their first purchase?")
            .await;
        assert_eq!(raw.entities.into_vec(), vec!["CUST001".to_string()]);
        assert_eq!(raw.sequence.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_unparseable_reply_takes_fallback() {
        let raw = extractor(Arc::new(CannedLlm("As an AI model...".to_string())))
            .extract("When did CUST001 make their first purchase?")
            .await;
        assert_eq!(raw.entities.into_vec(), vec!["CUST001".to_string()]);
    }

    #[tokio::test]
    async fn test_parseable_reply_wins() {
        let reply = r#"{"entities": ["CUST009"], "intent": "aggregate"}"#.to_string();
        let raw = extractor(Arc::new(CannedLlm(reply)))
            .extract("irrelevant")
            .await;
        assert_eq!(raw.entities.into_vec(), vec!["CUST009".to_string()]);
        assert_eq!(raw.intent.as_deref(), Some("aggregate"));
    }
}
