//! Answer one question from the command line against a local stack
//! (Ollama on :11434, Neo4j on :7687).
//!
//!     cargo run --example ask -- "When did CUST001 make their first purchase?"

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use askgraph_core::Vocabulary;
use askgraph_engine::Engine;
use askgraph_graph::{GraphConfig, Neo4jStore};
use askgraph_llm::OllamaClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let question: String = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if question.is_empty() {
        anyhow::bail!("usage: ask <question>");
    }

    let store = Neo4jStore::connect(&GraphConfig::default()).await?;
    let engine = Engine::new(
        Arc::new(OllamaClient::default_client()),
        Arc::new(store),
        Vocabulary::default(),
    );

    println!("{}", engine.answer(&question, None).await);
    Ok(())
}
