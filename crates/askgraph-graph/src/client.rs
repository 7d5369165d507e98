//! Neo4j execution client.
//!
//! The engine depends only on the `GraphStore` trait; `Neo4jStore` is the
//! default adapter. Calls are guarded by a timeout and a bounded
//! exponential-backoff retry so one slow query cannot hold a caller
//! indefinitely.

use std::time::Duration;

use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph, Query};
use serde::Deserialize;
use tracing::warn;

use crate::error::StoreError;
use crate::record::{FieldValue, GraphRecord};
use crate::synth::{BoundQuery, ParamValue};

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub query_timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "askgraph_dev".to_string(),
            query_timeout_secs: 10,
            max_retries: 2,
        }
    }
}

/// Graph-store collaborator: run one bound query.
///
/// An empty result is `Ok(vec![])` and distinct from failure ("ran fine,
/// found nothing").
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn run(&self, query: &BoundQuery) -> Result<Vec<GraphRecord>, StoreError>;
}

/// Client for the Neo4j event graph.
#[derive(Clone)]
pub struct Neo4jStore {
    graph: Graph,
    query_timeout: Duration,
    max_retries: u32,
}

impl Neo4jStore {
    /// Connect to Neo4j.
    ///
    /// neo4rs uses a lazy pool; `Graph::connect` does not establish a real
    /// bolt connection yet. We run a cheap `RETURN 1` ping immediately so
    /// that callers get a fast failure when Neo4j is unreachable instead of
    /// hanging silently on the first query.
    pub async fn connect(config: &GraphConfig) -> Result<Self, StoreError> {
        let neo4j_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .db("neo4j")
            .max_connections(4)
            .fetch_size(50)
            .build()
            .map_err(|e| StoreError::Connect(e.to_string()))?;

        let graph = Graph::connect(neo4j_config)
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;

        graph
            .run(Query::new("RETURN 1".to_string()))
            .await
            .map_err(|e| StoreError::Connect(format!("Neo4j is not responding: {e}")))?;

        Ok(Self {
            graph,
            query_timeout: Duration::from_secs(config.query_timeout_secs),
            max_retries: config.max_retries,
        })
    }

    fn build_query(bound: &BoundQuery) -> Query {
        let mut query = Query::new(bound.cypher.to_string());
        for (name, value) in &bound.params {
            query = match value {
                ParamValue::Str(s) => query.param(name, s.clone()),
                ParamValue::StrList(items) => query.param(name, items.clone()),
                ParamValue::Int(i) => query.param(name, *i),
            };
        }
        query
    }

    async fn try_run(&self, bound: &BoundQuery) -> Result<Vec<GraphRecord>, StoreError> {
        let mut result = self
            .graph
            .execute(Self::build_query(bound))
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut records = Vec::new();
        while let Ok(Some(row)) = result.next().await {
            records.push(decode_row(&row));
        }
        Ok(records)
    }
}

/// Map a row onto the flat record shape, tolerating absent fields.
fn decode_row(row: &neo4rs::Row) -> GraphRecord {
    let mut record = GraphRecord::new();
    for field in ["entity_id", "entity_name", "event_type", "timestamp", "details"] {
        if let Ok(value) = row.get::<String>(field) {
            record.insert(field, FieldValue::Str(value));
        }
    }
    if let Ok(count) = row.get::<i64>("event_count") {
        record.insert("event_count", FieldValue::Int(count));
    }
    record
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn run(&self, query: &BoundQuery) -> Result<Vec<GraphRecord>, StoreError> {
        let mut last_error = StoreError::Query("no attempts made".to_string());

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = Duration::from_secs(1 << (attempt - 1).min(4));
                tokio::time::sleep(delay).await;
            }

            match tokio::time::timeout(self.query_timeout, self.try_run(query)).await {
                Ok(Ok(records)) => return Ok(records),
                Ok(Err(e)) => {
                    if attempt < self.max_retries {
                        warn!(
                            attempt = attempt + 1,
                            max = self.max_retries + 1,
                            error = %e,
                            "Graph query failed, retrying"
                        );
                    }
                    last_error = e;
                }
                Err(_) => {
                    last_error = StoreError::Timeout(self.query_timeout);
                    if attempt < self.max_retries {
                        warn!(
                            attempt = attempt + 1,
                            max = self.max_retries + 1,
                            "Graph query timed out, retrying"
                        );
                    }
                }
            }
        }

        Err(last_error)
    }
}
