//! Per-session conversation context.
//!
//! A session accumulates the constraints of prior turns so that a follow-up
//! like "and when did they cancel?" keeps the entities already in play.
//! Merging happens *before* validation, so stale merged-in values are still
//! subject to the vocabulary filter.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::types::{ConstraintSet, RawConstraints, RawTimeRange};

/// Constraints accumulated across the turns of one session.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    entities: BTreeSet<String>,
    event_types: BTreeSet<String>,
    temporal_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl ConversationContext {
    /// Merge prior context into freshly extracted raw constraints.
    ///
    /// Set-valued fields are unioned; the prior temporal range applies only
    /// when the new query does not carry one. Intent and sequence always
    /// come from the new query.
    pub fn merge(&self, mut raw: RawConstraints) -> RawConstraints {
        raw.entities.extend_from(self.entities.iter().cloned());
        raw.event_types.extend_from(self.event_types.iter().cloned());

        let new_has_range = raw
            .time_range
            .as_ref()
            .map(|r| r.start.is_some() || r.end.is_some())
            .unwrap_or(false);
        if !new_has_range {
            if let Some((start, end)) = self.temporal_range {
                raw.time_range = Some(RawTimeRange {
                    start: Some(start.to_rfc3339_opts(SecondsFormat::Secs, true)),
                    end: Some(end.to_rfc3339_opts(SecondsFormat::Secs, true)),
                });
            }
        }
        raw
    }

    /// Record a validated turn into the context.
    pub fn absorb(&mut self, validated: &ConstraintSet) {
        self.entities.extend(validated.entity_ids.iter().cloned());
        self.event_types.extend(validated.event_types.iter().cloned());
        if validated.temporal_range.is_some() {
            self.temporal_range = validated.temporal_range;
        }
    }
}

/// Session-keyed store of conversation contexts.
///
/// Contexts are created on first use and discarded by `end_session`. The
/// lock only guards map access; the engine does not serialize concurrent
/// requests for the same session id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, ConversationContext>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the session's prior context into raw constraints, creating the
    /// session on first use.
    pub fn merge_for(&self, session_id: &str, raw: RawConstraints) -> RawConstraints {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let context = sessions.entry(session_id.to_string()).or_default();
        context.merge(raw)
    }

    /// Record a validated turn into the session's context.
    pub fn absorb(&self, session_id: &str, validated: &ConstraintSet) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .entry(session_id.to_string())
            .or_default()
            .absorb(validated);
    }

    /// Drop a session and its accumulated context.
    pub fn end_session(&self, session_id: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(session_id);
    }
}
