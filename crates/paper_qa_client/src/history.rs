//! Read-only view over recorded question/answer exchanges.
//!
//! The list carries summaries only; a session's answer and sources are
//! fetched when that session is opened.

use std::cmp::Ordering;

use crate::client::Client;
use crate::error::Result;
use crate::messages::{HistorySession, SessionDetail, SessionId};

/// History summaries in the order the backend returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    sessions: Vec<HistorySession>,
}

impl History {
    pub fn new(sessions: Vec<HistorySession>) -> Self {
        Self { sessions }
    }

    pub async fn fetch(client: &Client) -> Result<Self> {
        Ok(Self::new(client.list_history().await?))
    }

    pub fn entries(&self) -> &[HistorySession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn find(&self, id: &SessionId) -> Option<&HistorySession> {
        self.sessions.iter().find(|s| &s.id == id)
    }

    /// Newest first by parsed timestamp. Unparsable timestamps sort after
    /// parsable ones, by raw text descending. Ties keep backend order.
    pub fn recent_first(&self) -> Vec<&HistorySession> {
        let mut sorted: Vec<&HistorySession> = self.sessions.iter().collect();
        sorted.sort_by(|a, b| newest_first(a, b));
        sorted
    }

    pub fn into_inner(self) -> Vec<HistorySession> {
        self.sessions
    }
}

fn newest_first(a: &HistorySession, b: &HistorySession) -> Ordering {
    match (a.timestamp.to_datetime(), b.timestamp.to_datetime()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.timestamp.as_str().cmp(a.timestamp.as_str()),
    }
}

/// Fetch the full record behind `summary`.
pub async fn open(client: &Client, summary: &HistorySession) -> Result<SessionDetail> {
    let detail = client.session_detail(&summary.id).await?;
    if !detail.matches(summary) {
        tracing::warn!(
            "session {} detail differs from its history entry",
            summary.id
        );
    }
    Ok(detail)
}
