//! Resource shapes exchanged with the backend (`/api`). Field names match the
//! JSON contract exactly.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// A named collection of papers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub name: String,
    /// Paper count, when the backend reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

/// A single document inside a library. `name` is unique within the library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// A question scoped to one library. An empty `papers` list means every paper
/// in the library. Built through [`Question::new`], which rejects blank text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub(crate) library: String,
    pub(crate) papers: Vec<String>,
    #[serde(rename = "question")]
    pub(crate) text: String,
}

impl Question {
    /// Fails when `text` is empty or whitespace only.
    pub fn new(
        library: impl Into<String>,
        papers: impl IntoIterator<Item = impl Into<String>>,
        text: impl Into<String>,
    ) -> Result<Self> {
        let question = Self {
            library: library.into(),
            papers: papers.into_iter().map(Into::into).collect(),
            text: text.into(),
        };
        question.validate()?;
        Ok(question)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(ClientError::Validation("question text must not be empty".into()));
        }
        Ok(())
    }

    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn papers(&self) -> &[String] {
        &self.papers
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn targets_all_papers(&self) -> bool {
        self.papers.is_empty()
    }
}

/// The backend's reply to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

impl Answer {
    pub fn sources(&self) -> &[String] {
        self.sources.as_deref().unwrap_or(&[])
    }
}

/// Opaque history session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        SessionId(s.to_string())
    }
}

/// Timestamp text as the backend wrote it. Compared verbatim; parse with
/// [`Timestamp::to_datetime`] when a point in time is needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub String);

impl Timestamp {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accepts RFC 3339 and naive ISO-8601 (treated as UTC).
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.0) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&self.0, fmt).ok())
            .map(|naive| naive.and_utc())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Summary row of the history list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySession {
    pub id: SessionId,
    pub timestamp: Timestamp,
    pub question: String,
}

/// Full record of one past exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: HistorySession,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

impl SessionDetail {
    pub fn sources(&self) -> &[String] {
        self.sources.as_deref().unwrap_or(&[])
    }

    /// True when this detail describes the same exchange as `summary`.
    pub fn matches(&self, summary: &HistorySession) -> bool {
        self.session == *summary
    }
}

/// Client → server: create library body.
#[derive(Debug, Serialize)]
pub(crate) struct CreateLibraryRequest<'a> {
    pub name: &'a str,
}

/// Client → server: add papers by descriptor.
#[derive(Debug, Serialize)]
pub(crate) struct AddPapersRequest<'a> {
    pub paper_descs: &'a [String],
}

/// Server → client: add-papers reply, bare or wrapped in `{"added": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum AddPapersResponse {
    List(Vec<Paper>),
    Envelope { added: Vec<Paper> },
}

impl AddPapersResponse {
    pub fn into_papers(self) -> Vec<Paper> {
        match self {
            AddPapersResponse::List(papers) => papers,
            AddPapersResponse::Envelope { added } => added,
        }
    }
}
