//! HTTP client for the paper library backend: libraries, papers, questions, history.
//!
//! Every method is one request. Nothing is retried, cached or applied locally;
//! callers re-fetch to observe the effect of a mutation.

use std::path::Path;

use reqwest::multipart;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::messages::{
    AddPapersRequest, AddPapersResponse, Answer, CreateLibraryRequest, HistorySession, Library,
    Paper, Question, SessionDetail, SessionId,
};
use crate::request::{self, Pending, RequestTracker};

/// Resource client bound to one backend origin. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base: Url,
}

impl Client {
    /// `base_url` is the API root, e.g. `http://localhost:5000/api`.
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(base_url.to_string()));
        }
        let http = reqwest::Client::builder()
            .build()
            .map_err(ClientError::Network)?;
        Ok(Self { http, base })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.base_url())
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Base URL with `segments` appended, each percent-encoded. Empty, `.` and
    /// `..` segments are rejected: they would address a different resource.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(ClientError::Validation(format!("invalid path parameter: {bad:?}")));
        }
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidBaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.endpoint(segments)?;
        debug!("{} {}", method, url);
        Ok(self.http.request(method, url))
    }

    async fn send(builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await.map_err(ClientError::Network)?;
        let status = response.status();
        debug!("response status: {}", status);
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!("backend returned {}: {}", status, body);
        Err(ClientError::Server { status, body })
    }

    async fn fetch<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
        let bytes = Self::send(builder).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn execute(builder: RequestBuilder) -> Result<()> {
        Self::send(builder).await.map(drop)
    }

    // ── Libraries ────────────────────────────────────────────────────────

    /// `GET /libraries`, in backend order.
    pub async fn list_libraries(&self) -> Result<Vec<Library>> {
        Self::fetch(self.request(Method::GET, &["libraries"])?).await
    }

    /// `POST /libraries`. An existing name is rejected by the backend.
    pub async fn create_library(&self, name: &str) -> Result<Library> {
        if name.trim().is_empty() {
            return Err(ClientError::Validation("library name must not be empty".into()));
        }
        let body = CreateLibraryRequest { name };
        Self::fetch(self.request(Method::POST, &["libraries"])?.json(&body)).await
    }

    /// `DELETE /libraries/{name}`. Repeating it is a backend-defined error.
    pub async fn delete_library(&self, name: &str) -> Result<()> {
        Self::execute(self.request(Method::DELETE, &["libraries", name])?).await
    }

    // ── Papers ───────────────────────────────────────────────────────────

    pub async fn list_papers(&self, library: &str) -> Result<Vec<Paper>> {
        Self::fetch(self.request(Method::GET, &["libraries", library, "papers"])?).await
    }

    /// `POST /libraries/{library}/upload` as multipart field `file`. File type and
    /// size are left to the backend to judge.
    pub async fn upload_paper(
        &self,
        library: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<Paper> {
        let part = multipart::Part::bytes(content).file_name(file_name.to_string());
        let form = multipart::Form::new().part("file", part);
        let request = self.request(Method::POST, &["libraries", library, "upload"])?;
        Self::fetch(request.multipart(form)).await
    }

    /// Read `path` and upload it under its file name.
    pub async fn upload_paper_file(&self, library: &str, path: &Path) -> Result<Paper> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::Validation(format!("not a file path: {}", path.display())))?
            .to_string();
        let content = tokio::fs::read(path).await?;
        self.upload_paper(library, &file_name, content).await
    }

    /// `POST /libraries/{library}/add` with descriptor strings (URLs, titles, ids).
    pub async fn add_papers(&self, library: &str, paper_descs: &[String]) -> Result<Vec<Paper>> {
        let body = AddPapersRequest { paper_descs };
        let request = self.request(Method::POST, &["libraries", library, "add"])?;
        let response: AddPapersResponse = Self::fetch(request.json(&body)).await?;
        Ok(response.into_papers())
    }

    pub async fn delete_paper(&self, library: &str, paper: &str) -> Result<()> {
        let request = self.request(Method::DELETE, &["libraries", library, "papers", paper])?;
        Self::execute(request).await
    }

    // ── Questions ────────────────────────────────────────────────────────

    /// `POST /ask`. Empty `papers` asks every paper in the library. No deadline
    /// is applied; the answer arrives whole or the call fails.
    pub async fn ask(&self, library: &str, papers: &[String], question: &str) -> Result<Answer> {
        let question = Question::new(library, papers.iter().cloned(), question)?;
        self.submit(&question).await
    }

    /// Blank question text fails locally; nothing is sent.
    pub async fn submit(&self, question: &Question) -> Result<Answer> {
        question.validate()?;
        Self::fetch(self.request(Method::POST, &["ask"])?.json(question)).await
    }

    /// Start `question` on its own task and return a handle tagged with a fresh
    /// current id from `tracker`. An invalid question fails here, before any id
    /// is issued.
    pub fn ask_detached(
        &self,
        tracker: &RequestTracker,
        question: Question,
    ) -> Result<Pending<Answer>> {
        question.validate()?;
        let client = self.clone();
        let id = tracker.begin();
        debug!("request {} asks {:?}", id, question.text);
        Ok(request::spawn(id, async move {
            client.submit(&question).await
        }))
    }

    // ── History ──────────────────────────────────────────────────────────

    /// `GET /history`, in backend order.
    pub async fn list_history(&self) -> Result<Vec<HistorySession>> {
        Self::fetch(self.request(Method::GET, &["history"])?).await
    }

    pub async fn session_detail(&self, id: &SessionId) -> Result<SessionDetail> {
        Self::fetch(self.request(Method::GET, &["history", id.as_str()])?).await
    }
}
