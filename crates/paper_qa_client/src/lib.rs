//! Client library for the paper library question-answering backend
//! (HTTP resources, client-side routes, history browsing).
//! Used by the `paper-qa` CLI.

pub mod client;
pub mod config;
pub mod error;
pub mod history;
pub mod messages;
pub mod navigation;
pub mod request;

pub use client::Client;
pub use config::{default_config_path, BackendSection, ChatSection, Config, ConfigError};
pub use error::ClientError;
pub use history::History;
pub use messages::{
    Answer, HistorySession, Library, Paper, Question, SessionDetail, SessionId, Timestamp,
};
pub use navigation::{ChatDraft, Navigator, Resolution, Route, Transition, ViewData};
pub use request::{Completion, Pending, RequestId, RequestTracker};
