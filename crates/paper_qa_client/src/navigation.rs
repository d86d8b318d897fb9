//! Addressable views and the transitions between them.
//!
//! Views share no in-memory state: entering a view loads its data again
//! through the [`Client`]. The library list is both the initial state and the
//! target of every unmatched path.

use std::collections::BTreeSet;
use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::client::Client;
use crate::error::Result;
use crate::messages::{HistorySession, Library, Paper, Question};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/home`, static landing view.
    Home,
    /// `/library`
    LibraryList,
    /// `/library/{library}/papers`
    LibraryPapers { library: String },
    /// `/chat`. Library, papers and question are chosen inside the view.
    Chat,
}

/// Outcome of matching a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Matched(Route),
    Redirect(Route),
}

impl Resolution {
    pub fn route(&self) -> &Route {
        match self {
            Resolution::Matched(r) | Resolution::Redirect(r) => r,
        }
    }

    pub fn into_route(self) -> Route {
        match self {
            Resolution::Matched(r) | Resolution::Redirect(r) => r,
        }
    }
}

impl Route {
    /// Where the application starts and where unknown paths land.
    pub const INITIAL: Route = Route::LibraryList;

    pub fn name(&self) -> &'static str {
        match self {
            Route::Home => "home",
            Route::LibraryList => "library",
            Route::LibraryPapers { .. } => "papers",
            Route::Chat => "chat",
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/home".into(),
            Route::LibraryList => "/library".into(),
            Route::LibraryPapers { library } => {
                format!("/library/{}/papers", encode_segment(library))
            }
            Route::Chat => "/chat".into(),
        }
    }

    /// Match `path` against the route table. `/` and anything unmatched
    /// redirect to [`Route::INITIAL`].
    pub fn resolve(path: &str) -> Resolution {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let matched = match segments.as_slice() {
            ["home"] => Some(Route::Home),
            ["library"] => Some(Route::LibraryList),
            ["library", library, "papers"] => {
                decode_segment(library).map(|library| Route::LibraryPapers { library })
            }
            ["chat"] => Some(Route::Chat),
            _ => None,
        };
        match matched {
            Some(route) => Resolution::Matched(route),
            None => Resolution::Redirect(Route::INITIAL),
        }
    }
}

impl Default for Route {
    fn default() -> Self {
        Route::INITIAL
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Characters escaped inside one path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn encode_segment(s: &str) -> String {
    utf8_percent_encode(s, SEGMENT).to_string()
}

/// Strict inverse of [`encode_segment`]: every `%` must start a two-digit hex
/// escape and the result must be UTF-8. Names that would not survive as a
/// path segment (empty, `.`, `..`) are refused.
fn decode_segment(s: &str) -> Option<String> {
    let is_escape = |rest: &str| {
        let bytes = rest.as_bytes();
        bytes.len() >= 2 && bytes[..2].iter().all(u8::is_ascii_hexdigit)
    };
    if !s.split('%').skip(1).all(is_escape) {
        return None;
    }
    let decoded = percent_decode_str(s).decode_utf8().ok()?;
    match decoded.as_ref() {
        "" | "." | ".." => None,
        _ => Some(decoded.into_owned()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: Route,
    pub to: Route,
    pub redirected: bool,
}

/// Current-view state machine. Starts at [`Route::INITIAL`].
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    current: Route,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &Route {
        &self.current
    }

    pub fn navigate(&mut self, path: &str) -> Transition {
        let resolution = Route::resolve(path);
        let redirected = matches!(resolution, Resolution::Redirect(_));
        if redirected {
            tracing::debug!("{:?} redirected to {}", path, Route::INITIAL);
        }
        self.go(resolution.into_route(), redirected)
    }

    pub fn go_to(&mut self, route: Route) -> Transition {
        self.go(route, false)
    }

    fn go(&mut self, to: Route, redirected: bool) -> Transition {
        let from = std::mem::replace(&mut self.current, to.clone());
        Transition {
            from,
            to,
            redirected,
        }
    }
}

/// Data a view shows, loaded on entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewData {
    Home,
    LibraryList {
        libraries: Vec<Library>,
    },
    LibraryPapers {
        library: String,
        papers: Vec<Paper>,
    },
    Chat {
        libraries: Vec<Library>,
        history: Vec<HistorySession>,
    },
}

/// Load `route`'s data fresh from the backend.
pub async fn enter(client: &Client, route: &Route) -> Result<ViewData> {
    tracing::debug!("entering {}", route);
    match route {
        Route::Home => Ok(ViewData::Home),
        Route::LibraryList => Ok(ViewData::LibraryList {
            libraries: client.list_libraries().await?,
        }),
        Route::LibraryPapers { library } => Ok(ViewData::LibraryPapers {
            library: library.clone(),
            papers: client.list_papers(library).await?,
        }),
        Route::Chat => {
            let (libraries, history) =
                futures_util::try_join!(client.list_libraries(), client.list_history())?;
            Ok(ViewData::Chat { libraries, history })
        }
    }
}

/// The chat view's own selection state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatDraft {
    pub library: Option<String>,
    pub papers: BTreeSet<String>,
    pub text: String,
}

impl ChatDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switching library clears the paper selection.
    pub fn select_library(&mut self, library: impl Into<String>) {
        let library = library.into();
        if self.library.as_deref() != Some(library.as_str()) {
            self.papers.clear();
        }
        self.library = Some(library);
    }

    /// Returns whether the paper is selected afterwards.
    pub fn toggle_paper(&mut self, paper: &str) -> bool {
        if self.papers.remove(paper) {
            false
        } else {
            self.papers.insert(paper.to_string());
            true
        }
    }

    pub fn can_submit(&self) -> bool {
        self.library.is_some() && !self.text.trim().is_empty()
    }

    pub fn to_question(&self) -> Result<Question> {
        let library = self.library.clone().ok_or_else(|| {
            crate::error::ClientError::Validation("no library selected".into())
        })?;
        Question::new(library, self.papers.iter().cloned(), self.text.clone())
    }
}
