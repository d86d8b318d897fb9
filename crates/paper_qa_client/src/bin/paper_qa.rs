//! paper-qa: command-line front end for the paper library backend.
//! Reads config, runs one Resource Client operation (or opens one client-side
//! route) and prints the result to stdout.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use paper_qa_client::config::{self, ConfigSource};
use paper_qa_client::navigation::{self, Resolution, Route, ViewData};
use paper_qa_client::{
    history, Answer, Client, ClientError, Config, History, HistorySession, Library, Paper, Question,
    RequestTracker, SessionDetail, SessionId,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "paper-qa", version)]
#[command(about = "Organize paper libraries and ask questions about them")]
struct Cli {
    /// Config file (default: $PAPER_QA_CONFIG or ~/.paper-qa/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend API root, overriding the config file
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List libraries
    Libraries,
    /// Create a library
    CreateLibrary { name: String },
    /// Delete a library and its papers
    DeleteLibrary { name: String },
    /// List the papers of a library
    Papers { library: String },
    /// Upload a file into a library
    Upload { library: String, file: PathBuf },
    /// Add papers by descriptor (URL, title, identifier)
    Add {
        library: String,
        #[arg(required = true)]
        descs: Vec<String>,
    },
    /// Delete a paper from a library
    DeletePaper { library: String, paper: String },
    /// Ask a question; reads it from stdin when not given
    Ask {
        #[arg(long, short)]
        library: Option<String>,
        /// Restrict to these papers (repeatable); all papers when omitted
        #[arg(long = "paper", short)]
        papers: Vec<String>,
        question: Option<String>,
    },
    /// List past exchanges
    History {
        /// Sort newest first instead of backend order
        #[arg(long)]
        recent_first: bool,
    },
    /// Show one past exchange
    Session { id: String },
    /// Open a client route (e.g. /library/ml-papers/papers) and print its view
    Open { path: String },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Config {
    let source = config::resolve_config_path(cli.config.as_deref());
    match config::load_from(&source) {
        Ok(c) => c,
        Err(e) => {
            let shown = match &source {
                ConfigSource::Explicit(p) | ConfigSource::Default(p) => p.display().to_string(),
                ConfigSource::None => "<none>".into(),
            };
            eprintln!("Error: failed to load config from {}: {}", shown, e);
            process::exit(1);
        }
    }
}

/// Question from the positional argument, else the first line of stdin.
fn read_question(arg: Option<String>) -> String {
    if let Some(q) = arg {
        return q.trim().to_string();
    }
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).unwrap_or(0);
    line.trim().to_string()
}

fn fail(context: &str, err: ClientError) -> ! {
    match err.server_message() {
        Some(msg) => eprintln!("Error: {}: {} ({})", context, msg, err),
        None => eprintln!("Error: {}: {}", context, err),
    }
    process::exit(1);
}

fn print_libraries(out: &mut impl Write, libraries: &[Library]) {
    for lib in libraries {
        let _ = match lib.count {
            Some(n) => writeln!(out, "{}\t{} papers", lib.name, n),
            None => writeln!(out, "{}", lib.name),
        };
    }
}

fn print_papers(out: &mut impl Write, papers: &[Paper]) {
    for paper in papers {
        let _ = match &paper.path {
            Some(path) => writeln!(out, "{}\t{}", paper.name, path),
            None => writeln!(out, "{}", paper.name),
        };
    }
}

fn print_sessions<'a>(
    out: &mut impl Write,
    sessions: impl IntoIterator<Item = &'a HistorySession>,
) {
    for s in sessions {
        let _ = writeln!(out, "{}\t{}\t{}", s.id, s.timestamp, s.question);
    }
}

fn print_sources(out: &mut impl Write, sources: &[String]) {
    if !sources.is_empty() {
        let _ = writeln!(out, "\nSources:");
        for src in sources {
            let _ = writeln!(out, "  {}", src);
        }
    }
}

fn print_answer(out: &mut impl Write, answer: &Answer) {
    let _ = writeln!(out, "{}", answer.answer);
    print_sources(out, answer.sources());
}

fn print_detail(out: &mut impl Write, detail: &SessionDetail) {
    let session = &detail.session;
    let _ = writeln!(out, "[{}] {}", session.timestamp, session.question);
    let _ = writeln!(out, "\n{}", detail.answer);
    print_sources(out, detail.sources());
}

async fn run(cli: Cli, cfg: Config) {
    let base_url = cli.base_url.as_deref().unwrap_or_else(|| cfg.base_url());
    let client = Client::new(base_url).unwrap_or_else(|e| fail("bad backend address", e));

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Libraries => {
            let libraries = client
                .list_libraries()
                .await
                .unwrap_or_else(|e| fail("listing libraries failed", e));
            print_libraries(&mut out, &libraries);
        }
        Command::CreateLibrary { name } => {
            let lib = client
                .create_library(&name)
                .await
                .unwrap_or_else(|e| fail("creating library failed", e));
            let _ = writeln!(out, "created {}", lib.name);
        }
        Command::DeleteLibrary { name } => {
            client
                .delete_library(&name)
                .await
                .unwrap_or_else(|e| fail("deleting library failed", e));
            let _ = writeln!(out, "deleted {}", name);
        }
        Command::Papers { library } => {
            let papers = client
                .list_papers(&library)
                .await
                .unwrap_or_else(|e| fail("listing papers failed", e));
            print_papers(&mut out, &papers);
        }
        Command::Upload { library, file } => {
            let paper = client
                .upload_paper_file(&library, &file)
                .await
                .unwrap_or_else(|e| fail("upload failed", e));
            let _ = writeln!(out, "uploaded {}", paper.name);
        }
        Command::Add { library, descs } => {
            let papers = client
                .add_papers(&library, &descs)
                .await
                .unwrap_or_else(|e| fail("adding papers failed", e));
            print_papers(&mut out, &papers);
        }
        Command::DeletePaper { library, paper } => {
            client
                .delete_paper(&library, &paper)
                .await
                .unwrap_or_else(|e| fail("deleting paper failed", e));
            let _ = writeln!(out, "deleted {}", paper);
        }
        Command::Ask {
            library,
            papers,
            question,
        } => {
            let Some(library) = library.or(cfg.chat.default_library) else {
                eprintln!("Error: no library given (use --library or chat.default_library)");
                process::exit(1);
            };
            let text = read_question(question);
            let question = Question::new(library, papers, text)
                .unwrap_or_else(|e| fail("no question provided", e));
            // Long-running: runs on its own task and is correlated by id.
            let tracker = RequestTracker::new();
            let pending = client
                .ask_detached(&tracker, question)
                .unwrap_or_else(|e| fail("question failed", e));
            let completion = pending.wait().await;
            match completion.if_current(&tracker) {
                Some(Ok(answer)) => print_answer(&mut out, &answer),
                Some(Err(e)) => fail("question failed", e),
                None => {}
            }
        }
        Command::History { recent_first } => {
            let history = History::fetch(&client)
                .await
                .unwrap_or_else(|e| fail("listing history failed", e));
            if recent_first {
                print_sessions(&mut out, history.recent_first());
            } else {
                print_sessions(&mut out, history.entries());
            }
        }
        Command::Session { id } => {
            let detail = client
                .session_detail(&SessionId(id))
                .await
                .unwrap_or_else(|e| fail("loading session failed", e));
            print_detail(&mut out, &detail);
        }
        Command::Open { path } => {
            let resolution = Route::resolve(&path);
            if let Resolution::Redirect(to) = &resolution {
                let _ = writeln!(out, "redirected to {}", to);
            }
            let route = resolution.into_route();
            let view = navigation::enter(&client, &route)
                .await
                .unwrap_or_else(|e| fail("loading view failed", e));
            match view {
                ViewData::Home => {
                    let _ = writeln!(out, "paper-qa");
                }
                ViewData::LibraryList { libraries } => print_libraries(&mut out, &libraries),
                ViewData::LibraryPapers { library, papers } => {
                    let _ = writeln!(out, "{}:", library);
                    print_papers(&mut out, &papers);
                }
                ViewData::Chat {
                    libraries,
                    history: sessions,
                } => {
                    let _ = writeln!(out, "Libraries:");
                    print_libraries(&mut out, &libraries);
                    let _ = writeln!(out, "\nHistory:");
                    let history = History::new(sessions);
                    print_sessions(&mut out, history.recent_first());
                    if let Some(latest) = history.recent_first().first() {
                        match history::open(&client, latest).await {
                            Ok(detail) => {
                                let _ = writeln!(out, "\nLatest:");
                                print_detail(&mut out, &detail);
                            }
                            Err(e) => tracing::warn!("loading latest session failed: {}", e),
                        }
                    }
                }
            }
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing();
    let cfg = load_config(&cli);

    // Single-threaded: calls interleave on one thread while awaiting the backend.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to create runtime: {}", e);
            process::exit(1);
        });

    rt.block_on(run(cli, cfg));
}
