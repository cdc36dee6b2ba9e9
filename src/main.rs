use std::path::PathBuf;

use clap::{Parser, Subcommand};

use confsched_core::{Changes, Session};
use confsched_store::{seed, Database, SessionStore};

#[derive(Parser)]
#[command(name = "confsched", about = "Local conference-schedule store")]
struct Cli {
    /// Directory holding the schedule database.
    /// Defaults to $CONFSCHED_DATA_DIR, then ~/.confsched.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Bundled seed database, installed on first run only.
    #[arg(long)]
    seed: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the schedule in order.
    List,
    /// Print one session in full.
    Show { id: String },
    /// Mark a session as a favorite.
    Star { id: String },
    /// Clear the favorite mark.
    Unstar { id: String },
    /// Replace the whole schedule from a JSON document (full resync).
    Import { path: PathBuf },
    /// Stream change diffs until interrupted.
    Watch,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let data_dir = cli
        .data_dir
        .or_else(|| std::env::var("CONFSCHED_DATA_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| dirs_home().join(".confsched"));
    let db_path = data_dir.join("schedule.db");

    if let Some(seed_path) = &cli.seed {
        seed::install_seed(&db_path, seed_path).expect("failed to install seed database");
    }

    let db = Database::open(&db_path).expect("failed to open schedule database");
    let store = SessionStore::open(db).expect("failed to load schedule");

    match cli.command {
        Command::List => {
            for session in store.current_sessions() {
                print_row(&session);
            }
        }
        Command::Show { id } => match store.observe_session(&id) {
            Some(watch) => print_details(&watch.value()),
            None => {
                eprintln!("no session with id {id:?}");
                std::process::exit(1);
            }
        },
        Command::Star { id } => {
            store.set_starred(&id, true).expect("failed to update favorite");
        }
        Command::Unstar { id } => {
            store.set_starred(&id, false).expect("failed to update favorite");
        }
        Command::Import { path } => {
            let raw = std::fs::read_to_string(&path).expect("failed to read schedule document");
            let sessions: Vec<Session> =
                serde_json::from_str(&raw).expect("malformed schedule document");

            let mut rx = store.subscribe();
            store
                .replace_all_sessions(sessions)
                .expect("failed to replace schedule");
            if let Ok(changes) = rx.try_recv() {
                print_diff(&changes);
            }
        }
        Command::Watch => {
            let mut rx = store.subscribe();
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    result = rx.recv() => match result {
                        Ok(changes) => print_diff(&changes),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "watch lagged, dropped events");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        }
    }
}

fn print_row(session: &Session) {
    let marker = if session.is_starred { "*" } else { " " };
    println!(
        "{marker} {}  {:<8} {:>3}m  {}  [{}]",
        session.starts_at.format("%Y-%m-%d %H:%M"),
        session.track,
        session.length_minutes,
        session.title,
        session.id,
    );
}

fn print_details(session: &Session) {
    print_row(session);
    println!("  speaker: {}", session.speaker_name);
    println!("  {}", session.abstract_text);
}

fn print_diff(changes: &Changes) {
    println!(
        "{} sessions ({} removed, {} added, {} changed)",
        changes.sessions.len(),
        changes.deletions.len(),
        changes.insertions.len(),
        changes.modifications.len(),
    );
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
