//! Main event loop for the line-oriented front end.
//!
//! Multiplexes shutdown signals, stdin commands and background completions
//! from the session's [`SyncEvent`] channel.

use crate::api::ForumApi;
use crate::session::{FeedSession, SyncEvent};
use anyhow::Result;
use std::io::{ErrorKind, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use super::commands::{self, Command, HELP};
use super::render::{render_status, render_tabs, render_topics, terminal_width};

const INVALID_INPUT: &str = "Input was not valid UTF-8, ignored.";

/// One read from stdin, after recoverable errors are filtered out.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Line(String),
    /// The line was not valid UTF-8. The reader has consumed it.
    Skipped,
    End,
}

fn classify_line(read: std::io::Result<Option<String>>) -> std::io::Result<Input> {
    match read {
        Ok(Some(line)) => Ok(Input::Line(line)),
        Ok(None) => Ok(Input::End),
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            tracing::warn!(error = %e, "Ignoring input line that is not valid UTF-8");
            Ok(Input::Skipped)
        }
        Err(e) => Err(e),
    }
}

/// Whether the loop keeps running after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    Quit,
}

/// Run until `quit`, end of input, or a shutdown signal.
///
/// The first page of the selected feed is requested before the first prompt.
pub async fn run<A: ForumApi + 'static>(
    session: &mut FeedSession<A>,
    mut event_rx: mpsc::Receiver<SyncEvent>,
) -> Result<()> {
    let mut stdout = std::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let width = terminal_width();

    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt())?;

    let active = session.active_identity().clone();
    session.ensure_next_page(&active);
    writeln!(stdout, "{}", render_tabs(session.tabs()))?;
    writeln!(stdout, "Type `help` for commands.")?;

    loop {
        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        #[cfg(unix)]
        let sigint_fut = sigint.recv();
        #[cfg(not(unix))]
        let sigint_fut = std::future::pending::<Option<()>>();

        tokio::select! {
            biased;

            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
                break;
            }

            _ = sigint_fut => {
                tracing::info!("Received SIGINT, shutting down gracefully");
                break;
            }

            // Completions go first so a command always sees the latest cache.
            Some(event) = event_rx.recv() => {
                let output = apply_event(session, event, width);
                if !output.is_empty() {
                    writeln!(stdout, "{}", output)?;
                }
            }

            line = lines.next_line() => {
                let line = match classify_line(line)? {
                    Input::Line(line) => line,
                    Input::Skipped => {
                        writeln!(stdout, "{}", INVALID_INPUT)?;
                        continue;
                    }
                    Input::End => {
                        tracing::debug!("End of input");
                        break;
                    }
                };
                let (action, output) = match commands::parse(&line) {
                    Ok(Some(command)) => handle_command(session, command, width),
                    Ok(None) => (Action::Continue, String::new()),
                    Err(e) => (Action::Continue, e.to_string()),
                };
                if !output.is_empty() {
                    writeln!(stdout, "{}", output)?;
                }
                stdout.flush()?;
                if action == Action::Quit {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Apply a completion and describe what the user should see.
///
/// The active feed is redrawn when its content changed. Notices for any
/// feed are always shown.
pub(super) fn apply_event<A: ForumApi + 'static>(
    session: &mut FeedSession<A>,
    event: SyncEvent,
    width: usize,
) -> String {
    let result = session.handle_event(event);
    let mut out = Vec::new();

    if let Some(notice) = result.notice {
        tracing::warn!(notice = %notice, "Background request failed");
        out.push(format!("! {}", notice));
    }
    if result.changed.as_ref() == Some(session.active_identity()) {
        out.push(render_active(session, width));
    }
    out.join("\n")
}

/// Execute one parsed command against the session.
pub(super) fn handle_command<A: ForumApi + 'static>(
    session: &mut FeedSession<A>,
    command: Command,
    width: usize,
) -> (Action, String) {
    let active = session.active_identity().clone();
    let output = match command {
        Command::List => render_active(session, width),
        Command::More => {
            if session.ensure_next_page(&active) {
                "Loading next page...".to_string()
            } else if session.status(&active).has_next_page {
                "Already loading.".to_string()
            } else {
                "No more topics.".to_string()
            }
        }
        Command::Refresh => {
            session.invalidate(&active);
            "Refreshing...".to_string()
        }
        Command::Vote { tid, direction } => match session.apply_vote(&active, tid, direction) {
            Ok(()) => {
                let votes = session
                    .cache()
                    .topic(&active, tid)
                    .map(|t| t.votes)
                    .unwrap_or_default();
                format!("Sent {} on #{} (now {:+}).", direction, tid, votes)
            }
            Err(e) => e.to_string(),
        },
        Command::Tabs => render_tabs(session.tabs()),
        Command::Tab(index) => match session.select_tab(index) {
            Ok(_) => format!(
                "{}\n{}",
                render_tabs(session.tabs()),
                render_active(session, width)
            ),
            Err(e) => e.to_string(),
        },
        Command::Status => render_status(&session.status(&active)),
        Command::Help => HELP.to_string(),
        Command::Quit => return (Action::Quit, String::new()),
    };
    (Action::Continue, output)
}

fn render_active<A: ForumApi + 'static>(session: &FeedSession<A>, width: usize) -> String {
    let identity = session.active_identity();
    render_topics(
        &session.visible_topics(identity),
        &session.status(identity),
        width,
    )
}
