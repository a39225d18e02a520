//! Command parsing for the line-oriented front end.

use crate::api::Tid;
use crate::feed::VoteDirection;
use thiserror::Error;

/// Help text listing every command.
pub const HELP: &str = "\
Commands:
  list            show the current feed
  more            load the next page
  refresh         reload the current feed from page 1
  up <tid>        upvote a topic
  down <tid>      downvote a topic
  tabs            list the feed tabs
  tab <n>         switch to tab n (1-based)
  status          show loading state
  help            show this help
  quit            exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    List,
    More,
    Refresh,
    Vote { tid: Tid, direction: VoteDirection },
    Tabs,
    /// Zero-based tab index.
    Tab(usize),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0} (type `help`)")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("Not a valid number: {0}")]
    InvalidNumber(String),
    #[error("Tabs are numbered from 1")]
    TabZero,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let command = match head.to_ascii_lowercase().as_str() {
        "list" | "ls" | "l" => Command::List,
        "more" | "m" | "n" => Command::More,
        "refresh" | "r" => Command::Refresh,
        "up" | "+" => Command::Vote {
            tid: number(arg, "up")?,
            direction: VoteDirection::Up,
        },
        "down" | "-" => Command::Vote {
            tid: number(arg, "down")?,
            direction: VoteDirection::Down,
        },
        "tabs" => Command::Tabs,
        "tab" | "t" => {
            let n: usize = number(arg, "tab")?;
            if n == 0 {
                return Err(CommandError::TabZero);
            }
            Command::Tab(n - 1)
        }
        "status" | "s" => Command::Status,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn number<T: std::str::FromStr>(arg: Option<&str>, name: &'static str) -> Result<T, CommandError> {
    let raw = arg.ok_or(CommandError::MissingArgument(name))?;
    raw.trim_start_matches('#')
        .parse()
        .map_err(|_| CommandError::InvalidNumber(raw.to_string()))
}
