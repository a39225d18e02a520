//! Plain-text rendering of tabs, topic lists and feed status.
//!
//! Every function returns a `String` so output can be asserted on without a
//! terminal.

use crate::api::Topic;
use crate::feed::{FeedStatus, Footer};
use crate::tabs::TabSet;
use crate::util::{fit_to_width, sanitize_line};
use chrono::DateTime;
use std::fmt::Write as _;
use std::sync::Arc;

/// Columns used when the terminal width is unknown.
pub const DEFAULT_WIDTH: usize = 80;

/// Fixed columns before the title: indent, `#tid`, votes and gaps.
const PREFIX_WIDTH: usize = 18;
/// Date column including its leading gap.
const DATE_WIDTH: usize = 12;

/// Terminal width from `COLUMNS`, else [`DEFAULT_WIDTH`].
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.trim().parse::<usize>().ok())
        .filter(|&w| w >= 40)
        .unwrap_or(DEFAULT_WIDTH)
}

/// One line with every tab, the selected one in brackets.
pub fn render_tabs(tabs: &TabSet) -> String {
    tabs.tabs()
        .iter()
        .enumerate()
        .map(|(i, tab)| {
            let title = sanitize_line(&tab.title);
            if tab.is_selected() {
                format!("[{}:{}]", i + 1, title)
            } else {
                format!(" {}:{} ", i + 1, title)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The topic rows followed by the footer line.
pub fn render_topics(topics: &[Arc<Topic>], status: &FeedStatus, width: usize) -> String {
    let mut out = String::new();

    if topics.is_empty() {
        if status.is_empty() {
            out.push_str("  (no topics)\n");
        } else if status.is_fetching {
            out.push_str("  Loading...\n");
        }
    }

    let title_width = width.saturating_sub(PREFIX_WIDTH + DATE_WIDTH).max(10);
    for topic in topics {
        let _ = writeln!(out, "{}", render_row(topic, title_width));
    }

    out.push_str(&render_footer(status));
    out
}

fn render_row(topic: &Topic, title_width: usize) -> String {
    let title = topic
        .title
        .as_deref()
        .map(sanitize_line)
        .unwrap_or_else(|| format!("Topic {}", topic.tid).into());
    let date = topic.timestamp.and_then(format_date).unwrap_or_default();
    format!(
        "  #{:<7} {:>+5}  {}  {:>10}",
        topic.tid,
        topic.votes,
        fit_to_width(&title, title_width),
        date
    )
}

/// `YYYY-MM-DD` for a millisecond timestamp.
fn format_date(millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.format("%Y-%m-%d").to_string())
}

pub fn render_footer(status: &FeedStatus) -> String {
    let mut line = match status.footer() {
        Footer::LoadingMore => "  -- loading more --".to_string(),
        Footer::NoMoreData => "  -- no more topics --".to_string(),
        Footer::Idle => "  -- `more` for the next page --".to_string(),
    };
    if status.is_refreshing {
        line.push_str(" (refreshing)");
    }
    line
}

/// Multi-line loading and pagination summary.
pub fn render_status(status: &FeedStatus) -> String {
    let mut out = format!(
        "pages: {}  topics: {}  more: {}",
        status.page_count,
        status.topic_count,
        if status.has_next_page { "yes" } else { "no" }
    );
    if status.is_refreshing {
        out.push_str("  refreshing");
    } else if status.is_fetching_next_page {
        out.push_str("  loading next page");
    } else if status.is_fetching {
        out.push_str("  loading");
    }
    if let Some(err) = &status.error {
        let _ = write!(out, "\nlast error: {}", sanitize_line(err));
    }
    out
}
