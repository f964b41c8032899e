//! Text formatting functions for `campus_fixit`.
//!
//! Plain or ANSI-colored terminal output:
//! - Status icons (○ ◐ ✓)
//! - Category badges (`[Water]`, `[Electrical]`, ...)
//! - Issue line and detail formatting

use crate::client::{ClientIssue, ClientStatus};
use crate::util::time::{format_age, parse_timestamp};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Status icon characters.
pub mod icons {
    /// Open issue, nobody has picked it up yet.
    pub const OPEN: &str = "○";
    /// Being worked on.
    pub const IN_PROGRESS: &str = "◐";
    /// Fixed.
    pub const RESOLVED: &str = "✓";
}

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const DIM: &str = "\x1b[90m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Formatting options for text output.
#[derive(Debug, Clone, Copy)]
pub struct TextFormatOptions {
    pub use_color: bool,
    pub max_width: Option<usize>,
}

impl TextFormatOptions {
    #[must_use]
    pub const fn plain() -> Self {
        Self {
            use_color: false,
            max_width: None,
        }
    }
}

fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{color}{text}{RESET}")
    } else {
        text.to_string()
    }
}

const fn status_color(status: ClientStatus) -> &'static str {
    match status {
        ClientStatus::Open => GREEN,
        ClientStatus::InProgress => YELLOW,
        ClientStatus::Resolved => DIM,
    }
}

/// Return the icon character for a status.
#[must_use]
pub const fn format_status_icon(status: ClientStatus) -> &'static str {
    match status {
        ClientStatus::Open => icons::OPEN,
        ClientStatus::InProgress => icons::IN_PROGRESS,
        ClientStatus::Resolved => icons::RESOLVED,
    }
}

/// Format status label with optional color.
#[must_use]
pub fn format_status_label(status: ClientStatus, use_color: bool) -> String {
    paint(status.as_str(), status_color(status), use_color)
}

/// Format a category as a bracketed badge. A missing category shows as `[?]`.
#[must_use]
pub fn format_category_badge(category: &str) -> String {
    if category.is_empty() {
        "[?]".to_string()
    } else {
        format!("[{category}]")
    }
}

/// Determine terminal width from environment (falls back to 80).
#[must_use]
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|columns| columns.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(80)
}

fn take_width(text: &str, budget: usize) -> String {
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        let cw = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + cw > budget {
            break;
        }
        used += cw;
        out.push(c);
    }
    out
}

/// Truncate a title to fit within `max_len` visible columns.
///
/// Handles wide characters (emojis, CJK) correctly using `unicode-width`.
#[must_use]
pub fn truncate_title(title: &str, max_len: usize) -> String {
    if UnicodeWidthStr::width(title) <= max_len {
        return title.to_string();
    }
    if max_len <= 3 {
        return take_width(title, max_len);
    }
    let mut out = take_width(title, max_len - 3);
    out.push_str("...");
    out
}

/// Format a single-line issue summary with options.
///
/// Format: `{icon} {id} [{category}] {title}`
#[must_use]
pub fn format_issue_line_with(issue: &ClientIssue, options: TextFormatOptions) -> String {
    let icon_plain = format_status_icon(issue.status);
    let badge = format_category_badge(&issue.category);

    let prefix_len = UnicodeWidthStr::width(icon_plain)
        + UnicodeWidthStr::width(issue.id.as_str())
        + UnicodeWidthStr::width(badge.as_str())
        + 3;
    let title = options.max_width.map_or_else(
        || issue.title.clone(),
        |width| truncate_title(&issue.title, width.saturating_sub(prefix_len)),
    );

    let icon = paint(icon_plain, status_color(issue.status), options.use_color);
    format!("{icon} {} {badge} {title}", issue.id)
}

/// Format a single-line issue summary.
#[must_use]
pub fn format_issue_line(issue: &ClientIssue) -> String {
    format_issue_line_with(issue, TextFormatOptions::plain())
}

/// Multi-line view of one issue.
#[must_use]
pub fn format_issue_details(issue: &ClientIssue, use_color: bool) -> String {
    let mut out = String::new();
    let icon = paint(
        format_status_icon(issue.status),
        status_color(issue.status),
        use_color,
    );
    out.push_str(&format!("{icon} {}\n", paint(&issue.title, BOLD, use_color)));
    out.push_str(&format!("  ID:        {}\n", issue.id));
    out.push_str(&format!(
        "  Status:    {}\n",
        format_status_label(issue.status, use_color)
    ));
    out.push_str(&format!("  Category:  {}\n", issue.category));
    match &issue.created_by {
        Some(user) => out.push_str(&format!(
            "  Reported:  {} by {} <{}>\n",
            issue.created_at, user.name, user.email
        )),
        None => out.push_str(&format!("  Reported:  {}\n", issue.created_at)),
    }
    match parse_timestamp(&issue.updated_at) {
        Ok(ts) => out.push_str(&format!(
            "  Updated:   {} ({})\n",
            issue.updated_at,
            format_age(&ts, &chrono::Utc::now())
        )),
        Err(_) => out.push_str(&format!("  Updated:   {}\n", issue.updated_at)),
    }
    if let Some(url) = &issue.image_url {
        out.push_str(&format!("  Photo:     {url}\n"));
    }
    if !issue.admin_remarks.is_empty() {
        out.push_str(&format!("  Remarks:   {}\n", issue.admin_remarks));
    }
    out.push('\n');
    for line in issue.description.lines() {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
    out
}
