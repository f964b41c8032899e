//! Output formatting for `campus_fixit`.
//!
//! Human-readable text for the terminal. `--json` output bypasses this module
//! and serializes the client types directly.

mod text;

pub use text::{
    TextFormatOptions, format_category_badge, format_issue_details, format_issue_line,
    format_issue_line_with, format_status_icon, format_status_label, terminal_width,
    truncate_title,
};
