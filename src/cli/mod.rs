//! CLI definitions and entry point.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::CliOverrides;

pub mod commands;

/// Campus facility-issue reporting: API server and client
#[derive(Parser, Debug)]
#[command(name = "fixit", author, version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API base URL for client commands (default http://localhost:5000)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Project config file (default ./fixit.yaml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Session cache file (default ~/.config/fixit/session.json)
    #[arg(long, global = true)]
    pub session_file: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

impl Cli {
    /// Config overrides carried by the global flags.
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            config: self.config.clone(),
            api_url: self.api_url.clone(),
            session_file: self.session_file.clone(),
            ..CliOverrides::default()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the REST API server
    Serve(ServeArgs),

    /// Check that the API server is up
    Health,

    /// Create a student account and sign in
    Register(RegisterArgs),

    /// Sign in and cache the session
    Login(LoginArgs),

    /// Forget the cached session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Report and manage issues
    #[command(alias = "issue")]
    Issues {
        #[command(subcommand)]
        command: IssuesCommand,
    },

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Address to bind, e.g. 0.0.0.0:5000
    #[arg(long)]
    pub bind: Option<String>,

    /// Database path, sqlite:// URL or :memory:
    #[arg(long)]
    pub database: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RegisterArgs {
    /// Display name
    #[arg(long)]
    pub name: String,

    /// Email address
    #[arg(long)]
    pub email: String,

    /// Password (read from stdin when omitted)
    #[arg(long, env = "FIXIT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Email address
    #[arg(long)]
    pub email: String,

    /// Password (read from stdin when omitted)
    #[arg(long, env = "FIXIT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum IssuesCommand {
    /// Report a new issue
    Create(CreateArgs),

    /// List issues you reported
    Mine(ListArgs),

    /// List every issue (admin)
    All(ListArgs),

    /// Show one issue
    Show {
        /// Issue ID
        id: String,
    },

    /// Change an issue's status (admin)
    Status {
        /// Issue ID
        id: String,
        /// open, in-progress or resolved
        status: String,
    },

    /// Set the admin remarks on an issue (admin)
    Remarks {
        /// Issue ID
        id: String,
        /// Remarks text; empty clears them
        remarks: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// Short summary
    #[arg(long)]
    pub title: String,

    /// What is wrong and where
    #[arg(short, long)]
    pub description: String,

    /// Electrical, Water, Internet or Infrastructure
    #[arg(short, long)]
    pub category: String,

    /// Photo to attach (max 5 MB)
    #[arg(long)]
    pub image: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Filter by status (open, in-progress, resolved)
    #[arg(short, long)]
    pub status: Option<String>,

    /// Filter by category
    #[arg(short, long)]
    pub category: Option<String>,
}

/// Supported shells for completion generation.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
    Elvish,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: ShellType,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
