//! `campus_fixit`: campus facility-issue reporting.
//!
//! Students report broken things (title, description, category, optional
//! photo); administrators move reports through `Open`, `In Progress` and
//! `Resolved` and leave remarks. The crate holds both sides:
//!
//! - [`server`]: the axum REST API over [`storage`] (SQLite), [`auth`]
//!   (argon2 + JWT), [`objects`] (image store with signed URLs) and
//!   [`lifecycle`] (the issue operations and their authorization)
//! - [`client`]: the session and issue-list containers a UI drives, speaking
//!   to the API through an explicit session
//! - [`cli`]: the `fixit` binary's command surface for both

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod objects;
pub mod server;
pub mod storage;
pub mod util;
pub mod validation;

pub use error::{ErrorCode, FixitError, Result, StructuredError};
