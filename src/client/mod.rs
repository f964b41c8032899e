//! Typed client for the REST API.
//!
//! - [`api`] - transport, bearer session, error envelope decoding
//! - [`session`] - signed-in user and its on-disk cache
//! - [`issues`] - own/all issue lists kept in sync with mutations
//! - [`normalize`] - payload and status mapping at the boundary

pub mod api;
pub mod issues;
pub mod normalize;
pub mod session;

pub use api::{ApiClient, ImageFile, NewIssueForm, Session};
pub use issues::{ClientFilters, IssueList};
pub use normalize::{ClientIssue, ClientStatus, ClientUser, normalize_issue};
pub use session::SessionContainer;
