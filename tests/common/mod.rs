#![allow(dead_code)]

pub mod cli;
pub mod http;

use campus_fixit::auth::AuthResponse;
use campus_fixit::config::{AdminSeed, RateLimitSettings, ServerConfig};
use campus_fixit::model::{Category, Issue, Role, Status, User};
use campus_fixit::server::AppState;
use campus_fixit::storage::SqliteStorage;
use chrono::Utc;
use std::sync::Once;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::info;

pub const TEST_SECRET: &str = "test-signing-secret-0123456789";
pub const ADMIN_EMAIL: &str = "admin@campus.test";
pub const ADMIN_PASSWORD: &str = "admin-pass-123";

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        campus_fixit::logging::init_test_logging();
    });
}

pub struct TestLogGuard {
    name: String,
    start: Instant,
}

impl TestLogGuard {
    fn new(name: &str) -> Self {
        init_test_logging();
        info!("{name}: starting");
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }
}

impl Drop for TestLogGuard {
    fn drop(&mut self) {
        info!(
            "{}: assertions passed (elapsed {:?})",
            self.name,
            self.start.elapsed()
        );
    }
}

pub fn test_log(name: &str) -> TestLogGuard {
    TestLogGuard::new(name)
}

pub fn test_db() -> SqliteStorage {
    init_test_logging();
    SqliteStorage::open_memory().expect("Failed to create test database")
}

pub fn test_db_with_dir() -> (SqliteStorage, TempDir) {
    init_test_logging();
    let dir = TempDir::new().expect("Failed to create temp dir");
    let storage =
        SqliteStorage::open(&dir.path().join("fixit.db")).expect("Failed to create test database");
    (storage, dir)
}

/// Server config with local uploads under `dir` and a seeded admin.
pub fn test_config(dir: &TempDir) -> ServerConfig {
    let mut config = ServerConfig::with_secret(TEST_SECRET);
    config.storage.dir = dir.path().join("uploads");
    config.rate_limit = RateLimitSettings {
        window: Duration::from_secs(900),
        max_requests: 10_000,
    };
    config.admin = AdminSeed {
        name: "Campus Admin".to_string(),
        email: Some(ADMIN_EMAIL.to_string()),
        password: Some(ADMIN_PASSWORD.to_string()),
    };
    config
}

/// Wired services over an in-memory database, admin already seeded.
pub fn test_state(config: &ServerConfig) -> AppState {
    let state = AppState::new(config, test_db());
    state
        .auth
        .seed_admin(&config.admin)
        .expect("seed admin");
    state
}

pub fn register_student(state: &AppState, name: &str, email: &str) -> AuthResponse {
    state
        .auth
        .register(name, email, "student-pass")
        .expect("register student")
}

pub fn login_admin(state: &AppState) -> AuthResponse {
    state
        .auth
        .login(ADMIN_EMAIL, ADMIN_PASSWORD)
        .expect("admin login")
}

pub fn make_user(id: &str, email: &str, role: Role) -> User {
    let now = Utc::now();
    User {
        id: id.to_string(),
        name: format!("User {id}"),
        email: email.to_string(),
        password_hash: "$argon2id$fake".to_string(),
        role,
        created_at: now,
        updated_at: now,
    }
}

pub fn make_issue(id: &str, creator: &str, category: Category, status: Status) -> Issue {
    let now = Utc::now();
    Issue {
        id: id.to_string(),
        title: format!("Issue {id}"),
        description: "Something is broken".to_string(),
        category,
        status,
        image_url: None,
        created_by: creator.to_string(),
        creator: None,
        admin_remarks: String::new(),
        created_at: now,
        updated_at: now,
    }
}
