//! The REST API.
//!
//! | Method | Path                       | Guard                |
//! |--------|----------------------------|----------------------|
//! | POST   | `/api/auth/register`       | none                 |
//! | POST   | `/api/auth/login`          | none                 |
//! | POST   | `/api/issues`              | create issue         |
//! | GET    | `/api/issues`              | list all (admin)     |
//! | GET    | `/api/issues/my`           | list own             |
//! | GET    | `/api/issues/:id`          | view (+ ownership)   |
//! | PUT    | `/api/issues/:id/status`   | update status (admin)|
//! | PUT    | `/api/issues/:id/remarks`  | update remarks (admin)|
//! | GET    | `/api/health`              | none                 |
//! | GET    | `/api/storage/*path`       | signed link          |

pub mod guard;
pub mod rate_limit;
pub mod routes;
pub mod wire;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware;
use axum::routing::{get, post, put};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthService, TokenIssuer};
use crate::config::ServerConfig;
use crate::error::{FixitError, Result};
use crate::lifecycle::IssueService;
use crate::objects::{MAX_IMAGE_BYTES, build_object_store};
use crate::storage::{SharedStorage, SqliteStorage, shared};
use guard::{
    CREATE_ISSUE, Guard, LIST_ALL_ISSUES, LIST_OWN_ISSUES, UPDATE_REMARKS, UPDATE_STATUS,
    VIEW_ISSUE,
};
use rate_limit::RateLimiter;

/// Request bodies may carry one image plus a few text fields.
pub const BODY_LIMIT: usize = MAX_IMAGE_BYTES + 1024 * 1024;

/// Everything a handler can reach.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub issues: IssueService,
    pub storage: SharedStorage,
    pub rate_limiter: Arc<RateLimiter>,
    pub cors_origin: String,
}

impl AppState {
    /// Wire services over an opened database.
    #[must_use]
    pub fn new(config: &ServerConfig, storage: SqliteStorage) -> Self {
        let storage = shared(storage);
        let tokens = TokenIssuer::new(config.jwt_secret.as_bytes(), config.jwt_expires_in);
        let objects = build_object_store(&config.storage, &config.public_url);
        Self {
            auth: AuthService::new(storage.clone(), tokens),
            issues: IssueService::new(storage.clone(), objects),
            storage,
            rate_limiter: Arc::new(RateLimiter::new(config.rate_limit)),
            cors_origin: config.cors_origin.clone(),
        }
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    let origin = origin.trim();
    if origin.is_empty() || origin == "*" {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE]),
        Err(e) => {
            tracing::warn!(origin, error = %e, "invalid CORS origin, allowing none");
            CorsLayer::new()
        }
    }
}

/// The full application router.
pub fn build_router(state: AppState) -> Router {
    let guarded = |required| middleware::from_fn_with_state(Guard::new(&state, required), guard::check);

    let api = Router::new()
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .route(
            "/api/issues",
            post(routes::issues::create_issue).route_layer(guarded(CREATE_ISSUE)),
        )
        .route(
            "/api/issues",
            get(routes::issues::list_all_issues).route_layer(guarded(LIST_ALL_ISSUES)),
        )
        .route(
            "/api/issues/my",
            get(routes::issues::list_my_issues).route_layer(guarded(LIST_OWN_ISSUES)),
        )
        .route(
            "/api/issues/:id",
            get(routes::issues::get_issue).route_layer(guarded(VIEW_ISSUE)),
        )
        .route(
            "/api/issues/:id/status",
            put(routes::issues::update_status).route_layer(guarded(UPDATE_STATUS)),
        )
        .route(
            "/api/issues/:id/remarks",
            put(routes::issues::update_remarks).route_layer(guarded(UPDATE_REMARKS)),
        )
        .route("/api/health", get(routes::health))
        .route("/api/storage/*path", get(routes::storage::download))
        .fallback(routes::not_found);

    api.layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit::limit,
        ))
        .layer(cors_layer(&state.cors_origin))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Open storage, seed the admin and build the state `serve` runs on.
///
/// # Errors
///
/// Fails if the database cannot be opened. Seeding failures are only logged.
pub fn prepare(config: &ServerConfig) -> Result<AppState> {
    let storage = SqliteStorage::open_url(&config.database_url)?;
    storage.ping()?;
    tracing::info!(database = %config.database_url, "database ready");

    let state = AppState::new(config, storage);
    tracing::info!(backend = state.issues.objects().backend(), "object store ready");
    if let Some(local) = state.issues.objects().as_local() {
        tracing::info!(dir = %local.dir().display(), "serving uploads from disk");
    }

    if let Err(e) = state.auth.seed_admin(&config.admin) {
        tracing::error!(error = %e, "admin seeding failed");
    }
    Ok(state)
}

/// Bind and serve until Ctrl-C.
///
/// # Errors
///
/// Fails if the database cannot be opened or the address cannot be bound.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let state = prepare(&config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| FixitError::Config(format!("Cannot bind {}: {e}", config.bind)))?;
    let local = listener.local_addr()?;
    tracing::info!(addr = %local, "Campus FixIt API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
