//!
//! microblog HTTP server
//! ---------------------
//! Axum router for the account, profile, social graph and admin pages.
//!
//! Responsibilities:
//! - Server-side sessions keyed by an opaque cookie (see `identity::session`).
//! - Per-request identity loading and login/admin guards (`gate`).
//! - Handlers that talk to SQLite through the `Db` handle carried in `AppState`.
//! - Startup: schema creation, optional admin seeding, session sweeping.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Router};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::identity::{RequestContext, SessionManager};
use crate::storage::{users, Db};

pub mod admin;
pub mod auth;
pub mod gate;
pub mod profile;
pub mod social;
pub mod view;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub sessions: Arc<SessionManager>,
    /// Directory avatar uploads are written to.
    pub upload_dir: PathBuf,
    pub cookie_secure: bool,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(db: Db, cfg: &ServerConfig) -> Self {
        Self {
            db,
            sessions: Arc::new(SessionManager::new(cfg.session_ttl)),
            upload_dir: cfg.upload_dir.clone(),
            cookie_secure: cfg.cookie_secure,
            max_upload_bytes: cfg.max_upload_bytes,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/auth/update", get(profile::edit_form).post(profile::update))
        .route("/auth/{id}/follow", post(social::follow))
        .route("/auth/{id}/unfollow", post(social::unfollow))
        .route("/auth/{id}/following", get(social::following))
        .route("/auth/{id}/followers", get(social::followers))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .route_layer(from_fn(gate::require_login));

    let admin = Router::new()
        .route("/auth/admin", get(admin::admin_dashboard))
        .route("/auth/adminusers", get(admin::list_users))
        .route("/auth/adminposts", get(admin::list_posts))
        .route_layer(from_fn(gate::require_admin));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/auth/register", get(auth::register_form).post(auth::register))
        .route("/auth/login", get(auth::login_form).post(auth::login))
        .route("/auth/logout", get(auth::logout))
        .merge(protected)
        .merge(admin)
        .layer(from_fn_with_state(state.clone(), gate::load_identity))
        .with_state(state)
}

async fn index(State(state): State<AppState>, Extension(ctx): Extension<RequestContext>) -> Response {
    view::render(&state, &ctx, view::Page::new(view::INDEX_TEMPLATE))
}

async fn health(State(state): State<AppState>) -> StatusCode {
    state.db.health().await
}

/// Serve on an already-bound listener. Tests use this with port 0.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Open the database, make sure the schema and optional admin exist, then serve
/// until the listener fails.
pub async fn run(cfg: ServerConfig) -> anyhow::Result<()> {
    info!(
        target: "startup",
        "microblog starting: database_url={}, upload_dir={:?}, session_ttl={}s, cookie_secure={}",
        cfg.database_url, cfg.upload_dir, cfg.session_ttl.as_secs(), cfg.cookie_secure
    );

    std::fs::create_dir_all(&cfg.upload_dir)
        .with_context(|| format!("Failed to create or access upload dir: {}", cfg.upload_dir.display()))?;
    let db = Db::connect(&cfg.database_url).await?;
    db.init_schema().await.context("While creating schema")?;
    if let Some(seed) = &cfg.admin_seed {
        users::ensure_default_admin(&db, seed)
            .await
            .with_context(|| format!("While ensuring admin account '{}'", seed.username))?;
    }

    let state = AppState::new(db, &cfg);

    // Background session sweeper
    {
        let sessions = state.sessions.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(SESSION_SWEEP_INTERVAL).await;
                let removed = sessions.sweep();
                if removed > 0 { tracing::debug!(removed = removed, "session_sweep"); }
            }
        });
    }

    let addr = cfg.socket_addr();
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("Failed to bind {}", addr))?;
    serve(listener, state).await
}
