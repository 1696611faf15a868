//!
//! microblog storage module
//! ------------------------
//! Relational persistence on SQLite through a `sqlx` pool. Two tables:
//! `user` (credentials, profile fields, role, last login) and `follow`
//! (directed edges `user_id -> follows_id`).
//!
//! The pool is wrapped in `Db`, which the server injects into every handler;
//! nothing in the crate reaches for a global connection. Query helpers live in
//! `users` and `follows` and take `&Db`.

use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use axum::http::StatusCode;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::debug;

pub mod follows;
pub mod users;

pub use follows::FollowCounts;
pub use users::{ProfileUpdate, UserProfile, UserRecord};

/// Cloneable handle to the connection pool.
#[derive(Clone, Debug)]
pub struct Db(pub SqlitePool);

const SCHEMA: [&str; 2] = [
    r#"
    CREATE TABLE IF NOT EXISTS user (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        username    TEXT NOT NULL UNIQUE,
        password    TEXT NOT NULL,
        useremail   TEXT,
        nickname    TEXT,
        website     TEXT,
        About       TEXT,
        pfp         TEXT,
        user_type   TEXT,
        last_login  TEXT
    );"#,
    r#"
    CREATE TABLE IF NOT EXISTS follow (
        user_id     INTEGER NOT NULL REFERENCES user (id),
        follows_id  INTEGER NOT NULL REFERENCES user (id),
        UNIQUE (user_id, follows_id)
    );"#,
];

impl Db {
    /// Open (creating the file if needed) a SQLite database with foreign keys on.
    pub async fn connect(url: &str) -> anyhow::Result<Db> {
        let opts = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("parse sqlite url {}", url))?
            .create_if_missing(true)
            .foreign_keys(true);
        // Every in-memory connection is its own database; pin the pool to one.
        let max = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max)
            .connect_with(opts)
            .await
            .with_context(|| format!("connect to sqlite via {}", url))?;
        Ok(Db(pool))
    }

    /// Create tables if they do not exist. Safe to run on every startup.
    pub async fn init_schema(&self) -> anyhow::Result<()> {
        for stmt in SCHEMA.iter() {
            sqlx::query(stmt)
                .execute(&self.0)
                .await
                .with_context(|| format!("apply schema: {}", stmt.trim().lines().next().unwrap_or_default()))?;
        }
        debug!("schema ready");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool { &self.0 }

    /// Liveness probe: can a connection be acquired from the pool.
    pub async fn health(&self) -> StatusCode {
        match self.0.acquire().await {
            Ok(_) => StatusCode::OK,
            Err(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Build a `sqlite://` URL for a file path, creating parent directories.
pub fn sqlite_url_for_path(p: &Path) -> anyhow::Result<String> {
    let abs = if p.is_absolute() { p.to_path_buf() } else { std::env::current_dir()?.join(p) };
    if let Some(parent) = abs.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("create parent dirs for {:?}", parent))?;
    }
    let s = abs.to_string_lossy().replace('\\', "/");
    Ok(format!("sqlite://{}", s))
}
