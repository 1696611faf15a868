//! Credential store: the `user` table.

use anyhow::Context;
use chrono::{DateTime, Utc};
use chrono_tz::America::New_York;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::info;

use super::Db;
use crate::config::AdminSeed;
use crate::security;

const USER_COLUMNS: &str =
    "id, username, password, useremail, nickname, website, About AS about, pfp, user_type, last_login";

/// Full row, including the password hash. Never serialized; use [`UserProfile`].
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub useremail: Option<String>,
    pub nickname: Option<String>,
    pub website: Option<String>,
    pub about: Option<String>,
    pub pfp: Option<String>,
    pub user_type: Option<String>,
    pub last_login: Option<String>,
}

impl UserRecord {
    pub fn is_admin(&self) -> bool { security::is_admin_role(self.user_type.as_deref()) }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.useremail.clone(),
            nickname: self.nickname.clone(),
            website: self.website.clone(),
            about: self.about.clone(),
            pfp: self.pfp.clone(),
            user_type: self.user_type.clone(),
            last_login: self.last_login.clone(),
        }
    }
}

/// What views get to see of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub website: Option<String>,
    pub about: Option<String>,
    pub pfp: Option<String>,
    pub user_type: Option<String>,
    pub last_login: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub nickname: String,
    pub website: String,
    pub about: String,
    pub pfp: Option<String>,
}

/// Current time in US Eastern, RFC 3339, as stored in `last_login`.
pub fn login_timestamp(now: DateTime<Utc>) -> String {
    now.with_timezone(&New_York).to_rfc3339()
}

pub async fn username_exists(db: &Db, username: &str) -> sqlx::Result<bool> {
    let hit: Option<i64> = sqlx::query_scalar("SELECT id FROM user WHERE username = ?")
        .bind(username)
        .fetch_optional(db.pool())
        .await?;
    Ok(hit.is_some())
}

/// Insert a new account. Returns `None` when the username is already taken,
/// including when a concurrent insert wins the UNIQUE constraint.
pub async fn insert_user(db: &Db, username: &str, password_hash: &str, email: &str) -> sqlx::Result<Option<i64>> {
    let res = sqlx::query("INSERT INTO user (username, password, useremail) VALUES (?, ?, ?)")
        .bind(username)
        .bind(password_hash)
        .bind(email)
        .execute(db.pool())
        .await;
    match res {
        Ok(done) => Ok(Some(done.last_insert_rowid())),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
        Err(e) => Err(e),
    }
}

pub async fn find_by_username(db: &Db, username: &str) -> sqlx::Result<Option<UserRecord>> {
    sqlx::query_as::<_, UserRecord>(&format!("SELECT {USER_COLUMNS} FROM user WHERE username = ?"))
        .bind(username)
        .fetch_optional(db.pool())
        .await
}

pub async fn find_by_id(db: &Db, id: i64) -> sqlx::Result<Option<UserRecord>> {
    sqlx::query_as::<_, UserRecord>(&format!("SELECT {USER_COLUMNS} FROM user WHERE id = ?"))
        .bind(id)
        .fetch_optional(db.pool())
        .await
}

pub async fn list_all(db: &Db) -> sqlx::Result<Vec<UserRecord>> {
    sqlx::query_as::<_, UserRecord>(&format!("SELECT {USER_COLUMNS} FROM user ORDER BY id"))
        .fetch_all(db.pool())
        .await
}

pub async fn count(db: &Db) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM user").fetch_one(db.pool()).await
}

pub async fn stamp_last_login(db: &Db, id: i64, at: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE user SET last_login = ? WHERE id = ?")
        .bind(at)
        .bind(id)
        .execute(db.pool())
        .await?;
    Ok(())
}

pub async fn avatar_of(db: &Db, id: i64) -> sqlx::Result<Option<String>> {
    let pfp: Option<Option<String>> = sqlx::query_scalar("SELECT pfp FROM user WHERE id = ?")
        .bind(id)
        .fetch_optional(db.pool())
        .await?;
    Ok(pfp.flatten())
}

pub async fn update_profile(db: &Db, id: i64, upd: &ProfileUpdate) -> sqlx::Result<()> {
    sqlx::query("UPDATE user SET nickname = ?, website = ?, About = ?, pfp = ? WHERE id = ?")
        .bind(&upd.nickname)
        .bind(&upd.website)
        .bind(&upd.about)
        .bind(&upd.pfp)
        .bind(id)
        .execute(db.pool())
        .await?;
    Ok(())
}

pub async fn set_role(db: &Db, username: &str, role: &str) -> sqlx::Result<bool> {
    let done = sqlx::query("UPDATE user SET user_type = ? WHERE username = ?")
        .bind(role)
        .bind(username)
        .execute(db.pool())
        .await?;
    Ok(done.rows_affected() > 0)
}

/// Create the seeded admin account, or promote it if it already exists.
/// An existing account keeps its password.
pub async fn ensure_default_admin(db: &Db, seed: &AdminSeed) -> anyhow::Result<()> {
    if username_exists(db, &seed.username).await? {
        set_role(db, &seed.username, security::ADMIN_ROLE).await?;
        info!(target: "startup", username = %seed.username, "existing account promoted to admin");
        return Ok(());
    }
    let hash = security::hash_password(&seed.password).context("hash admin password")?;
    if insert_user(db, &seed.username, &hash, "").await?.is_some() {
        set_role(db, &seed.username, security::ADMIN_ROLE).await?;
        info!(target: "startup", username = %seed.username, "admin account created");
    }
    Ok(())
}
