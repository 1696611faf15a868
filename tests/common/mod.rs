//! Shared harness: a server on an ephemeral port backed by a temp SQLite file.
#![allow(dead_code)]

use std::path::PathBuf;

use anyhow::Result;
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use tempfile::TempDir;
use tokio::net::TcpListener;

use microblog::config::{AdminSeed, ServerConfig};
use microblog::server::{self, AppState};
use microblog::storage::{sqlite_url_for_path, users, Db, UserRecord};

pub struct TestServer {
    pub base: String,
    pub state: AppState,
    pub upload_dir: PathBuf,
    _tmp: TempDir,
}

impl TestServer {
    pub fn db(&self) -> &Db { &self.state.db }

    pub fn url(&self, path: &str) -> String { format!("{}{}", self.base, path) }

    pub async fn user(&self, username: &str) -> Result<UserRecord> {
        users::find_by_username(self.db(), username)
            .await?
            .ok_or_else(|| anyhow::anyhow!("no user {}", username))
    }

    pub async fn edge_count(&self) -> Result<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follow").fetch_one(self.db().pool()).await?)
    }

    pub async fn seed_admin(&self, username: &str, password: &str) -> Result<()> {
        let seed = AdminSeed { username: username.to_string(), password: password.to_string() };
        users::ensure_default_admin(self.db(), &seed).await
    }

    pub async fn register(&self, client: &Client, username: &str, password: &str, email: &str) -> Result<Response> {
        Ok(client
            .post(self.url("/auth/register"))
            .form(&[("username", username), ("password", password), ("useremail", email)])
            .send()
            .await?)
    }

    pub async fn login(&self, client: &Client, username: &str, password: &str) -> Result<Response> {
        Ok(client
            .post(self.url("/auth/login"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await?)
    }

    /// Register and log in on a fresh cookie-carrying client.
    pub async fn signed_in(&self, username: &str) -> Result<Client> {
        let client = client();
        self.register(&client, username, "pw", &format!("{}@example.com", username)).await?;
        let resp = self.login(&client, username, "pw").await?;
        anyhow::ensure!(resp.status() == 303, "login for {} failed: {}", username, resp.status());
        Ok(client)
    }

    /// Rendered view of `path` as JSON.
    pub async fn view(&self, client: &Client, path: &str) -> Result<serde_json::Value> {
        let resp = client.get(self.url(path)).send().await?;
        anyhow::ensure!(resp.status() == 200, "GET {} returned {}", path, resp.status());
        Ok(resp.json().await?)
    }
}

pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("reqwest client")
}

pub fn location(resp: &Response) -> Option<&str> {
    resp.headers().get("location").and_then(|v| v.to_str().ok())
}

pub fn flashes(page: &serde_json::Value) -> Vec<String> {
    page["flashes"]
        .as_array()
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

pub async fn spawn() -> Result<TestServer> {
    let tmp = tempfile::tempdir()?;
    let url = sqlite_url_for_path(&tmp.path().join("blog.db"))?;
    let db = Db::connect(&url).await?;
    db.init_schema().await?;

    let cfg = ServerConfig {
        database_url: url,
        upload_dir: tmp.path().join("pfp"),
        ..ServerConfig::default()
    };
    let state = AppState::new(db, &cfg);
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let base = format!("http://{}", listener.local_addr()?);
    tokio::spawn(server::serve(listener, state.clone()));

    Ok(TestServer { base, state, upload_dir: cfg.upload_dir, _tmp: tmp })
}
