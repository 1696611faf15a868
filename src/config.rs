//! Server configuration.
//!
//! Values come from environment variables first; the server binary then applies
//! command-line overrides on top (see `main.rs`).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_HTTP_PORT: u16 = 5000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://microblog.db";
pub const DEFAULT_UPLOAD_DIR: &str = "static/upload/pfp";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: '{value}' ({reason})")]
    Invalid { name: String, value: String, reason: String },
    #[error("{0} is set but {1} is missing")]
    Incomplete(&'static str, &'static str),
}

/// Credentials of an account that is created (or promoted) to admin at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub http_port: u16,
    pub database_url: String,
    /// Filesystem directory receiving avatar uploads.
    pub upload_dir: PathBuf,
    /// Request body cap for the profile update form.
    pub max_upload_bytes: usize,
    pub session_ttl: Duration,
    /// Adds `Secure` to the session cookie; leave off for plain-HTTP development.
    pub cookie_secure: bool,
    pub admin_seed: Option<AdminSeed>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            cookie_secure: false,
            admin_seed: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source. `from_env` is this over
    /// the process environment; tests feed a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = ServerConfig::default();
        if let Some(v) = lookup("MICROBLOG_BIND") { cfg.bind = v; }
        if let Some(v) = lookup("MICROBLOG_HTTP_PORT") { cfg.http_port = parse_port("MICROBLOG_HTTP_PORT", &v)?; }
        if let Some(v) = lookup("DATABASE_URL") { cfg.database_url = v; }
        if let Some(v) = lookup("MICROBLOG_UPLOAD_DIR") { cfg.upload_dir = PathBuf::from(v); }
        if let Some(v) = lookup("MICROBLOG_MAX_UPLOAD_BYTES") {
            cfg.max_upload_bytes = v.trim().parse::<usize>().map_err(|e| invalid("MICROBLOG_MAX_UPLOAD_BYTES", &v, e))?;
        }
        if let Some(v) = lookup("MICROBLOG_SESSION_TTL_SECS") {
            let secs = v.trim().parse::<u64>().map_err(|e| invalid("MICROBLOG_SESSION_TTL_SECS", &v, e))?;
            if secs == 0 {
                return Err(invalid("MICROBLOG_SESSION_TTL_SECS", &v, "must be positive"));
            }
            cfg.session_ttl = Duration::from_secs(secs);
        }
        if let Some(v) = lookup("MICROBLOG_COOKIE_SECURE") {
            cfg.cookie_secure = parse_bool(&v).ok_or_else(|| invalid("MICROBLOG_COOKIE_SECURE", &v, "expected a boolean"))?;
        }
        cfg.admin_seed = match (lookup("MICROBLOG_ADMIN_USERNAME"), lookup("MICROBLOG_ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminSeed { username, password }),
            (Some(_), None) => return Err(ConfigError::Incomplete("MICROBLOG_ADMIN_USERNAME", "MICROBLOG_ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Incomplete("MICROBLOG_ADMIN_PASSWORD", "MICROBLOG_ADMIN_USERNAME")),
            (None, None) => None,
        };
        Ok(cfg)
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind, self.http_port)
    }
}

fn invalid(name: &str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid { name: name.to_string(), value: value.to_string(), reason: reason.to_string() }
}

pub fn parse_port(name: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse::<u16>().map_err(|e| invalid(name, value, e))
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
