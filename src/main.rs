use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use microblog::config::{parse_port, ServerConfig};

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].as_str());
        }
        i += 1;
    }
    None
}

/// Command-line flags win over environment variables.
fn apply_args(cfg: &mut ServerConfig, args: &[String]) -> anyhow::Result<()> {
    if let Some(v) = flag_value(args, "--port") { cfg.http_port = parse_port("--port", v)?; }
    if let Some(v) = flag_value(args, "--database-url") { cfg.database_url = v.to_string(); }
    if let Some(v) = flag_value(args, "--upload-dir") { cfg.upload_dir = PathBuf::from(v); }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().collect();
    let mut cfg = ServerConfig::from_env()?;
    apply_args(&mut cfg, &args)?;

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "microblog",
        "microblog starting: RUST_LOG='{}', addr={}, database_url='{}', admin_seed={}",
        rust_log, cfg.socket_addr(), cfg.database_url, cfg.admin_seed.is_some()
    );

    microblog::server::run(cfg).await
}
