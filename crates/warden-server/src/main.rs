//! warden server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, loads every prisoner, runs the periodic reconciliation pass
//! in the background, and serves the JSON API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `auth_password_hash` in config.toml:
//!
//! ```text
//! cargo run -p warden-server -- --hash-password
//! ```
//!
//! # Importing legacy records
//!
//! A JSON array of pre-versioning prisoner documents can be loaded with
//! `--import-legacy <file>`. They are migrated on the next start.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use rand_core::OsRng;
use tokio::{net::TcpListener, sync::watch};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use warden_core::ids::RoleId;
use warden_engine::{Warden, scheduler::run_scheduler};
use warden_server::{AppState, ServerConfig, auth::AuthConfig};
use warden_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Warden sentence reconciliation server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  /// Import a JSON array of legacy prisoner documents into the store and exit.
  #[arg(long, value_name = "FILE")]
  import_legacy: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Helper mode: hash a password and exit.
  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("WARDEN"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if let Some(path) = cli.import_legacy {
    let raw = tokio::fs::read_to_string(&path)
      .await
      .with_context(|| format!("failed to read {path:?}"))?;
    let documents: Vec<serde_json::Value> =
      serde_json::from_str(&raw).context("legacy import must be a JSON array")?;
    let imported = store
      .import_legacy(&documents)
      .await
      .context("legacy import failed")?;
    tracing::info!(imported, "imported legacy prisoner records");
    return Ok(());
  }

  let ledger = store.role_ledger(RoleId(server_cfg.prison_role));
  let warden = Arc::new(Warden::new(store, ledger.clone()));

  let loaded = warden.load().await.context("failed to load prisoners")?;
  tracing::info!(loaded, "prisoners loaded");

  // The scheduler's first pass doubles as the post-load reconciliation.
  let (stop_tx, mut stop_rx) = watch::channel(());
  let scheduler = tokio::spawn(run_scheduler(
    warden.clone(),
    server_cfg.tick_interval(),
    async move {
      let _ = stop_rx.changed().await;
    },
  ));

  let state = AppState {
    warden,
    ledger,
    auth: Arc::new(AuthConfig {
      username:      server_cfg.auth_username.clone(),
      password_hash: server_cfg.auth_password_hash.clone(),
    }),
  };

  let app = warden_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  let _ = stop_tx.send(());
  scheduler.await.context("scheduler task failed")?;

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    return;
  }
  tracing::info!("shutting down");
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
