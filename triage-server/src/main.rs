use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use triage_core::{OpsDesk, SqliteStore, SystemClock};
use triage_server::config::AppConfig;
use triage_server::{router, AppState};

#[derive(Parser, Debug)]
#[command(name = "ops-triage")]
#[command(about = "Incident lifecycle, SLA health and triage service")]
struct CliArgs {
    /// Listen address, e.g. 0.0.0.0:8080
    #[arg(short, long, env = "OPS_TRIAGE_ADDR")]
    addr: Option<String>,

    /// SQLite database path
    #[arg(long, env = "OPS_TRIAGE_DB")]
    db: Option<PathBuf>,

    /// TOML config file; skips the usual lookup when given
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,triage_core=info,triage_server=info")
            }),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load(),
    };
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    if let Some(db) = args.db {
        config.server.db_path = db;
    }

    let store = SqliteStore::open(&config.server.db_path)
        .with_context(|| format!("opening {}", config.server.db_path.display()))?;
    let desk = OpsDesk::new(Arc::new(store), Arc::new(SystemClock), config.triage.clone());
    info!(
        backend = desk.store().backend_name(),
        mttr_window_days = desk.config().mttr_window_days,
        breach_threshold_total = desk.config().breach_threshold_total,
        "incident store ready"
    );
    let app = router(AppState::new(desk));

    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("binding {}", config.server.addr))?;

    info!(addr = %config.server.addr, db = %config.server.db_path.display(), "ops-triage listening");
    axum::serve(listener, app).await?;
    Ok(())
}
