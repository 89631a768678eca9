//! rollcall-bot - course enrollment and channel permission service
//!
//! Wires the enrollment engine, permission reconciler, and catalogue cache
//! to a SQLite database and serves the admin API. The chat-platform adapter
//! is out of tree; without one the binary runs against the in-memory guild
//! backend, which is enough for the admin API and local development.

use anyhow::Result;
use clap::Parser;
use rollcall_bot::course::{CatalogueCache, CatalogueSource, CourseDirectory};
use rollcall_bot::course::catalogue::HttpCatalogueSource;
use rollcall_bot::enrollment::{EnrollmentEngine, Reconciler};
use rollcall_bot::gateway::MemoryGuild;
use rollcall_bot::{build_router, AppState};
use rollcall_common::config::{load_config, resolve_database_path};
use rollcall_common::db::init_database;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "rollcall-bot", about = "Course enrollment and permission service")]
struct Args {
    /// Path to rollcall.toml (default: platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database file path (overrides ROLLCALL_DB and the config file)
    #[arg(long)]
    db: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting rollcall-bot v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let db_path = resolve_database_path(args.db.as_deref(), &config);
    info!("Database path: {}", db_path.display());
    let db = init_database(&db_path).await?;

    // No platform adapter is linked into this binary; run against the
    // in-memory backend so the admin API and catalogue refresh still work
    let guild = Arc::new(MemoryGuild::new());
    warn!("No platform gateway configured, using in-memory guild backend");

    let catalogue = Arc::new(CatalogueCache::new());
    let mut sources: Vec<Arc<dyn CatalogueSource>> = Vec::new();
    for url in &config.catalogue.sources {
        let source = HttpCatalogueSource::new(
            url.clone(),
            Duration::from_secs(config.catalogue.fetch_timeout_secs),
        )?;
        sources.push(Arc::new(source));
    }
    let sources = Arc::new(sources);

    let directory = CourseDirectory::new(db.clone(), guild.clone());
    let reconciler = Reconciler::new(
        db.clone(),
        guild.clone(),
        config.permissions.clone(),
        Duration::from_millis(config.reconcile.overwrite_delay_ms),
    );
    let engine = EnrollmentEngine::new(
        db.clone(),
        guild.clone(),
        guild.clone(),
        directory.clone(),
        catalogue.clone(),
        reconciler.clone(),
        config.verification.required,
    );

    if !sources.is_empty() {
        if !catalogue.refresh(&sources).await {
            warn!("Initial catalogue refresh failed, starting with an empty catalogue");
        }
        spawn_refresh_task(
            catalogue.clone(),
            sources.clone(),
            config.catalogue.refresh_interval_secs,
        );
    }

    let state = AppState {
        db,
        directory,
        engine,
        reconciler,
        catalogue,
        catalogue_sources: sources,
        bearer_token: config.server.bearer_token.clone(),
    };
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("rollcall-bot listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Refresh the catalogue on a fixed interval; failures keep the previous
/// snapshot and are retried next tick
fn spawn_refresh_task(
    catalogue: Arc<CatalogueCache>,
    sources: Arc<Vec<Arc<dyn CatalogueSource>>>,
    interval_secs: u64,
) {
    if interval_secs == 0 {
        return;
    }
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; the startup refresh covered it
        interval.tick().await;
        loop {
            interval.tick().await;
            if !catalogue.refresh(&sources).await {
                warn!("Scheduled catalogue refresh failed, keeping previous snapshot");
            }
        }
    });
}
