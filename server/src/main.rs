// Copyright (c) 2026 Badgery Project. MIT License.
// See LICENSE for details.

//! # Badgery Server
//!
//! Entry point for the `badgery-server` binary. Parses CLI arguments,
//! initializes logging and metrics, and serves the public badge endpoints.
//!
//! The binary supports three subcommands:
//!
//! - `run`     — start the badge server
//! - `init`    — create the data directory and store the issuer profile
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use badgery_core::config::{BaseUrl, ServiceConfig};
use badgery_core::issuer::{self, Issuer};
use badgery_core::storage::BadgeStore;

use cli::{BadgeryCli, Commands};
use metrics::ServerMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = BadgeryCli::parse();

    match cli.command {
        Commands::Run(args) => run_server(args).await,
        Commands::Init(args) => init_data_dir(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the badge server: public API plus the metrics endpoint.
async fn run_server(args: cli::RunArgs) -> Result<()> {
    logging::init(
        "badgery_server=info,badgery_core=info,tower_http=debug",
        args.log_format,
    );

    tracing::info!(
        http_port = args.http_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        base_url = %args.base_url,
        "starting badgery-server"
    );

    // --- Configuration ---
    // Base URL problems are deployment errors; fail before touching storage.
    let base_url = BaseUrl::new(&args.base_url)
        .map_err(|e| anyhow::anyhow!("invalid --base-url: {e}"))?;
    let cfg = Arc::new(ServiceConfig::new(base_url));

    // --- Persistent storage ---
    let db_path = args.data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    let store = Arc::new(
        BadgeStore::open(&db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?,
    );
    tracing::info!(path = %db_path.display(), "database opened");

    // --- Issuer check ---
    // Issuer-dependent routes must never 500 one request at a time; a
    // missing profile aborts startup instead.
    match issuer::get_issuer(&store) {
        Ok(profile) => tracing::info!(issuer = %profile.name, "issuer profile loaded"),
        Err(_) => bail!(
            "no issuer profile found in {} — run `badgery-server init` first",
            args.data_dir.display()
        ),
    }

    // --- Metrics ---
    let server_metrics = Arc::new(ServerMetrics::new());
    server_metrics.awards_stored.set(store.award_count() as i64);

    // --- Application state ---
    let app_state = api::AppState {
        store: Arc::clone(&store),
        cfg,
        metrics: Arc::clone(&server_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.http_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {api_addr}"))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&server_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {metrics_addr}"))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    store.flush().context("failed to flush database on shutdown")?;
    tracing::info!("badgery-server stopped");
    Ok(())
}

/// Initializes the data directory and stores the issuer profile.
///
/// Idempotent in the sense that re-running replaces the profile — there is
/// exactly one issuer by design.
fn init_data_dir(args: cli::InitArgs) -> Result<()> {
    logging::init("badgery_server=info", logging::LogFormat::Pretty);

    let db_path = args.data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    let store = BadgeStore::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;

    let image = match &args.image {
        Some(path) => Some(
            std::fs::read(path)
                .with_context(|| format!("failed to read issuer logo: {}", path.display()))?,
        ),
        None => None,
    };

    let profile = Issuer {
        name: args.name.clone(),
        url: args.url.clone(),
        description: args.description.clone(),
        image,
        email: args.email.clone(),
    };
    issuer::set_issuer(&store, &profile)
        .map_err(|e| anyhow::anyhow!("failed to store issuer profile: {e}"))?;
    store.flush().context("failed to flush database")?;

    println!("Data directory initialized.");
    println!("  Data directory : {}", args.data_dir.display());
    println!("  Issuer         : {}", args.name);
    println!("  Issuer URL     : {}", args.url);
    if let Some(email) = &args.email {
        println!("  Contact email  : {email}");
    }

    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("badgery-server {}", env!("CARGO_PKG_VERSION"));
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
