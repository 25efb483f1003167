//! Loyalty ledger server
//!
//! Serves the HTTP API and runs the accrual daemon against the same store.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loyalty_accrual::{AccrualDaemon, DaemonConfig, HttpAccrualOracle};
use loyalty_api::{AppState, create_router};
use loyalty_db::{PgLedgerStore, connect, migration::Migrator};
use loyalty_shared::config::ConfigOverrides;
use loyalty_shared::{AppConfig, JwtConfig, JwtService};

/// Command-line flags. Each overrides the matching config value.
#[derive(Debug, Parser)]
#[command(name = "loyalty", version, about = "Loyalty ledger server")]
struct Cli {
    /// Address to listen on, `host:port`.
    #[arg(short = 'a', long = "address", env = "RUN_ADDRESS")]
    address: Option<String>,

    /// Postgres connection URI.
    #[arg(short = 'd', long = "database", env = "DATABASE_URI")]
    database: Option<String>,

    /// Base address of the accrual system.
    #[arg(short = 'r', long = "accrual", env = "ACCRUAL_SYSTEM_ADDRESS")]
    accrual: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loyalty=debug,loyalty_api=debug,loyalty_accrual=debug,loyalty_core=debug,loyalty_db=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_with_overrides(ConfigOverrides {
        server_address: cli.address,
        database_url: cli.database,
        accrual_base_url: cli.accrual,
    })
    .context("Failed to load configuration")?;

    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    Migrator::up(&db, None)
        .await
        .context("Failed to run migrations")?;
    info!("Migrations applied");

    let store = Arc::new(PgLedgerStore::new(db));

    let jwt_service = JwtService::new(JwtConfig {
        secret: config.jwt.secret.clone(),
        access_token_expires_secs: i64::try_from(config.jwt.access_token_expiry_secs)
            .context("jwt.access_token_expiry_secs is out of range")?,
    });

    let oracle = HttpAccrualOracle::new(
        &config.accrual.base_url,
        Duration::from_secs(config.accrual.request_timeout_secs),
    )
    .context("Failed to build accrual client")?;
    info!(base_url = %oracle.base_url(), "Accrual oracle configured");

    let daemon = AccrualDaemon::new(
        store.clone(),
        Arc::new(oracle),
        DaemonConfig::from(&config.accrual),
    );

    // Cancelled on shutdown signal, or by the daemon itself when it dies
    let cancel = CancellationToken::new();
    let daemon_task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            let result = daemon.start(cancel.clone()).await;
            cancel.cancel();
            result
        }
    });

    let state = AppState {
        store,
        jwt_service: Arc::new(jwt_service),
    };
    let app = create_router(
        state,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    match daemon_task.await.context("Accrual daemon panicked")? {
        Ok(()) => {
            info!("Server stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Accrual daemon failed");
            Err(e.into())
        }
    }
}

/// Resolves on Ctrl+C, SIGTERM, or when `cancel` fires.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Shutdown signal received (Ctrl+C)"),
        () = terminate => info!("Shutdown signal received (SIGTERM)"),
        () = cancel.cancelled() => info!("Shutting down after accrual daemon exit"),
    }
}
