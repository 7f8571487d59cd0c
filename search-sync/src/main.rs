//! Search Sync Main Entry Point
//!
//! Reads customer change messages (one JSON object per line) from stdin and
//! propagates them to the search index until EOF or Ctrl-C.

use dotenv::dotenv;
use search_sync::{Dependencies, LineConsumer, ServiceError};
use std::env;
use tokio::io::BufReader;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() -> Result<(), ServiceError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("search_sync=info,search_sync_repository=info"));

    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
            .map_err(|e| ServiceError::config(format!("Failed to initialize tracing: {}", e)))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .try_init()
            .map_err(|e| ServiceError::config(format!("Failed to initialize tracing: {}", e)))?;
    }

    info!(
        service_name = "search-sync",
        service_version = env!("CARGO_PKG_VERSION"),
        json,
        "Tracing initialized"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    dotenv().ok();
    init_tracing()?;

    info!("Starting customer search sync");

    let deps = match Dependencies::new().await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let consumer = LineConsumer::new(BufReader::new(tokio::io::stdin()));
    let consumed = consumer.run(deps.propagator.as_ref(), shutdown_signal()).await;

    let stats = deps.propagator.shutdown().await?;
    deps.client.close().await;

    match consumed {
        Ok(summary) => {
            info!(
                lines = summary.lines,
                dispatched = summary.dispatched,
                malformed = summary.malformed,
                rejected = summary.rejected,
                indexed = stats.indexed,
                deleted = stats.deleted,
                patched = stats.patched,
                failed = stats.failed,
                "Search sync completed"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Search sync failed");
            Err(e.into())
        }
    }
}
