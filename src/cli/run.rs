use crate::config::load_config;
use crate::engine::Engine;
use crate::scheduler::run_refresh_loop;
use crate::source::{FileLogSource, TimestampFormat};
use crate::web::run_server;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("web server error: {0}")]
    WebServer(String),
}

pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            eprintln!("  ~/.config/queuesight/config.yml");
            eprintln!("  /etc/queuesight/config.yml");
            eprintln!("\nUse --config <path> to specify a config file, or run 'queuesight config init' to generate one.");
            std::process::exit(1);
        }
    };

    run_service(&config_path).await.map_err(|e| e.into())
}

async fn run_service(config_path: &PathBuf) -> Result<(), RunError> {
    info!(config_path = %config_path.display(), "Loading configuration");

    let config = load_config(config_path)?;

    if !config.source.path.exists() {
        // The queue log may appear once the PBX writes its first event;
        // queries until then fail retryably while cached bundles stay
        // servable.
        warn!(path = %config.source.path.display(), "queue log does not exist yet");
    }

    info!(path = %config.source.path.display(), "Creating log source");
    let source = Arc::new(FileLogSource::new(config.source.path.clone()));

    let engine = Arc::new(Engine::new(
        source,
        TimestampFormat::from_config(&config.source.timestamp.format),
        config.cache.capacity,
        config.query.compute_budget,
    ));

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    info!("Starting refresh scheduler task");
    let scheduler_engine = Arc::clone(&engine);
    let scheduler_handle = tokio::spawn(run_refresh_loop(
        scheduler_engine,
        config.refresh.interval,
        shutdown_rx.clone(),
    ));

    info!("Starting web server on {}", config.web.listen);
    let web_engine = Arc::clone(&engine);
    let web_listen = config.web.listen.clone();
    let mut web_handle = tokio::spawn(async move {
        run_server(web_engine, web_listen, shutdown_rx)
            .await
            .map_err(|e| RunError::WebServer(e.to_string()))
    });

    info!("Engine started, press Ctrl+C to shutdown");

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
        result = &mut web_handle => {
            // The server exiting on its own means bind failure or a fatal
            // serve error; propagate after stopping the scheduler.
            let _ = shutdown_tx.send(true);
            scheduler_handle.await?;
            return result?;
        }
    }

    info!("Waiting for tasks to complete");

    match scheduler_handle.await {
        Ok(()) => info!("Scheduler task completed"),
        Err(e) => error!(error = %e, "Scheduler task join error"),
    }

    match web_handle.await {
        Ok(Ok(())) => info!("Web server stopped"),
        Ok(Err(e)) => error!(error = %e, "Web server error"),
        Err(e) => error!(error = %e, "Web server join error"),
    }

    info!("Shutdown complete");

    Ok(())
}
