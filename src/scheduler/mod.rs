use crate::engine::Engine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

/// Background loop that keeps the default scope warm.
///
/// Recomputes the unfiltered bundle on a fixed interval by calling the same
/// `Engine::refresh` routine the manual trigger uses. Refresh errors are
/// logged and the loop keeps running; a transient log outage must not kill
/// the scheduler.
pub async fn run_refresh_loop(
    engine: Arc<Engine>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // An interval's first tick fires immediately; consume it so startup is
    // not a refresh.
    ticker.tick().await;

    info!(interval_secs = interval.as_secs(), "refresh scheduler started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match engine.refresh().await {
                    Ok(bundle) => {
                        info!(total_records = bundle.total_records, "scheduled refresh complete");
                    }
                    Err(e) => {
                        error!(error = %e, "scheduled refresh failed");
                    }
                }
            }
            _ = async { let _ = shutdown_rx.wait_for(|&stop| stop).await; } => {
                info!("refresh scheduler stopping");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{LogSource, SourceError, TimestampFormat};
    use async_trait::async_trait;

    struct StaticSource(&'static str);

    #[async_trait]
    impl LogSource for StaticSource {
        async fn read_all(&self) -> Result<String, SourceError> {
            Ok(self.0.to_string())
        }
    }

    fn test_engine() -> Arc<Engine> {
        Arc::new(Engine::new(
            Arc::new(StaticSource(
                "1733280000|C1|sales|NONE|ENTERQUEUE\n\
                 1733280060|C1|sales|PJSIP/101|CONNECT|60\n\
                 1733280120|C1|sales|PJSIP/101|COMPLETEAGENT|60|60\n",
            )),
            TimestampFormat::Epoch,
            8,
            Duration::from_secs(30),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_refreshes_on_interval() {
        let engine = test_engine();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run_refresh_loop(
            Arc::clone(&engine),
            Duration::from_secs(3600),
            shutdown_rx,
        ));

        // Nothing happens at startup.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(engine.pipeline_runs(), 0);

        // Two intervals later the default scope has been rebuilt twice.
        tokio::time::sleep(Duration::from_secs(2 * 3600)).await;
        assert_eq!(engine.pipeline_runs(), 2);
        assert_eq!(engine.cached_scopes(), 1);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_stops_on_shutdown() {
        let engine = test_engine();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run_refresh_loop(
            engine,
            Duration::from_secs(3600),
            shutdown_rx,
        ));

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
