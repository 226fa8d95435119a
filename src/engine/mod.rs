use crate::aggregate::builder::build_bundle;
use crate::aggregate::scope::QueryScope;
use crate::aggregate::types::AggregateBundle;
use crate::cache::CacheStore;
use crate::event::parser::EventParser;
use crate::session::reconstruct::reconstruct_sessions;
use crate::source::{LogSource, SourceError, TimestampFormat};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Failures surfaced to query callers. Both variants are retryable; they are
/// distinct so callers can apply different backoff policies, and a stale
/// cached bundle for an already-computed scope remains servable throughout.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("log source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),

    #[error("recomputation exceeded the {}s compute budget", .budget.as_secs())]
    DeadlineExceeded { budget: Duration },
}

/// Public entry point of the aggregation engine.
///
/// Resolves queries against the cache store, recomputing on miss by
/// re-running the full pipeline (read log, parse, reconstruct, build) scoped
/// to the request. There is exactly one recomputation routine; the refresh
/// scheduler, the manual refresh trigger, and query misses all go through
/// it.
pub struct Engine {
    source: Arc<dyn LogSource>,
    parser: EventParser,
    cache: CacheStore,
    /// Per-scope coordination tokens so concurrent misses on one scope share
    /// a single recomputation.
    flights: Mutex<HashMap<QueryScope, Arc<Mutex<()>>>>,
    compute_budget: Duration,
    pipeline_runs: AtomicU64,
}

impl Engine {
    pub fn new(
        source: Arc<dyn LogSource>,
        timestamp: TimestampFormat,
        cache_capacity: usize,
        compute_budget: Duration,
    ) -> Self {
        Self {
            source,
            parser: EventParser::new(timestamp),
            cache: CacheStore::new(cache_capacity),
            flights: Mutex::new(HashMap::new()),
            compute_budget,
            pipeline_runs: AtomicU64::new(0),
        }
    }

    /// Resolve a scope to a bundle: cache hit returns immediately, a miss
    /// recomputes synchronously and installs the result.
    pub async fn query(&self, scope: &QueryScope) -> Result<Arc<AggregateBundle>, EngineError> {
        if let Some(entry) = self.cache.get(scope) {
            return Ok(entry.bundle.clone());
        }

        let token = {
            let mut flights = self.flights.lock().await;
            Arc::clone(
                flights
                    .entry(scope.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };

        let result = {
            let _guard = token.lock().await;

            // Whoever held the token before us may have landed the bundle.
            if let Some(entry) = self.cache.get(scope) {
                Ok(entry.bundle.clone())
            } else {
                self.recompute(scope).await
            }
        };

        // Drop the token once nobody else is waiting on it, so adversarial
        // scope churn cannot grow the flight map without bound.
        let mut flights = self.flights.lock().await;
        if let Some(current) = flights.get(scope) {
            if Arc::strong_count(current) <= 2 {
                flights.remove(scope);
            }
        }

        result
    }

    /// Recompute and install the default scope. Called from the refresh
    /// scheduler on its timer and from the manual refresh operation.
    pub async fn refresh(&self) -> Result<Arc<AggregateBundle>, EngineError> {
        self.recompute(&QueryScope::all()).await
    }

    async fn recompute(&self, scope: &QueryScope) -> Result<Arc<AggregateBundle>, EngineError> {
        match tokio::time::timeout(self.compute_budget, self.run_pipeline(scope)).await {
            Ok(result) => result,
            Err(_) => Err(EngineError::DeadlineExceeded {
                budget: self.compute_budget,
            }),
        }
    }

    /// The one pipeline invocation point: full-log rescan through parser,
    /// reconstructor, and builder, then a wholesale cache install.
    async fn run_pipeline(&self, scope: &QueryScope) -> Result<Arc<AggregateBundle>, EngineError> {
        self.pipeline_runs.fetch_add(1, Ordering::Relaxed);

        let raw = self.source.read_all().await?;
        let parsed = self.parser.parse_log(&raw);
        let reconstructed = reconstruct_sessions(parsed.events);

        if parsed.stats.skipped_lines > 0
            || reconstructed.stats.orphaned_events > 0
            || reconstructed.stats.duplicate_terminals > 0
        {
            warn!(
                skipped_lines = parsed.stats.skipped_lines,
                orphaned_events = reconstructed.stats.orphaned_events,
                duplicate_terminals = reconstructed.stats.duplicate_terminals,
                "log scan recovered from irregular lines"
            );
        }

        let bundle = Arc::new(build_bundle(
            &reconstructed.sessions,
            scope,
            parsed.stats.parsed_events,
            Utc::now(),
        ));
        self.cache.put(scope.clone(), Arc::clone(&bundle));

        info!(
            total_records = bundle.total_records,
            sessions = reconstructed.sessions.len(),
            unterminated = reconstructed.stats.unterminated,
            agent_filter = scope.agent.as_deref().unwrap_or("ALL"),
            "aggregate bundle rebuilt"
        );

        Ok(bundle)
    }

    /// Number of full pipeline invocations so far. Cache hits and
    /// single-flight waiters do not bump this.
    pub fn pipeline_runs(&self) -> u64 {
        self.pipeline_runs.load(Ordering::Relaxed)
    }

    pub fn cached_scopes(&self) -> usize {
        self.cache.len()
    }
}
