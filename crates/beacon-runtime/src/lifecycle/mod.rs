mod bootstrap;
mod compile;
mod signal;
mod types;

use std::path::Path;
use std::sync::Arc;

use orion_error::op_context;
use orion_error::prelude::*;
use pulsar_config::BeaconConfig;
use tokio_util::sync::CancellationToken;

use crate::adapter::DataStoreAdapter;
use crate::error::RuntimeResult;
use crate::metrics::RuntimeMetrics;
use crate::orchestrator::{CycleContext, CycleOrchestrator};

// Re-export public API
pub use signal::wait_for_signal;

use bootstrap::load_and_compile;

/// Manages the full lifecycle of the Beacon runtime: bootstrap, run, and
/// graceful shutdown.
///
/// Unlike the teacher's multi-task-group reactor, there is exactly one task
/// here — the Cycle Orchestrator — since a single sequential cycle loop is
/// the whole runtime. `Reactor` still owns the root cancellation token and
/// the configured shutdown grace period, mirroring the teacher's
/// bootstrap/run/shutdown split.
pub struct Reactor {
    cancel: CancellationToken,
    orchestrator: Arc<CycleOrchestrator>,
    shutdown_grace: std::time::Duration,
    metrics: Arc<RuntimeMetrics>,
}

impl Reactor {
    /// Bootstrap the runtime from a [`BeaconConfig`] and a base directory
    /// (for resolving a relative `system.rule_set` path) and start the
    /// cycle orchestrator.
    #[tracing::instrument(name = "runtime.start", skip_all)]
    pub async fn start(
        config: BeaconConfig,
        base_dir: &Path,
        adapter: Arc<dyn DataStoreAdapter>,
    ) -> RuntimeResult<Self> {
        let mut op = op_context!("runtime-bootstrap").with_auto_log();
        op.record("base_dir", base_dir.display().to_string().as_str());

        let data = load_and_compile(&config, base_dir)?;
        let metrics = Arc::new(RuntimeMetrics::new());
        let cycle_period = std::time::Duration::from_millis(config.cycle_period_ms());

        let orchestrator = Arc::new(CycleOrchestrator::new());
        orchestrator.start(CycleContext {
            adapter,
            compiled: data.compiled,
            valid_sensors: data.valid_sensors,
            buffer_capacity: config.system.buffer_capacity,
            cycle_period,
            backoff_base_delay: config.runtime.backoff_base_delay.as_duration(),
            backoff_max_attempts: config.runtime.backoff_max_attempts,
            metrics: Arc::clone(&metrics),
        });

        op.mark_suc();
        Ok(Self {
            cancel: CancellationToken::new(),
            orchestrator,
            shutdown_grace: config.runtime.shutdown_grace.as_duration(),
            metrics,
        })
    }

    /// Current runtime metrics snapshot, for a `/metrics` endpoint or tests.
    pub fn metrics(&self) -> Arc<RuntimeMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Request graceful shutdown of the cycle orchestrator.
    pub fn shutdown(&self) {
        beacon_info!(sys, "initiating graceful shutdown");
        self.cancel.cancel();
    }

    /// Wait for shutdown to be requested, then stop the orchestrator within
    /// its configured grace period.
    pub async fn wait(self) -> RuntimeResult<()> {
        self.cancel.cancelled().await;
        self.orchestrator.stop(self.shutdown_grace).await
    }

    /// Returns a clone of the root cancellation token (for signal integration).
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
