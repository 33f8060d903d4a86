use serde::{Deserialize, Serialize};

use crate::types::HumanDuration;

/// The `[runtime]` section of `beacon.toml`: cycle cadence, fault-retry
/// backoff, and graceful-shutdown timing for the Cycle Orchestrator.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeSection {
    /// How often the orchestrator starts a new cycle. Overrides
    /// `[system].cycle_time_ms` when set; `None` defers to it.
    pub cycle_period: Option<HumanDuration>,
    /// Initial delay before the first retry after an `AdapterError`,
    /// doubled on each subsequent attempt.
    pub backoff_base_delay: HumanDuration,
    /// Number of consecutive `AdapterError` retries tolerated before the
    /// orchestrator treats the fault as fatal and terminates.
    pub backoff_max_attempts: u32,
    /// Grace period granted to an in-flight cycle to finish after a stop
    /// request, before the orchestrator forces shutdown.
    pub shutdown_grace: HumanDuration,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            cycle_period: None,
            backoff_base_delay: "100ms".parse().unwrap(),
            backoff_max_attempts: 5,
            shutdown_grace: "5s".parse().unwrap(),
        }
    }
}
