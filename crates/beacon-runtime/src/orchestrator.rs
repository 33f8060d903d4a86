use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use orion_error::prelude::*;
use pulsar_core::{CompiledRuleSet, EvalContext, EvaluationStats, Plan, RingBufferManager};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::adapter::DataStoreAdapter;
use crate::error::{RuntimeError, RuntimeReason, RuntimeResult};
use crate::metrics::RuntimeMetrics;

/// Inputs the Cycle Orchestrator needs to run (spec §4.H).
pub struct CycleContext {
    pub adapter: Arc<dyn DataStoreAdapter>,
    pub compiled: CompiledRuleSet,
    pub valid_sensors: Vec<String>,
    pub buffer_capacity: usize,
    pub cycle_period: Duration,
    pub backoff_base_delay: Duration,
    pub backoff_max_attempts: u32,
    pub metrics: Arc<RuntimeMetrics>,
}

/// `Stopped` / `Running` — `Starting`/`Stopping` are transient, held only for
/// the duration of the (synchronous, lock-held) `start`/`stop` call itself,
/// so they are not separately observable states here.
enum State {
    Stopped,
    Running {
        cancel: CancellationToken,
        handle: JoinHandle<RuntimeResult<()>>,
    },
}

/// Drives the compiled rule set against a `DataStoreAdapter` once per
/// `cycle_period`, evaluating one layer at a time and writing outputs back.
///
/// `start`/`stop` are idempotent: starting an already-running orchestrator,
/// or stopping an already-stopped one, is a no-op. Cycles are driven by a
/// single sequential loop, never spawned concurrently, so "at most one
/// cycle in flight" holds by construction rather than by locking.
pub struct CycleOrchestrator {
    state: Mutex<State>,
}

impl Default for CycleOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleOrchestrator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Stopped),
        }
    }

    pub fn start(&self, ctx: CycleContext) {
        let mut state = self.state.lock().unwrap();
        if matches!(*state, State::Running { .. }) {
            return;
        }
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(run_cycles(ctx, task_cancel));
        *state = State::Running { cancel, handle };
    }

    /// Signal shutdown and wait up to `grace` for the in-flight cycle (if
    /// any) to finish before returning.
    pub async fn stop(&self, grace: Duration) -> RuntimeResult<()> {
        let prev = {
            let mut state = self.state.lock().unwrap();
            std::mem::replace(&mut *state, State::Stopped)
        };
        if let State::Running { cancel, handle } = prev {
            cancel.cancel();
            match tokio::time::timeout(grace, handle).await {
                Ok(Ok(result)) => return result,
                Ok(Err(join_err)) => {
                    return Err(StructError::from(RuntimeReason::Shutdown)
                        .with_detail(format!("cycle task panicked: {join_err}")));
                }
                Err(_) => {
                    beacon_warn!(
                        sys,
                        grace_ms = grace.as_millis() as u64,
                        "shutdown grace period elapsed before cycle task finished"
                    );
                }
            }
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock().unwrap(), State::Running { .. })
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Every sensor read by a `ThresholdOverTime` leaf anywhere in the compiled
/// rule set, paired with the largest duration any such leaf reads it over —
/// the ring buffer only needs to retain history for sensors temporal
/// conditions actually use.
fn temporal_horizons(compiled: &CompiledRuleSet) -> HashMap<String, u64> {
    let mut out = HashMap::new();
    for compiled_rule in &compiled.rules {
        let mut pairs = Vec::new();
        compiled_rule.rule.condition.temporal_horizons(&mut pairs);
        for (sensor, horizon_ms) in pairs {
            let entry = out.entry(sensor).or_insert(0u64);
            *entry = (*entry).max(horizon_ms);
        }
    }
    out
}

/// The orchestrator's main loop: one cycle per tick, sequential, never
/// overlapping. Missed ticks are dropped (not queued) —
/// `MissedTickBehavior::Skip` — and an overrun is logged at most once per
/// minute.
async fn run_cycles(ctx: CycleContext, cancel: CancellationToken) -> RuntimeResult<()> {
    let CycleContext {
        adapter,
        compiled,
        valid_sensors,
        buffer_capacity,
        cycle_period,
        backoff_base_delay,
        backoff_max_attempts,
        metrics,
    } = ctx;

    let horizons = temporal_horizons(&compiled);
    let plan = Plan::new(compiled);
    let mut buffers = RingBufferManager::new(buffer_capacity, &horizons);

    let mut ticker = tokio::time::interval(cycle_period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let last_overrun_warning_ms = AtomicI64::new(i64::MIN);

    beacon_info!(sys, layers = plan.layer_count(), "cycle orchestrator starting");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                beacon_info!(sys, "cycle orchestrator stopping");
                return Ok(());
            }
            _ = ticker.tick() => {
                let started = now_ms();
                run_one_cycle(
                    &adapter,
                    &plan,
                    &valid_sensors,
                    &mut buffers,
                    backoff_base_delay,
                    backoff_max_attempts,
                    &metrics,
                )
                .await?;

                let elapsed_ms = now_ms() - started;
                metrics.record_cycle(started);
                if elapsed_ms as u64 > cycle_period.as_millis() as u64 {
                    metrics.inc_overrun_cycle();
                    warn_overrun_rate_limited(&last_overrun_warning_ms, started, elapsed_ms);
                }
            }
        }
    }
}

fn warn_overrun_rate_limited(last_warning_ms: &AtomicI64, now: i64, elapsed_ms: i64) {
    let last = last_warning_ms.load(Ordering::Relaxed);
    if now - last >= 60_000 {
        last_warning_ms.store(now, Ordering::Relaxed);
        beacon_warn!(cycle, elapsed_ms = elapsed_ms, "cycle exceeded its period");
    }
}

/// Read the sensors the compiled rule set depends on, retrying adapter
/// failures with exponential backoff, evaluate every layer in order, and
/// write the results back through the adapter. Exhausting the retry budget
/// on either the read or the write skips and counts this cycle alone
/// (spec §4.H/§7) rather than propagating a fatal error.
#[allow(clippy::too_many_arguments)]
async fn run_one_cycle(
    adapter: &Arc<dyn DataStoreAdapter>,
    plan: &Plan,
    valid_sensors: &[String],
    buffers: &mut RingBufferManager,
    backoff_base_delay: Duration,
    backoff_max_attempts: u32,
    metrics: &RuntimeMetrics,
) -> RuntimeResult<()> {
    let readings = match with_backoff(backoff_base_delay, backoff_max_attempts, metrics, || {
        adapter.read(valid_sensors)
    })
    .await
    {
        Ok(readings) => readings,
        Err(e) => {
            metrics.inc_skipped_cycle();
            beacon_warn!(adapter, error = %e, "cycle skipped: adapter read retries exhausted");
            return Ok(());
        }
    };

    let now = now_ms();
    let mut by_sensor: HashMap<String, f64> = HashMap::new();
    let mut samples: HashMap<String, (f64, i64)> = HashMap::new();
    for reading in &readings {
        by_sensor.insert(reading.sensor.clone(), reading.value);
        samples.insert(
            reading.sensor.clone(),
            (reading.value, reading.timestamp_ms.unwrap_or(now)),
        );
    }
    let violations_before = buffers.monotonicity_violations();
    buffers.update(&samples, now);
    metrics.add_monotonicity_violations(buffers.monotonicity_violations() - violations_before);

    let mut outputs: HashMap<String, f64> = HashMap::new();
    let mut messages: Vec<(String, String)> = Vec::new();
    let mut stats = EvaluationStats::default();

    for layer in 0..plan.layer_count() {
        let mut evaluation_ctx = EvalContext {
            inputs: &by_sensor,
            outputs: &mut outputs,
            messages: &mut messages,
            buffers,
            now_ms: now,
            stats: &mut stats,
        };
        plan.evaluate_layer(layer, &mut evaluation_ctx);
    }
    metrics.add_evaluation_skips(stats.evaluation_skips);

    let output_pairs: Vec<(String, f64)> = outputs.into_iter().collect();
    if let Err(e) = with_backoff(backoff_base_delay, backoff_max_attempts, metrics, || {
        adapter.write(&output_pairs, &messages)
    })
    .await
    {
        metrics.inc_skipped_cycle();
        beacon_warn!(adapter, error = %e, "cycle skipped: adapter write retries exhausted");
    }
    Ok(())
}

/// Exponential backoff retry: `backoff_base_delay`, doubled each attempt,
/// up to `backoff_max_attempts` tries before the last `AdapterError` is
/// returned to the caller, which skips and counts the cycle rather than
/// terminating the orchestrator.
async fn with_backoff<T, F, Fut>(
    backoff_base_delay: Duration,
    backoff_max_attempts: u32,
    metrics: &RuntimeMetrics,
    mut op: F,
) -> RuntimeResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, RuntimeError>>,
{
    let mut delay = backoff_base_delay;
    let mut last_err: Option<RuntimeError> = None;
    for attempt in 1..=backoff_max_attempts.max(1) {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                metrics.inc_adapter_retry();
                beacon_warn!(adapter, attempt = attempt, error = %e, "adapter call failed, retrying");
                last_err = Some(e);
                if attempt < backoff_max_attempts {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
    let detail = last_err
        .map(|e| format!("adapter error persisted after {backoff_max_attempts} attempts: {e}"))
        .unwrap_or_else(|| "adapter call failed with no configured attempts".to_string());
    Err(StructError::from(RuntimeReason::AdapterError).with_detail(detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::test_support::InMemoryAdapter;
    use crate::adapter::SensorReading;
    use pulsar_core::layer_rules;
    use pulsar_lang::ast::{Action, CmpOp, ConditionLeaf, ConditionNode, Rule, SetValueSource};

    fn fahrenheit_rule() -> Rule {
        Rule {
            name: "hot".to_string(),
            description: None,
            condition: ConditionNode::Leaf(ConditionLeaf::Comparison {
                sensor: "temp_f".to_string(),
                operator: CmpOp::Gt,
                value: 90.0,
            }),
            actions: vec![Action::SetValue {
                key: "alarm".to_string(),
                value: SetValueSource::Number(1.0),
            }],
        }
    }

    fn base_context(adapter: Arc<dyn DataStoreAdapter>, compiled: CompiledRuleSet) -> CycleContext {
        CycleContext {
            adapter,
            compiled,
            valid_sensors: vec!["temp_f".to_string()],
            buffer_capacity: 10,
            cycle_period: Duration::from_millis(10),
            backoff_base_delay: Duration::from_millis(1),
            backoff_max_attempts: 3,
            metrics: Arc::new(RuntimeMetrics::new()),
        }
    }

    #[tokio::test]
    async fn one_cycle_reads_evaluates_and_writes() {
        let compiled = layer_rules(vec![fahrenheit_rule()]).unwrap();
        let adapter = Arc::new(InMemoryAdapter::new(vec![SensorReading {
            sensor: "temp_f".to_string(),
            timestamp_ms: None,
            value: 95.0,
        }]));
        let metrics = RuntimeMetrics::new();
        let plan = Plan::new(compiled);
        let mut buffers = RingBufferManager::new(10, &HashMap::new());
        let adapter_dyn: Arc<dyn DataStoreAdapter> = adapter.clone();

        run_one_cycle(
            &adapter_dyn,
            &plan,
            &["temp_f".to_string()],
            &mut buffers,
            Duration::from_millis(1),
            3,
            &metrics,
        )
        .await
        .unwrap();

        let writes = adapter.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, vec![("alarm".to_string(), 1.0)]);
    }

    #[tokio::test]
    async fn exhausted_retries_skip_and_count_the_cycle() {
        let compiled = layer_rules(vec![fahrenheit_rule()]).unwrap();
        let adapter = Arc::new(InMemoryAdapter::new(vec![]));
        *adapter.fail_reads.lock().unwrap() = true;
        let metrics = RuntimeMetrics::new();
        let plan = Plan::new(compiled);
        let mut buffers = RingBufferManager::new(10, &HashMap::new());
        let adapter_dyn: Arc<dyn DataStoreAdapter> = adapter.clone();

        // Exhausting the retry budget is not fatal: the cycle is skipped
        // and counted, and the orchestrator loop keeps running.
        run_one_cycle(
            &adapter_dyn,
            &plan,
            &["temp_f".to_string()],
            &mut buffers,
            Duration::from_millis(1),
            2,
            &metrics,
        )
        .await
        .unwrap();

        let snap = metrics.snapshot();
        assert_eq!(snap.adapter_retries_total, 2);
        assert_eq!(snap.skipped_cycles_total, 1);
        assert!(adapter.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn start_stop_is_idempotent() {
        let compiled = layer_rules(vec![fahrenheit_rule()]).unwrap();
        let adapter: Arc<dyn DataStoreAdapter> = Arc::new(InMemoryAdapter::new(vec![]));
        let orchestrator = CycleOrchestrator::new();
        orchestrator.start(base_context(adapter.clone(), compiled));
        assert!(orchestrator.is_running());

        // Starting again while running is a no-op — no second task spawned.
        let compiled2 = layer_rules(vec![fahrenheit_rule()]).unwrap();
        orchestrator.start(base_context(adapter, compiled2));

        orchestrator.stop(Duration::from_secs(1)).await.unwrap();
        assert!(!orchestrator.is_running());

        // Stopping again while stopped is a no-op.
        orchestrator.stop(Duration::from_secs(1)).await.unwrap();
    }

    /// An adapter whose `read` blocks for longer than the cycle period,
    /// forcing the orchestrator to run past its deadline.
    struct SlowAdapter {
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl DataStoreAdapter for SlowAdapter {
        async fn read(&self, _sensors: &[String]) -> Result<Vec<SensorReading>, RuntimeError> {
            tokio::time::sleep(self.delay).await;
            Ok(vec![])
        }

        async fn write(
            &self,
            _outputs: &[(String, f64)],
            _messages: &[(String, String)],
        ) -> Result<(), RuntimeError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn slow_adapter_trips_the_overrun_counter() {
        // spec §8 S4: a cycle that overruns its period is counted, not
        // fatal — the loop keeps ticking and later ticks are just dropped
        // by `MissedTickBehavior::Skip`.
        let compiled = layer_rules(vec![fahrenheit_rule()]).unwrap();
        let adapter: Arc<dyn DataStoreAdapter> = Arc::new(SlowAdapter {
            delay: Duration::from_millis(30),
        });
        let metrics = Arc::new(RuntimeMetrics::new());
        let ctx = CycleContext {
            adapter,
            compiled,
            valid_sensors: vec!["temp_f".to_string()],
            buffer_capacity: 10,
            cycle_period: Duration::from_millis(5),
            backoff_base_delay: Duration::from_millis(1),
            backoff_max_attempts: 1,
            metrics: metrics.clone(),
        };
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(run_cycles(ctx, task_cancel));

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        handle.await.unwrap().unwrap();

        assert!(metrics.snapshot().overrun_cycles_total >= 1);
    }
}
