//! End-to-end integration test driven through the public `Reactor` API,
//! the way the teacher's `wf-runtime` exercises `FusionEngine` from its
//! own `tests/` directory.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use beacon_runtime::{DataStoreAdapter, Reactor, RuntimeError, SensorReading};
use pulsar_config::BeaconConfig;

/// Always reports no readings, but sleeps past the configured cycle period
/// first — forces the orchestrator to run over its deadline every cycle.
struct SlowAdapter {
    delay: Duration,
}

#[async_trait]
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

/// spec §8 S4: a cycle that runs past its period is dropped and counted in
/// `overrun_cycles_total`, not treated as fatal — the runtime keeps ticking.
#[tokio::test]
async fn slow_adapter_trips_the_overrun_counter_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("rules.yaml"),
        "version: 1\nrules: []\n",
    )
    .unwrap();

    let config: BeaconConfig = r#"
        [system]
        valid_sensors = ["temp_f"]
        rule_set = "rules.yaml"

        [runtime]
        cycle_period = "5ms"
        backoff_max_attempts = 1
        shutdown_grace = "1s"
    "#
    .parse()
    .unwrap();

    let adapter: Arc<dyn DataStoreAdapter> = Arc::new(SlowAdapter {
        delay: Duration::from_millis(30),
    });
    let reactor = Reactor::start(config, dir.path(), adapter).await.unwrap();
    let metrics = reactor.metrics();

    tokio::time::sleep(Duration::from_millis(150)).await;

    reactor.shutdown();
    reactor.wait().await.unwrap();

    assert!(metrics.snapshot().overrun_cycles_total >= 1);
}
