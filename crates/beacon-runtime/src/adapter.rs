use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use orion_error::compat_prelude::*;
use orion_error::prelude::*;
use pulsar_config::AdapterSection;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::{RuntimeError, RuntimeReason};

/// A single sensor reading returned by a [`DataStoreAdapter::read`] call.
/// `timestamp_ms` is `None` when the backing store doesn't carry one (spec
/// §4.I); the orchestrator falls back to its own clock for staleness and
/// monotonicity checks in that case.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub sensor: String,
    pub timestamp_ms: Option<i64>,
    pub value: f64,
}

/// The contract between the Cycle Orchestrator and whatever key/value store
/// backs the deployment (spec §4.I). Implementations are deployment-specific
/// (Redis, a shared-memory ring, a test double) and are passed through
/// opaquely from `[adapter]` in `beacon.toml`.
///
/// All methods are cancellation points: the orchestrator races them against
/// its shutdown signal, so implementations should return promptly once their
/// underlying I/O is cancelled rather than blocking indefinitely.
#[async_trait]
pub trait DataStoreAdapter: Send + Sync {
    /// Read the current values for the given sensors.
    async fn read(&self, sensors: &[String]) -> Result<Vec<SensorReading>, RuntimeError>;

    /// Write the outputs and messages produced by one cycle's evaluation.
    async fn write(
        &self,
        outputs: &[(String, f64)],
        messages: &[(String, String)],
    ) -> Result<(), RuntimeError>;

    /// Cheap liveness probe used by the orchestrator's fault policy.
    async fn healthy(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredValue {
    value: f64,
    #[serde(default)]
    timestamp_ms: Option<i64>,
}

/// Built-in `DataStoreAdapter`: sensors live in a JSON file of
/// `{sensor: {value, timestamp_ms}}`, outputs are merged into a second JSON
/// file the same shape, and messages are appended as JSON lines — the file
/// sink's async-buffered-writer idiom, adapted to a KV store instead of an
/// append-only alert stream.
///
/// Configured through the opaque `[adapter]` section of `beacon.toml`:
/// ```toml
/// [adapter]
/// input_path = "sensors.json"
/// output_path = "outputs.json"
/// messages_path = "messages.jsonl"
/// ```
#[derive(Debug)]
pub struct JsonFileAdapter {
    input_path: PathBuf,
    output_path: PathBuf,
    messages_path: PathBuf,
}

impl JsonFileAdapter {
    pub fn from_config(section: &AdapterSection, base_dir: &Path) -> Result<Self, RuntimeError> {
        let resolve = |key: &str| -> Result<PathBuf, RuntimeError> {
            let raw = section
                .get(key)
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    StructError::from(RuntimeReason::Bootstrap)
                        .with_detail(format!("[adapter] is missing required key {key:?}"))
                })?;
            let path = PathBuf::from(raw);
            Ok(if path.is_relative() {
                base_dir.join(path)
            } else {
                path
            })
        };
        Ok(Self {
            input_path: resolve("input_path")?,
            output_path: resolve("output_path")?,
            messages_path: resolve("messages_path")?,
        })
    }

    async fn read_store(path: &Path) -> Result<HashMap<String, StoredValue>, RuntimeError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                StructError::from(RuntimeReason::AdapterError)
                    .with_detail(format!("{}: invalid JSON: {e}", path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(StructError::from(RuntimeReason::AdapterError)
                .with_detail(format!("reading {}: {e}", path.display()))),
        }
    }
}

#[async_trait]
impl DataStoreAdapter for JsonFileAdapter {
    async fn read(&self, sensors: &[String]) -> Result<Vec<SensorReading>, RuntimeError> {
        let store = Self::read_store(&self.input_path).await?;
        Ok(sensors
            .iter()
            .filter_map(|sensor| {
                store.get(sensor).map(|stored| SensorReading {
                    sensor: sensor.clone(),
                    timestamp_ms: stored.timestamp_ms,
                    value: stored.value,
                })
            })
            .collect())
    }

    async fn write(
        &self,
        outputs: &[(String, f64)],
        messages: &[(String, String)],
    ) -> Result<(), RuntimeError> {
        if !outputs.is_empty() {
            let now_ms = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as i64;
            let mut store = Self::read_store(&self.output_path).await?;
            for (key, value) in outputs {
                store.insert(
                    key.clone(),
                    StoredValue {
                        value: *value,
                        timestamp_ms: Some(now_ms),
                    },
                );
            }
            let serialized = serde_json::to_string_pretty(&store).map_err(|e| {
                StructError::from(RuntimeReason::AdapterError)
                    .with_detail(format!("serializing outputs: {e}"))
            })?;
            tokio::fs::write(&self.output_path, serialized)
                .await
                .owe(RuntimeReason::AdapterError)?;
        }

        if !messages.is_empty() {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.messages_path)
                .await
                .owe(RuntimeReason::AdapterError)?;
            for (channel, message) in messages {
                let line = serde_json::json!({ "channel": channel, "message": message });
                file.write_all(line.to_string().as_bytes())
                    .await
                    .owe(RuntimeReason::AdapterError)?;
                file.write_all(b"\n").await.owe(RuntimeReason::AdapterError)?;
            }
            file.flush().await.owe(RuntimeReason::AdapterError)?;
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use orion_error::prelude::*;

    use super::*;

    /// An in-memory adapter for orchestrator tests: reads come from a fixed
    /// table, writes accumulate into a shared log for assertions.
    pub struct InMemoryAdapter {
        pub readings: Mutex<Vec<SensorReading>>,
        pub writes: Mutex<Vec<(Vec<(String, f64)>, Vec<(String, String)>)>>,
        pub fail_reads: Mutex<bool>,
    }

    impl InMemoryAdapter {
        pub fn new(readings: Vec<SensorReading>) -> Self {
            Self {
                readings: Mutex::new(readings),
                writes: Mutex::new(Vec::new()),
                fail_reads: Mutex::new(false),
            }
        }
    }

    #[async_trait]
    impl DataStoreAdapter for InMemoryAdapter {
        async fn read(&self, sensors: &[String]) -> Result<Vec<SensorReading>, RuntimeError> {
            if *self.fail_reads.lock().unwrap() {
                return Err(StructError::from(crate::error::RuntimeReason::AdapterError)
                    .with_detail("simulated read failure"));
            }
            let readings = self.readings.lock().unwrap();
            Ok(readings
                .iter()
                .filter(|r| sensors.contains(&r.sensor))
                .cloned()
                .collect())
        }

        async fn write(
            &self,
            outputs: &[(String, f64)],
            messages: &[(String, String)],
        ) -> Result<(), RuntimeError> {
            self.writes
                .lock()
                .unwrap()
                .push((outputs.to_vec(), messages.to_vec()));
            Ok(())
        }

        async fn healthy(&self) -> bool {
            !*self.fail_reads.lock().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section() -> AdapterSection {
        let mut table = toml::Table::new();
        table.insert("input_path".into(), toml::Value::String("in.json".into()));
        table.insert(
            "output_path".into(),
            toml::Value::String("out.json".into()),
        );
        table.insert(
            "messages_path".into(),
            toml::Value::String("messages.jsonl".into()),
        );
        AdapterSection(table)
    }

    #[tokio::test]
    async fn read_returns_known_sensors_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("in.json"),
            r#"{"temp_f": {"value": 95.0, "timestamp_ms": 1000}}"#,
        )
        .unwrap();
        let adapter = JsonFileAdapter::from_config(&section(), dir.path()).unwrap();

        let readings = adapter
            .read(&["temp_f".to_string(), "humidity".to_string()])
            .await
            .unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].sensor, "temp_f");
        assert_eq!(readings[0].value, 95.0);
    }

    #[tokio::test]
    async fn missing_timestamp_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("in.json"),
            r#"{"temp_f": {"value": 95.0}}"#,
        )
        .unwrap();
        let adapter = JsonFileAdapter::from_config(&section(), dir.path()).unwrap();

        let readings = adapter.read(&["temp_f".to_string()]).await.unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].timestamp_ms, None);
    }

    #[tokio::test]
    async fn missing_input_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = JsonFileAdapter::from_config(&section(), dir.path()).unwrap();
        let readings = adapter.read(&["temp_f".to_string()]).await.unwrap();
        assert!(readings.is_empty());
    }

    #[tokio::test]
    async fn write_merges_outputs_and_appends_messages() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = JsonFileAdapter::from_config(&section(), dir.path()).unwrap();

        adapter
            .write(
                &[("alarm".to_string(), 1.0)],
                &[("ops".to_string(), "hot".to_string())],
            )
            .await
            .unwrap();
        adapter
            .write(&[("other".to_string(), 2.0)], &[])
            .await
            .unwrap();

        let out = std::fs::read_to_string(dir.path().join("out.json")).unwrap();
        let stored: HashMap<String, StoredValue> = serde_json::from_str(&out).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored["alarm"].value, 1.0);
        assert_eq!(stored["other"].value, 2.0);

        let messages = std::fs::read_to_string(dir.path().join("messages.jsonl")).unwrap();
        assert_eq!(messages.lines().count(), 1);
        assert!(messages.contains("\"channel\":\"ops\""));
    }

    #[tokio::test]
    async fn missing_config_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let table = toml::Table::new();
        let err = format!(
            "{}",
            JsonFileAdapter::from_config(&AdapterSection(table), dir.path()).unwrap_err()
        );
        assert!(err.contains("input_path"));
    }
}
