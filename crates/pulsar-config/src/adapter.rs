use serde::{Deserialize, Serialize};

/// The `[adapter]` section of `beacon.toml`: connection parameters for
/// whatever `DataStoreAdapter` the deployment wires up. `pulsar-config`
/// only validates that the table parses as TOML; the adapter implementation
/// itself is responsible for interpreting its own keys.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct AdapterSection(pub toml::Table);

impl AdapterSection {
    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.0.get(key)
    }
}
