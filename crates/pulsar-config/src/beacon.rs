use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::adapter::AdapterSection;
use crate::logging::LoggingConfig;
use crate::runtime::RuntimeSection;
use crate::system::SystemSection;
use crate::validate;

/// The deployed Beacon process's configuration (`beacon.toml`, spec §6
/// AMBIENT). Parsed via `FromStr` / `load`, with `validate::validate` run
/// automatically before the value is handed back to the caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    pub system: SystemSection,
    pub runtime: RuntimeSection,
    pub logging: LoggingConfig,
    pub adapter: AdapterSection,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            system: SystemSection::default(),
            runtime: RuntimeSection::default(),
            logging: LoggingConfig::default(),
            adapter: AdapterSection::default(),
        }
    }
}

impl BeaconConfig {
    /// Effective cycle period in milliseconds: `[runtime].cycle_period` when
    /// set, otherwise `[system].cycle_time_ms`.
    pub fn cycle_period_ms(&self) -> u64 {
        self.runtime
            .cycle_period
            .map(|d| d.as_millis())
            .unwrap_or(self.system.cycle_time_ms)
    }

    /// Load and validate a `beacon.toml` file from disk.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("reading {:?}: {e}", path.as_ref()))?;
        text.parse()
    }
}

impl FromStr for BeaconConfig {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: BeaconConfig =
            toml::from_str(s).map_err(|e| anyhow::anyhow!("parsing beacon.toml: {e}"))?;
        validate::validate(&config)?;
        Ok(config)
    }
}
