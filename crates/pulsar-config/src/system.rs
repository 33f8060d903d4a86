use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default cycle period when `[system]` omits `cycle_time_ms` (spec §6).
pub const DEFAULT_CYCLE_TIME_MS: u64 = 100;
/// Default per-sensor ring-buffer capacity when `[system]` omits `buffer_capacity`.
pub const DEFAULT_BUFFER_CAPACITY: usize = 100;
/// Default rule-set document path when `[system]` omits `rule_set`.
pub const DEFAULT_RULE_SET_PATH: &str = "rules.yaml";

/// The `[system]` section of `beacon.toml`: the sensor namespace and the
/// buffering/cadence defaults a deployed Beacon process runs with.
///
/// This mirrors `pulsar_lang::parser::document::SystemConfigDoc` in shape,
/// but is a distinct document: `SystemConfigDoc` is the spec-literal
/// YAML/JSON system-config document a rule author ships alongside a
/// rule-set for the Pulsar validator to check sensor names against.
/// `SystemSection` is the deployed Beacon process's own TOML config,
/// read by `beacon-runtime` at startup. A deployment typically sets
/// `SystemSection::valid_sensors` to the same set declared in the
/// authoring-time system-config document, but the two are not required
/// to be the same file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemSection {
    pub valid_sensors: Vec<String>,
    pub cycle_time_ms: u64,
    pub buffer_capacity: usize,
    /// Path to the rule-set document (spec §6 "Rule-set document"),
    /// relative to the process's base directory unless absolute.
    pub rule_set: PathBuf,
}

impl Default for SystemSection {
    fn default() -> Self {
        Self {
            valid_sensors: Vec::new(),
            cycle_time_ms: DEFAULT_CYCLE_TIME_MS,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            rule_set: PathBuf::from(DEFAULT_RULE_SET_PATH),
        }
    }
}
