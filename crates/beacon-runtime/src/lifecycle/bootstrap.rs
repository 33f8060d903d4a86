use std::path::Path;

use pulsar_config::BeaconConfig;

use crate::error::RuntimeResult;

use super::compile::{compile, input_sensors, load_rule_set, validate_against};
use super::types::BootstrapData;

/// Load the rule-set document, validate it against the deployed sensor
/// namespace, and layer it into a [`pulsar_core::CompiledRuleSet`].
pub(super) fn load_and_compile(config: &BeaconConfig, base_dir: &Path) -> RuntimeResult<BootstrapData> {
    let rule_set_path = if config.system.rule_set.is_absolute() {
        config.system.rule_set.clone()
    } else {
        base_dir.join(&config.system.rule_set)
    };

    let (rules, diagnostics) = load_rule_set(&rule_set_path)?;
    validate_against(&rules, &config.system.valid_sensors, diagnostics)?;
    let compiled = compile(rules)?;
    let valid_sensors = input_sensors(&compiled);

    beacon_info!(
        conf,
        file = %rule_set_path.display(),
        rules = compiled.rules.len(),
        layers = compiled.layer_count(),
        "rule set compiled"
    );

    Ok(BootstrapData {
        compiled,
        valid_sensors,
    })
}
