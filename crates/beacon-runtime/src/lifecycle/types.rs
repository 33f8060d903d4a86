use pulsar_core::CompiledRuleSet;

/// Compiled artifacts from the config-loading phase, ready for the Cycle
/// Orchestrator.
pub(super) struct BootstrapData {
    pub compiled: CompiledRuleSet,
    pub valid_sensors: Vec<String>,
}
