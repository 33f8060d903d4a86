use std::collections::HashSet;
use std::path::Path;

use orion_error::compat_prelude::*;
use orion_error::prelude::*;
use pulsar_core::{layer_rules, CompiledRuleSet};
use pulsar_lang::ast::Rule;
use pulsar_lang::{parse_rule_set, validate_rule_set, Diagnostic, DocumentFormat};

use crate::error::{RuntimeReason, RuntimeResult};

/// Read and parse the rule-set document at `path` (spec §6 "Rule-set
/// document"). Only a malformed document as a whole is fail-fast; every
/// rule's own structural problems come back as [`Diagnostic`]s alongside
/// whatever rules did lower successfully. Sensor-namespace validation
/// happens separately in [`validate_against`] and its diagnostics must be
/// merged with these before any fail/report decision (spec §4.B: "validation
/// is total").
pub(super) fn load_rule_set(path: &Path) -> RuntimeResult<(Vec<Rule>, Vec<Diagnostic>)> {
    let content = std::fs::read_to_string(path)
        .owe_sys()
        .position(path.display().to_string())?;
    let format = DocumentFormat::from_path(path);
    parse_rule_set(&content, format)
        .owe(RuntimeReason::Bootstrap)
        .position(path.display().to_string())
}

/// Validate a parsed rule set against the deployed sensor namespace
/// (spec §4.B) and fail on the union of `parse_rule_set`'s document-level
/// diagnostics and these namespace checks, so one bad rule never hides
/// problems in the rest of the document or vice versa.
pub(super) fn validate_against(
    rules: &[Rule],
    valid_sensors: &[String],
    mut diagnostics: Vec<Diagnostic>,
) -> RuntimeResult<()> {
    let sensors: HashSet<String> = valid_sensors.iter().cloned().collect();
    diagnostics.extend(validate_rule_set(rules, &sensors));
    if diagnostics.is_empty() {
        return Ok(());
    }
    let detail = diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    Err(StructError::from(RuntimeReason::Bootstrap).with_detail(detail))
}

/// Build the dependency graph and assign layers (spec §4.D).
pub(super) fn compile(rules: Vec<Rule>) -> RuntimeResult<CompiledRuleSet> {
    layer_rules(rules).owe(RuntimeReason::Bootstrap)
}

/// Every sensor any compiled rule reads, deduplicated — the set the Cycle
/// Orchestrator asks the adapter for each cycle.
pub(super) fn input_sensors(compiled: &CompiledRuleSet) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for compiled_rule in &compiled.rules {
        for sensor in &compiled_rule.input_sensors {
            if !out.contains(sensor) {
                out.push(sensor.clone());
            }
        }
    }
    out
}
