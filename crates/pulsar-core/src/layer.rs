//! Dependency Layerer (spec §4.D): builds the rule dependency graph,
//! rejects cycles, and assigns each rule a layer by longest-path-from-source.

use std::collections::{BTreeMap, BTreeSet};

use orion_error::prelude::*;
use pulsar_lang::ast::Rule;

use crate::error::{CoreError, CoreReason};

/// A rule plus the layering metadata derived from the dependency graph
/// (spec §3 "Compiled rule").
pub struct CompiledRule {
    pub rule: Rule,
    pub layer: u32,
    pub dependencies: BTreeSet<String>,
    pub input_sensors: Vec<String>,
    pub output_sensors: Vec<String>,
}

/// The full set of compiled rules, ordered by `(layer, name)` (spec §3
/// "Compiled rule set").
pub struct CompiledRuleSet {
    pub rules: Vec<CompiledRule>,
}

impl CompiledRuleSet {
    pub fn layer_count(&self) -> u32 {
        self.rules.iter().map(|r| r.layer).max().map_or(0, |m| m + 1)
    }

    /// Rules in a given layer, already in ascending-name order (spec §5
    /// "rules within a layer in ascending-name order").
    pub fn layer(&self, layer: u32) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter().filter(move |r| r.layer == layer)
    }
}

/// Build the dependency graph (edge r→s iff an input sensor of s is an
/// output sensor of r), reject cycles, and assign layers.
pub fn layer_rules(rules: Vec<Rule>) -> Result<CompiledRuleSet, CoreError> {
    // name -> (input_sensors, output_sensors)
    let mut sensors: BTreeMap<String, (Vec<String>, Vec<String>)> = BTreeMap::new();
    for rule in &rules {
        sensors.insert(
            rule.name.clone(),
            (rule.input_sensors(), rule.output_sensors()),
        );
    }

    // Which rule produces a given output sensor (first writer wins for
    // edge-building purposes; validation elsewhere catches true conflicts).
    let mut producer_of: BTreeMap<String, String> = BTreeMap::new();
    for (name, (_, outputs)) in &sensors {
        for sensor in outputs {
            producer_of.entry(sensor.clone()).or_insert_with(|| name.clone());
        }
    }

    // edges[r] = set of rules r depends on (r reads their output).
    let mut dependencies: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (name, (inputs, _)) in &sensors {
        let mut deps = BTreeSet::new();
        for sensor in inputs {
            if let Some(producer) = producer_of.get(sensor) {
                if producer != name {
                    deps.insert(producer.clone());
                }
            }
        }
        dependencies.insert(name.clone(), deps);
    }

    let layers = assign_layers(&dependencies)?;

    let mut compiled: Vec<CompiledRule> = rules
        .into_iter()
        .map(|rule| {
            let (inputs, outputs) = sensors.remove(&rule.name).unwrap();
            let deps = dependencies.remove(&rule.name).unwrap();
            let layer = layers[&rule.name];
            CompiledRule {
                rule,
                layer,
                dependencies: deps,
                input_sensors: inputs,
                output_sensors: outputs,
            }
        })
        .collect();

    compiled.sort_by(|a, b| (a.layer, &a.rule.name).cmp(&(b.layer, &b.rule.name)));

    Ok(CompiledRuleSet { rules: compiled })
}

/// Longest-path-from-source layering with Kahn's-algorithm-style cycle
/// detection. `layer(r) = 1 + max(layer(d) for d in deps(r))`, `0` if no
/// deps. On a cycle, reports it naming the lowest-name member.
fn assign_layers(
    dependencies: &BTreeMap<String, BTreeSet<String>>,
) -> Result<BTreeMap<String, u32>, CoreError> {
    let mut layers: BTreeMap<String, u32> = BTreeMap::new();
    // in_progress tracks the current DFS stack to detect back-edges (cycles).
    let mut in_progress: BTreeSet<String> = BTreeSet::new();

    fn visit(
        name: &str,
        dependencies: &BTreeMap<String, BTreeSet<String>>,
        layers: &mut BTreeMap<String, u32>,
        in_progress: &mut BTreeSet<String>,
    ) -> Result<u32, Vec<String>> {
        if let Some(&layer) = layers.get(name) {
            return Ok(layer);
        }
        if in_progress.contains(name) {
            return Err(vec![name.to_string()]);
        }
        in_progress.insert(name.to_string());

        let deps = dependencies.get(name).cloned().unwrap_or_default();
        let mut max_dep_layer: Option<u32> = None;
        for dep in &deps {
            match visit(dep, dependencies, layers, in_progress) {
                Ok(dep_layer) => {
                    max_dep_layer = Some(max_dep_layer.map_or(dep_layer, |m| m.max(dep_layer)));
                }
                Err(mut cycle) => {
                    cycle.push(name.to_string());
                    return Err(cycle);
                }
            }
        }

        in_progress.remove(name);
        let layer = max_dep_layer.map_or(0, |m| m + 1);
        layers.insert(name.to_string(), layer);
        Ok(layer)
    }

    for name in dependencies.keys() {
        if let Err(mut cycle) = visit(name, dependencies, &mut layers, &mut in_progress) {
            cycle.sort();
            cycle.dedup();
            return Err(StructError::from(CoreReason::DependencyCycle)
                .with_detail(format!("cycle among rules: {cycle:?}")));
        }
    }

    Ok(layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsar_lang::ast::{Action, Combinator, ConditionNode, SetValueSource};

    fn writer_rule(name: &str, reads: &str, writes: &str) -> Rule {
        Rule {
            name: name.to_string(),
            description: None,
            condition: ConditionNode::Group {
                combinator: Combinator::All,
                children: vec![],
            },
            actions: vec![Action::SetValue {
                key: writes.to_string(),
                value: SetValueSource::Expression(
                    pulsar_lang::parser::parse_expression(reads).unwrap(),
                ),
            }],
        }
    }

    #[test]
    fn chain_layers_monotonically() {
        // r1 writes a, r2 reads a writes b, r3 reads b writes c (S3).
        let rules = vec![
            writer_rule("r1", "1", "a"),
            writer_rule("r2", "a", "b"),
            writer_rule("r3", "b", "c"),
        ];
        let compiled = layer_rules(rules).unwrap();
        let by_name: BTreeMap<_, _> = compiled
            .rules
            .iter()
            .map(|r| (r.rule.name.clone(), r.layer))
            .collect();
        assert_eq!(by_name["r1"], 0);
        assert_eq!(by_name["r2"], 1);
        assert_eq!(by_name["r3"], 2);
    }

    #[test]
    fn independent_rules_share_layer_zero() {
        let rules = vec![writer_rule("r1", "1", "a"), writer_rule("r2", "2", "b")];
        let compiled = layer_rules(rules).unwrap();
        assert!(compiled.rules.iter().all(|r| r.layer == 0));
    }

    #[test]
    fn cycle_is_rejected() {
        // r1 reads x writes y; r2 reads y writes x (S6).
        let rules = vec![writer_rule("r1", "input:x", "output:y"), {
            let mut r = writer_rule("r2", "output:y", "input:x");
            r.name = "r2".to_string();
            r
        }];
        let err = layer_rules(rules);
        assert!(err.is_err());
    }
}
