//! Rule-set and system-config document parsing (spec §6). Documents are
//! YAML or JSON; both deserialize through the same `serde`-derived shape,
//! the way `other_examples`' sibling Pulsar engine loads `UserRule` with
//! `serde_yaml` before compiling it further.

use std::path::Path;

use orion_error::prelude::*;
use serde::Deserialize;
use winnow::prelude::*;

use crate::ast::{
    Action, Combinator, ConditionLeaf, ConditionNode, DurationMs, Rule, SetValueSource,
};
use crate::error::{LangError, LangReason};
use crate::validate::{Diagnostic, DiagnosticKind};

use super::expr::parse_expression;
use super::primitives::duration_ms;

/// Top-level rule-set document (spec §6 "Rule-set document").
#[derive(Debug, Deserialize)]
pub struct RuleSetDoc {
    pub version: u32,
    #[serde(default)]
    pub rules: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
pub struct RawRule {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub conditions: RawConditions,
    #[serde(default)]
    pub actions: Vec<RawAction>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawConditions {
    pub all: Option<Vec<RawCondition>>,
    pub any: Option<Vec<RawCondition>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawCondition {
    Comparison {
        sensor: String,
        operator: String,
        value: f64,
    },
    Expression {
        expression: String,
    },
    ThresholdOverTime {
        sensor: String,
        threshold: f64,
        duration: String,
        operator: String,
        #[serde(default)]
        required_fraction: Option<f64>,
    },
}

#[derive(Debug, Deserialize)]
pub enum RawAction {
    #[serde(rename = "set_value")]
    SetValue {
        key: String,
        #[serde(default)]
        value: Option<serde_yaml::Value>,
        #[serde(default)]
        value_expression: Option<String>,
    },
    #[serde(rename = "send_message")]
    SendMessage { channel: String, message: String },
}

/// System-config document (spec §6 "System-config document").
#[derive(Debug, Deserialize)]
pub struct SystemConfigDoc {
    pub version: u32,
    pub valid_sensors: Vec<String>,
    #[serde(default)]
    pub cycle_time_ms: Option<u64>,
    #[serde(default)]
    pub buffer_capacity: Option<usize>,
}

impl SystemConfigDoc {
    pub const DEFAULT_CYCLE_TIME_MS: u64 = 100;
    pub const DEFAULT_BUFFER_CAPACITY: usize = 100;

    pub fn cycle_time_ms(&self) -> u64 {
        self.cycle_time_ms.unwrap_or(Self::DEFAULT_CYCLE_TIME_MS)
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity.unwrap_or(Self::DEFAULT_BUFFER_CAPACITY)
    }
}

/// Which serialization a document is presented in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Infer from a file extension; defaults to YAML for unrecognized
    /// extensions the way the sibling engine treats its `.yaml` rule files
    /// as the canonical form.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

fn syntax_err(detail: impl std::fmt::Display) -> LangError {
    StructError::from(LangReason::DocumentSyntax).with_detail(detail.to_string())
}

fn diagnostic(rule_name: &str, kind: DiagnosticKind) -> Diagnostic {
    Diagnostic {
        rule_name: Some(rule_name.to_string()),
        kind,
    }
}

/// Parse a rule-set document in the given format. This stage only checks
/// document syntax (shape, required fields) and expression grammar; sensor
/// namespace / whitelist / uniqueness checks belong to the validator.
///
/// Only a malformed document as a whole (the thing `serde_yaml`/`serde_json`
/// itself can't deserialize into a [`RuleSetDoc`]) is fail-fast — every
/// rule's own structural problems (bad operator, malformed duration,
/// expression grammar, ambiguous `conditions` block, malformed `set_value`)
/// are collected as [`Diagnostic`]s so one bad rule never hides problems in
/// the rest of the document (spec §4.B: "validation is total").
pub fn parse_rule_set(
    input: &str,
    format: DocumentFormat,
) -> Result<(Vec<Rule>, Vec<Diagnostic>), LangError> {
    let doc: RuleSetDoc = match format {
        DocumentFormat::Yaml => serde_yaml::from_str(input).map_err(syntax_err)?,
        DocumentFormat::Json => serde_json::from_str(input).map_err(syntax_err)?,
    };
    let mut diagnostics = Vec::new();
    let rules = doc
        .rules
        .into_iter()
        .filter_map(|raw| lower_rule(raw, &mut diagnostics))
        .collect();
    Ok((rules, diagnostics))
}

/// Parse a system-config document in the given format.
pub fn parse_system_config(
    input: &str,
    format: DocumentFormat,
) -> Result<SystemConfigDoc, LangError> {
    match format {
        DocumentFormat::Yaml => serde_yaml::from_str(input).map_err(syntax_err),
        DocumentFormat::Json => serde_json::from_str(input).map_err(syntax_err),
    }
}

/// Lowers one raw rule, pushing every structural problem it finds onto
/// `diagnostics` and returning `None` (the rule is dropped from the
/// compiled set) only if at least one such problem was found — but other
/// rules in the same document are still lowered and diagnosed regardless.
fn lower_rule(raw: RawRule, diagnostics: &mut Vec<Diagnostic>) -> Option<Rule> {
    let before = diagnostics.len();
    let condition = lower_conditions(&raw.name, &raw.conditions, diagnostics);
    let actions: Vec<Action> = raw
        .actions
        .into_iter()
        .filter_map(|action| lower_action(&raw.name, action, diagnostics))
        .collect();

    if diagnostics.len() > before {
        return None;
    }

    Some(Rule {
        name: raw.name,
        description: raw.description,
        condition: condition.expect("no diagnostics implies condition lowered"),
        actions,
    })
}

/// A rule's top-level `conditions` block is itself an implicit ALL/ANY
/// group; at most one of `all`/`any` may be set. Neither present yields a
/// vacuously-true empty ALL group (spec §4.E).
fn lower_conditions(
    rule_name: &str,
    raw: &RawConditions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<ConditionNode> {
    match (&raw.all, &raw.any) {
        (Some(all), None) => lower_group(rule_name, Combinator::All, all, diagnostics),
        (None, Some(any)) => lower_group(rule_name, Combinator::Any, any, diagnostics),
        (None, None) => Some(ConditionNode::Group {
            combinator: Combinator::All,
            children: Vec::new(),
        }),
        (Some(_), Some(_)) => {
            diagnostics.push(diagnostic(
                rule_name,
                DiagnosticKind::AmbiguousConditionsBlock(rule_name.to_string()),
            ));
            None
        }
    }
}

fn lower_group(
    rule_name: &str,
    combinator: Combinator,
    raw: &[RawCondition],
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<ConditionNode> {
    let before = diagnostics.len();
    let children: Vec<ConditionNode> = raw
        .iter()
        .filter_map(|c| lower_condition(rule_name, c, diagnostics))
        .collect();
    if diagnostics.len() > before {
        return None;
    }
    Some(ConditionNode::Group {
        combinator,
        children,
    })
}

fn lower_condition(
    rule_name: &str,
    raw: &RawCondition,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<ConditionNode> {
    let leaf = match raw {
        RawCondition::Comparison {
            sensor,
            operator,
            value,
        } => ConditionLeaf::Comparison {
            sensor: sensor.clone(),
            operator: parse_cmp_op(rule_name, operator, diagnostics)?,
            value: *value,
        },
        RawCondition::Expression { expression } => ConditionLeaf::Expression {
            expr: parse_rule_expression(rule_name, expression, diagnostics)?,
        },
        RawCondition::ThresholdOverTime {
            sensor,
            threshold,
            duration,
            operator,
            required_fraction,
        } => {
            let duration_ms = parse_duration(rule_name, duration, diagnostics);
            let operator = parse_cmp_op(rule_name, operator, diagnostics);
            ConditionLeaf::ThresholdOverTime {
                sensor: sensor.clone(),
                threshold: *threshold,
                duration_ms: duration_ms?,
                operator: operator?,
                required_fraction: required_fraction.unwrap_or(1.0),
            }
        }
    };
    Some(ConditionNode::Leaf(leaf))
}

fn lower_action(
    rule_name: &str,
    raw: RawAction,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Action> {
    match raw {
        RawAction::SetValue {
            key,
            value,
            value_expression,
        } => {
            let source = match (value, value_expression) {
                (Some(v), None) => lower_scalar(rule_name, &v, diagnostics)?,
                (None, Some(expr)) => {
                    SetValueSource::Expression(parse_rule_expression(rule_name, &expr, diagnostics)?)
                }
                (None, None) | (Some(_), Some(_)) => {
                    diagnostics.push(diagnostic(
                        rule_name,
                        DiagnosticKind::InvalidSetValueSource(rule_name.to_string()),
                    ));
                    return None;
                }
            };
            Some(Action::SetValue { key, value: source })
        }
        RawAction::SendMessage { channel, message } => {
            Some(Action::SendMessage { channel, message })
        }
    }
}

fn lower_scalar(
    rule_name: &str,
    value: &serde_yaml::Value,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<SetValueSource> {
    if let Some(n) = value.as_f64() {
        Some(SetValueSource::Number(n))
    } else if let Some(s) = value.as_str() {
        Some(SetValueSource::StringLit(s.to_string()))
    } else {
        diagnostics.push(diagnostic(
            rule_name,
            DiagnosticKind::InvalidSetValueSource(rule_name.to_string()),
        ));
        None
    }
}

fn parse_rule_expression(
    rule_name: &str,
    expression: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<crate::ast::Expr> {
    match parse_expression(expression) {
        Ok(expr) => Some(expr),
        Err(e) => {
            diagnostics.push(diagnostic(
                rule_name,
                DiagnosticKind::ExpressionGrammar(rule_name.to_string(), e.to_string()),
            ));
            None
        }
    }
}

fn parse_cmp_op(
    rule_name: &str,
    token: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<crate::ast::CmpOp> {
    match crate::ast::CmpOp::from_token(token) {
        Some(op) => Some(op),
        None => {
            diagnostics.push(diagnostic(
                rule_name,
                DiagnosticKind::UnknownComparisonOperator(rule_name.to_string()),
            ));
            None
        }
    }
}

fn parse_duration(
    rule_name: &str,
    token: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<DurationMs> {
    let mut s = token;
    let parsed = duration_ms.parse_next(&mut s).ok().filter(|_| s.is_empty());
    match parsed {
        Some(ms) => Some(DurationMs(ms)),
        None => {
            diagnostics.push(diagnostic(
                rule_name,
                DiagnosticKind::MalformedDuration(rule_name.to_string()),
            ));
            None
        }
    }
}
