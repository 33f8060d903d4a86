//! Code/Plan Emitter (spec §4.E): interprets a [`CompiledRuleSet`] against a
//! cycle's inputs/outputs/buffers. This crate takes the "interpreted"
//! strategy the design notes permit — each condition/action walks a typed
//! AST built once at compile time, rather than generating source.

use std::collections::HashMap;

use pulsar_lang::ast::{
    Action, CmpOp, Combinator, ConditionLeaf, ConditionNode, Expr, Rule, SetValueSource,
};

use crate::layer::CompiledRuleSet;
use crate::ring_buffer::RingBufferManager;

/// Per-cycle counters accumulated while evaluating a plan.
#[derive(Debug, Default, Clone, Copy)]
pub struct EvaluationStats {
    pub evaluation_skips: u64,
}

/// Everything a rule evaluation needs to read: this cycle's inputs, outputs
/// written so far by earlier layers, and the sensor ring buffers for
/// temporal predicates.
pub struct EvalContext<'a> {
    pub inputs: &'a HashMap<String, f64>,
    pub outputs: &'a mut HashMap<String, f64>,
    pub messages: &'a mut Vec<(String, String)>,
    pub buffers: &'a RingBufferManager,
    pub now_ms: i64,
    pub stats: &'a mut EvaluationStats,
}

impl EvalContext<'_> {
    fn resolve(&self, ident: &str) -> Option<f64> {
        self.outputs.get(ident).or_else(|| self.inputs.get(ident)).copied()
    }
}

/// An immutable, freely shareable evaluation plan (spec §3 "Evaluation
/// plan"): one layer of rules at a time, in ascending (layer, name) order.
pub struct Plan {
    compiled: CompiledRuleSet,
}

impl Plan {
    pub fn new(compiled: CompiledRuleSet) -> Self {
        Self { compiled }
    }

    pub fn layer_count(&self) -> u32 {
        self.compiled.layer_count()
    }

    /// Evaluate every rule in `layer`, in ascending-name order (spec §5).
    pub fn evaluate_layer(&self, layer: u32, ctx: &mut EvalContext<'_>) {
        for compiled_rule in self.compiled.layer(layer) {
            evaluate_rule(&compiled_rule.rule, ctx);
        }
    }
}

fn evaluate_rule(rule: &Rule, ctx: &mut EvalContext<'_>) {
    if !eval_condition(&rule.condition, ctx) {
        return;
    }
    for action in &rule.actions {
        match action {
            Action::SetValue { key, value } => {
                let Some(v) = eval_set_value(value, ctx) else {
                    ctx.stats.evaluation_skips += 1;
                    continue;
                };
                ctx.outputs.insert(key.clone(), v);
            }
            Action::SendMessage { channel, message } => {
                ctx.messages.push((channel.clone(), message.clone()));
            }
        }
    }
}

fn eval_set_value(source: &SetValueSource, ctx: &mut EvalContext<'_>) -> Option<f64> {
    match source {
        SetValueSource::Number(n) => Some(*n),
        SetValueSource::StringLit(_) => None,
        SetValueSource::Expression(expr) => eval_expr(expr, ctx),
    }
}

/// ALL is conjunction (empty = true); ANY is disjunction (empty = false).
/// A missing/non-numeric sensor or NaN comparison makes the relevant leaf
/// false, never an error (spec §4.E).
fn eval_condition(node: &ConditionNode, ctx: &mut EvalContext<'_>) -> bool {
    match node {
        ConditionNode::Group {
            combinator: Combinator::All,
            children,
        } => children.iter().all(|c| eval_condition(c, ctx)),
        ConditionNode::Group {
            combinator: Combinator::Any,
            children,
        } => children.iter().any(|c| eval_condition(c, ctx)),
        ConditionNode::Leaf(leaf) => eval_leaf(leaf, ctx),
    }
}

fn eval_leaf(leaf: &ConditionLeaf, ctx: &mut EvalContext<'_>) -> bool {
    match leaf {
        ConditionLeaf::Comparison {
            sensor,
            operator,
            value,
        } => {
            let Some(lhs) = ctx.resolve(sensor) else {
                ctx.stats.evaluation_skips += 1;
                return false;
            };
            operator.apply(lhs, *value)
        }
        ConditionLeaf::Expression { expr } => {
            let Some(v) = eval_expr(expr, ctx) else {
                ctx.stats.evaluation_skips += 1;
                return false;
            };
            v.is_finite() && v != 0.0
        }
        ConditionLeaf::ThresholdOverTime {
            sensor,
            threshold,
            duration_ms,
            operator,
            required_fraction,
        } => {
            let window = ctx.buffers.window(sensor, duration_ms.as_millis(), ctx.now_ms);
            crate::temporal::threshold_over_time(
                &window,
                ctx.now_ms,
                duration_ms.as_millis(),
                *operator,
                *threshold,
                *required_fraction,
            )
        }
    }
}

/// Evaluate an expression tree; `None` propagates for a missing/non-numeric
/// identifier, an unknown/mis-arity function call, or a vanished operand —
/// the caller turns that into an `EvaluationSkip` (spec §4.E).
fn eval_expr(expr: &Expr, ctx: &mut EvalContext<'_>) -> Option<f64> {
    match expr {
        Expr::Number(n) => Some(*n),
        Expr::Ident(name) => ctx.resolve(name),
        Expr::Neg(inner) => eval_expr(inner, ctx).map(|v| -v),
        Expr::Arith { op, left, right } => {
            let l = eval_expr(left, ctx)?;
            let r = eval_expr(right, ctx)?;
            Some(apply_arith(*op, l, r))
        }
        Expr::Cmp { op, left, right } => {
            let l = eval_expr(left, ctx)?;
            let r = eval_expr(right, ctx)?;
            Some(if op.apply(l, r) { 1.0 } else { 0.0 })
        }
        Expr::FuncCall { name, args } => {
            let values: Option<Vec<f64>> = args.iter().map(|a| eval_expr(a, ctx)).collect();
            apply_func(name, &values?)
        }
    }
}

fn apply_arith(op: pulsar_lang::ast::ArithOp, l: f64, r: f64) -> f64 {
    use pulsar_lang::ast::ArithOp::*;
    match op {
        Add => l + r,
        Sub => l - r,
        Mul => l * r,
        Div => l / r,
    }
}

/// Implementations for the closed math-function whitelist (spec §3). An
/// unknown name or wrong argument count yields `None`, treated as a skip.
fn apply_func(name: &str, args: &[f64]) -> Option<f64> {
    match (name, args) {
        ("abs", [a]) => Some(a.abs()),
        ("sqrt", [a]) => Some(a.sqrt()),
        ("sin", [a]) => Some(a.sin()),
        ("cos", [a]) => Some(a.cos()),
        ("tan", [a]) => Some(a.tan()),
        ("log", [a]) => Some(a.ln()),
        ("exp", [a]) => Some(a.exp()),
        ("floor", [a]) => Some(a.floor()),
        ("ceil", [a]) => Some(a.ceil()),
        ("round", [a]) => Some(a.round()),
        ("pow", [a, b]) => Some(a.powf(*b)),
        ("min", [a, b]) => Some(a.min(*b)),
        ("max", [a, b]) => Some(a.max(*b)),
        _ => None,
    }
}

// Re-exported for callers that only need the comparison semantics (e.g.
// tests constructing a bare `Comparison` leaf without a whole rule).
pub use pulsar_lang::ast::CmpOp as ComparisonOperator;
