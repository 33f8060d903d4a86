//! Rule model — in-memory representation of rules, conditions, and actions
//! (spec §3 "Rule", "Condition tree", "Action").

use super::expr::{CmpOp, Expr};

/// A duration in milliseconds, normalized from the authoring document's
/// `<integer><unit>` syntax (`ms|s|m|h`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DurationMs(pub u64);

impl DurationMs {
    pub fn as_millis(self) -> u64 {
        self.0
    }
}

/// Logical combinator for a condition tree's internal nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    All,
    Any,
}

/// A leaf predicate in a condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionLeaf {
    /// `(sensor, operator, numeric value)`.
    Comparison {
        sensor: String,
        operator: CmpOp,
        value: f64,
    },
    /// An arbitrary arithmetic/comparison expression over sensors.
    Expression { expr: Expr },
    /// Threshold-over-duration predicate evaluated against a sensor's
    /// ring-buffer window.
    ThresholdOverTime {
        sensor: String,
        threshold: f64,
        duration_ms: DurationMs,
        operator: CmpOp,
        /// Fraction of in-window samples that must satisfy `operator`,
        /// in `[0, 1]`. Defaults to `1.0`.
        required_fraction: f64,
    },
}

/// A condition tree node: either a logical combinator over child nodes, or
/// a leaf predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionNode {
    Group {
        combinator: Combinator,
        children: Vec<ConditionNode>,
    },
    Leaf(ConditionLeaf),
}

impl ConditionNode {
    /// Every sensor identifier referenced anywhere in this subtree, in
    /// first-occurrence order without duplicates.
    pub fn referenced_sensors(&self, out: &mut Vec<String>) {
        match self {
            ConditionNode::Group { children, .. } => {
                for c in children {
                    c.referenced_sensors(out);
                }
            }
            ConditionNode::Leaf(leaf) => match leaf {
                ConditionLeaf::Comparison { sensor, .. } => {
                    if !out.contains(sensor) {
                        out.push(sensor.clone());
                    }
                }
                ConditionLeaf::Expression { expr } => expr.referenced_idents(out),
                ConditionLeaf::ThresholdOverTime { sensor, .. } => {
                    if !out.contains(sensor) {
                        out.push(sensor.clone());
                    }
                }
            },
        }
    }

    /// Every function name referenced anywhere in this subtree.
    pub fn referenced_funcs(&self, out: &mut Vec<String>) {
        match self {
            ConditionNode::Group { children, .. } => {
                for c in children {
                    c.referenced_funcs(out);
                }
            }
            ConditionNode::Leaf(ConditionLeaf::Expression { expr }) => {
                expr.referenced_funcs(out);
            }
            ConditionNode::Leaf(_) => {}
        }
    }

    /// Every sensor referenced only by a `ThresholdOverTime` leaf, paired
    /// with its duration — used to size the ring buffer's retention
    /// horizon (spec §3 "Ring buffer" invariant).
    pub fn temporal_horizons(&self, out: &mut Vec<(String, u64)>) {
        match self {
            ConditionNode::Group { children, .. } => {
                for c in children {
                    c.temporal_horizons(out);
                }
            }
            ConditionNode::Leaf(ConditionLeaf::ThresholdOverTime {
                sensor,
                duration_ms,
                ..
            }) => {
                out.push((sensor.clone(), duration_ms.as_millis()));
            }
            ConditionNode::Leaf(_) => {}
        }
    }
}

/// The value side of a `SetValue` action: either a constant, or an
/// expression evaluated against the current cycle's sensors/outputs.
#[derive(Debug, Clone, PartialEq)]
pub enum SetValueSource {
    Number(f64),
    StringLit(String),
    Expression(Expr),
}

/// One rule action, executed in declaration order (spec §3 "Action").
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetValue {
        key: String,
        value: SetValueSource,
    },
    SendMessage {
        channel: String,
        message: String,
    },
}

/// A fully parsed and validated rule, prior to dependency-layering and
/// compilation (spec §3 "Rule").
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub description: Option<String>,
    pub condition: ConditionNode,
    pub actions: Vec<Action>,
}

impl Rule {
    /// All sensors read by this rule's condition tree (not including
    /// sensors referenced only inside `SetValue` expressions, which are
    /// *also* inputs — see [`Rule::input_sensors`]).
    pub fn condition_sensors(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.condition.referenced_sensors(&mut out);
        out
    }

    /// All identifiers this rule reads as inputs: every sensor referenced
    /// in the condition tree plus every identifier referenced in a
    /// `SetValue` value-expression.
    pub fn input_sensors(&self) -> Vec<String> {
        let mut out = self.condition_sensors();
        for action in &self.actions {
            if let Action::SetValue {
                value: SetValueSource::Expression(expr),
                ..
            } = action
            {
                let mut idents = Vec::new();
                expr.referenced_idents(&mut idents);
                for id in idents {
                    if !out.contains(&id) {
                        out.push(id);
                    }
                }
            }
        }
        out
    }

    /// Every output key this rule writes via `SetValue` actions.
    pub fn output_sensors(&self) -> Vec<String> {
        let mut out = Vec::new();
        for action in &self.actions {
            if let Action::SetValue { key, .. } = action {
                if !out.contains(key) {
                    out.push(key.clone());
                }
            }
        }
        out
    }
}
