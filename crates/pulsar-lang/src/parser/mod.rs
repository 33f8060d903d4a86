mod document;
mod expr;
mod primitives;

pub use document::{
    parse_rule_set, parse_system_config, DocumentFormat, RuleSetDoc, SystemConfigDoc,
};
pub use expr::parse_expression;
