pub mod ast;
pub mod error;
pub mod parser;
pub mod validate;

pub use error::{LangError, LangReason, LangResult};
pub use parser::{parse_expression, parse_rule_set, parse_system_config, DocumentFormat};
pub use validate::{validate_rule_set, Diagnostic, DiagnosticKind};
