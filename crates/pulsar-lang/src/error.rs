use derive_more::From;
use orion_error::{ErrorCode, StructError, UvsReason};

/// Errors raised by the grammar-level expression parser itself (malformed
/// syntax, not semantic validation — those become [`Diagnostic`]s instead).
#[derive(Debug, Clone, PartialEq, thiserror::Error, From)]
pub enum LangReason {
    #[error("expression parse error")]
    ExpressionSyntax,
    #[error("rule-set document parse error")]
    DocumentSyntax,
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for LangReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::ExpressionSyntax => 1101,
            Self::DocumentSyntax => 1102,
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type LangError = StructError<LangReason>;
pub type LangResult<T> = Result<T, LangError>;
