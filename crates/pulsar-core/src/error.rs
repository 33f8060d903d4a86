use derive_more::From;
use orion_error::{ErrorCode, StructError, UvsReason};

#[derive(Debug, Clone, PartialEq, thiserror::Error, From)]
pub enum CoreReason {
    /// A cycle exists in the rule dependency graph (spec §4.D).
    #[error("dependency cycle in rule set")]
    DependencyCycle,
    /// An unexpected fault during evaluation, buffer update, or
    /// orchestrator logic (spec §7 `FatalFault`).
    #[error("rule evaluation fault")]
    EvaluationFault,
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for CoreReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::DependencyCycle => 1001,
            Self::EvaluationFault => 1002,
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type CoreError = StructError<CoreReason>;
pub type CoreResult<T> = Result<T, CoreError>;
