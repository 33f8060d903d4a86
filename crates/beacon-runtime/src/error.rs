use derive_more::From;
use orion_error::{ErrorCode, StructError, UvsReason};
use pulsar_core::CoreReason;

#[derive(Debug, Clone, PartialEq, thiserror::Error, From)]
pub enum RuntimeReason {
    #[error("bootstrap error")]
    Bootstrap,
    #[error("shutdown error")]
    Shutdown,
    /// A `DataStoreAdapter` call failed. Retried with backoff up to
    /// `runtime.backoff_max_attempts`; exhausting the budget skips and
    /// counts the cycle rather than escalating (spec §4.H/§7).
    #[error("adapter error")]
    AdapterError,
    /// A non-adapter fault the orchestrator cannot recover from; unlike
    /// `AdapterError`, this terminates the cycle loop.
    #[error("fatal fault")]
    FatalFault,
    #[error("{0}")]
    Core(CoreReason),
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for RuntimeReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::Bootstrap => 2001,
            Self::Shutdown => 2002,
            Self::AdapterError => 2003,
            Self::FatalFault => 2004,
            Self::Core(c) => c.error_code(),
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type RuntimeError = StructError<RuntimeReason>;
pub type RuntimeResult<T> = Result<T, RuntimeError>;
