#[macro_use]
mod log_macros;

pub mod adapter;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod orchestrator;
pub mod tracing_init;

pub use adapter::{DataStoreAdapter, JsonFileAdapter, SensorReading};
pub use error::{RuntimeError, RuntimeReason, RuntimeResult};
pub use lifecycle::{wait_for_signal, Reactor};
pub use metrics::{MetricsSnapshot, RuntimeMetrics};
pub use orchestrator::{CycleContext, CycleOrchestrator};
