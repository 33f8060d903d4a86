pub mod adapter;
pub mod beacon;
pub mod logging;
pub mod runtime;
pub mod system;
pub mod types;
pub mod validate;

pub use adapter::AdapterSection;
pub use beacon::BeaconConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use runtime::RuntimeSection;
pub use system::{
    SystemSection, DEFAULT_BUFFER_CAPACITY, DEFAULT_CYCLE_TIME_MS, DEFAULT_RULE_SET_PATH,
};
pub use types::HumanDuration;
