pub mod error;
pub mod layer;
pub mod plan;
pub mod ring_buffer;
pub mod temporal;

pub use error::{CoreError, CoreReason, CoreResult};
pub use layer::{layer_rules, CompiledRule, CompiledRuleSet};
pub use plan::{EvalContext, EvaluationStats, Plan};
pub use ring_buffer::{RingBufferManager, Sample};
