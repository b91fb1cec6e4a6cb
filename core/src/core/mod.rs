pub mod attributes;
pub mod control;
pub mod interceptor;
pub mod phase;

// Re-export key types for easier access from other strata modules (and lib.rs)
pub use attributes::{AttributeKey, Attributes};
pub use control::FrameState;
pub use interceptor::{Interceptor, InterceptorFuture, InterceptorId};
pub use phase::{PhaseRegistry, PhaseRelation, PipelinePhase, Placement};
