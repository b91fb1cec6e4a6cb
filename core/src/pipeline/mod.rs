// strata/src/pipeline/mod.rs

//! Defines the `Pipeline<TSubject, TContext>` struct, its construction,
//! modification, merging and execution, and the call frame it drives.

pub mod definition;
mod driver;
pub mod execution;
pub mod frame;
pub mod hooks;
pub mod merge;
pub mod options;
pub mod table;

// Re-export the main Pipeline struct
pub use definition::Pipeline;
pub use frame::{PipelineContext, ProceedFuture};
pub use options::CallOptions;
