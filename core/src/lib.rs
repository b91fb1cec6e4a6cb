// src/lib.rs

//! Strata: an asynchronous, phase-ordered interceptor pipeline engine.
//!
//! A `Pipeline<TSubject, TContext>` processes a subject (a request, a
//! response, ...) through named, orderable phases. Each phase holds
//! interceptors that may inspect or replace the subject, wrap the rest of the
//! call, short-circuit it, or fail it. HTTP clients and servers build every
//! cross-cutting feature (authentication, compression, logging, content
//! negotiation, routing) as interceptors on top of this engine.
//!
//! Features:
//!  - Phases inserted before/after other phases, with misconfiguration
//!    reported at registration time.
//!  - Onion-style execution: code before `proceed()` runs outer-to-inner,
//!    code after it runs inner-to-outer.
//!  - Errors unwind through every enclosing `proceed()`, so an outer
//!    interceptor can translate or recover from failures further down.
//!  - Merging pipelines while keeping relative phase order.
//!  - Per-call cancellation tokens and deadlines, delivered through the same
//!    error path.
//!  - A cached, shared flattening of the interceptor sequence, so a pipeline
//!    is configured once and executed concurrently by many calls.

pub mod core;
pub mod error;
pub mod pipeline;

// --- Re-exports for the Public API ---

pub use crate::core::attributes::{AttributeKey, Attributes};
pub use crate::core::control::FrameState;
pub use crate::core::interceptor::{Interceptor, InterceptorFuture, InterceptorId};
pub use crate::core::phase::{PhaseRegistry, PhaseRelation, PipelinePhase, Placement};

pub use crate::pipeline::definition::Pipeline;
pub use crate::pipeline::frame::{PipelineContext, ProceedFuture};
pub use crate::pipeline::options::CallOptions;
pub use crate::pipeline::table::SharedInterceptor;

pub use crate::error::{StrataError, StrataResult};

// Callers pass this to `execute_with_cancellation` / `CallOptions::cancellation`.
pub use tokio_util::sync::CancellationToken;

/*
    Core Workflow:
    1. Declare the phases of your pipeline, usually as constants:
       `const CALL: PipelinePhase = PipelinePhase::new("Call");`
    2. Create a `Pipeline<MySubject, MyContext>::new(&[SETUP, CALL])` and add
       more phases with `insert_phase_before/after` where plugins need them.
    3. Register interceptors with `.intercept(&PHASE, |ctx| Box::pin(async move { .. }))`
       or `.intercept_with(&PHASE, my_interceptor)`. An interceptor calls
       `ctx.proceed().await?` to run the rest of the pipeline.
    4. Register the terminal action (sending bytes, dispatching to a handler)
       as the last interceptor of the last phase.
    5. Share the pipeline (`Arc<Pipeline<..>>`) and call
       `pipeline.execute(context, subject).await` once per call.
*/
