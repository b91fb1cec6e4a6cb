// strata/src/core/interceptor.rs

//! The interceptor contract and the identity used to report on interceptors.

use crate::core::phase::PipelinePhase;
use crate::error::StrataResult;
use crate::pipeline::frame::PipelineContext;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Future returned by closure interceptors. It borrows the call frame for the
/// duration of the interceptor.
pub type InterceptorFuture<'a> = Pin<Box<dyn Future<Output = StrataResult<()>> + Send + 'a>>;

/// A unit of processing registered into a phase.
///
/// An interceptor receives the call frame and may:
/// 1. Read or replace the subject, and read or mutate the call context.
/// 2. Call `ctx.proceed().await` to run everything downstream of it. Code
///    before that call runs before downstream interceptors, code after it runs
///    once they have all completed.
/// 3. Return without proceeding, or call `ctx.finish()`, to stop the call.
/// 4. Return an error. Every outer interceptor sees it as the result of its
///    own `proceed()`.
///
/// Closures of the shape `|ctx| Box::pin(async move { .. })` implement this
/// trait; plugins and terminal transports usually implement it on a struct.
#[async_trait]
pub trait Interceptor<TSubject, TContext>: Send + Sync
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  async fn intercept(&self, ctx: &mut PipelineContext<TSubject, TContext>) -> StrataResult<()>;
}

#[async_trait]
impl<TSubject, TContext, F> Interceptor<TSubject, TContext> for F
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
  F: for<'a> Fn(&'a mut PipelineContext<TSubject, TContext>) -> InterceptorFuture<'a> + Send + Sync,
{
  async fn intercept(&self, ctx: &mut PipelineContext<TSubject, TContext>) -> StrataResult<()> {
    (self)(ctx).await
  }
}

/// Identity of a registered interceptor: its phase and its position within
/// that phase. Displayed as `Phase#index`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterceptorId {
  pub phase: PipelinePhase,
  pub index: usize,
}

impl InterceptorId {
  pub fn new(phase: PipelinePhase, index: usize) -> Self {
    Self { phase, index }
  }
}

impl fmt::Display for InterceptorId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}#{}", self.phase, self.index)
  }
}
