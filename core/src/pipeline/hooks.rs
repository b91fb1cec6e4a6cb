// strata/src/pipeline/hooks.rs

//! Contains methods for registering interceptors into the phases of a
//! `Pipeline<TSubject, TContext>`.

use crate::core::interceptor::{Interceptor, InterceptorFuture};
use crate::core::phase::PipelinePhase;
use crate::error::StrataResult;
use crate::pipeline::definition::Pipeline;
use crate::pipeline::frame::PipelineContext;
use crate::pipeline::table::SharedInterceptor;
use std::sync::Arc;
use tracing::{event, Level};

impl<TSubject, TContext> Pipeline<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  /// Registers a closure interceptor at the end of `phase`.
  ///
  /// ```
  /// use strata::{Pipeline, PipelinePhase, StrataError};
  ///
  /// const CALL: PipelinePhase = PipelinePhase::new("Call");
  ///
  /// let mut pipeline = Pipeline::<String, ()>::new(&[CALL]);
  /// pipeline
  ///   .intercept(&CALL, |ctx| {
  ///     Box::pin(async move {
  ///       ctx.subject_mut().push_str(" handled");
  ///       ctx.proceed().await?;
  ///       Ok::<_, StrataError>(())
  ///     })
  ///   })
  ///   .unwrap();
  /// assert_eq!(pipeline.interceptor_count(), 1);
  /// ```
  ///
  /// Fails with `PhaseNotFound` if `phase` is not registered.
  pub fn intercept<F>(&mut self, phase: &PipelinePhase, interceptor_fn: F) -> StrataResult<()>
  where
    F: for<'a> Fn(&'a mut PipelineContext<TSubject, TContext>) -> InterceptorFuture<'a> + Send + Sync + 'static,
  {
    self.intercept_shared(phase, Arc::new(interceptor_fn))
  }

  /// Registers an `Interceptor` implementation at the end of `phase`.
  pub fn intercept_with<I>(&mut self, phase: &PipelinePhase, interceptor: I) -> StrataResult<()>
  where
    I: Interceptor<TSubject, TContext> + 'static,
  {
    self.intercept_shared(phase, Arc::new(interceptor))
  }

  /// Registers an interceptor that may also be installed in other pipelines.
  pub fn intercept_shared(
    &mut self,
    phase: &PipelinePhase,
    interceptor: SharedInterceptor<TSubject, TContext>,
  ) -> StrataResult<()> {
    self.registry.ensure_phase_exists(phase)?;
    self.table.push(phase, interceptor);
    event!(
      Level::DEBUG,
      %phase,
      index = self.table.bucket(phase).len() - 1,
      "Interceptor registered."
    );
    Ok(())
  }
}
