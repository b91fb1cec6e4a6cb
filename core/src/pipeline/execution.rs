// strata/src/pipeline/execution.rs

//! Contains the `Pipeline::execute*()` methods, which run one call frame
//! through the pipeline's flattened interceptor sequence.

use crate::error::StrataResult;
use crate::pipeline::definition::Pipeline;
use crate::pipeline::driver::Driver;
use crate::pipeline::frame::FrameCore;
use crate::pipeline::options::{CallGuard, CallOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{event, instrument, Level};

impl<TSubject, TContext> Pipeline<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  /// Executes this pipeline with the given call `context` and initial
  /// `subject`, returning the subject as left by the interceptors.
  ///
  /// Every interceptor runs at most once, in phase order and then in
  /// registration order. The call stops early when an interceptor finishes
  /// it, returns without proceeding, or fails; an error that no interceptor
  /// handled is returned here.
  pub async fn execute(&self, context: TContext, subject: TSubject) -> StrataResult<TSubject> {
    self.execute_with(context, subject, CallOptions::default()).await
  }

  /// Executes with a cancellation token. Cancelling the token fails the call
  /// with `StrataError::Cancelled`, delivered to the innermost running
  /// interceptor's caller.
  ///
  /// Once cancelled, the call stays interrupted: an outer interceptor that
  /// recovers from the error may set the subject and return, but any `.await`
  /// that suspends during recovery is interrupted as well, and the error is
  /// re-attributed to that interceptor (for example
  /// `Pipeline call cancelled at A#0: call cancelled`).
  pub async fn execute_with_cancellation(
    &self,
    context: TContext,
    subject: TSubject,
    token: CancellationToken,
  ) -> StrataResult<TSubject> {
    self
      .execute_with(context, subject, CallOptions::new().cancellation(token))
      .await
  }

  /// Executes with a deadline `timeout` from now. An elapsed deadline fails
  /// the call like a cancelled token, with reason `deadline elapsed`.
  ///
  /// Recovery after the deadline follows the same rule as for cancellation:
  /// it must not suspend, or it fails with
  /// `Pipeline call cancelled at <interceptor>: deadline elapsed`.
  pub async fn execute_with_timeout(
    &self,
    context: TContext,
    subject: TSubject,
    timeout: Duration,
  ) -> StrataResult<TSubject> {
    self
      .execute_with(context, subject, CallOptions::new().timeout(timeout))
      .await
  }

  #[instrument(
    name = "Pipeline::execute",
    skip_all,
    fields(
      subject_type = %std::any::type_name::<TSubject>(),
      context_type = %std::any::type_name::<TContext>(),
      num_phases = self.registry.len(),
      num_interceptors = self.table.len(),
    ),
    err(Display)
  )]
  pub async fn execute_with(
    &self,
    context: TContext,
    subject: TSubject,
    options: CallOptions,
  ) -> StrataResult<TSubject> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    let interceptors = self.table.flattened(&self.registry);
    let core = FrameCore::new(context, subject, Arc::clone(&interceptors));
    let core = Driver::new(interceptors, CallGuard::arm(options)).run(core).await?;

    event!(Level::DEBUG, state = ?core.state, "Pipeline execution completed.");
    Ok(core.subject)
  }
}
