// strata/src/pipeline/driver.rs

//! Runs one call frame to completion.
//!
//! Interceptors nest through `proceed()`, but their futures are not nested:
//! the driver keeps every started interceptor on its own stack and only ever
//! polls the innermost one. A chain of any length therefore runs at constant
//! native stack depth.

use crate::core::control::FrameState;
use crate::error::{StrataError, StrataResult};
use crate::pipeline::frame::{new_link, FrameCore, PipelineContext, SharedLink};
use crate::pipeline::options::CallGuard;
use crate::pipeline::table::Flattened;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{event, Level};

type InterceptorRun = Pin<Box<dyn Future<Output = StrataResult<()>> + Send>>;
type Interruption = Pin<Box<dyn Future<Output = &'static str> + Send>>;

/// An interceptor that has started and not yet completed.
struct Active {
  position: usize,
  run: InterceptorRun,
}

pub(crate) struct Driver<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  interceptors: Flattened<TSubject, TContext>,
  link: SharedLink<TSubject, TContext>,
  active: Vec<Active>,
  guard: CallGuard,
  interruption: Option<Interruption>,
  fired: Option<&'static str>,
}

impl<TSubject, TContext> Driver<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  pub(crate) fn new(interceptors: Flattened<TSubject, TContext>, guard: CallGuard) -> Self {
    let interruption: Option<Interruption> = if guard.is_armed() {
      let watched = guard.clone();
      Some(Box::pin(async move { watched.interrupted().await }))
    } else {
      None
    };
    Self {
      interceptors,
      link: new_link(),
      active: Vec::new(),
      guard,
      interruption,
      fired: None,
    }
  }

  /// Drives `core` through the interceptor sequence and returns it once the
  /// outermost interceptor has completed.
  pub(crate) async fn run(mut self, core: FrameCore<TSubject, TContext>) -> StrataResult<FrameCore<TSubject, TContext>> {
    if !core.has_next() {
      return Ok(core);
    }
    if let Some((core, outcome)) = self.start(core) {
      return outcome.map(|()| core);
    }
    std::future::poll_fn(|cx| self.poll_active(cx)).await
  }

  /// Starts the interceptor at the cursor. Hands the frame straight back when
  /// nothing is left to start, or with an error when the call was interrupted
  /// before it could start.
  fn start(
    &mut self,
    mut core: FrameCore<TSubject, TContext>,
  ) -> Option<(FrameCore<TSubject, TContext>, StrataResult<()>)> {
    let position = core.index;
    let Some(entry) = self.interceptors.get(position) else {
      return Some((core, Ok(())));
    };

    if let Some(reason) = self.guard.interruption() {
      event!(Level::WARN, interceptor = %entry.id, reason, "Call interrupted before interceptor started.");
      core.state = FrameState::Failed;
      let err = StrataError::Cancelled {
        at: Some(entry.id.clone()),
        reason: reason.to_string(),
      };
      return Some((core, Err(err)));
    }

    core.index = position + 1;
    core.stack.push(position);
    event!(Level::TRACE, interceptor = %entry.id, depth = core.stack.len(), "Entering interceptor.");

    let interceptor = Arc::clone(&entry.interceptor);
    let handle = PipelineContext::new(core, Arc::clone(&self.link));
    // Dropping the handle, on completion or when the run is abandoned,
    // leaves the frame in `Link::returned`.
    let run: InterceptorRun = Box::pin(async move {
      let mut handle = handle;
      let outcome = interceptor.intercept(&mut handle).await;
      drop(handle);
      outcome
    });
    self.active.push(Active { position, run });
    None
  }

  fn poll_active(&mut self, cx: &mut Context<'_>) -> Poll<StrataResult<FrameCore<TSubject, TContext>>> {
    loop {
      let Some(top) = self.active.last_mut() else {
        return Poll::Ready(Err(StrataError::Internal("no interceptor left to drive".to_string())));
      };
      let position = top.position;
      let polled = top.run.as_mut().poll(cx);

      if let Poll::Ready(outcome) = polled {
        self.active.pop();
        if let Some(done) = self.complete(position, outcome) {
          return Poll::Ready(done);
        }
        continue;
      }

      let request = self.link.lock().request.take();
      if let Some(core) = request {
        if let Some(refused) = self.start(core) {
          self.link.lock().reply = Some(refused);
        }
        continue;
      }

      let Some(reason) = self.poll_interruption(cx) else {
        return Poll::Pending;
      };
      // Interrupt the innermost running interceptor. Dropping its run drops
      // its handle, which returns the frame.
      self.active.pop();
      let err = StrataError::Cancelled {
        at: Some(self.interceptors[position].id.clone()),
        reason: reason.to_string(),
      };
      event!(Level::WARN, interceptor = %self.interceptors[position].id, reason, "Call interrupted.");
      if let Some(done) = self.complete(position, Err(err)) {
        return Poll::Ready(done);
      }
    }
  }

  /// Settles the interceptor at `position` and hands the frame to whoever
  /// proceeded into it. Returns the call's result once the outermost
  /// interceptor has settled.
  fn complete(
    &mut self,
    position: usize,
    outcome: StrataResult<()>,
  ) -> Option<StrataResult<FrameCore<TSubject, TContext>>> {
    let Some(mut core) = self.link.lock().returned.take() else {
      return Some(Err(StrataError::Internal(format!(
        "call frame lost after {}",
        self.interceptors[position].id
      ))));
    };
    let id = &self.interceptors[position].id;
    let outcome = outcome.map_err(|err| core.attribute(id, err));
    core.stack.pop();

    match &outcome {
      Ok(()) => {
        let short_circuited = core.state.is_running() && core.index == position + 1 && core.index < core.interceptors.len();
        if short_circuited {
          event!(
            Level::DEBUG,
            interceptor = %id,
            skipped = core.interceptors.len() - core.index,
            "Interceptor returned without proceeding; call short-circuited."
          );
          core.state = FrameState::Finished;
        }
        event!(Level::TRACE, interceptor = %id, "Leaving interceptor.");
      }
      Err(err) => {
        if core.state != FrameState::Failed {
          event!(Level::ERROR, interceptor = %id, error = %err, "Interceptor failed.");
        }
        core.state = FrameState::Failed;
      }
    }

    if self.active.is_empty() {
      return Some(outcome.map(|()| core));
    }
    self.link.lock().reply = Some((core, outcome));
    None
  }

  /// The interruption reason once the guard has fired. An interruption keeps
  /// firing for the rest of the call.
  fn poll_interruption(&mut self, cx: &mut Context<'_>) -> Option<&'static str> {
    if self.fired.is_some() {
      return self.fired;
    }
    let interruption = self.interruption.as_mut()?;
    match interruption.as_mut().poll(cx) {
      Poll::Ready(reason) => {
        self.fired = Some(reason);
        self.interruption = None;
        self.fired
      }
      Poll::Pending => None,
    }
  }
}
