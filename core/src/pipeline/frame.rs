// strata/src/pipeline/frame.rs

//! The per-call frame (`PipelineContext`) seen by interceptors, and the
//! `proceed()` future that hands the frame to the next interceptor.
//!
//! A call's state lives in one `FrameCore`. Whichever interceptor is running
//! holds it; `proceed()` lends it downstream through the call's `Link` and
//! takes it back once the driver reports the downstream chain completed.

use crate::core::control::FrameState;
use crate::core::interceptor::InterceptorId;
use crate::error::{StrataError, StrataResult};
use crate::pipeline::table::Flattened;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{event, Level};

/// Cursor, subject and context of one call.
pub(crate) struct FrameCore<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  pub(crate) context: TContext,
  pub(crate) subject: TSubject,
  pub(crate) interceptors: Flattened<TSubject, TContext>,
  pub(crate) index: usize,
  pub(crate) state: FrameState,
  pub(crate) stack: Vec<usize>,
}

impl<TSubject, TContext> FrameCore<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  pub(crate) fn new(context: TContext, subject: TSubject, interceptors: Flattened<TSubject, TContext>) -> Self {
    Self {
      context,
      subject,
      interceptors,
      index: 0,
      state: FrameState::Running,
      stack: Vec::new(),
    }
  }

  /// Whether `proceed()` has an interceptor to start.
  pub(crate) fn has_next(&self) -> bool {
    self.state.is_running() && self.index < self.interceptors.len()
  }

  fn proceed_stack(&self) -> Vec<InterceptorId> {
    self
      .stack
      .iter()
      .map(|&position| self.interceptors[position].id.clone())
      .collect()
  }

  /// Attaches the failing interceptor and the proceed stack to a raw user
  /// error. Errors already attributed further down keep their origin.
  pub(crate) fn attribute(&self, id: &InterceptorId, err: StrataError) -> StrataError {
    match err {
      StrataError::HandlerError { source } => StrataError::InterceptorFailure {
        origin: id.clone(),
        proceed_stack: self.proceed_stack(),
        source,
      },
      StrataError::Cancelled { at: None, reason } => StrataError::Cancelled {
        at: Some(id.clone()),
        reason,
      },
      other => other,
    }
  }
}

/// Hand-off slots between the interceptor handles of one call and its driver.
pub(crate) struct Link<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  /// Lent by a `proceed()` that wants the next interceptor started.
  pub(crate) request: Option<FrameCore<TSubject, TContext>>,
  /// Handed back to the suspended `proceed()` with the downstream outcome.
  pub(crate) reply: Option<(FrameCore<TSubject, TContext>, StrataResult<()>)>,
  /// Left by an interceptor handle when its interceptor completed or was
  /// dropped.
  pub(crate) returned: Option<FrameCore<TSubject, TContext>>,
}

pub(crate) type SharedLink<TSubject, TContext> = Arc<Mutex<Link<TSubject, TContext>>>;

pub(crate) fn new_link<TSubject, TContext>() -> SharedLink<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  Arc::new(Mutex::new(Link {
    request: None,
    reply: None,
    returned: None,
  }))
}

/// The call frame of one `execute` invocation, as seen by one interceptor.
///
/// Gives access to the current subject, the call context, and the position of
/// the call in the interceptor sequence. A frame is created by `execute` and
/// dropped when the call completes; it is never shared between calls.
pub struct PipelineContext<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  core: Option<FrameCore<TSubject, TContext>>,
  link: SharedLink<TSubject, TContext>,
}

impl<TSubject, TContext> PipelineContext<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  pub(crate) fn new(core: FrameCore<TSubject, TContext>, link: SharedLink<TSubject, TContext>) -> Self {
    Self { core: Some(core), link }
  }

  fn core(&self) -> &FrameCore<TSubject, TContext> {
    match &self.core {
      Some(core) => core,
      // Only a pending `proceed()` holds the core elsewhere, and it borrows
      // this handle exclusively while it does.
      None => unreachable!("call frame is lent to a downstream interceptor"),
    }
  }

  fn core_mut(&mut self) -> &mut FrameCore<TSubject, TContext> {
    match &mut self.core {
      Some(core) => core,
      None => unreachable!("call frame is lent to a downstream interceptor"),
    }
  }

  pub fn subject(&self) -> &TSubject {
    &self.core().subject
  }

  pub fn subject_mut(&mut self) -> &mut TSubject {
    &mut self.core_mut().subject
  }

  /// Replaces the subject. Interceptors that run afterwards, and the caller of
  /// `execute`, see the new value.
  pub fn set_subject(&mut self, subject: TSubject) {
    self.core_mut().subject = subject;
  }

  pub fn context(&self) -> &TContext {
    &self.core().context
  }

  pub fn context_mut(&mut self) -> &mut TContext {
    &mut self.core_mut().context
  }

  pub fn state(&self) -> FrameState {
    self.core().state
  }

  pub fn is_finished(&self) -> bool {
    self.core().state == FrameState::Finished
  }

  /// The innermost interceptor currently running.
  pub fn current(&self) -> Option<&InterceptorId> {
    let core = self.core();
    core.stack.last().map(|&position| &core.interceptors[position].id)
  }

  /// Interceptors currently running or suspended in `proceed()`, outermost
  /// first.
  pub fn proceed_stack(&self) -> Vec<InterceptorId> {
    self.core().proceed_stack()
  }

  /// Interceptors not yet started. Zero once the frame stopped running.
  pub fn remaining(&self) -> usize {
    let core = self.core();
    if !core.state.is_running() {
      return 0;
    }
    core.interceptors.len().saturating_sub(core.index)
  }

  /// Skips every interceptor that has not started yet. Interceptors already
  /// suspended in `proceed()` resume normally, and any further `proceed()`
  /// returns the subject as is.
  pub fn finish(&mut self) {
    let core = self.core_mut();
    if core.state.is_running() {
      event!(
        Level::DEBUG,
        at = ?core.stack.last().map(|&position| core.interceptors[position].id.to_string()),
        skipped = core.interceptors.len() - core.index,
        "Call finished early."
      );
      core.state = FrameState::Finished;
    }
  }

  /// Runs the next interceptor and, transitively, everything it proceeds
  /// into. Returns the subject once they have completed.
  ///
  /// When the frame is no longer running, or no interceptor is left, this
  /// is a no-op that returns the current subject.
  ///
  /// While suspended here the interceptor is not polled: futures it joins or
  /// races with `proceed()` make progress only once the downstream chain has
  /// completed.
  pub fn proceed(&mut self) -> ProceedFuture<'_, TSubject, TContext> {
    ProceedFuture {
      frame: Some(self),
      lent: false,
    }
  }

  /// Replaces the subject, then proceeds.
  pub fn proceed_with(&mut self, subject: TSubject) -> ProceedFuture<'_, TSubject, TContext> {
    self.set_subject(subject);
    self.proceed()
  }
}

impl<TSubject, TContext> Drop for PipelineContext<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  fn drop(&mut self) {
    if let Some(core) = self.core.take() {
      self.link.lock().returned = Some(core);
    }
  }
}

/// Future returned by [`PipelineContext::proceed`]. Resolves to the current
/// subject once everything downstream has completed.
///
/// Dropping it before completion gives the frame back to the interceptor
/// without running anything downstream.
pub struct ProceedFuture<'a, TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  frame: Option<&'a mut PipelineContext<TSubject, TContext>>,
  lent: bool,
}

impl<'a, TSubject, TContext> Future for ProceedFuture<'a, TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  type Output = StrataResult<&'a mut TSubject>;

  fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
    let this = self.get_mut();
    let Some(frame) = this.frame.take() else {
      return Poll::Ready(Err(StrataError::Internal("proceed polled after completion".to_string())));
    };

    if !this.lent {
      let lendable = frame.core.as_ref().is_some_and(FrameCore::has_next);
      if !lendable {
        return Poll::Ready(Ok(frame.subject_mut()));
      }
      // The driver picks the request up as soon as this interceptor yields,
      // and polls it again once the downstream chain has settled.
      let core = frame.core.take();
      frame.link.lock().request = core;
      this.lent = true;
      this.frame = Some(frame);
      return Poll::Pending;
    }

    let reply = frame.link.lock().reply.take();
    match reply {
      Some((core, outcome)) => {
        this.lent = false;
        frame.core = Some(core);
        match outcome {
          Ok(()) => Poll::Ready(Ok(frame.subject_mut())),
          Err(err) => Poll::Ready(Err(err)),
        }
      }
      None => {
        this.frame = Some(frame);
        Poll::Pending
      }
    }
  }
}

impl<TSubject, TContext> Drop for ProceedFuture<'_, TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  fn drop(&mut self) {
    if !self.lent {
      return;
    }
    if let Some(frame) = self.frame.take() {
      let mut link = frame.link.lock();
      let reclaimed = match link.request.take() {
        Some(core) => Some(core),
        None => link.reply.take().map(|(core, _)| core),
      };
      drop(link);
      if reclaimed.is_some() {
        frame.core = reclaimed;
      }
    }
  }
}
