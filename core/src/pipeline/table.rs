// strata/src/pipeline/table.rs

//! Per-phase interceptor buckets and the cached flattened sequence.

use crate::core::interceptor::{Interceptor, InterceptorId};
use crate::core::phase::{PhaseRegistry, PipelinePhase};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, Level};

pub type SharedInterceptor<TSubject, TContext> = Arc<dyn Interceptor<TSubject, TContext>>;

/// One entry of the flattened sequence.
pub(crate) struct Registered<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  pub(crate) id: InterceptorId,
  pub(crate) interceptor: SharedInterceptor<TSubject, TContext>,
}

impl<TSubject, TContext> Clone for Registered<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  fn clone(&self) -> Self {
    Self {
      id: self.id.clone(),
      interceptor: Arc::clone(&self.interceptor),
    }
  }
}

pub(crate) type Flattened<TSubject, TContext> = Arc<[Registered<TSubject, TContext>]>;

pub(crate) struct InterceptorTable<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  buckets: HashMap<PipelinePhase, Vec<SharedInterceptor<TSubject, TContext>>>,
  count: usize,
  // Dropped on every structural change; filled on the next execution.
  flattened: OnceCell<Flattened<TSubject, TContext>>,
}

impl<TSubject, TContext> InterceptorTable<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  pub(crate) fn new() -> Self {
    Self {
      buckets: HashMap::new(),
      count: 0,
      flattened: OnceCell::new(),
    }
  }

  pub(crate) fn push(&mut self, phase: &PipelinePhase, interceptor: SharedInterceptor<TSubject, TContext>) {
    self.buckets.entry(phase.clone()).or_default().push(interceptor);
    self.count += 1;
    self.invalidate();
  }

  pub(crate) fn bucket(&self, phase: &PipelinePhase) -> &[SharedInterceptor<TSubject, TContext>] {
    self.buckets.get(phase).map(Vec::as_slice).unwrap_or(&[])
  }

  pub(crate) fn len(&self) -> usize {
    self.count
  }

  pub(crate) fn invalidate(&mut self) {
    self.flattened.take();
  }

  pub(crate) fn is_cached(&self) -> bool {
    self.flattened.get().is_some()
  }

  /// The flattened sequence for `registry`, computed on first use after a
  /// structural change.
  pub(crate) fn flattened(&self, registry: &PhaseRegistry) -> Flattened<TSubject, TContext> {
    Arc::clone(self.flattened.get_or_init(|| self.flatten(registry)))
  }

  fn flatten(&self, registry: &PhaseRegistry) -> Flattened<TSubject, TContext> {
    let mut destination = Vec::with_capacity(self.count);
    for phase in registry.iter() {
      for (index, interceptor) in self.bucket(phase).iter().enumerate() {
        destination.push(Registered {
          id: InterceptorId::new(phase.clone(), index),
          interceptor: Arc::clone(interceptor),
        });
      }
    }
    event!(
      Level::DEBUG,
      num_phases = registry.len(),
      num_interceptors = destination.len(),
      "Interceptor sequence flattened."
    );
    destination.into()
  }
}

impl<TSubject, TContext> Clone for InterceptorTable<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  fn clone(&self) -> Self {
    Self {
      buckets: self.buckets.clone(),
      count: self.count,
      flattened: OnceCell::new(),
    }
  }
}
