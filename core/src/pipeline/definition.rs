// strata/src/pipeline/definition.rs

//! Contains the `Pipeline<TSubject, TContext>` struct definition and methods
//! for its construction and structural modification.

use crate::core::attributes::Attributes;
use crate::core::phase::{PhaseRegistry, PhaseRelation, PipelinePhase, Placement};
use crate::error::StrataResult;
use crate::pipeline::table::{InterceptorTable, SharedInterceptor};
use std::fmt;
use tracing::{event, Level};

/// An ordered set of phases, each holding interceptors, that processes a
/// `TSubject` within a call-scoped `TContext`.
///
/// A pipeline is configured once (phases, then interceptors, possibly merged
/// from other pipelines) and then shared, usually behind an `Arc`, by every
/// call that executes it. Registration needs `&mut self` and execution needs
/// `&self`, so a pipeline cannot change while a call is running on it.
pub struct Pipeline<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  pub(crate) registry: PhaseRegistry,
  pub(crate) table: InterceptorTable<TSubject, TContext>,
  attributes: Attributes,
}

impl<TSubject, TContext> Pipeline<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  /// Creates a pipeline with the given phases, in order. Repeated phases are
  /// registered once.
  pub fn new(phases: &[PipelinePhase]) -> Self {
    let mut registry = PhaseRegistry::new();
    for phase in phases {
      registry.add(phase.clone());
    }
    Self {
      registry,
      table: InterceptorTable::new(),
      attributes: Attributes::new(),
    }
  }

  /// Creates a single-phase pipeline pre-populated with `interceptors`.
  pub fn with_interceptors(
    phase: PipelinePhase,
    interceptors: impl IntoIterator<Item = SharedInterceptor<TSubject, TContext>>,
  ) -> Self {
    let mut pipeline = Self::new(std::slice::from_ref(&phase));
    for interceptor in interceptors {
      pipeline.table.push(&phase, interceptor);
    }
    pipeline
  }

  /// Attributes owned by this pipeline, shared by all of its calls.
  pub fn attributes(&self) -> &Attributes {
    &self.attributes
  }

  // --- Phase Registry ---

  /// Phases in execution order.
  pub fn phases(&self) -> Vec<PipelinePhase> {
    self.registry.iter().cloned().collect()
  }

  pub fn has_phase(&self, phase: &PipelinePhase) -> bool {
    self.registry.contains(phase)
  }

  pub fn phase_relation(&self, phase: &PipelinePhase) -> Option<&PhaseRelation> {
    self.registry.relation_of(phase)
  }

  /// Appends `phase` to the end of this pipeline. No-op if it is already
  /// registered.
  pub fn add_phase(&mut self, phase: PipelinePhase) {
    let name = phase.name().to_string();
    if self.registry.add(phase) {
      self.table.invalidate();
      event!(Level::DEBUG, phase = %name, "Phase added.");
    }
  }

  /// Inserts `phase` immediately after `reference`.
  ///
  /// Fails with `PhaseNotFound` if `reference` is not registered, and with
  /// `DuplicatePhase` if `phase` already is.
  pub fn insert_phase_after(&mut self, reference: &PipelinePhase, phase: PipelinePhase) -> StrataResult<()> {
    self.insert_phase_relative_to(reference, phase, Placement::After)
  }

  /// Inserts `phase` immediately before `reference`.
  ///
  /// Fails with `PhaseNotFound` if `reference` is not registered, and with
  /// `DuplicatePhase` if `phase` already is.
  pub fn insert_phase_before(&mut self, reference: &PipelinePhase, phase: PipelinePhase) -> StrataResult<()> {
    self.insert_phase_relative_to(reference, phase, Placement::Before)
  }

  pub fn insert_phase_relative_to(
    &mut self,
    reference: &PipelinePhase,
    phase: PipelinePhase,
    placement: Placement,
  ) -> StrataResult<()> {
    let name = phase.name().to_string();
    self.registry.insert_relative(reference, phase, placement)?;
    self.table.invalidate();
    event!(Level::DEBUG, phase = %name, reference = %reference, ?placement, "Phase inserted.");
    Ok(())
  }

  // --- Interceptor Table inspection ---

  /// Interceptors registered in `phase`, in registration order.
  pub fn interceptors_of(&self, phase: &PipelinePhase) -> &[SharedInterceptor<TSubject, TContext>] {
    self.table.bucket(phase)
  }

  pub fn interceptor_count(&self) -> usize {
    self.table.len()
  }

  /// `true` if no interceptor is installed, regardless of the number of
  /// phases.
  pub fn is_empty(&self) -> bool {
    self.table.len() == 0
  }

  /// Whether the flattened sequence is currently cached.
  pub fn is_flattened(&self) -> bool {
    self.table.is_cached()
  }
}

impl<TSubject, TContext> Clone for Pipeline<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  fn clone(&self) -> Self {
    Self {
      registry: self.registry.clone(),
      table: self.table.clone(),
      attributes: self.attributes.clone(),
    }
  }
}

impl<TSubject, TContext> Default for Pipeline<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  fn default() -> Self {
    Self::new(&[])
  }
}

impl<TSubject, TContext> fmt::Debug for Pipeline<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let phases: Vec<String> = self
      .registry
      .iter()
      .map(|p| format!("{} ({} interceptors)", p, self.table.bucket(p).len()))
      .collect();
    f.debug_struct("Pipeline")
      .field("phases", &phases)
      .field("attributes", &self.attributes)
      .finish()
  }
}
