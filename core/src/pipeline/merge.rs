// strata/src/pipeline/merge.rs

//! Merging one pipeline's phases and interceptors into another.

use crate::core::phase::{PhaseRelation, PipelinePhase};
use crate::pipeline::definition::Pipeline;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, instrument, Level};

impl<TSubject, TContext> Pipeline<TSubject, TContext>
where
  TSubject: Send + 'static,
  TContext: Send + 'static,
{
  /// Merges `from` into this pipeline, keeping relative phase order.
  ///
  /// Phases of `from` that are missing here are placed the way they were
  /// placed in `from`, not simply appended: a phase inserted after a phase
  /// known here lands right after it, so merging a pipeline whose `D` was
  /// inserted after `A` into `[A, B, C]` gives `[A, D, B, C]`. Siblings placed
  /// after the same reference keep `from`'s order among themselves, and a
  /// phase inserted before its reference lands right before it. A phase whose
  /// reference is missing here, or that was appended in `from`, is appended.
  /// Phases already present are never moved.
  ///
  /// Then `from`'s interceptors for each phase are appended after the ones
  /// already registered here. `from` is left unchanged.
  #[instrument(
    name = "Pipeline::merge",
    skip_all,
    fields(target_phases = self.registry.len(), source_phases = from.registry.len())
  )]
  pub fn merge(&mut self, from: &Pipeline<TSubject, TContext>) {
    let mut added_phases = 0usize;
    let mut added_interceptors = 0usize;
    // Last phase merged after each reference, so later siblings follow it.
    let mut last_after: HashMap<PipelinePhase, PipelinePhase> = HashMap::new();

    for phase in from.registry.iter() {
      if !self.registry.contains(phase) {
        let relation = from.registry.relation_of(phase).cloned().unwrap_or(PhaseRelation::Last);
        let slot = match &relation {
          PhaseRelation::After(reference) => {
            let anchor = last_after.get(reference).unwrap_or(reference);
            self.registry.position(anchor).map(|idx| idx + 1)
          }
          PhaseRelation::Before(reference) => self.registry.position(reference),
          PhaseRelation::Last => None,
        };
        match slot {
          Some(index) => {
            if let PhaseRelation::After(reference) = &relation {
              last_after.insert(reference.clone(), phase.clone());
            }
            if let Err(err) = self.registry.place(index, phase.clone(), relation) {
              event!(Level::WARN, phase = %phase, error = %err, "Phase could not be placed during merge.");
            }
          }
          None => {
            self.registry.add(phase.clone());
          }
        }
        added_phases += 1;
      }

      for interceptor in from.table.bucket(phase) {
        self.table.push(phase, Arc::clone(interceptor));
        added_interceptors += 1;
      }
    }

    if added_phases > 0 {
      self.table.invalidate();
    }
    event!(Level::DEBUG, added_phases, added_interceptors, "Pipelines merged.");
  }

  /// Returns a new pipeline holding this pipeline merged with `other`.
  /// Neither input is modified.
  pub fn merged(&self, other: &Pipeline<TSubject, TContext>) -> Pipeline<TSubject, TContext> {
    let mut result = self.clone();
    result.merge(other);
    result
  }
}
