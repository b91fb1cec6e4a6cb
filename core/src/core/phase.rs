// strata/src/core/phase.rs

//! Phases and the ordered registry that places them.

use crate::error::{StrataError, StrataResult};
use std::borrow::Cow;
use std::fmt;

/// A named ordering anchor in a pipeline.
///
/// Phases carry no behavior; two phases are the same phase iff their names
/// are equal. Well-known phases are usually declared as constants:
///
/// ```
/// use strata::PipelinePhase;
///
/// pub const SETUP: PipelinePhase = PipelinePhase::new("Setup");
/// pub const CALL: PipelinePhase = PipelinePhase::new("Call");
/// assert_ne!(SETUP, CALL);
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PipelinePhase {
  name: Cow<'static, str>,
}

impl PipelinePhase {
  pub const fn new(name: &'static str) -> Self {
    Self {
      name: Cow::Borrowed(name),
    }
  }

  /// Creates a phase from a name computed at run time.
  pub fn named<S: Into<String>>(name: S) -> Self {
    Self {
      name: Cow::Owned(name.into()),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }
}

impl fmt::Display for PipelinePhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.name)
  }
}

impl fmt::Debug for PipelinePhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Phase(`{}`)", self.name)
  }
}

/// Where a phase is placed relative to a reference phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
  Before,
  After,
  /// Appended to the end; the reference phase is ignored.
  Last,
}

/// How a registered phase was placed. Retained so that merging can reproduce
/// the placement in another pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseRelation {
  Before(PipelinePhase),
  After(PipelinePhase),
  Last,
}

#[derive(Debug, Clone)]
struct PhaseEntry {
  phase: PipelinePhase,
  relation: PhaseRelation,
}

/// Ordered list of phases with relative-insertion rules.
///
/// The order is exactly the list order, edited only through `add`,
/// `insert_after`, `insert_before` and `insert_relative`, so resolving it is
/// deterministic for a fixed sequence of registration calls.
#[derive(Debug, Clone, Default)]
pub struct PhaseRegistry {
  entries: Vec<PhaseEntry>,
}

impl PhaseRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn contains(&self, phase: &PipelinePhase) -> bool {
    self.position(phase).is_some()
  }

  pub fn position(&self, phase: &PipelinePhase) -> Option<usize> {
    self.entries.iter().position(|e| &e.phase == phase)
  }

  pub fn relation_of(&self, phase: &PipelinePhase) -> Option<&PhaseRelation> {
    self.entries.iter().find(|e| &e.phase == phase).map(|e| &e.relation)
  }

  /// Phases in resolved order.
  pub fn iter(&self) -> impl Iterator<Item = &PipelinePhase> + '_ {
    self.entries.iter().map(|e| &e.phase)
  }

  /// Appends `phase` unless it is already registered. Returns whether the
  /// registry changed.
  pub fn add(&mut self, phase: PipelinePhase) -> bool {
    if self.contains(&phase) {
      return false;
    }
    self.entries.push(PhaseEntry {
      phase,
      relation: PhaseRelation::Last,
    });
    true
  }

  pub fn insert_after(&mut self, reference: &PipelinePhase, phase: PipelinePhase) -> StrataResult<()> {
    let idx = self.ensure_phase_exists(reference)?;
    self.ensure_phase_not_exists(&phase)?;
    self.entries.insert(
      idx + 1,
      PhaseEntry {
        phase,
        relation: PhaseRelation::After(reference.clone()),
      },
    );
    Ok(())
  }

  pub fn insert_before(&mut self, reference: &PipelinePhase, phase: PipelinePhase) -> StrataResult<()> {
    let idx = self.ensure_phase_exists(reference)?;
    self.ensure_phase_not_exists(&phase)?;
    self.entries.insert(
      idx,
      PhaseEntry {
        phase,
        relation: PhaseRelation::Before(reference.clone()),
      },
    );
    Ok(())
  }

  pub fn insert_relative(
    &mut self,
    reference: &PipelinePhase,
    phase: PipelinePhase,
    placement: Placement,
  ) -> StrataResult<()> {
    match placement {
      Placement::Before => self.insert_before(reference, phase),
      Placement::After => self.insert_after(reference, phase),
      Placement::Last => {
        self.ensure_phase_not_exists(&phase)?;
        self.entries.push(PhaseEntry {
          phase,
          relation: PhaseRelation::Last,
        });
        Ok(())
      }
    }
  }

  /// Inserts `phase` at `index` (clamped to the end), recording `relation`
  /// as its placement.
  pub(crate) fn place(&mut self, index: usize, phase: PipelinePhase, relation: PhaseRelation) -> StrataResult<()> {
    self.ensure_phase_not_exists(&phase)?;
    let index = index.min(self.entries.len());
    self.entries.insert(index, PhaseEntry { phase, relation });
    Ok(())
  }

  pub(crate) fn ensure_phase_exists(&self, phase: &PipelinePhase) -> StrataResult<usize> {
    self.position(phase).ok_or_else(|| StrataError::PhaseNotFound {
      phase: phase.name().to_string(),
    })
  }

  fn ensure_phase_not_exists(&self, phase: &PipelinePhase) -> StrataResult<()> {
    if self.contains(phase) {
      return Err(StrataError::DuplicatePhase {
        phase: phase.name().to_string(),
      });
    }
    Ok(())
  }
}
