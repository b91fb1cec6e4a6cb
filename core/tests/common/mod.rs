// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use strata::{Interceptor, Pipeline, PipelineContext, PipelinePhase, StrataResult};
use tracing::Level;

// --- Common Phases ---
pub const PHASE_A: PipelinePhase = PipelinePhase::new("A");
pub const PHASE_B: PipelinePhase = PipelinePhase::new("B");
pub const PHASE_C: PipelinePhase = PipelinePhase::new("C");
pub const PHASE_D: PipelinePhase = PipelinePhase::new("D");
pub const PHASE_X: PipelinePhase = PipelinePhase::new("X");

// --- Common Context ---

/// Call context shared between the test and the interceptors of one call.
#[derive(Clone, Debug, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push<S: Into<String>>(&self, event: S) {
    self.0.lock().push(event.into());
  }

  pub fn events(&self) -> Vec<String> {
    self.0.lock().clone()
  }
}

pub type TestPipeline = Pipeline<String, EventLog>;

/// Phases [A, B, C], with B inserted after A and C after B.
pub fn abc_pipeline() -> TestPipeline {
  let mut pipeline = TestPipeline::new(&[PHASE_A]);
  pipeline.insert_phase_after(&PHASE_A, PHASE_B).unwrap();
  pipeline.insert_phase_after(&PHASE_B, PHASE_C).unwrap();
  pipeline
}

// --- Common Interceptors ---

/// Records `"<name> <subject>"`, proceeds, then records `"<name> done"`.
pub struct Recorder {
  name: &'static str,
}

pub fn recorder(name: &'static str) -> Recorder {
  Recorder { name }
}

#[async_trait]
impl Interceptor<String, EventLog> for Recorder {
  async fn intercept(&self, ctx: &mut PipelineContext<String, EventLog>) -> StrataResult<()> {
    let log = ctx.context().clone();
    log.push(format!("{} {}", self.name, ctx.subject()));
    ctx.proceed().await?;
    log.push(format!("{} done", self.name));
    Ok(())
  }
}

/// Records `name` and fails with `message`.
pub struct Failing {
  name: &'static str,
  message: &'static str,
}

pub fn failing(name: &'static str, message: &'static str) -> Failing {
  Failing { name, message }
}

#[async_trait]
impl Interceptor<String, EventLog> for Failing {
  async fn intercept(&self, ctx: &mut PipelineContext<String, EventLog>) -> StrataResult<()> {
    ctx.context().push(format!("{} {}", self.name, ctx.subject()));
    tracing::warn!(target: "test_interceptors", name = self.name, "failing with: '{}'", self.message);
    Err(anyhow::anyhow!(self.message).into())
  }
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
