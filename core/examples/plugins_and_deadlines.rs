// strata/examples/plugins_and_deadlines.rs

use std::time::Duration;
use strata::{AttributeKey, Pipeline, PipelinePhase, StrataError};
use tracing::{info, warn};

const SETUP: PipelinePhase = PipelinePhase::new("Setup");
const CALL: PipelinePhase = PipelinePhase::new("Call");
const MONITORING: PipelinePhase = PipelinePhase::new("Monitoring");

const MONITORING_INSTALLED: AttributeKey<bool> = AttributeKey::new("monitoring-installed");

type ClientPipeline = Pipeline<String, ()>;

/// A plugin contributes its own phase and interceptors, and marks itself as
/// installed so that installing it twice is a no-op.
fn install_monitoring(base: &mut ClientPipeline) -> Result<(), StrataError> {
  if base.attributes().get(&MONITORING_INSTALLED).unwrap_or(false) {
    return Ok(());
  }
  let mut plugin = ClientPipeline::new(&[SETUP]);
  plugin.insert_phase_after(&SETUP, MONITORING)?;
  plugin.intercept(&MONITORING, |ctx| {
    Box::pin(async move {
      let started = tokio::time::Instant::now();
      let result = ctx.proceed().await.map(|_| ());
      info!(elapsed = ?started.elapsed(), ok = result.is_ok(), "Call observed.");
      result
    })
  })?;
  base.merge(&plugin);
  base.attributes().put(&MONITORING_INSTALLED, true);
  Ok(())
}

#[tokio::main]
async fn main() -> Result<(), StrataError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Plugins and Deadlines Example ---");

  let mut pipeline = ClientPipeline::new(&[SETUP, CALL]);
  pipeline.intercept(&CALL, |ctx| {
    Box::pin(async move {
      let delay = if ctx.subject() == "slow" { 500 } else { 5 };
      tokio::time::sleep(Duration::from_millis(delay)).await;
      ctx.subject_mut().push_str(" -> done");
      Ok::<_, StrataError>(())
    })
  })?;

  install_monitoring(&mut pipeline)?;
  install_monitoring(&mut pipeline)?;
  info!("Phases after install: {:?}", pipeline.phases());

  let fast = pipeline
    .execute_with_timeout((), "fast".to_string(), Duration::from_millis(100))
    .await?;
  info!("Fast call returned: {}", fast);

  match pipeline
    .execute_with_timeout((), "slow".to_string(), Duration::from_millis(100))
    .await
  {
    Ok(response) => warn!("Slow call unexpectedly returned: {}", response),
    Err(e) if e.is_cancelled() => info!("Slow call cancelled as expected: {}", e),
    Err(e) => return Err(e),
  }

  Ok(())
}
