// strata/examples/error_handling.rs

use strata::{Pipeline, PipelinePhase, StrataError};
use tracing::{error, info, warn};

const RECOVER: PipelinePhase = PipelinePhase::new("Recover");
const VALIDATE: PipelinePhase = PipelinePhase::new("Validate");
const CALL: PipelinePhase = PipelinePhase::new("Call");

// 1. Define a custom application error type
#[derive(Debug, thiserror::Error)]
enum ExampleAppError {
  #[error("Request rejected by validation: {0}")]
  Rejected(String),

  #[error("Strata error during pipeline execution: {0}")]
  Strata(#[from] StrataError), // Allows StrataError to be converted into ExampleAppError
}

#[derive(Debug, Default)]
struct ErrorContext {
  // Whether the outermost interceptor should turn failures into a fallback.
  recover: bool,
}

fn build_pipeline() -> Result<Pipeline<String, ErrorContext>, StrataError> {
  let mut pipeline = Pipeline::<String, ErrorContext>::new(&[RECOVER, VALIDATE, CALL]);

  // Outermost: observes every failure below it, after it has unwound.
  pipeline
    .intercept(&RECOVER, |ctx| {
      Box::pin(async move {
        let outcome = ctx.proceed().await.map(|_| ());
        match outcome {
          Ok(()) => Ok(()),
          Err(err) if ctx.context().recover => {
            warn!(origin = ?err.origin().map(ToString::to_string), "Recovering from: {}", err);
            ctx.set_subject("fallback".to_string());
            Ok(())
          }
          Err(err) => Err(err),
        }
      })
    })?;

  pipeline
    .intercept(&VALIDATE, |ctx| {
      Box::pin(async move {
        if ctx.subject().is_empty() {
          // Domain errors travel through anyhow and keep their type.
          let rejected = ExampleAppError::Rejected("empty request".to_string());
          return Err(anyhow::Error::new(rejected).into());
        }
        ctx.proceed().await?;
        Ok::<_, StrataError>(())
      })
    })?;

  pipeline
    .intercept(&CALL, |ctx| {
      Box::pin(async move {
        info!("Calling backend with '{}'", ctx.subject());
        let response = format!("response to {}", ctx.subject());
        ctx.set_subject(response);
        Ok::<_, StrataError>(())
      })
    })?;

  Ok(pipeline)
}

async fn run(pipeline: &Pipeline<String, ErrorContext>, recover: bool, request: &str) -> Result<String, ExampleAppError> {
  let result = pipeline.execute(ErrorContext { recover }, request.to_string()).await;
  match result {
    Ok(response) => Ok(response),
    // Surface the domain error an interceptor raised, if that is what failed.
    Err(StrataError::InterceptorFailure {
      origin,
      proceed_stack,
      source,
    }) => match source.downcast::<ExampleAppError>() {
      Ok(app_err) => Err(app_err),
      Err(source) => Err(
        StrataError::InterceptorFailure {
          origin,
          proceed_stack,
          source,
        }
        .into(),
      ),
    },
    Err(other) => Err(other.into()),
  }
}

#[tokio::main]
async fn main() -> Result<(), ExampleAppError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Error Handling Example ---");
  let pipeline = build_pipeline()?;

  // Scenario 1: A valid request
  match run(&pipeline, false, "ping").await {
    Ok(response) => info!("Scenario 1 succeeded: {}", response),
    Err(e) => error!("Scenario 1 failed unexpectedly: {}", e),
  }

  // Scenario 2: Validation fails and nothing recovers
  match run(&pipeline, false, "").await {
    Ok(response) => error!("Scenario 2 should have failed, got: {}", response),
    Err(ExampleAppError::Rejected(reason)) => info!("Scenario 2 rejected as expected: {}", reason),
    Err(e) => error!("Scenario 2 failed with an unexpected error: {}", e),
  }

  // Scenario 3: Validation fails and the outermost interceptor recovers
  match run(&pipeline, true, "").await {
    Ok(response) => info!("Scenario 3 recovered with: {}", response),
    Err(e) => error!("Scenario 3 should have recovered: {}", e),
  }

  // Scenario 4: Registering into an unknown phase fails at registration time
  let mut pipeline = build_pipeline()?;
  let unknown = PipelinePhase::new("Unknown");
  match pipeline.intercept(&unknown, |_ctx| Box::pin(async move { Ok::<_, StrataError>(()) })) {
    Ok(()) => error!("Scenario 4 should have failed"),
    Err(e) => info!(configuration = e.is_configuration(), "Scenario 4 failed as expected: {}", e),
  }

  Ok(())
}
