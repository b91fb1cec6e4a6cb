// strata/examples/basic_pipeline.rs

use strata::{Pipeline, PipelinePhase, StrataError};
use tracing::info;

// 1. Declare the phases, in the order a request moves through them
const BEFORE: PipelinePhase = PipelinePhase::new("Before");
const STATE: PipelinePhase = PipelinePhase::new("State");
const TRANSFORM: PipelinePhase = PipelinePhase::new("Transform");
const SEND: PipelinePhase = PipelinePhase::new("Send");

// 2. Define the subject flowing through the pipeline, and the call context
#[derive(Clone, Debug, Default)]
struct Request {
  url: String,
  headers: Vec<(String, String)>,
  body: Vec<u8>,
}

#[derive(Debug)]
struct CallContext {
  request_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), StrataError> {
  // Initialize tracing (optional, for demonstration)
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Basic Pipeline Example ---");

  // 3. Create the pipeline definition
  let mut pipeline = Pipeline::<Request, CallContext>::new(&[BEFORE, STATE, TRANSFORM]);
  pipeline.insert_phase_after(&TRANSFORM, SEND)?;

  // 4. Register interceptors
  // Outermost: runs first on the way in and last on the way out.
  pipeline.intercept(&BEFORE, |ctx| {
    Box::pin(async move {
      let id = ctx.context().request_id;
      info!(id, url = %ctx.subject().url, "-> request");
      let sent = ctx.proceed().await?;
      info!(id, body_len = sent.body.len(), "<- request done");
      Ok::<_, StrataError>(())
    })
  })?;

  pipeline.intercept(&STATE, |ctx| {
    Box::pin(async move {
      ctx
        .subject_mut()
        .headers
        .push(("Authorization".to_string(), "Bearer example".to_string()));
      ctx.proceed().await?;
      Ok::<_, StrataError>(())
    })
  })?;

  pipeline.intercept(&TRANSFORM, |ctx| {
    Box::pin(async move {
      let mut encoded = ctx.subject().clone();
      encoded.body = b"{\"hello\":\"world\"}".to_vec();
      encoded.headers.push(("Content-Type".to_string(), "application/json".to_string()));
      ctx.proceed_with(encoded).await?;
      Ok::<_, StrataError>(())
    })
  })?;

  // The terminal action is the last interceptor of the last phase.
  pipeline.intercept(&SEND, |ctx| {
    Box::pin(async move {
      info!(headers = ctx.subject().headers.len(), "sending {} bytes", ctx.subject().body.len());
      Ok::<_, StrataError>(())
    })
  })?;

  info!("Phases: {:?}", pipeline.phases());

  // 5. Execute one call
  let request = Request {
    url: "https://example.com/api".to_string(),
    ..Default::default()
  };
  let sent = pipeline.execute(CallContext { request_id: 1 }, request).await?;

  // 6. Inspect the result
  info!("Final request: {:?}", sent);
  assert_eq!(sent.headers.len(), 2);
  assert!(!sent.body.is_empty());

  Ok(())
}
