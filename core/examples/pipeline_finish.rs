// strata/examples/pipeline_finish.rs

use std::collections::HashMap;
use std::sync::Arc;
use strata::{Pipeline, PipelinePhase, StrataError};
use tracing::{error, info};

const LOOKUP: PipelinePhase = PipelinePhase::new("Lookup");
const FETCH: PipelinePhase = PipelinePhase::new("Fetch");

#[derive(Debug)]
struct Response {
  path: String,
  body: String,
  from_cache: bool,
}

#[tokio::main]
async fn main() -> Result<(), StrataError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Pipeline Finish Example ---");

  // The call context is a handle to a cache shared by every call.
  let mut pipeline = Pipeline::<Response, Arc<HashMap<String, String>>>::new(&[LOOKUP, FETCH]);

  // A cache hit fills in the response and finishes the call.
  pipeline.intercept(&LOOKUP, |ctx| {
    Box::pin(async move {
      let cached = ctx.context().get(&ctx.subject().path).cloned();
      match cached {
        Some(body) => {
          info!(path = %ctx.subject().path, "Cache hit, finishing call.");
          let response = ctx.subject_mut();
          response.body = body;
          response.from_cache = true;
          ctx.finish();
        }
        None => {
          ctx.proceed().await?;
        }
      }
      Ok::<_, StrataError>(())
    })
  })?;

  pipeline.intercept(&FETCH, |ctx| {
    Box::pin(async move {
      if ctx.subject().path == "/cached" {
        // This interceptor should not be reached for cached paths
        error!("Fetch ran for a cached path (SHOULD NOT HAPPEN).");
      }
      let body = format!("fresh content for {}", ctx.subject().path);
      ctx.subject_mut().body = body;
      Ok::<_, StrataError>(())
    })
  })?;

  let cache = Arc::new(HashMap::from([("/cached".to_string(), "cached content".to_string())]));

  for path in ["/cached", "/other"] {
    let response = Response {
      path: path.to_string(),
      body: String::new(),
      from_cache: false,
    };
    let response = pipeline.execute(Arc::clone(&cache), response).await?;
    info!(?response, "Call completed.");
  }

  Ok(())
}
