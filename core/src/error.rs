// strata/src/error.rs
use crate::core::interceptor::InterceptorId;
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrataError {
  #[error("Phase not found: {phase}")]
  PhaseNotFound { phase: String },

  #[error("Phase already registered: {phase}")]
  DuplicatePhase { phase: String },

  #[error("Interceptor {origin} failed (proceed stack: {}). Source: {source}", display_stack(.proceed_stack))]
  InterceptorFailure {
    origin: InterceptorId,
    /// Interceptors suspended in `proceed()` when the failure happened,
    /// outermost first. The last entry is `origin`.
    proceed_stack: Vec<InterceptorId>,
    #[source]
    source: AnyhowError,
  },

  #[error("Pipeline call cancelled at {}: {reason}", display_position(.at))]
  Cancelled {
    at: Option<InterceptorId>,
    reason: String,
  },

  #[error("Error in user-provided interceptor. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Attribute '{key}' holds a value of another type than {expected}")]
  AttributeTypeMismatch { key: &'static str, expected: &'static str },

  #[error("Internal strata error: {0}")]
  Internal(String),
}

impl StrataError {
  /// The interceptor an execution-time error is attributed to, if any.
  pub fn origin(&self) -> Option<&InterceptorId> {
    match self {
      StrataError::InterceptorFailure { origin, .. } => Some(origin),
      StrataError::Cancelled { at, .. } => at.as_ref(),
      _ => None,
    }
  }

  pub fn is_cancelled(&self) -> bool {
    matches!(self, StrataError::Cancelled { .. })
  }

  /// Registration-time errors, raised synchronously by the registration API.
  pub fn is_configuration(&self) -> bool {
    matches!(self, StrataError::PhaseNotFound { .. } | StrataError::DuplicatePhase { .. })
  }
}

// Interceptors use `?` on anyhow errors. An anyhow error that already carries
// a StrataError is unwrapped instead of nested.
impl From<AnyhowError> for StrataError {
  fn from(err: AnyhowError) -> Self {
    match err.downcast::<StrataError>() {
      Ok(strata_err) => strata_err,
      Err(source) => StrataError::HandlerError { source },
    }
  }
}

fn display_stack(stack: &[InterceptorId]) -> String {
  if stack.is_empty() {
    return "<empty>".to_string();
  }
  stack.iter().map(ToString::to_string).collect::<Vec<_>>().join(" -> ")
}

fn display_position(at: &Option<InterceptorId>) -> String {
  match at {
    Some(id) => id.to_string(),
    None => "<call start>".to_string(),
  }
}

pub type StrataResult<T, E = StrataError> = std::result::Result<T, E>;
