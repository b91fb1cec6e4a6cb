// strata/src/pipeline/options.rs

//! Per-call options and the guard that turns them into cancellation failures.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Options for a single `execute` call. The default attaches no guard.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
  pub(crate) cancellation: Option<CancellationToken>,
  pub(crate) timeout: Option<Duration>,
}

impl CallOptions {
  pub fn new() -> Self {
    Self::default()
  }

  /// Aborts the call when `token` is cancelled.
  pub fn cancellation(mut self, token: CancellationToken) -> Self {
    self.cancellation = Some(token);
    self
  }

  /// Aborts the call once `timeout` has elapsed, measured from the start of
  /// `execute`.
  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }
}

pub(crate) const CANCELLED_REASON: &str = "call cancelled";
pub(crate) const DEADLINE_REASON: &str = "deadline elapsed";

/// The armed form of `CallOptions` carried by a call frame.
#[derive(Debug, Clone, Default)]
pub(crate) struct CallGuard {
  token: Option<CancellationToken>,
  deadline: Option<Instant>,
}

impl CallGuard {
  pub(crate) fn arm(options: CallOptions) -> Self {
    Self {
      token: options.cancellation,
      deadline: options.timeout.map(|t| Instant::now() + t),
    }
  }

  pub(crate) fn is_armed(&self) -> bool {
    self.token.is_some() || self.deadline.is_some()
  }

  /// The reason the call must stop now, if any.
  pub(crate) fn interruption(&self) -> Option<&'static str> {
    if self.token.as_ref().is_some_and(CancellationToken::is_cancelled) {
      return Some(CANCELLED_REASON);
    }
    if self.deadline.is_some_and(|d| Instant::now() >= d) {
      return Some(DEADLINE_REASON);
    }
    None
  }

  /// Resolves once the call must stop. Pending forever for an unarmed guard.
  pub(crate) async fn interrupted(&self) -> &'static str {
    match (&self.token, self.deadline) {
      (Some(token), Some(deadline)) => {
        tokio::select! {
          biased;
          _ = token.cancelled() => CANCELLED_REASON,
          _ = tokio::time::sleep_until(deadline) => DEADLINE_REASON,
        }
      }
      (Some(token), None) => {
        token.cancelled().await;
        CANCELLED_REASON
      }
      (None, Some(deadline)) => {
        tokio::time::sleep_until(deadline).await;
        DEADLINE_REASON
      }
      (None, None) => std::future::pending().await,
    }
  }
}
