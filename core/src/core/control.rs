// strata/src/core/control.rs

//! States of a call frame.

/// Where a call frame is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
  /// Interceptors may still be started by `proceed()`.
  Running,
  /// `finish()` was called or an interceptor returned without proceeding.
  /// Further `proceed()` calls return the subject unchanged.
  Finished,
  /// An error unwound through the frame. Further `proceed()` calls make no
  /// forward progress, even if an outer interceptor recovered from it.
  Failed,
}

impl FrameState {
  pub fn is_running(self) -> bool {
    self == FrameState::Running
  }
}
