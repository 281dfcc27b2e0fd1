use std::time::{Duration, Instant};

use crate::constants::constants;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
  Success,
  Error,
  Warning,
}

impl ToastKind {
  pub fn icon(self) -> &'static str {
    match self {
      ToastKind::Success => "✔",
      ToastKind::Error => "✖",
      ToastKind::Warning => "⚠",
    }
  }
}

/// A transient notification that dismisses itself after a fixed duration.
#[derive(Debug, Clone)]
pub struct Toast {
  pub message: String,
  pub kind: ToastKind,
  shown_at: Instant,
  duration: Duration,
}

impl Toast {
  pub fn new(message: impl Into<String>, kind: ToastKind) -> Self {
    Self::shown_at(message, kind, Instant::now())
  }

  fn shown_at(message: impl Into<String>, kind: ToastKind, shown_at: Instant) -> Self {
    Self { message: message.into(), kind, shown_at, duration: constants().toast_duration() }
  }

  pub fn is_expired_at(&self, now: Instant) -> bool {
    now.saturating_duration_since(self.shown_at) >= self.duration
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn expires_after_configured_duration() {
    let t0 = Instant::now();
    let toast = Toast::shown_at("Video downloaded successfully!", ToastKind::Success, t0);
    assert!(!toast.is_expired_at(t0));
    assert!(!toast.is_expired_at(t0 + Duration::from_millis(3999)));
    assert!(toast.is_expired_at(t0 + Duration::from_millis(4000)));
  }

  #[test]
  fn earlier_clock_is_not_expired() {
    let t0 = Instant::now() + Duration::from_secs(1);
    let toast = Toast::shown_at("x", ToastKind::Warning, t0);
    assert!(!toast.is_expired_at(t0 - Duration::from_millis(500)));
  }
}
