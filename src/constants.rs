//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!`, so there is no runtime file I/O.
//! Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // Backend
  pub default_api_base: String,
  pub request_timeout_secs: u64,

  // Metadata placeholders
  pub fallback_title: String,
  pub fallback_source_name: String,
  pub fallback_thumbnail: String,
  pub fallback_source_logo: String,
  pub fallback_file_name: String,

  // Progress simulator
  pub progress_tick_ms: u64,
  pub progress_cap: f64,
  pub progress_max_step: f64,

  // Toasts
  pub toast_duration_ms: u64,

  // Splash screen
  pub splash_tick_ms: u64,
  pub splash_step: u16,
  pub splash_text_interval_ms: u64,
  pub splash_exit_delay_ms: u64,
  pub splash_texts: Vec<String>,
}

impl Constants {
  pub fn progress_tick(&self) -> Duration {
    Duration::from_millis(self.progress_tick_ms)
  }

  pub fn toast_duration(&self) -> Duration {
    Duration::from_millis(self.toast_duration_ms)
  }
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; a malformed file fails every test run.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn embedded_constants_parse() {
    let c = constants();
    assert_eq!(c.default_api_base, "http://127.0.0.1:8000");
    assert_eq!(c.fallback_title, "Unknown Title");
    assert_eq!(c.fallback_source_name, "Unknown Source");
    assert_eq!(c.progress_tick(), Duration::from_millis(500));
    assert!(c.progress_cap < 100.0);
    assert_eq!(c.splash_texts.len(), 4);
  }
}
