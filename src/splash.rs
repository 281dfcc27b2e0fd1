//! Startup splash: a fake loading bar with rotating captions.
//!
//! State is derived purely from elapsed time, so the render loop just asks
//! for the values at `Instant::now()`.

use std::time::{Duration, Instant};

use crate::constants::constants;

pub struct Splash {
  started_at: Instant,
}

impl Splash {
  pub fn new(started_at: Instant) -> Self {
    Self { started_at }
  }

  fn elapsed_ms(&self, now: Instant) -> u64 {
    now.saturating_duration_since(self.started_at).as_millis() as u64
  }

  /// Percentage in 0..=100.
  pub fn progress_at(&self, now: Instant) -> u16 {
    let c = constants();
    let ticks = self.elapsed_ms(now) / c.splash_tick_ms.max(1);
    ticks.saturating_mul(c.splash_step as u64).min(100) as u16
  }

  pub fn caption_at(&self, now: Instant) -> &'static str {
    let texts = &constants().splash_texts;
    if texts.is_empty() {
      return "";
    }
    let idx = (self.elapsed_ms(now) / constants().splash_text_interval_ms.max(1)) as usize % texts.len();
    &texts[idx]
  }

  /// The bar reaches 100, one more tick notices it, then a short pause.
  fn total_duration() -> Duration {
    let c = constants();
    let step = c.splash_step.max(1) as u64;
    let ticks_to_full = 100u64.div_ceil(step);
    Duration::from_millis((ticks_to_full + 1) * c.splash_tick_ms + c.splash_exit_delay_ms)
  }

  pub fn is_done_at(&self, now: Instant) -> bool {
    now.saturating_duration_since(self.started_at) >= Self::total_duration()
  }
}
