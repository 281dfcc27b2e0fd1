use reqwest::Url;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

use crate::api::HttpService;
use crate::lifecycle::{Controller, Outcome};
use crate::splash::Splash;
use crate::toast::{Toast, ToastKind};

/// Which pane receives plain keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
  Input,
  Video,
}

pub struct App {
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub focus: Focus,
  pub controller: Controller<HttpService>,
  pub toast: Option<Toast>,
  pub splash: Option<Splash>,
  /// Where the last successful download was written.
  pub last_saved: Option<PathBuf>,
  pub should_quit: bool,
}

impl App {
  pub fn new(controller: Controller<HttpService>, show_splash: bool) -> Self {
    Self {
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      focus: Focus::Input,
      controller,
      toast: None,
      splash: show_splash.then(|| Splash::new(Instant::now())),
      last_saved: None,
      should_quit: false,
    }
  }

  /// Pre-fill the input and look the URL up immediately.
  pub fn start_with(&mut self, url: &str) {
    self.input = url.trim().to_string();
    self.cursor_position = self.input.chars().count();
    self.submit();
  }

  pub fn show_toast(&mut self, message: impl Into<String>, kind: ToastKind) {
    self.toast = Some(Toast::new(message, kind));
  }

  pub fn hide_toast(&mut self) {
    self.toast = None;
  }

  pub fn dismiss_splash(&mut self) {
    self.splash = None;
  }

  /// Time-driven housekeeping: expire the toast and end the splash.
  pub fn tick(&mut self, now: Instant) {
    if self.toast.as_ref().is_some_and(|t| t.is_expired_at(now)) {
      self.toast = None;
    }
    if self.splash.as_ref().is_some_and(|s| s.is_done_at(now)) {
      self.splash = None;
    }
  }

  /// Apply finished background work.
  pub fn check_pending(&mut self) {
    for outcome in self.controller.poll() {
      self.handle_outcome(outcome);
    }
  }

  pub fn handle_outcome(&mut self, outcome: Outcome) {
    match outcome {
      Outcome::InfoLoaded(video) => {
        debug!(title = %video.title, "app: video info shown");
        self.focus = Focus::Video;
      }
      Outcome::Progress(_) => {}
      Outcome::Downloaded { saved_to } => {
        self.last_saved = saved_to;
        self.show_toast("Video downloaded successfully!", ToastKind::Success);
      }
      Outcome::Failed(message) => {
        self.show_toast(message, ToastKind::Error);
      }
    }
  }

  /// Submit the URL form.
  pub fn submit(&mut self) {
    if self.input.trim().is_empty() {
      self.show_toast("Please enter a valid URL", ToastKind::Warning);
      return;
    }
    info!(url = %self.input.trim(), "app: lookup requested");
    self.last_saved = None;
    self.controller.fetch_video_info(&self.input);
  }

  pub fn download(&mut self) {
    if self.controller.download_video() {
      self.last_saved = None;
    }
  }

  /// Clear the form and all request state.
  pub fn reset(&mut self) {
    self.input.clear();
    self.cursor_position = 0;
    self.input_scroll = 0;
    self.focus = Focus::Input;
    self.last_saved = None;
    self.controller.reset_state();
  }

  /// Whether the input text parses as an absolute URL.
  pub fn input_is_valid_url(&self) -> bool {
    is_valid_url(&self.input)
  }
}

pub fn is_valid_url(s: &str) -> bool {
  Url::parse(s.trim()).is_ok()
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::lifecycle::{Phase, SimulatorSettings};
  use crate::model::VideoMetadata;
  use std::sync::Arc;
  use std::time::Duration;

  pub(crate) fn test_app() -> App {
    // Nothing listens on the discard port; these tests never reach the network.
    let service = HttpService::new("http://127.0.0.1:9", std::env::temp_dir()).unwrap();
    App::new(Controller::new(Arc::new(service), SimulatorSettings::default()), false)
  }

  pub(crate) fn sample_video() -> Arc<VideoMetadata> {
    Arc::new(VideoMetadata {
      title: "Cat video".into(),
      thumbnail: "http://img/cat.png".into(),
      source_name: "Ex".into(),
      source_logo: "http://img/logo.png".into(),
      duration: Some("3:05".into()),
      views: Some("42 views".into()),
      description: None,
      url: "https://example.com/v1".into(),
    })
  }

  #[test]
  fn url_validity() {
    assert!(is_valid_url("https://example.com/v1"));
    assert!(is_valid_url("  https://example.com  "));
    assert!(!is_valid_url("example.com/v1"));
    assert!(!is_valid_url(""));
  }

  #[test]
  fn blank_submit_warns_without_fetching() {
    let mut app = test_app();
    app.input = "   ".into();
    app.submit();
    let toast = app.toast.as_ref().unwrap();
    assert_eq!(toast.kind, ToastKind::Warning);
    assert_eq!(toast.message, "Please enter a valid URL");
    assert!(!app.controller.is_busy());
  }

  #[test]
  fn failure_outcome_shows_error_toast() {
    let mut app = test_app();
    app.handle_outcome(Outcome::Failed("rate limited".into()));
    let toast = app.toast.as_ref().unwrap();
    assert_eq!(toast.kind, ToastKind::Error);
    assert_eq!(toast.message, "rate limited");
  }

  #[test]
  fn download_outcome_shows_success_and_remembers_path() {
    let mut app = test_app();
    app.handle_outcome(Outcome::Downloaded { saved_to: Some(PathBuf::from("/d/Cat video.mp4")) });
    assert_eq!(app.toast.as_ref().unwrap().message, "Video downloaded successfully!");
    assert_eq!(app.last_saved, Some(PathBuf::from("/d/Cat video.mp4")));
  }

  #[test]
  fn info_loaded_moves_focus_to_video() {
    let mut app = test_app();
    app.handle_outcome(Outcome::InfoLoaded(sample_video()));
    assert_eq!(app.focus, Focus::Video);
  }

  #[test]
  fn reset_clears_form_and_state() {
    let mut app = test_app();
    app.controller.force_phase(Phase::Ready { video: sample_video(), progress: 100.0 });
    app.input = "https://example.com/v1".into();
    app.cursor_position = 5;
    app.focus = Focus::Video;
    app.last_saved = Some(PathBuf::from("/x"));

    app.reset();
    assert!(app.input.is_empty());
    assert_eq!(app.cursor_position, 0);
    assert_eq!(app.focus, Focus::Input);
    assert!(app.last_saved.is_none());
    assert_eq!(app.controller.phase(), &Phase::Idle);
  }

  #[test]
  fn tick_expires_toast_and_splash() {
    let mut app = test_app();
    app.splash = Some(Splash::new(Instant::now()));
    app.show_toast("hi", ToastKind::Success);
    app.tick(Instant::now());
    assert!(app.toast.is_some());
    assert!(app.splash.is_some());

    app.tick(Instant::now() + Duration::from_secs(10));
    assert!(app.toast.is_none());
    assert!(app.splash.is_none());
  }
}
