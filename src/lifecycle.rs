//! Request lifecycle: fetch metadata, download, reset.
//!
//! The controller is owned by a single task (the UI loop or a CLI command) and
//! mutated through `&mut self`. Each operation spawns one worker task that reports
//! back over a channel; every report carries the generation it was started under,
//! so results from superseded or reset operations are dropped on arrival.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, info, warn};

use crate::api::VideoService;
use crate::constants::constants;
use crate::error::RequestError;
use crate::model::{DownloadResponse, VideoInfoResponse, VideoMetadata};

/// Shown when a worker task ends without reporting (panic).
const TASK_FAILED: &str = "Request task failed.";

// --- Progress simulator ---

#[derive(Debug, Clone, Copy)]
pub struct SimulatorSettings {
  pub tick: Duration,
  pub cap: f64,
  pub max_step: f64,
}

impl Default for SimulatorSettings {
  fn default() -> Self {
    let c = constants();
    Self { tick: c.progress_tick(), cap: c.progress_cap, max_step: c.progress_max_step }
  }
}

/// Fabricates a plausible, increasing percentage while the backend works.
/// Never exceeds `cap`; the real completion is signalled separately.
pub struct ProgressSimulator {
  value: f64,
  cap: f64,
  max_step: f64,
  rng: StdRng,
}

impl ProgressSimulator {
  pub fn new(settings: &SimulatorSettings) -> Self {
    Self::with_rng(settings, StdRng::from_entropy())
  }

  fn with_rng(settings: &SimulatorSettings, rng: StdRng) -> Self {
    Self { value: 0.0, cap: settings.cap, max_step: settings.max_step, rng }
  }

  /// Advance one tick. Returns the new value, or `None` once the cap is reached.
  pub fn advance(&mut self) -> Option<f64> {
    if self.value >= self.cap {
      return None;
    }
    let step = if self.max_step > 0.0 { self.rng.gen_range(0.0..self.max_step) } else { 0.0 };
    self.value = (self.value + step).min(self.cap);
    Some(self.value)
  }
}

// --- State ---

/// Lifecycle state. Each variant carries exactly what is meaningful in it.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
  Idle,
  /// Metadata request in flight. `previous` stays visible until it resolves.
  Fetching { previous: Option<Arc<VideoMetadata>> },
  /// Metadata loaded. `progress` is 0, or 100 after a successful download.
  Ready { video: Arc<VideoMetadata>, progress: f64 },
  Downloading { video: Arc<VideoMetadata>, progress: f64 },
  Failed { video: Option<Arc<VideoMetadata>>, error: String },
}

impl Phase {
  pub fn metadata(&self) -> Option<&Arc<VideoMetadata>> {
    match self {
      Phase::Idle => None,
      Phase::Fetching { previous } => previous.as_ref(),
      Phase::Ready { video, .. } | Phase::Downloading { video, .. } => Some(video),
      Phase::Failed { video, .. } => video.as_ref(),
    }
  }

  pub fn is_loading(&self) -> bool {
    matches!(self, Phase::Fetching { .. })
  }

  pub fn is_downloading(&self) -> bool {
    matches!(self, Phase::Downloading { .. })
  }

  pub fn is_busy(&self) -> bool {
    self.is_loading() || self.is_downloading()
  }

  pub fn progress(&self) -> f64 {
    match self {
      Phase::Ready { progress, .. } | Phase::Downloading { progress, .. } => *progress,
      _ => 0.0,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      Phase::Failed { error, .. } => Some(error),
      _ => None,
    }
  }

  /// The video a download can start from, if any.
  fn downloadable(&self) -> Option<&Arc<VideoMetadata>> {
    match self {
      Phase::Ready { video, .. } | Phase::Failed { video: Some(video), .. } => Some(video),
      _ => None,
    }
  }
}

/// Flat view of the lifecycle state, as rendering code reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
  pub metadata: Option<Arc<VideoMetadata>>,
  pub is_loading: bool,
  pub is_downloading: bool,
  pub progress: f64,
  pub error: Option<String>,
}

/// Something the caller may want to announce.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
  InfoLoaded(Arc<VideoMetadata>),
  Progress(f64),
  Downloaded { saved_to: Option<PathBuf> },
  Failed(String),
}

// --- Worker reports ---

#[derive(Debug)]
enum Update {
  InfoFetched { url: String, result: Result<VideoInfoResponse, RequestError> },
  Progress(f64),
  DownloadResolved,
  DownloadFinished(Result<Option<PathBuf>, RequestError>),
  /// The worker was dropped before finishing.
  Abandoned,
}

#[derive(Debug)]
struct Tagged {
  generation: u64,
  update: Update,
}

/// Worker-side sender. Reports `Abandoned` on drop unless `finish` was called,
/// so a panicking or aborted worker still ends its operation.
struct Reporter {
  tx: mpsc::UnboundedSender<Tagged>,
  generation: u64,
  finished: bool,
}

impl Reporter {
  fn send(&self, update: Update) {
    let _ = self.tx.send(Tagged { generation: self.generation, update });
  }

  fn finish(mut self, update: Update) {
    self.finished = true;
    self.send(update);
  }
}

impl Drop for Reporter {
  fn drop(&mut self) {
    if !self.finished {
      self.send(Update::Abandoned);
    }
  }
}

// --- Controller ---

pub struct Controller<S: VideoService> {
  service: Arc<S>,
  settings: SimulatorSettings,
  phase: Phase,
  generation: u64,
  tx: mpsc::UnboundedSender<Tagged>,
  rx: mpsc::UnboundedReceiver<Tagged>,
  task: Option<JoinHandle<()>>,
}

impl<S: VideoService> Controller<S> {
  pub fn new(service: Arc<S>, settings: SimulatorSettings) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self { service, settings, phase: Phase::Idle, generation: 0, tx, rx, task: None }
  }

  pub fn service(&self) -> &S {
    &self.service
  }

  pub fn phase(&self) -> &Phase {
    &self.phase
  }

  pub fn metadata(&self) -> Option<&Arc<VideoMetadata>> {
    self.phase.metadata()
  }

  pub fn is_busy(&self) -> bool {
    self.phase.is_busy()
  }

  pub fn snapshot(&self) -> Snapshot {
    Snapshot {
      metadata: self.phase.metadata().cloned(),
      is_loading: self.phase.is_loading(),
      is_downloading: self.phase.is_downloading(),
      progress: self.phase.progress(),
      error: self.phase.error().map(str::to_string),
    }
  }

  #[cfg(test)]
  pub(crate) fn force_phase(&mut self, phase: Phase) {
    self.phase = phase;
  }

  fn reporter(&self, generation: u64) -> Reporter {
    Reporter { tx: self.tx.clone(), generation, finished: false }
  }

  /// Abort the in-flight worker, if any, and start a new generation.
  fn next_generation(&mut self) -> u64 {
    if let Some(handle) = self.task.take() {
      handle.abort();
    }
    self.generation += 1;
    self.generation
  }

  /// Resolve `url` into metadata. Blank input is ignored and returns `false`.
  /// Supersedes any operation still in flight.
  pub fn fetch_video_info(&mut self, url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() {
      return false;
    }
    let generation = self.next_generation();
    let previous = self.phase.metadata().cloned();
    self.phase = Phase::Fetching { previous };
    info!(url = %url, generation, "lifecycle: fetching video info");

    let service = Arc::clone(&self.service);
    let reporter = self.reporter(generation);
    let url = url.to_string();
    self.task = Some(tokio::spawn(async move {
      let result = service.video_info(&url).await;
      reporter.finish(Update::InfoFetched { url, result });
    }));
    true
  }

  /// Ask the backend for a file of the current video and save it.
  /// Returns `false` without doing anything when there is no metadata or
  /// another operation is in flight.
  pub fn download_video(&mut self) -> bool {
    let Some(video) = self.phase.downloadable().cloned() else {
      debug!(phase = ?self.phase, "lifecycle: download ignored");
      return false;
    };
    let generation = self.next_generation();
    self.phase = Phase::Downloading { video: Arc::clone(&video), progress: 0.0 };
    info!(url = %video.url, generation, "lifecycle: download started");

    let service = Arc::clone(&self.service);
    let reporter = self.reporter(generation);
    let simulator = ProgressSimulator::new(&self.settings);
    let tick = self.settings.tick;
    self.task = Some(tokio::spawn(run_download(service, video, simulator, tick, reporter)));
    true
  }

  /// Return to the initial empty state. In-flight work is aborted and any
  /// result it already queued is ignored.
  pub fn reset_state(&mut self) {
    self.next_generation();
    self.phase = Phase::Idle;
    info!(generation = self.generation, "lifecycle: reset");
  }

  /// Apply every queued worker report without waiting.
  pub fn poll(&mut self) -> Vec<Outcome> {
    let mut outcomes = Vec::new();
    while let Ok(tagged) = self.rx.try_recv() {
      if let Some(outcome) = self.apply(tagged) {
        outcomes.push(outcome);
      }
    }
    outcomes
  }

  /// Wait for the next report that changes state. `None` once nothing is in flight.
  pub async fn next_event(&mut self) -> Option<Outcome> {
    while self.phase.is_busy() {
      let tagged = self.rx.recv().await?;
      if let Some(outcome) = self.apply(tagged) {
        return Some(outcome);
      }
    }
    None
  }

  fn apply(&mut self, tagged: Tagged) -> Option<Outcome> {
    if tagged.generation != self.generation {
      debug!(stale = tagged.generation, current = self.generation, "lifecycle: discarding stale update");
      return None;
    }

    let cap = self.settings.cap;
    let phase = std::mem::replace(&mut self.phase, Phase::Idle);
    let (next, outcome) = match (tagged.update, phase) {
      (Update::InfoFetched { url, result: Ok(response) }, Phase::Fetching { .. }) => {
        let video = Arc::new(VideoMetadata::from_response(response, &url));
        info!(title = %video.title, "lifecycle: video info loaded");
        (Phase::Ready { video: Arc::clone(&video), progress: 0.0 }, Some(Outcome::InfoLoaded(video)))
      }
      (Update::InfoFetched { result: Err(e), .. }, Phase::Fetching { previous }) => {
        let error = e.to_string();
        warn!(err = %error, "lifecycle: video info failed");
        (Phase::Failed { video: previous, error: error.clone() }, Some(Outcome::Failed(error)))
      }
      (Update::Progress(value), Phase::Downloading { video, progress }) => {
        let next = progress.max(value.min(cap));
        let outcome = (next > progress).then_some(Outcome::Progress(next));
        (Phase::Downloading { video, progress: next }, outcome)
      }
      (Update::DownloadResolved, Phase::Downloading { video, .. }) => {
        (Phase::Downloading { video, progress: 100.0 }, Some(Outcome::Progress(100.0)))
      }
      (Update::DownloadFinished(Ok(saved_to)), Phase::Downloading { video, .. }) => {
        info!(saved_to = ?saved_to, "lifecycle: download complete");
        (Phase::Ready { video, progress: 100.0 }, Some(Outcome::Downloaded { saved_to }))
      }
      (Update::DownloadFinished(Err(e)), Phase::Downloading { video, .. }) => {
        let error = e.to_string();
        warn!(err = %error, "lifecycle: download failed");
        (Phase::Failed { video: Some(video), error: error.clone() }, Some(Outcome::Failed(error)))
      }
      (Update::Abandoned, phase) if phase.is_busy() => {
        warn!("lifecycle: worker ended without reporting");
        let video = phase.metadata().cloned();
        (Phase::Failed { video, error: TASK_FAILED.to_string() }, Some(Outcome::Failed(TASK_FAILED.to_string())))
      }
      (update, phase) => {
        debug!(update = ?update, phase = ?phase, "lifecycle: update does not apply");
        (phase, None)
      }
    };

    self.phase = next;
    if !self.phase.is_busy() {
      self.task = None;
    }
    outcome
  }
}

impl<S: VideoService> Drop for Controller<S> {
  fn drop(&mut self) {
    if let Some(handle) = self.task.take() {
      handle.abort();
    }
  }
}

/// Download worker. The ticker lives only inside the request loop, so it stops
/// on every exit path: resolution, failure, or abort of the task.
async fn run_download<S: VideoService>(
  service: Arc<S>,
  video: Arc<VideoMetadata>,
  mut simulator: ProgressSimulator,
  tick: Duration,
  reporter: Reporter,
) {
  let result: Result<DownloadResponse, RequestError> = {
    let request = service.request_download(&video.url);
    tokio::pin!(request);
    let mut ticker = interval_at(Instant::now() + tick, tick);
    loop {
      tokio::select! {
        biased;
        result = &mut request => break result,
        _ = ticker.tick() => {
          if let Some(value) = simulator.advance() {
            reporter.send(Update::Progress(value));
          }
        }
      }
    }
  };

  let response = match result {
    Ok(response) => response,
    Err(e) => {
      reporter.finish(Update::DownloadFinished(Err(e)));
      return;
    }
  };
  reporter.send(Update::DownloadResolved);

  let saved = match response.file_path() {
    Some(path) => service.save_file(path, &video.title).await.map(Some),
    None => Ok(None),
  };
  reporter.finish(Update::DownloadFinished(saved));
}
