//! Headless subcommands: the same controller driven from a plain terminal.

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use clap_complete::Shell;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::api::{VideoService, normalize_api_base};
use crate::config::{Config, config_path};
use crate::lifecycle::{Controller, Outcome};
use crate::model::VideoMetadata;

const BAR_WIDTH: usize = 30;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Print metadata for a video URL
  Info {
    url: String,
    /// Print JSON instead of a summary
    #[arg(long)]
    json: bool,
  },
  /// Fetch metadata for a video URL, then download it
  Download { url: String },
  /// Persist --api-base and --download-dir as defaults, then print the config
  Config,
  /// Print a shell completion script
  Completions { shell: Shell },
}

/// Drive a lookup to completion.
async fn lookup<S: VideoService>(controller: &mut Controller<S>, url: &str) -> Result<std::sync::Arc<VideoMetadata>> {
  if !controller.fetch_video_info(url) {
    bail!("Please enter a valid URL");
  }
  while controller.next_event().await.is_some() {}
  if let Some(error) = controller.phase().error() {
    bail!("{}", error);
  }
  controller.metadata().cloned().context("No video information returned")
}

pub async fn run_info<S: VideoService>(mut controller: Controller<S>, url: &str, json: bool) -> Result<()> {
  let video = lookup(&mut controller, url).await?;
  if json {
    println!("{}", serde_json::to_string_pretty(video.as_ref()).context("Failed to serialize metadata")?);
  } else {
    print!("{}", format_metadata(&video));
  }
  Ok(())
}

pub async fn run_download<S: VideoService>(mut controller: Controller<S>, url: &str) -> Result<()> {
  let video = lookup(&mut controller, url).await?;
  eprintln!("{} ({})", video.title, video.source_name);

  if !controller.download_video() {
    bail!("Download could not be started");
  }
  let mut stderr = std::io::stderr();
  write!(stderr, "\r{}", progress_line(0.0))?;
  stderr.flush()?;

  while let Some(outcome) = controller.next_event().await {
    match outcome {
      Outcome::Progress(value) => {
        write!(stderr, "\r{}", progress_line(value))?;
        stderr.flush()?;
      }
      Outcome::Downloaded { saved_to } => {
        writeln!(stderr)?;
        match saved_to {
          Some(path) => {
            info!(path = %path.display(), "cli: saved");
            println!("{}", path.display());
          }
          None => eprintln!("The backend accepted the download but returned no file link."),
        }
      }
      Outcome::Failed(message) => {
        writeln!(stderr)?;
        bail!("{}", message);
      }
      Outcome::InfoLoaded(_) => {}
    }
  }
  Ok(())
}

/// Apply the given overrides to the saved config and print the result.
/// Nothing is written when no override is given.
pub fn run_config(api_base: Option<&str>, download_dir: Option<&Path>) -> Result<()> {
  let mut config = Config::load();
  if api_base.is_none() && download_dir.is_none() {
    if let Some(path) = config_path() {
      println!("# {}", path.display());
    }
  } else {
    if let Some(base) = api_base {
      config.api_base = Some(normalize_api_base(base)?);
    }
    if let Some(dir) = download_dir {
      config.download_dir = Some(dir.to_path_buf());
    }
    let path = config.save()?;
    info!(path = %path.display(), "cli: config saved");
    println!("# {}", path.display());
  }
  print!("{}", toml::to_string(&config).context("Failed to serialize config")?);
  Ok(())
}

pub fn format_metadata(video: &VideoMetadata) -> String {
  let mut out = format!("{}\n", video.title);
  let mut field = |label: &str, value: &str| out.push_str(&format!("  {:<10}{}\n", label, value));
  field("Source", &video.source_name);
  if let Some(duration) = &video.duration {
    field("Duration", duration);
  }
  if let Some(views) = &video.views {
    field("Views", views);
  }
  field("URL", &video.url);
  field("Thumbnail", &video.thumbnail);
  if let Some(description) = &video.description {
    out.push_str(&format!("\n{}\n", description));
  }
  out
}

fn progress_line(progress: f64) -> String {
  let ratio = (progress / 100.0).clamp(0.0, 1.0);
  let filled = ((ratio * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
  format!("[{}{}] {:>3}%", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled), progress.round() as u16)
}
