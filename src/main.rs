mod api;
mod app;
mod cli;
mod config;
mod constants;
mod error;
mod files;
mod input;
mod lifecycle;
mod model;
mod splash;
mod toast;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use api::HttpService;
use app::App;
use cli::Command;
use config::Config;
use lifecycle::{Controller, SimulatorSettings};

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Video URL to look up on startup
  url: Option<String>,

  /// Backend base URL (default: saved config, then http://127.0.0.1:8000)
  #[arg(long, global = true)]
  api_base: Option<String>,

  /// Directory downloaded files are saved to (default: saved config, then ~/Downloads)
  #[arg(long, global = true)]
  download_dir: Option<PathBuf>,

  /// Skip the startup splash screen
  #[arg(long)]
  no_splash: bool,

  #[command(subcommand)]
  command: Option<Command>,
}

// --- Logging ---

/// Log to `<data dir>/vdp.log`; the terminal belongs to the UI.
/// The filter comes from `VDP_LOG` (default `info`).
fn init_logging() -> Option<WorkerGuard> {
  let dir = config::project_dirs().map(|d| d.data_local_dir().to_path_buf()).unwrap_or_else(std::env::temp_dir);
  std::fs::create_dir_all(&dir).ok()?;
  let appender = RollingFileAppender::builder()
    .rotation(Rotation::NEVER)
    .filename_prefix("vdp")
    .filename_suffix("log")
    .build(&dir)
    .ok()?;
  let (writer, guard) = tracing_appender::non_blocking(appender);
  let filter = EnvFilter::try_from_env("VDP_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).try_init().ok()?;
  Some(guard)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let _log_guard = init_logging();

  let url = match args.command {
    Some(Command::Completions { shell }) => {
      clap_complete::generate(shell, &mut Args::command(), env!("CARGO_PKG_NAME"), &mut std::io::stdout());
      return Ok(());
    }
    Some(Command::Config) => return cli::run_config(args.api_base.as_deref(), args.download_dir.as_deref()),
    Some(Command::Info { url, json }) => {
      return cli::run_info(controller(args.api_base.as_deref(), args.download_dir.as_deref())?, &url, json).await;
    }
    Some(Command::Download { url }) => {
      return cli::run_download(controller(args.api_base.as_deref(), args.download_dir.as_deref())?, &url).await;
    }
    None => args.url,
  };

  let mut app = App::new(controller(args.api_base.as_deref(), args.download_dir.as_deref())?, !args.no_splash);
  if let Some(url) = url {
    app.start_with(&url);
  }

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, app).await;
  ratatui::restore();
  result
}

fn controller(api_base: Option<&str>, download_dir: Option<&Path>) -> Result<Controller<HttpService>> {
  let settings = Config::load().resolve(api_base, download_dir)?;
  info!(api_base = %settings.api_base, download_dir = %settings.download_dir.display(), "main: settings resolved");
  let service = HttpService::new(&settings.api_base, settings.download_dir)?;
  Ok(Controller::new(Arc::new(service), SimulatorSettings::default()))
}

async fn run(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
  loop {
    app.check_pending();
    app.tick(Instant::now());

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    // Short poll keeps the splash and progress animations smooth.
    if event::poll(Duration::from_millis(50))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(&mut app, key);
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }
  info!("main: exiting");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cli_definition_is_valid() {
    Args::command().debug_assert();
  }

  #[test]
  fn bare_url_starts_the_ui() {
    let args = Args::try_parse_from(["vdp", "https://example.com/v1", "--no-splash"]).unwrap();
    assert_eq!(args.url.as_deref(), Some("https://example.com/v1"));
    assert!(args.no_splash);
    assert!(args.command.is_none());
  }

  #[test]
  fn subcommands_accept_global_flags() {
    let args = Args::try_parse_from(["vdp", "info", "https://example.com/v1", "--json", "--api-base", "http://h:1"])
      .unwrap();
    assert_eq!(args.api_base.as_deref(), Some("http://h:1"));
    match args.command {
      Some(Command::Info { url, json }) => {
        assert_eq!(url, "https://example.com/v1");
        assert!(json);
      }
      other => panic!("unexpected command: {:?}", other),
    }
  }

  #[test]
  fn config_subcommand_reads_global_overrides() {
    let args = Args::try_parse_from(["vdp", "config", "--download-dir", "/tmp/v"]).unwrap();
    assert!(matches!(args.command, Some(Command::Config)));
    assert_eq!(args.download_dir, Some(PathBuf::from("/tmp/v")));
  }
}
