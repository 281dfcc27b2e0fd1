use anyhow::{Context, Result};
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::normalize_api_base;
use crate::constants::constants;

const APP_NAME: &str = "vdp";
const CONFIG_FILE: &str = "prefs.toml";

/// Persisted user preferences (`<config dir>/prefs.toml`).
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub api_base: Option<String>,
  pub download_dir: Option<PathBuf>,
}

/// Effective settings after applying CLI overrides and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
  pub api_base: String,
  pub download_dir: PathBuf,
}

pub fn project_dirs() -> Option<ProjectDirs> {
  ProjectDirs::from("", "", APP_NAME)
}

pub fn config_path() -> Option<PathBuf> {
  project_dirs().map(|d| d.config_dir().join(CONFIG_FILE))
}

impl Config {
  pub fn load() -> Self {
    config_path().and_then(|path| Self::load_from(&path).ok()).unwrap_or_default()
  }

  pub fn load_from(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
  }

  /// Write to the default location and return the path written.
  pub fn save(&self) -> Result<PathBuf> {
    let path = config_path().context("Could not determine a config directory")?;
    self.save_to(&path)?;
    Ok(path)
  }

  pub fn save_to(&self, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
      std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let content = toml::to_string(self).context("Failed to serialize config")?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
  }

  /// Resolve effective settings. Precedence: CLI flag, then this file, then defaults.
  pub fn resolve(&self, api_base: Option<&str>, download_dir: Option<&Path>) -> Result<Settings> {
    let raw_base = api_base.or(self.api_base.as_deref()).unwrap_or(constants().default_api_base.as_str());
    let download_dir = download_dir
      .map(Path::to_path_buf)
      .or_else(|| self.download_dir.clone())
      .unwrap_or_else(default_download_dir);
    Ok(Settings { api_base: normalize_api_base(raw_base)?, download_dir })
  }
}

/// The user's Downloads folder, falling back to the working directory.
fn default_download_dir() -> PathBuf {
  UserDirs::new()
    .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
    .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trips_through_toml() {
    let path = std::env::temp_dir().join(format!("vdp-config-{}", std::process::id())).join(CONFIG_FILE);
    let config =
      Config { api_base: Some("https://backend.example".into()), download_dir: Some(PathBuf::from("/tmp/videos")) };
    config.save_to(&path).unwrap();
    assert_eq!(Config::load_from(&path).unwrap(), config);
    std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
  }

  #[test]
  fn missing_fields_parse_as_none() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config, Config::default());
    let config: Config = toml::from_str("api_base = \"http://h:1\"").unwrap();
    assert_eq!(config.api_base.as_deref(), Some("http://h:1"));
    assert!(config.download_dir.is_none());
  }

  #[test]
  fn cli_overrides_file_overrides_default() {
    let file = Config { api_base: Some("http://file.example/".into()), download_dir: Some(PathBuf::from("/file")) };

    let s = file.resolve(Some("http://cli.example"), Some(Path::new("/cli"))).unwrap();
    assert_eq!(s, Settings { api_base: "http://cli.example".into(), download_dir: PathBuf::from("/cli") });

    let s = file.resolve(None, None).unwrap();
    assert_eq!(s, Settings { api_base: "http://file.example".into(), download_dir: PathBuf::from("/file") });

    let s = Config::default().resolve(None, None).unwrap();
    assert_eq!(s.api_base, "http://127.0.0.1:8000");
  }

  #[test]
  fn invalid_api_base_is_rejected() {
    assert!(Config::default().resolve(Some("nope"), None).is_err());
  }
}
