use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::constants;

/// Descriptive information about a video, resolved from a user-supplied URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
  pub title: String,
  pub thumbnail: String,
  pub source_name: String,
  pub source_logo: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration: Option<String>,
  /// Already formatted, e.g. `"42 views"`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub views: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  /// The URL the user submitted.
  pub url: String,
}

impl VideoMetadata {
  /// Map a `/video-info` response, filling placeholders for missing fields.
  pub fn from_response(response: VideoInfoResponse, url: &str) -> Self {
    let c = constants();
    let or = |v: Option<Value>, fallback: &str| text(v).unwrap_or_else(|| fallback.to_string());
    Self {
      title: or(response.title, &c.fallback_title),
      thumbnail: or(response.thumbnail, &c.fallback_thumbnail),
      source_name: or(response.source_name, &c.fallback_source_name),
      source_logo: or(response.source_logo, &c.fallback_source_logo),
      duration: text(response.duration),
      views: text(response.views).map(|v| format!("{} views", v)),
      description: text(response.description),
      url: url.to_string(),
    }
  }
}

/// Body of a successful `POST /video-info`. Every field is optional and loosely typed.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfoResponse {
  pub title: Option<Value>,
  pub thumbnail: Option<Value>,
  pub source_name: Option<Value>,
  pub source_logo: Option<Value>,
  pub duration: Option<Value>,
  pub views: Option<Value>,
  pub description: Option<Value>,
}

/// Body of a successful `POST /download`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
  pub download_url: Option<String>,
}

impl DownloadResponse {
  /// The server-relative file path, if one was returned.
  pub fn file_path(&self) -> Option<&str> {
    self.download_url.as_deref().map(str::trim).filter(|s| !s.is_empty())
  }
}

/// Body of a failed request.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
  pub error: Option<Value>,
}

impl ErrorBody {
  pub fn message(self) -> Option<String> {
    text(self.error)
  }
}

/// Request body shared by both endpoints.
#[derive(Debug, Serialize)]
pub struct UrlRequest<'a> {
  pub url: &'a str,
}

/// Render a loosely-typed JSON value as display text.
/// Absent, null, empty, zero and non-scalar values count as missing.
fn text(value: Option<Value>) -> Option<String> {
  match value? {
    Value::String(s) if !s.is_empty() => Some(s),
    Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
    _ => None,
  }
}
