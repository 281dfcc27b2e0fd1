use anyhow::{Context, Result, anyhow};
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::constants::constants;
use crate::error::RequestError;
use crate::files::{file_name_for, unique_path};
use crate::model::{DownloadResponse, ErrorBody, UrlRequest, VideoInfoResponse};

/// The remote backend that resolves video info and produces downloadable files.
pub trait VideoService: Send + Sync + 'static {
  /// `POST /video-info` with `{url}`.
  fn video_info(&self, url: &str) -> impl Future<Output = Result<VideoInfoResponse, RequestError>> + Send;

  /// `POST /download` with `{url}`.
  fn request_download(&self, url: &str) -> impl Future<Output = Result<DownloadResponse, RequestError>> + Send;

  /// Fetch `{apiBase}{download_url}` and store it locally, named after `title`.
  fn save_file(&self, download_url: &str, title: &str) -> impl Future<Output = Result<PathBuf, RequestError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
  VideoInfo,
  Download,
}

impl Endpoint {
  fn path(self) -> &'static str {
    match self {
      Endpoint::VideoInfo => "/video-info",
      Endpoint::Download => "/download",
    }
  }

  fn status_message(self, reason: &str) -> String {
    match self {
      Endpoint::VideoInfo => format!("Failed to fetch video info: {}", reason),
      Endpoint::Download => format!("Download failed: {}", reason),
    }
  }

  fn transport_message(self) -> &'static str {
    match self {
      Endpoint::VideoInfo => "Failed to fetch video information",
      Endpoint::Download => "Download failed",
    }
  }
}

fn status_reason(status: StatusCode) -> String {
  status.canonical_reason().map(str::to_string).unwrap_or_else(|| status.as_str().to_string())
}

/// Trim trailing slashes and check that the base is an absolute http(s) URL.
pub fn normalize_api_base(raw: &str) -> Result<String> {
  let trimmed = raw.trim().trim_end_matches('/');
  let parsed = Url::parse(trimmed).with_context(|| format!("Invalid API base URL: {}", raw))?;
  if !matches!(parsed.scheme(), "http" | "https") {
    return Err(anyhow!("API base must be http or https: {}", raw));
  }
  Ok(trimmed.to_string())
}

/// `VideoService` over HTTP.
pub struct HttpService {
  client: Client,
  api_base: String,
  download_dir: PathBuf,
}

impl HttpService {
  pub fn new(api_base: &str, download_dir: PathBuf) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(constants().request_timeout_secs))
      .user_agent(concat!("vdp/", env!("CARGO_PKG_VERSION")))
      .build()
      .context("Failed to build HTTP client")?;
    Ok(Self { client, api_base: normalize_api_base(api_base)?, download_dir })
  }

  pub fn api_base(&self) -> &str {
    &self.api_base
  }

  pub fn download_dir(&self) -> &std::path::Path {
    &self.download_dir
  }

  async fn post_json<T: DeserializeOwned>(&self, endpoint: Endpoint, url: &str) -> Result<T, RequestError> {
    let target = format!("{}{}", self.api_base, endpoint.path());
    debug!(target = %target, url = %url, "api: POST");

    let response = self.client.post(&target).json(&UrlRequest { url }).send().await.map_err(|e| {
      warn!(err = %e, target = %target, "api: request failed to send");
      RequestError::TransportFailed(endpoint.transport_message().to_string())
    })?;

    let status = response.status();
    if !status.is_success() {
      let message = error_message(response).await.unwrap_or_else(|| endpoint.status_message(&status_reason(status)));
      warn!(status = status.as_u16(), err = %message, target = %target, "api: request rejected");
      return Err(RequestError::RequestFailed { status: status.as_u16(), message });
    }

    response.json::<T>().await.map_err(|e| {
      warn!(err = %e, target = %target, "api: undecodable response body");
      RequestError::TransportFailed(endpoint.transport_message().to_string())
    })
  }
}

/// An in-progress `.part` download. Removed on drop unless it was renamed into
/// place, which covers error returns and an aborted save task alike.
struct PartFile {
  path: PathBuf,
  kept: bool,
}

impl Drop for PartFile {
  fn drop(&mut self) {
    if !self.kept
      && let Err(e) = std::fs::remove_file(&self.path)
      && e.kind() != std::io::ErrorKind::NotFound
    {
      warn!(err = %e, path = %self.path.display(), "api: could not remove partial file");
    }
  }
}

/// The `error` field of a failed response's JSON body, if any.
async fn error_message(response: Response) -> Option<String> {
  let body = response.text().await.ok()?;
  serde_json::from_str::<ErrorBody>(&body).ok()?.message()
}

impl VideoService for HttpService {
  async fn video_info(&self, url: &str) -> Result<VideoInfoResponse, RequestError> {
    self.post_json(Endpoint::VideoInfo, url).await
  }

  async fn request_download(&self, url: &str) -> Result<DownloadResponse, RequestError> {
    self.post_json(Endpoint::Download, url).await
  }

  async fn save_file(&self, download_url: &str, title: &str) -> Result<PathBuf, RequestError> {
    let href = format!("{}{}", self.api_base, download_url);
    info!(href = %href, "api: saving file");

    let transport = |e: reqwest::Error| {
      warn!(err = %e, "api: file transfer failed");
      RequestError::TransportFailed(Endpoint::Download.transport_message().to_string())
    };
    let save = |e: std::io::Error| {
      warn!(err = %e, "api: file write failed");
      RequestError::SaveFailed(format!("Could not save file: {}", e))
    };

    let response = self.client.get(&href).send().await.map_err(transport)?;
    let status = response.status();
    if !status.is_success() {
      return Err(RequestError::RequestFailed {
        status: status.as_u16(),
        message: Endpoint::Download.status_message(&status_reason(status)),
      });
    }

    tokio::fs::create_dir_all(&self.download_dir).await.map_err(save)?;
    let final_path = unique_path(&self.download_dir, &file_name_for(title, download_url));
    let mut part_name = final_path.file_name().unwrap_or_default().to_os_string();
    part_name.push(".part");
    let tmp_path = final_path.with_file_name(part_name);

    let mut part = PartFile { path: tmp_path, kept: false };
    let mut file = tokio::fs::File::create(&part.path).await.map_err(save)?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
      let chunk = chunk.map_err(transport)?;
      file.write_all(&chunk).await.map_err(save)?;
      written += chunk.len() as u64;
    }
    file.flush().await.map_err(save)?;
    drop(file);

    tokio::fs::rename(&part.path, &final_path).await.map_err(save)?;
    part.kept = true;
    info!(path = %final_path.display(), bytes = written, "api: file saved");
    Ok(final_path)
  }
}
