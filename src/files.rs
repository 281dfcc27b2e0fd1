use std::path::{Path, PathBuf};

use crate::constants::constants;

/// Longest file stem we produce, in chars.
const MAX_STEM_CHARS: usize = 120;

/// Replace characters that are invalid in file names on common platforms.
pub fn sanitize_file_name(name: &str) -> String {
  let cleaned: String = name
    .chars()
    .map(|c| if c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') { '_' } else { c })
    .collect();
  let trimmed = cleaned.trim().trim_matches('.').trim();
  trimmed.chars().take(MAX_STEM_CHARS).collect::<String>().trim_end().to_string()
}

/// Extension of the last path segment of a server-relative URL, if it has one.
fn url_extension(download_url: &str) -> Option<&str> {
  let path = download_url.split(['?', '#']).next().unwrap_or_default();
  let segment = path.rsplit('/').next().unwrap_or_default();
  let (stem, ext) = segment.rsplit_once('.')?;
  if stem.is_empty() || ext.is_empty() || ext.len() > 5 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
    return None;
  }
  Some(ext)
}

/// File name for a saved download: the video title plus the server file's extension.
pub fn file_name_for(title: &str, download_url: &str) -> String {
  let mut stem = sanitize_file_name(title);
  if stem.is_empty() {
    stem = constants().fallback_file_name.clone();
  }
  match url_extension(download_url) {
    Some(ext) if !stem.to_lowercase().ends_with(&format!(".{}", ext.to_lowercase())) => format!("{}.{}", stem, ext),
    _ => stem,
  }
}

/// First path in `dir` for `name` that does not exist yet: `name`, `name (1)`, `name (2)`...
pub fn unique_path(dir: &Path, name: &str) -> PathBuf {
  let candidate = dir.join(name);
  if !candidate.exists() {
    return candidate;
  }
  let as_path = Path::new(name);
  let stem = as_path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
  let ext = as_path.extension().and_then(|s| s.to_str()).map(|e| format!(".{}", e)).unwrap_or_default();
  (1..)
    .map(|n| dir.join(format!("{} ({}){}", stem, n, ext)))
    .find(|p| !p.exists())
    .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sanitize_replaces_reserved_chars() {
    assert_eq!(sanitize_file_name("a/b\\c:d*e?f\"g<h>i|j"), "a_b_c_d_e_f_g_h_i_j");
    assert_eq!(sanitize_file_name("  ..Cat video..  "), "Cat video");
    assert_eq!(sanitize_file_name("tab\there"), "tab_here");
  }

  #[test]
  fn sanitize_truncates_long_titles() {
    let long = "x".repeat(500);
    assert_eq!(sanitize_file_name(&long).chars().count(), MAX_STEM_CHARS);
  }

  #[test]
  fn extension_taken_from_url_path() {
    assert_eq!(url_extension("/files/abc.mp4"), Some("mp4"));
    assert_eq!(url_extension("/files/abc.webm?token=1.2"), Some("webm"));
    assert_eq!(url_extension("/files/abc"), None);
    assert_eq!(url_extension("/files/.hidden"), None);
    assert_eq!(url_extension("/files.d/abc"), None);
  }

  #[test]
  fn file_name_combines_title_and_extension() {
    assert_eq!(file_name_for("Cat video", "/files/abc.mp4"), "Cat video.mp4");
    assert_eq!(file_name_for("clip.MP4", "/files/abc.mp4"), "clip.MP4");
    assert_eq!(file_name_for("", "/files/abc.mp4"), "video.mp4");
    assert_eq!(file_name_for("???", "/files/abc"), "___");
  }

  #[test]
  fn unique_path_skips_existing_files() {
    let dir = std::env::temp_dir().join(format!("vdp-files-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let first = unique_path(&dir, "clip.mp4");
    assert_eq!(first, dir.join("clip.mp4"));
    std::fs::write(&first, b"x").unwrap();
    let second = unique_path(&dir, "clip.mp4");
    assert_eq!(second, dir.join("clip (1).mp4"));
    std::fs::write(&second, b"x").unwrap();
    assert_eq!(unique_path(&dir, "clip.mp4"), dir.join("clip (2).mp4"));
    std::fs::remove_dir_all(&dir).unwrap();
  }
}
