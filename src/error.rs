use thiserror::Error;

/// Failure of a backend request. `Display` is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
  /// Non-2xx response. `message` is the body's `error` field when present,
  /// otherwise a status-derived message.
  #[error("{message}")]
  RequestFailed { status: u16, message: String },

  /// Network, timeout or decode failure.
  #[error("{0}")]
  TransportFailed(String),

  /// The downloaded file could not be written locally.
  #[error("{0}")]
  SaveFailed(String),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_is_the_bare_message() {
    let err = RequestError::RequestFailed { status: 500, message: "rate limited".into() };
    assert_eq!(err.to_string(), "rate limited");
    assert_eq!(RequestError::TransportFailed("Download failed".into()).to_string(), "Download failed");
    assert_eq!(RequestError::SaveFailed("disk full".into()).to_string(), "disk full");
  }
}
