//! The single error value surfaced by every remote call.

use serde::Deserialize;

/// Failure of a remote call, normalized to a human-readable message.
///
/// The variants only exist for logging; consumers render `message()` and never
/// branch on the kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
  /// The request never produced a response (connect, timeout, TLS)
  #[error("network error: {0}")]
  Transport(String),
  /// The service answered with a non-success status
  #[error("server returned {status}: {message}")]
  Status { status: u16, message: String },
  /// The response body did not have the expected shape
  #[error("unexpected response: {0}")]
  Decode(String),
}

impl ApiError {
  /// Human-readable description for the presentation surface.
  pub fn message(&self) -> String {
    self.to_string()
  }

  /// Build a status error from a response body, preferring FastAPI's `detail`.
  pub fn from_status(status: u16, body: &str) -> Self {
    #[derive(Deserialize)]
    struct ErrorBody {
      detail: serde_json::Value,
    }

    let message = match serde_json::from_str::<ErrorBody>(body) {
      Ok(ErrorBody {
        detail: serde_json::Value::String(detail),
      }) => detail,
      Ok(ErrorBody { detail }) => detail.to_string(),
      Err(_) if body.trim().is_empty() => "no response body".to_string(),
      Err(_) => body.trim().to_string(),
    };

    ApiError::Status { status, message }
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      ApiError::Decode(err.to_string())
    } else if let Some(status) = err.status() {
      ApiError::Status {
        status: status.as_u16(),
        message: err.to_string(),
      }
    } else {
      ApiError::Transport(err.to_string())
    }
  }
}
