//! Structured error taxonomy for remote operations.
//!
//! Errors are classified exactly once, at the gateway boundary, from the HTTP
//! status and the server's JSON error body. Everything downstream (cache,
//! session, views) matches on [`ErrorKind`] and never inspects message text.

use std::fmt;

use thiserror::Error;

/// Classification of a failed remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Credentials rejected at login
  Authentication,
  /// The credential itself is missing, expired or revoked (401-class)
  Unauthorized,
  /// Authenticated, but lacking the capability for this route
  Forbidden,
  /// Payload rejected, either client-side or by server-side constraints
  Validation,
  /// The addressed item no longer exists
  NotFound,
  /// Transport failure, no response received
  Network,
  /// Unexpected failure
  Server,
}

impl ErrorKind {
  pub fn label(self) -> &'static str {
    match self {
      ErrorKind::Authentication => "authentication failed",
      ErrorKind::Unauthorized => "session expired",
      ErrorKind::Forbidden => "not allowed",
      ErrorKind::Validation => "invalid input",
      ErrorKind::NotFound => "not found",
      ErrorKind::Network => "network error",
      ErrorKind::Server => "server error",
    }
  }
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// A classified remote (or client-side validation) failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
  pub kind: ErrorKind,
  /// Offending input field for validation failures
  pub field: Option<String>,
  pub message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
  pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
    Self {
      kind,
      field: None,
      message: message.into(),
    }
  }

  pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      kind: ErrorKind::Validation,
      field: Some(field.into()),
      message: message.into(),
    }
  }

  pub fn authentication(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::Authentication, message)
  }

  pub fn unauthorized(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::Unauthorized, message)
  }

  pub fn forbidden(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::Forbidden, message)
  }

  pub fn not_found(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::NotFound, message)
  }

  pub fn network(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::Network, message)
  }

  pub fn server(message: impl Into<String>) -> Self {
    Self::new(ErrorKind::Server, message)
  }

  /// True for failures that signal the credential is no longer valid.
  pub fn is_unauthorized(&self) -> bool {
    self.kind == ErrorKind::Unauthorized
  }

  /// Transient failures worth one more attempt on reads.
  pub fn is_retryable(&self) -> bool {
    matches!(self.kind, ErrorKind::Network | ErrorKind::Server)
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      ApiError::server(format!("failed to parse response: {}", err))
    } else {
      ApiError::network(err.to_string())
    }
  }
}
