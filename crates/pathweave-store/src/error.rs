use thiserror::Error;

/// Errors returned by a workflow store.
#[derive(Debug, Error)]
pub enum StoreError {
  /// The HTTP request could not be sent or its body could not be read.
  #[error("http request failed: {0}")]
  Http(#[from] reqwest::Error),

  /// The service answered with a non-success status.
  #[error("store returned status {status}: {body}")]
  Status { status: u16, body: String },

  /// The configured base URL is invalid.
  #[error("invalid store url: {0}")]
  Url(#[from] url::ParseError),

  /// A referenced record does not exist.
  #[error("{kind} {id} not found")]
  NotFound { kind: &'static str, id: i64 },

  /// The request would break the graph's structure.
  #[error("request rejected: {message}")]
  Rejected { message: String },

  /// The store could not be reached.
  #[error("store unavailable: {message}")]
  Unavailable { message: String },
}

impl StoreError {
  pub(crate) fn not_found(kind: &'static str, id: impl Into<i64>) -> Self {
    Self::NotFound {
      kind,
      id: id.into(),
    }
  }

  pub(crate) fn rejected(message: impl Into<String>) -> Self {
    Self::Rejected {
      message: message.into(),
    }
  }
}
