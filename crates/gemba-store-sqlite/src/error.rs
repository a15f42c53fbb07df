//! Error type for `gemba-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Domain error from the taxonomy (validation, duplicates, structural
  /// guards, not-found).
  #[error(transparent)]
  Core(#[from] gemba_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("decode error: {0}")]
  Decode(String),
}

/// Collapse into the core taxonomy; backend-only failures become opaque
/// storage errors so transport layers can map statuses off one type.
impl From<Error> for gemba_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Core(e) => e,
      other => gemba_core::Error::Storage(other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
