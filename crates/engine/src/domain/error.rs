// crates/engine/src/domain/error.rs
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrustError {
  #[error("configuration: {0}")]
  Config(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  OpenSsl(#[from] openssl::error::ErrorStack),

  #[error("feature not enabled: {0}")]
  Feature(&'static str),

  #[error("network: {message}")]
  Network { message: String },

  #[error("trust server did not answer within {0:?}")]
  Timeout(Duration),

  #[error("no pinning manifest available")]
  ManifestUnavailable,

  #[error("signed envelope rejected: {0}")]
  Envelope(String),

  #[error("manifest schema violation: {0}")]
  Manifest(String),

  #[error("stale manifest: timestamp {timestamp} is too far from now ({now})")]
  StaleManifest { timestamp: f64, now: u64 },

  #[error("manifest customer mismatch: expected {expected:?}, found {found:?}")]
  CustomerMismatch { expected: String, found: String },

  #[error("host not pinned in manifest: {0}")]
  HostNotPinned(String),

  // Raised when the blocking fetch bridge loses its worker thread.
  #[error("internal panic: {0}")]
  Panic(String),
}

impl TrustError {
  /// Whether this failure means the cached manifest can no longer be trusted.
  pub fn is_integrity_failure(&self) -> bool {
    matches!(
      self,
      TrustError::Envelope(_)
        | TrustError::Manifest(_)
        | TrustError::StaleManifest { .. }
        | TrustError::CustomerMismatch { .. }
    )
  }
}

pub type TrustResult<T> = Result<T, TrustError>;
