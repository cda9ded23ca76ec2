//! Error taxonomy for validation, provider calls and artifact generation.

use thiserror::Error;

/// Source text rejected before any network call.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
  #[error("Content too short for meaningful generation")]
  TooShort,
  #[error("Content too long - provide a focused excerpt")]
  TooLong,
}

/// A live provider call failed. Recovered by substituting the mock reply.
#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("provider HTTP {status}: {message}")]
  Status { status: u16, message: String },
  #[error("unexpected provider response body: {0}")]
  MalformedBody(String),
  #[error("provider returned an empty completion")]
  EmptyCompletion,
}

/// Failure of one generation request, surfaced to the caller.
#[derive(Debug, Error)]
pub enum GenerationError {
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error("invalid JSON response from AI: {0}")]
  InvalidJson(String),
  #[error("{agent}: missing or malformed field in generated {artifact}: {detail}")]
  Schema { agent: &'static str, artifact: &'static str, detail: String },
  #[error("{agent}: invalid {unit} count in generated {artifact} (expected {expected}, got {actual})")]
  CountMismatch {
    agent: &'static str,
    unit: &'static str,
    artifact: &'static str,
    expected: usize,
    actual: usize,
  },
  #[error("{agent}: unusable reply: {detail}")]
  UnusableReply { agent: &'static str, detail: String },
  #[error("invalid options: {0}")]
  InvalidOptions(String),
  #[error("Material not found: {0}")]
  MaterialNotFound(String),
  #[error("material {id} could not be read: {reason}")]
  MaterialUnreadable { id: String, reason: String },
}

impl GenerationError {
  /// True for errors caused by the request itself rather than by generation.
  pub fn is_client_error(&self) -> bool {
    matches!(
      self,
      GenerationError::Validation(_) | GenerationError::InvalidOptions(_) | GenerationError::MaterialNotFound(_)
    )
  }
}
