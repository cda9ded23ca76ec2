//! Source-text gate applied before any provider call.

use serde::Serialize;

use crate::error::ValidationError;

/// Minimum trimmed length, in chars, accepted for generation.
pub const MIN_CONTENT_CHARS: usize = 100;
/// Maximum total length, in chars, accepted for generation.
pub const MAX_CONTENT_CHARS: usize = 10_000;

/// Check that `text` is long enough to learn from and short enough to send.
pub fn validate_content(text: &str) -> Result<(), ValidationError> {
  if text.trim().chars().count() < MIN_CONTENT_CHARS {
    return Err(ValidationError::TooShort);
  }
  if text.chars().count() > MAX_CONTENT_CHARS {
    return Err(ValidationError::TooLong);
  }
  Ok(())
}

/// Serializable form of a validation result for the HTTP surface.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ValidationOutcome {
  pub valid: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reason: Option<String>,
}

impl From<Result<(), ValidationError>> for ValidationOutcome {
  fn from(r: Result<(), ValidationError>) -> Self {
    match r {
      Ok(()) => Self { valid: true, reason: None },
      Err(e) => Self { valid: false, reason: Some(e.to_string()) },
    }
  }
}
