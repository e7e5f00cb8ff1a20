//! Error types for `onboard-core`.

use thiserror::Error;

/// Why a message could not be turned into a [`ProfileRecord`].
///
/// Every variant leads to the same disposition (requeue); callers branch on
/// the kind only for diagnostics.
///
/// [`ProfileRecord`]: crate::profile::ProfileRecord
#[derive(Debug, Error)]
pub enum ExtractionError {
  #[error("malformed payload: {0}")]
  MalformedPayload(#[from] serde_json::Error),

  #[error("unexpected event type: {0:?}")]
  UnsupportedEvent(Option<String>),

  #[error("subject id is missing")]
  MissingSubjectId,

  #[error("subject id has type {0}, expected string")]
  InvalidSubjectIdType(&'static str),

  #[error("subject id {0:?} does not carry the expected prefix")]
  InvalidSubjectIdFormat(String),

  #[error("failed to publish api key mapping for {subject_id}")]
  MappingPublishFailed { subject_id: String },
}

impl ExtractionError {
  /// Short, stable label used as a structured log field.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::MalformedPayload(_) => "malformed_payload",
      Self::UnsupportedEvent(_) => "unsupported_event",
      Self::MissingSubjectId
      | Self::InvalidSubjectIdType(_)
      | Self::InvalidSubjectIdFormat(_) => "validation_failure",
      Self::MappingPublishFailed { .. } => "mapping_publish_failure",
    }
  }
}

/// Credential settings that would make generated secrets guessable or
/// collide.
#[derive(Debug, Error)]
#[error("credential length of {0} bytes is below the minimum of {min}", min = crate::credential::MIN_CREDENTIAL_BYTES)]
pub struct CredentialLengthError(pub usize);

pub type Result<T, E = ExtractionError> = std::result::Result<T, E>;
