//! Outbound records: the canonical profile and the credential mapping.

use serde::{Deserialize, Serialize};

/// The de-nested subject forwarded to the profile service.
///
/// `email` and `phone_number` are `null` on the wire when the subject has
/// none; the verification flags are then `false`.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
  pub subject_id:     String,
  pub email:          Option<String>,
  pub email_verified: bool,
  pub phone_number:   Option<String>,
  pub phone_verified: bool,
  pub first_name:     Option<String>,
  pub last_name:      Option<String>,
  pub avatar_url:     Option<String>,
  /// Plaintext credential. Only ever leaves the process in the forward body.
  pub api_key:        String,
}

impl std::fmt::Debug for ProfileRecord {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ProfileRecord")
      .field("subject_id", &self.subject_id)
      .field("email", &self.email)
      .field("email_verified", &self.email_verified)
      .field("phone_number", &self.phone_number)
      .field("phone_verified", &self.phone_verified)
      .field("first_name", &self.first_name)
      .field("last_name", &self.last_name)
      .field("avatar_url", &self.avatar_url)
      .field("api_key", &"<redacted>")
      .finish()
  }
}

/// Key prefix under which downstream lookups find a credential hash.
pub const MAPPING_KEY_PREFIX: &str = "api_key:";

/// Credential-hash → subject-id association published for later lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
  pub key:   String,
  pub value: String,
}

impl MappingRecord {
  pub fn new(hash: &str, subject_id: &str) -> Self {
    Self {
      key:   format!("{MAPPING_KEY_PREFIX}{hash}"),
      value: subject_id.to_string(),
    }
  }
}
