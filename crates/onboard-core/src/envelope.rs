//! Inbound webhook shapes.
//!
//! The identity provider wraps each event twice:
//! `{eventType, data: {type, data: SubjectRecord}}`. Every field is optional
//! on the wire; validation happens in [`crate::extract`], not here.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

// ─── Envelope ────────────────────────────────────────────────────────────────

/// The outer webhook message as it arrives on the queue.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEnvelope {
  #[serde(rename = "eventType")]
  pub event_type: Option<String>,
  pub data:       Option<EventData>,
}

/// A payload after its outer tag has been read.
#[derive(Debug)]
pub enum Decoded {
  Supported(WebhookEnvelope),
  /// The body past the tag is never inspected.
  Unsupported { event_type: Option<String> },
}

impl WebhookEnvelope {
  /// Parse a raw queue payload in two steps: any JSON value first, the typed
  /// envelope only when `eventType` names the supported event. Only invalid
  /// JSON, or a supported event whose body does not fit the schema, is an
  /// error.
  pub fn decode(payload: &[u8]) -> crate::Result<Decoded> {
    let raw: Value = serde_json::from_slice(payload)?;
    match raw.get("eventType") {
      Some(Value::String(tag)) if tag == crate::SUPPORTED_EVENT => {
        Ok(Decoded::Supported(serde_json::from_value(raw)?))
      }
      tag => Ok(Decoded::Unsupported { event_type: tag.and_then(describe_tag) }),
    }
  }
}

fn describe_tag(tag: &Value) -> Option<String> {
  match tag {
    Value::Null => None,
    Value::String(s) => Some(s.clone()),
    other => Some(other.to_string()),
  }
}

/// The provider's own event object, nested under `data`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventData {
  #[serde(rename = "type")]
  pub kind: Option<String>,
  pub data: Option<SubjectRecord>,
}

// ─── Subject ─────────────────────────────────────────────────────────────────

/// The identity payload for a single subject.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubjectRecord {
  /// Kept as raw JSON so a non-string id can be told apart from a missing one.
  pub id: Option<Value>,

  #[serde(default, deserialize_with = "null_as_empty")]
  pub email_addresses:          Vec<EmailAddress>,
  pub primary_email_address_id: Option<String>,

  #[serde(default, deserialize_with = "null_as_empty")]
  pub phone_numbers:           Vec<PhoneNumber>,
  pub primary_phone_number_id: Option<String>,

  pub first_name:        Option<String>,
  pub last_name:         Option<String>,
  pub image_url:         Option<String>,
  pub profile_image_url: Option<String>,
}

// ─── Contact methods ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Verification {
  pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailAddress {
  pub id:            Option<String>,
  pub email_address: Option<String>,
  pub verification:  Option<Verification>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhoneNumber {
  pub id:           Option<String>,
  pub phone_number: Option<String>,
  pub verification: Option<Verification>,
}

/// Common view over email and phone entries so primary resolution is written
/// once.
pub trait ContactEntry {
  fn id(&self) -> Option<&str>;
  fn value(&self) -> Option<&str>;
  fn verification(&self) -> Option<&Verification>;

  fn is_verified(&self) -> bool {
    self
      .verification()
      .and_then(|v| v.status.as_deref())
      .is_some_and(|s| s == "verified")
  }
}

impl ContactEntry for EmailAddress {
  fn id(&self) -> Option<&str> { self.id.as_deref() }
  fn value(&self) -> Option<&str> { self.email_address.as_deref() }
  fn verification(&self) -> Option<&Verification> { self.verification.as_ref() }
}

impl ContactEntry for PhoneNumber {
  fn id(&self) -> Option<&str> { self.id.as_deref() }
  fn value(&self) -> Option<&str> { self.phone_number.as_deref() }
  fn verification(&self) -> Option<&Verification> { self.verification.as_ref() }
}

/// Pick the entry whose id matches `primary_id`, falling back to the first
/// entry. `None` only when `entries` is empty.
pub fn resolve_primary<'a, T: ContactEntry>(
  entries: &'a [T],
  primary_id: Option<&str>,
) -> Option<&'a T> {
  entries
    .iter()
    .find(|e| primary_id.is_some() && e.id() == primary_id)
    .or_else(|| entries.first())
}

/// Providers send `null` for empty lists as often as they omit them.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
