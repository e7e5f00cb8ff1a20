//! [`ProfileExtractor`]: turns a webhook envelope into a [`ProfileRecord`].
//!
//! Extraction is all-or-nothing. A credential is minted and its mapping
//! published only after the envelope has passed validation, and no record is
//! returned unless the mapping was published.

use serde_json::Value;

use crate::{
  ExtractionError, Result, SUBJECT_ID_PREFIX, SUPPORTED_EVENT,
  credential::{CredentialGenerator, HashRegistry},
  envelope::{ContactEntry, SubjectRecord, WebhookEnvelope, resolve_primary},
  profile::ProfileRecord,
  sink::MappingPublisher,
};

pub struct ProfileExtractor<R, P> {
  generator: CredentialGenerator<R>,
  publisher: P,
}

impl<R, P> ProfileExtractor<R, P>
where
  R: HashRegistry,
  P: MappingPublisher,
{
  pub fn new(generator: CredentialGenerator<R>, publisher: P) -> Self {
    Self { generator, publisher }
  }

  pub fn generator(&self) -> &CredentialGenerator<R> { &self.generator }

  pub fn publisher(&self) -> &P { &self.publisher }

  pub async fn extract(&self, envelope: &WebhookEnvelope) -> Result<ProfileRecord> {
    let result = self.try_extract(envelope).await;
    if let Err(e) = &result {
      tracing::error!(
        error = %e,
        kind = e.kind(),
        event_type = ?envelope.event_type,
        "profile data extraction failed"
      );
    }
    result
  }

  async fn try_extract(&self, envelope: &WebhookEnvelope) -> Result<ProfileRecord> {
    let event = envelope.data.clone().unwrap_or_default();
    if event.kind.as_deref() != Some(SUPPORTED_EVENT) {
      return Err(ExtractionError::UnsupportedEvent(event.kind));
    }

    let subject = event.data.unwrap_or_default();
    let subject_id = validate_subject_id(subject.id.as_ref())?.to_string();

    tracing::info!(event_type = SUPPORTED_EVENT, %subject_id, "extracting profile data");

    let contact = ContactDetails::resolve(&subject);

    let credential = self.generator.generate();
    if !self.publisher.publish(&credential.hash, &subject_id).await {
      return Err(ExtractionError::MappingPublishFailed { subject_id });
    }

    let profile = ProfileRecord {
      subject_id,
      email: contact.email,
      email_verified: contact.email_verified,
      phone_number: contact.phone,
      phone_verified: contact.phone_verified,
      first_name: subject.first_name,
      last_name: subject.last_name,
      avatar_url: subject
        .image_url
        .filter(|url| !url.is_empty())
        .or(subject.profile_image_url),
      api_key: credential.plaintext,
    };

    tracing::info!(
      subject_id = %profile.subject_id,
      has_email = non_empty(profile.email.as_deref()),
      has_phone = non_empty(profile.phone_number.as_deref()),
      has_name = non_empty(profile.first_name.as_deref())
        || non_empty(profile.last_name.as_deref()),
      email_verified = profile.email_verified,
      phone_verified = profile.phone_verified,
      "profile data extracted"
    );

    Ok(profile)
  }
}

/// Check presence, type and prefix of the subject id, in that order.
pub fn validate_subject_id(id: Option<&Value>) -> Result<&str> {
  match id {
    None | Some(Value::Null) => Err(ExtractionError::MissingSubjectId),
    Some(Value::String(s)) if s.is_empty() => Err(ExtractionError::MissingSubjectId),
    Some(Value::String(s)) if !s.starts_with(SUBJECT_ID_PREFIX) => {
      Err(ExtractionError::InvalidSubjectIdFormat(s.clone()))
    }
    Some(Value::String(s)) => Ok(s.as_str()),
    Some(other) => Err(ExtractionError::InvalidSubjectIdType(json_type(other))),
  }
}

/// Present and not blank. An empty string counts as absent.
fn non_empty(value: Option<&str>) -> bool { value.is_some_and(|s| !s.is_empty()) }

fn json_type(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "bool",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

/// Primary email and phone, resolved independently.
struct ContactDetails {
  email:          Option<String>,
  email_verified: bool,
  phone:          Option<String>,
  phone_verified: bool,
}

impl ContactDetails {
  fn resolve(subject: &SubjectRecord) -> Self {
    let email = resolve_primary(
      &subject.email_addresses,
      subject.primary_email_address_id.as_deref(),
    );
    let phone = resolve_primary(
      &subject.phone_numbers,
      subject.primary_phone_number_id.as_deref(),
    );
    Self {
      email:          email.and_then(|e| e.value()).map(str::to_string),
      email_verified: email.is_some_and(ContactEntry::is_verified),
      phone:          phone.and_then(|p| p.value()).map(str::to_string),
      phone_verified: phone.is_some_and(ContactEntry::is_verified),
    }
  }
}
