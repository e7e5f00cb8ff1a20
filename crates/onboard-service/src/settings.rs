//! [`ServiceConfig`]: layered from an optional TOML file, then `ONBOARD_*`
//! environment variables.

use std::{path::Path, time::Duration};

use config::{Config, ConfigError, Environment, File};
use onboard_core::credential::CredentialConfig;
use onboard_http::ProfileServiceConfig;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "ONBOARD";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
  pub nats_url:                String,
  pub events_stream:           String,
  pub events_subject:          String,
  pub consumer_name:           String,
  pub mapping_stream:          String,
  pub mapping_subject:         String,
  pub publish_timeout_secs:    u64,
  pub ack_wait_secs:           u64,
  /// Unset or zero requeues failing messages forever.
  pub max_deliveries:          Option<u64>,
  pub profile_service_url:     Option<String>,
  pub profile_service_api_key: Option<String>,
  pub credential_prefix:       String,
  pub credential_bytes:        usize,
  /// Health server port; no server when unset.
  pub health_port:             Option<u16>,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      nats_url:                "nats://localhost:4222".into(),
      events_stream:           "WEBHOOK_EVENTS".into(),
      events_subject:          "webhook-events".into(),
      consumer_name:           "onboard-service".into(),
      mapping_stream:          "API_KEY_MAPPINGS".into(),
      mapping_subject:         "api-key-mappings".into(),
      publish_timeout_secs:    5,
      ack_wait_secs:           30,
      max_deliveries:          None,
      profile_service_url:     Some("http://localhost:8000".into()),
      profile_service_api_key: None,
      credential_prefix:       "mk_".into(),
      credential_bytes:        32,
      health_port:             None,
    }
  }
}

impl ServiceConfig {
  /// Read `path` if it exists, then overlay the process environment.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::from_builder(
      Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(environment()),
    )
  }

  fn from_builder(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
  ) -> Result<Self, ConfigError> {
    builder.build()?.try_deserialize()
  }

  pub fn publish_timeout(&self) -> Duration { Duration::from_secs(self.publish_timeout_secs) }

  pub fn ack_wait(&self) -> Duration { Duration::from_secs(self.ack_wait_secs) }

  pub fn credential(&self) -> CredentialConfig {
    CredentialConfig {
      prefix:   self.credential_prefix.clone(),
      byte_len: self.credential_bytes,
    }
  }

  pub fn profile_service(&self) -> ProfileServiceConfig {
    ProfileServiceConfig {
      base_url: self.profile_service_url.clone(),
      api_key:  self.profile_service_api_key.clone(),
    }
  }
}

fn environment() -> Environment {
  Environment::with_prefix(ENV_PREFIX)
    .prefix_separator("_")
    .separator("__")
    .try_parsing(true)
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use config::FileFormat;

  use super::*;

  fn env(vars: &[(&str, &str)]) -> Environment {
    let map: HashMap<String, String> =
      vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    environment().source(Some(map))
  }

  #[test]
  fn defaults_apply_without_any_source() {
    let cfg = ServiceConfig::from_builder(Config::builder()).unwrap();
    assert_eq!(cfg.nats_url, "nats://localhost:4222");
    assert_eq!(cfg.events_stream, "WEBHOOK_EVENTS");
    assert_eq!(cfg.mapping_subject, "api-key-mappings");
    assert_eq!(cfg.publish_timeout(), Duration::from_secs(5));
    assert_eq!(cfg.max_deliveries, None);
    assert_eq!(cfg.credential().prefix, "mk_");
    assert_eq!(cfg.credential().byte_len, 32);
    assert_eq!(cfg.health_port, None);
  }

  #[test]
  fn file_values_override_defaults() {
    let toml = r#"
      consumer_name = "onboard-eu"
      max_deliveries = 5
      profile_service_url = "profiles.internal"
    "#;
    let cfg = ServiceConfig::from_builder(
      Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
    )
    .unwrap();
    assert_eq!(cfg.consumer_name, "onboard-eu");
    assert_eq!(cfg.max_deliveries, Some(5));
    assert_eq!(cfg.profile_service().base_url.as_deref(), Some("profiles.internal"));
    assert_eq!(cfg.events_subject, "webhook-events");
  }

  #[test]
  fn environment_overrides_file() {
    let cfg = ServiceConfig::from_builder(
      Config::builder()
        .add_source(File::from_str("ack_wait_secs = 10", FileFormat::Toml))
        .add_source(env(&[
          ("ONBOARD_ACK_WAIT_SECS", "45"),
          ("ONBOARD_HEALTH_PORT", "8081"),
          ("ONBOARD_PROFILE_SERVICE_API_KEY", "svc-secret"),
          ("UNRELATED_VAR", "x"),
        ])),
    )
    .unwrap();
    assert_eq!(cfg.ack_wait(), Duration::from_secs(45));
    assert_eq!(cfg.health_port, Some(8081));
    assert_eq!(cfg.profile_service().api_key.as_deref(), Some("svc-secret"));
  }

  #[test]
  fn zero_credential_bytes_cannot_build_a_generator() {
    use onboard_core::credential::{CredentialGenerator, InMemoryHashRegistry};

    let cfg = ServiceConfig::from_builder(
      Config::builder().add_source(env(&[("ONBOARD_CREDENTIAL_BYTES", "0")])),
    )
    .unwrap();
    assert_eq!(cfg.credential().byte_len, 0);
    assert!(CredentialGenerator::new(cfg.credential(), InMemoryHashRegistry::new()).is_err());
  }

  #[test]
  fn missing_file_is_not_an_error() {
    let cfg = ServiceConfig::load(Path::new("/nonexistent/onboard.toml")).unwrap();
    assert_eq!(cfg.credential_prefix, "mk_");
  }
}
