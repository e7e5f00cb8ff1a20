//! [`HttpProfileForwarder`]: `POST`s profiles to the profile service.

use std::time::Duration;

use onboard_core::{profile::ProfileRecord, sink::ProfileForwarder};
use reqwest::{Client, header::HeaderValue};
use serde::Deserialize;

use crate::Result;

/// Path, relative to the service base URL, that accepts new profiles.
pub const PROFILE_PATH: &str = "/api/profiles/me";

/// Upper bound on one forward, connection setup included.
pub const FORWARD_TIMEOUT: Duration = Duration::from_secs(10);

const API_KEY_HEADER: &str = "x-api-key";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Where the profile service lives and how to authenticate to it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileServiceConfig {
  pub base_url: Option<String>,
  /// Sent as `x-api-key`; the header is omitted when unset.
  pub api_key:  Option<String>,
}

/// Require an explicit `http://` or `https://` scheme, matched without regard
/// to case and written back lowercase, defaulting to `https://`. Trailing
/// slashes are dropped. Blank input yields `None`.
pub fn normalize_base_url(raw: &str) -> Option<String> {
  let trimmed = raw.trim().trim_end_matches('/');
  if trimmed.is_empty() {
    return None;
  }
  match trimmed.split_once("://") {
    Some((scheme, rest))
      if scheme.eq_ignore_ascii_case("https") || scheme.eq_ignore_ascii_case("http") =>
    {
      Some(format!("{}://{rest}", scheme.to_ascii_lowercase()))
    }
    _ => Some(format!("https://{trimmed}")),
  }
}

// ─── Forwarder ────────────────────────────────────────────────────────────────

/// Clones share one connection pool.
#[derive(Clone)]
pub struct HttpProfileForwarder {
  client:   Client,
  endpoint: Option<String>,
  api_key:  Option<HeaderValue>,
}

impl HttpProfileForwarder {
  pub fn new(config: &ProfileServiceConfig) -> Result<Self> {
    Self::with_timeout(config, FORWARD_TIMEOUT)
  }

  pub fn with_timeout(config: &ProfileServiceConfig, timeout: Duration) -> Result<Self> {
    let client = Client::builder().timeout(timeout).build()?;

    let endpoint = config
      .base_url
      .as_deref()
      .and_then(normalize_base_url)
      .map(|base| format!("{base}{PROFILE_PATH}"));

    let api_key = match config.api_key.as_deref().filter(|k| !k.is_empty()) {
      Some(key) => {
        let mut value = HeaderValue::from_str(key)?;
        value.set_sensitive(true);
        Some(value)
      }
      None => None,
    };

    Ok(Self { client, endpoint, api_key })
  }

  /// Full URL profiles are posted to, if a base URL was configured.
  pub fn endpoint(&self) -> Option<&str> { self.endpoint.as_deref() }
}

impl ProfileForwarder for HttpProfileForwarder {
  async fn forward(&self, profile: &ProfileRecord) -> bool {
    let Some(endpoint) = self.endpoint.as_deref() else {
      tracing::error!("profile service url missing");
      return false;
    };

    tracing::info!(endpoint, subject_id = %profile.subject_id, "sending profile data");

    let mut request = self.client.post(endpoint).json(profile);
    if let Some(key) = &self.api_key {
      request = request.header(API_KEY_HEADER, key.clone());
    }

    match request.send().await {
      Ok(resp) if resp.status().is_success() => true,
      Ok(resp) => {
        tracing::error!(
          endpoint,
          status_code = resp.status().as_u16(),
          "profile service request failed"
        );
        false
      }
      Err(e) => {
        tracing::error!(
          endpoint,
          error = %e,
          timeout = e.is_timeout(),
          status_code = ?e.status().map(|s| s.as_u16()),
          "profile service request failed"
        );
        false
      }
    }
  }
}
