//! [`JetStreamMappingPublisher`]: records credential mappings in JetStream.

use std::time::Duration;

use async_nats::{HeaderMap, jetstream};
use onboard_core::{profile::MappingRecord, sink::MappingPublisher};

use crate::{Error, Result, setup::ensure_mapping_stream, subjects::mapping_subject};

pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct JetStreamMappingPublisher {
  jetstream:    jetstream::Context,
  stream_name:  String,
  subject_base: String,
  timeout:      Duration,
}

impl JetStreamMappingPublisher {
  pub fn new(
    jetstream: jetstream::Context,
    stream_name: impl Into<String>,
    subject_base: impl Into<String>,
  ) -> Self {
    Self {
      jetstream,
      stream_name: stream_name.into(),
      subject_base: subject_base.into(),
      timeout: DEFAULT_PUBLISH_TIMEOUT,
    }
  }

  /// Bound on one publish, stream declaration and server ack included.
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Publish and wait for the server ack. Returns the stream sequence.
  pub async fn try_publish(&self, hash: &str, subject_id: &str) -> Result<u64> {
    let publish = async {
      ensure_mapping_stream(&self.jetstream, &self.stream_name, &self.subject_base).await?;

      let payload = serde_json::to_vec(&MappingRecord::new(hash, subject_id))?;
      let mut headers = HeaderMap::new();
      headers.insert("Content-Type", "application/json");

      let ack = self
        .jetstream
        .publish_with_headers(
          mapping_subject(&self.subject_base, subject_id),
          headers,
          payload.into(),
        )
        .await?
        .await?;
      Ok::<_, Error>(ack.sequence)
    };

    tokio::time::timeout(self.timeout, publish)
      .await
      .map_err(|_| Error::PublishTimeout(self.timeout))?
  }
}

impl MappingPublisher for JetStreamMappingPublisher {
  async fn publish(&self, hash: &str, subject_id: &str) -> bool {
    match self.try_publish(hash, subject_id).await {
      Ok(sequence) => {
        tracing::info!(%subject_id, stream = %self.stream_name, sequence, "api key mapping published");
        true
      }
      Err(e) => {
        tracing::error!(%subject_id, stream = %self.stream_name, error = %e, "api key mapping publish failed");
        false
      }
    }
  }
}
