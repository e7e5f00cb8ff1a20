//! JetStream provisioning for the inbound and mapping streams.
//!
//! Every function here is idempotent. The events stream and consumer are
//! declared at startup; the mapping stream before every publish.

use std::time::Duration;

use async_nats::jetstream::{
  self,
  consumer::{AckPolicy, DeliverPolicy, PullConsumer, pull},
  context::CreateStreamError,
  stream::{Config as StreamConfig, RetentionPolicy, StorageType},
};

use crate::{Error, Result, subjects::mapping_wildcard};

/// Inbound webhook events. Work-queue retention removes a message once it is
/// acknowledged; file storage survives broker restarts.
pub fn events_stream_config(name: &str, subject: &str) -> StreamConfig {
  StreamConfig {
    name: name.to_string(),
    subjects: vec![subject.to_string()],
    retention: RetentionPolicy::WorkQueue,
    storage: StorageType::File,
    ..Default::default()
  }
}

/// Credential mappings, one retained message per subject id.
pub fn mapping_stream_config(name: &str, subject_base: &str) -> StreamConfig {
  StreamConfig {
    name: name.to_string(),
    subjects: vec![mapping_wildcard(subject_base)],
    retention: RetentionPolicy::Limits,
    storage: StorageType::File,
    max_messages_per_subject: 1,
    ..Default::default()
  }
}

pub async fn ensure_events_stream(
  jetstream: &jetstream::Context,
  name: &str,
  subject: &str,
) -> Result<jetstream::stream::Stream, CreateStreamError> {
  jetstream
    .get_or_create_stream(events_stream_config(name, subject))
    .await
}

pub async fn ensure_mapping_stream(
  jetstream: &jetstream::Context,
  name: &str,
  subject_base: &str,
) -> Result<jetstream::stream::Stream, CreateStreamError> {
  jetstream
    .get_or_create_stream(mapping_stream_config(name, subject_base))
    .await
}

/// Durable pull consumer with explicit acks and at most one unacknowledged
/// message in flight.
pub fn events_consumer_config(name: &str, ack_wait: Duration) -> pull::Config {
  pull::Config {
    durable_name: Some(name.to_string()),
    ack_policy: AckPolicy::Explicit,
    deliver_policy: DeliverPolicy::All,
    ack_wait,
    max_ack_pending: 1,
    ..Default::default()
  }
}

pub async fn ensure_events_consumer(
  stream: &jetstream::stream::Stream,
  name: &str,
  ack_wait: Duration,
) -> Result<PullConsumer> {
  stream
    .get_or_create_consumer(name, events_consumer_config(name, ack_wait))
    .await
    .map_err(|e| Error::Consumer { name: name.to_string(), reason: e.to_string() })
}
