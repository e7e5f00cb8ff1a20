//! Capability traits for the two outbound sinks.
//!
//! Both sinks are best-effort from the pipeline's point of view: they report
//! success as a `bool` and are responsible for logging their own failures.
//! Implementations live in `onboard-nats` and `onboard-http`.

use std::{future::Future, sync::Arc};

use crate::profile::ProfileRecord;

/// Publishes the credential-hash → subject-id mapping to durable storage.
pub trait MappingPublisher: Send + Sync {
  /// Returns `true` once the mapping is durably recorded.
  fn publish<'a>(
    &'a self,
    hash: &'a str,
    subject_id: &'a str,
  ) -> impl Future<Output = bool> + Send + 'a;
}

/// Delivers a finished profile to the profile service.
pub trait ProfileForwarder: Send + Sync {
  /// Returns `true` only when the service accepted the profile.
  fn forward<'a>(
    &'a self,
    profile: &'a ProfileRecord,
  ) -> impl Future<Output = bool> + Send + 'a;
}

impl<P: MappingPublisher> MappingPublisher for Arc<P> {
  fn publish<'a>(
    &'a self,
    hash: &'a str,
    subject_id: &'a str,
  ) -> impl Future<Output = bool> + Send + 'a {
    (**self).publish(hash, subject_id)
  }
}

impl<F: ProfileForwarder> ProfileForwarder for Arc<F> {
  fn forward<'a>(
    &'a self,
    profile: &'a ProfileRecord,
  ) -> impl Future<Output = bool> + Send + 'a {
    (**self).forward(profile)
  }
}
