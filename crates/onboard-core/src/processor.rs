//! [`EventProcessor`]: per-message orchestration and ack/nack policy.
//!
//! ```text
//! Received ─┬─ unsupported eventType ───────────────────────────── Filtered → ack
//!           └─ Extracting ─┬─ error ─────────────────────── ExtractFailed → nack(requeue)
//!                          └─ Extracted → Forwarding ─┬─ ok ─── Delivered → ack
//!                                                     └─ fail ─ DeliveryFailed → nack(requeue)
//! ```
//!
//! With a delivery ceiling configured, a requeueing path reached on the final
//! allowed attempt becomes `nack(requeue = false)` instead.

use std::future::Future;

use serde::Serialize;

use crate::{
  ExtractionError,
  credential::HashRegistry,
  envelope::{Decoded, WebhookEnvelope},
  extract::ProfileExtractor,
  sink::{MappingPublisher, ProfileForwarder},
};

// ─── Delivery capability ─────────────────────────────────────────────────────

/// One message handed out by the broker, plus the means to settle it.
///
/// The processor settles every delivery exactly once.
pub trait Delivery: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn payload(&self) -> &[u8];

  /// 1-based count of how many times the broker has handed out this message.
  fn attempt(&self) -> u64;

  fn ack(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// `requeue = false` tells the broker to stop redelivering.
  fn nack(
    &self,
    requeue: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Terminal state reached for one message.
#[derive(Debug)]
pub enum Outcome {
  /// Outer event type was not the supported one; acked without side effects.
  Filtered { event_type: Option<String> },
  /// Profile forwarded; acked.
  Delivered { subject_id: String },
  /// Extraction failed; requeued.
  ExtractFailed(ExtractionError),
  /// Forwarding failed after the mapping was published; requeued.
  DeliveryFailed { subject_id: String },
  /// Failed on the last allowed attempt; nacked without requeue.
  Abandoned { attempt: u64, reason: String },
}

impl Outcome {
  pub fn is_acked(&self) -> bool {
    matches!(self, Self::Filtered { .. } | Self::Delivered { .. })
  }

  pub fn is_requeued(&self) -> bool {
    matches!(self, Self::ExtractFailed(_) | Self::DeliveryFailed { .. })
  }
}

/// Running totals by outcome, reported by the consumer loop and health
/// endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
  pub filtered:        u64,
  pub delivered:       u64,
  pub extract_failed:  u64,
  pub delivery_failed: u64,
  pub abandoned:       u64,
}

impl OutcomeCounts {
  pub fn record(&mut self, outcome: &Outcome) {
    match outcome {
      Outcome::Filtered { .. } => self.filtered += 1,
      Outcome::Delivered { .. } => self.delivered += 1,
      Outcome::ExtractFailed(_) => self.extract_failed += 1,
      Outcome::DeliveryFailed { .. } => self.delivery_failed += 1,
      Outcome::Abandoned { .. } => self.abandoned += 1,
    }
  }

  pub fn total(&self) -> u64 {
    self.filtered
      + self.delivered
      + self.extract_failed
      + self.delivery_failed
      + self.abandoned
  }
}

// ─── Processor ───────────────────────────────────────────────────────────────

pub struct EventProcessor<R, P, F> {
  extractor:      ProfileExtractor<R, P>,
  forwarder:      F,
  /// `None` retries forever.
  max_deliveries: Option<u64>,
}

impl<R, P, F> EventProcessor<R, P, F>
where
  R: HashRegistry,
  P: MappingPublisher,
  F: ProfileForwarder,
{
  pub fn new(extractor: ProfileExtractor<R, P>, forwarder: F) -> Self {
    Self { extractor, forwarder, max_deliveries: None }
  }

  /// Stop requeueing a failing message once it has been delivered `max`
  /// times. Zero is treated as unlimited.
  pub fn with_max_deliveries(mut self, max: Option<u64>) -> Self {
    self.max_deliveries = max.filter(|m| *m > 0);
    self
  }

  pub fn extractor(&self) -> &ProfileExtractor<R, P> { &self.extractor }

  pub fn forwarder(&self) -> &F { &self.forwarder }

  /// Carry one delivery to a terminal state and settle it with the broker.
  pub async fn handle<D: Delivery>(&self, delivery: &D) -> Outcome {
    let outcome = self.process(delivery.payload()).await;
    let outcome = self.apply_ceiling(outcome, delivery.attempt());

    let settled = if outcome.is_acked() {
      delivery.ack().await
    } else {
      delivery.nack(outcome.is_requeued()).await
    };
    if let Err(e) = settled {
      // The broker redelivers once the ack deadline passes.
      tracing::warn!(error = %e, "failed to settle message");
    }

    outcome
  }

  async fn process(&self, payload: &[u8]) -> Outcome {
    let envelope = match WebhookEnvelope::decode(payload) {
      Ok(Decoded::Supported(envelope)) => envelope,
      Ok(Decoded::Unsupported { event_type }) => {
        tracing::info!(?event_type, "skipping unsupported event");
        return Outcome::Filtered { event_type };
      }
      Err(e) => {
        tracing::error!(error = %e, kind = e.kind(), "message processing failed");
        return Outcome::ExtractFailed(e);
      }
    };

    let profile = match self.extractor.extract(&envelope).await {
      Ok(profile) => profile,
      Err(e) => return Outcome::ExtractFailed(e),
    };

    if self.forwarder.forward(&profile).await {
      tracing::info!(
        subject_id = %profile.subject_id,
        email = profile.email.is_some(),
        phone = profile.phone_number.is_some(),
        "profile created"
      );
      Outcome::Delivered { subject_id: profile.subject_id }
    } else {
      tracing::warn!(subject_id = %profile.subject_id, "profile creation failed; requeueing");
      Outcome::DeliveryFailed { subject_id: profile.subject_id }
    }
  }

  fn apply_ceiling(&self, outcome: Outcome, attempt: u64) -> Outcome {
    let Some(max) = self.max_deliveries else { return outcome };
    if attempt < max {
      return outcome;
    }

    let reason = match outcome {
      Outcome::ExtractFailed(e) => e.to_string(),
      Outcome::DeliveryFailed { subject_id } => {
        format!("profile forward failed for {subject_id}")
      }
      settled => return settled,
    };
    tracing::error!(
      attempt,
      max_deliveries = max,
      %reason,
      "delivery ceiling reached; abandoning message"
    );
    Outcome::Abandoned { attempt, reason }
  }
}
