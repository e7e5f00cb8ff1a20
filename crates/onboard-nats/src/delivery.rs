use async_nats::jetstream::{self, AckKind};
use onboard_core::processor::Delivery;

use crate::Error;

/// One pulled JetStream message.
///
/// `nack(true)` naks for immediate redelivery; `nack(false)` terminates the
/// message, which the server reports as a terminated-message advisory.
pub struct JetStreamDelivery {
  message: jetstream::Message,
}

impl JetStreamDelivery {
  pub fn new(message: jetstream::Message) -> Self { Self { message } }

  pub fn message(&self) -> &jetstream::Message { &self.message }
}

impl Delivery for JetStreamDelivery {
  type Error = Error;

  fn payload(&self) -> &[u8] { &self.message.payload }

  fn attempt(&self) -> u64 {
    self
      .message
      .info()
      .map(|info| info.delivered.max(1) as u64)
      .unwrap_or(1)
  }

  async fn ack(&self) -> Result<(), Error> {
    self.message.ack().await.map_err(|e| Error::Settle(e.to_string()))
  }

  async fn nack(&self, requeue: bool) -> Result<(), Error> {
    let kind = if requeue { AckKind::Nak(None) } else { AckKind::Term };
    self
      .message
      .ack_with(kind)
      .await
      .map_err(|e| Error::Settle(e.to_string()))
  }
}
