//! [`ConsumerLoop`]: drives the processor over the durable pull consumer.

use std::{fmt::Display, future::Future, sync::Arc};

use async_nats::jetstream::consumer::PullConsumer;
use futures_util::{Stream, StreamExt};
use onboard_core::{
  credential::HashRegistry,
  processor::{Delivery, EventProcessor, OutcomeCounts},
  sink::{MappingPublisher, ProfileForwarder},
};
use tokio::sync::RwLock;

use crate::{Error, JetStreamDelivery, Result};

pub struct ConsumerLoop<R, P, F> {
  processor: EventProcessor<R, P, F>,
  counts:    Arc<RwLock<OutcomeCounts>>,
}

impl<R, P, F> ConsumerLoop<R, P, F>
where
  R: HashRegistry,
  P: MappingPublisher,
  F: ProfileForwarder,
{
  pub fn new(processor: EventProcessor<R, P, F>) -> Self {
    Self { processor, counts: Arc::default() }
  }

  pub fn processor(&self) -> &EventProcessor<R, P, F> { &self.processor }

  /// Shared running totals, updated after every settled message.
  pub fn counts(&self) -> Arc<RwLock<OutcomeCounts>> { self.counts.clone() }

  /// Pull one message at a time from `consumer` until `shutdown` resolves or
  /// the message stream ends.
  pub async fn consume(
    &self,
    consumer: &PullConsumer,
    shutdown: impl Future<Output = ()>,
  ) -> Result<OutcomeCounts> {
    let messages = consumer
      .stream()
      .max_messages_per_batch(1)
      .messages()
      .await
      .map_err(|e| Error::Messages(e.to_string()))?;

    tracing::info!("waiting for messages");
    let messages = messages.map(|item| item.map(JetStreamDelivery::new));
    Ok(self.run(std::pin::pin!(messages), shutdown).await)
  }

  /// Process deliveries sequentially. Shutdown is only observed between
  /// messages; a message already pulled is always settled first.
  pub async fn run<S, D, E>(
    &self,
    mut messages: S,
    shutdown: impl Future<Output = ()>,
  ) -> OutcomeCounts
  where
    S: Stream<Item = std::result::Result<D, E>> + Unpin,
    D: Delivery,
    E: Display,
  {
    let mut shutdown = std::pin::pin!(shutdown);

    loop {
      let next = tokio::select! {
        biased;
        () = &mut shutdown => {
          tracing::info!("shutdown requested; stopping consumer");
          break;
        }
        next = messages.next() => next,
      };

      let delivery = match next {
        Some(Ok(delivery)) => delivery,
        Some(Err(e)) => {
          tracing::error!(error = %e, "error receiving message");
          continue;
        }
        None => {
          tracing::warn!("message stream closed");
          break;
        }
      };

      let outcome = self.processor.handle(&delivery).await;
      self.counts.write().await.record(&outcome);
    }

    let counts = *self.counts.read().await;
    tracing::info!(
      total = counts.total(),
      delivered = counts.delivered,
      filtered = counts.filtered,
      abandoned = counts.abandoned,
      "consumer stopped"
    );
    counts
  }
}

#[cfg(test)]
mod tests {
  use std::{
    convert::Infallible,
    sync::{
      Arc, Mutex,
      atomic::{AtomicBool, Ordering},
    },
  };

  use futures_util::stream;
  use onboard_core::{
    credential::{CredentialConfig, CredentialGenerator, InMemoryHashRegistry},
    extract::ProfileExtractor,
    profile::ProfileRecord,
  };
  use serde_json::json;

  use super::*;

  struct AlwaysPublish;

  impl MappingPublisher for AlwaysPublish {
    async fn publish(&self, _hash: &str, _subject_id: &str) -> bool { true }
  }

  #[derive(Default)]
  struct Forwarder {
    reject: AtomicBool,
  }

  impl ProfileForwarder for Forwarder {
    async fn forward(&self, _profile: &ProfileRecord) -> bool {
      !self.reject.load(Ordering::SeqCst)
    }
  }

  #[derive(Debug, Clone, PartialEq)]
  enum Settled {
    Ack,
    Nack(bool),
  }

  struct Message {
    payload: Vec<u8>,
    log:     Arc<Mutex<Vec<Settled>>>,
  }

  impl Delivery for Message {
    type Error = Infallible;

    fn payload(&self) -> &[u8] { &self.payload }

    fn attempt(&self) -> u64 { 1 }

    async fn ack(&self) -> std::result::Result<(), Infallible> {
      self.log.lock().unwrap().push(Settled::Ack);
      Ok(())
    }

    async fn nack(&self, requeue: bool) -> std::result::Result<(), Infallible> {
      self.log.lock().unwrap().push(Settled::Nack(requeue));
      Ok(())
    }
  }

  type Loop = ConsumerLoop<InMemoryHashRegistry, AlwaysPublish, Arc<Forwarder>>;

  fn consumer_loop(forwarder: Arc<Forwarder>) -> Loop {
    let generator =
      CredentialGenerator::new(CredentialConfig::default(), InMemoryHashRegistry::new())
        .unwrap();
    let extractor = ProfileExtractor::new(generator, AlwaysPublish);
    ConsumerLoop::new(EventProcessor::new(extractor, forwarder))
  }

  fn created(id: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
      "eventType": "user.created",
      "data": { "type": "user.created", "data": { "id": id } }
    }))
    .unwrap()
  }

  fn message(payload: Vec<u8>, log: &Arc<Mutex<Vec<Settled>>>) -> Message {
    Message { payload, log: log.clone() }
  }

  #[tokio::test]
  async fn processes_every_message_in_order() {
    let log = Arc::new(Mutex::new(vec![]));
    let messages = stream::iter(vec![
      Ok::<_, Infallible>(message(created("user_1"), &log)),
      Ok(message(br#"{"eventType":"user.deleted"}"#.to_vec(), &log)),
      Ok(message(b"not json".to_vec(), &log)),
      Ok(message(created("user_2"), &log)),
    ]);

    let consumer = consumer_loop(Arc::default());
    let counts = consumer.run(messages, std::future::pending()).await;

    assert_eq!(counts.delivered, 2);
    assert_eq!(counts.filtered, 1);
    assert_eq!(counts.extract_failed, 1);
    assert_eq!(counts.total(), 4);
    assert_eq!(
      *log.lock().unwrap(),
      vec![Settled::Ack, Settled::Ack, Settled::Nack(true), Settled::Ack]
    );
    assert_eq!(*consumer.counts().read().await, counts);
  }

  #[tokio::test]
  async fn failed_forward_is_requeued() {
    let log = Arc::new(Mutex::new(vec![]));
    let forwarder = Arc::new(Forwarder::default());
    forwarder.reject.store(true, Ordering::SeqCst);

    let consumer = consumer_loop(forwarder);
    let counts = consumer
      .run(
        stream::iter(vec![Ok::<_, Infallible>(message(created("user_1"), &log))]),
        std::future::pending(),
      )
      .await;

    assert_eq!(counts.delivery_failed, 1);
    assert_eq!(*log.lock().unwrap(), vec![Settled::Nack(true)]);
  }

  #[tokio::test]
  async fn stream_errors_are_skipped() {
    let log = Arc::new(Mutex::new(vec![]));
    let messages = stream::iter(vec![
      Err("connection hiccup"),
      Ok(message(created("user_1"), &log)),
    ]);

    let counts = consumer_loop(Arc::default())
      .run(messages, std::future::pending())
      .await;

    assert_eq!(counts.delivered, 1);
    assert_eq!(counts.total(), 1);
  }

  #[tokio::test]
  async fn shutdown_stops_an_idle_loop() {
    let messages = stream::pending::<std::result::Result<Message, Infallible>>();
    let counts = consumer_loop(Arc::default())
      .run(messages, std::future::ready(()))
      .await;
    assert_eq!(counts, OutcomeCounts::default());
  }
}
