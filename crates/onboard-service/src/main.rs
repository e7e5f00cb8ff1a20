//! `onboard`: consumes subject-created webhook events from JetStream,
//! issues an API key per subject and registers the profile with the profile
//! service.
//!
//! Reads `onboard.toml` (or the path given with `--config`), then `ONBOARD_*`
//! environment variables.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use onboard_core::{
  credential::{CredentialGenerator, InMemoryHashRegistry},
  extract::ProfileExtractor,
  processor::EventProcessor,
};
use onboard_http::HttpProfileForwarder;
use onboard_nats::{
  ConsumerLoop, JetStreamMappingPublisher,
  setup::{ensure_events_consumer, ensure_events_stream, ensure_mapping_stream},
};
use onboard_service::{ServiceConfig, health, signal::shutdown_signal};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Onboard webhook consumer")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "onboard.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = ServiceConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let generator = CredentialGenerator::new(cfg.credential(), Arc::new(InMemoryHashRegistry::new()))
    .context("invalid credential_bytes")?;

  // Broker.
  let client = async_nats::connect(cfg.nats_url.as_str())
    .await
    .with_context(|| format!("failed to connect to NATS at {}", cfg.nats_url))?;
  let jetstream = async_nats::jetstream::new(client.clone());

  let events = ensure_events_stream(&jetstream, &cfg.events_stream, &cfg.events_subject)
    .await
    .context("failed to declare events stream")?;
  ensure_mapping_stream(&jetstream, &cfg.mapping_stream, &cfg.mapping_subject)
    .await
    .context("failed to declare mapping stream")?;
  let consumer = ensure_events_consumer(&events, &cfg.consumer_name, cfg.ack_wait())
    .await
    .context("failed to create events consumer")?;

  // Pipeline.
  let publisher =
    JetStreamMappingPublisher::new(jetstream.clone(), &cfg.mapping_stream, &cfg.mapping_subject)
      .with_timeout(cfg.publish_timeout());
  let forwarder = HttpProfileForwarder::new(&cfg.profile_service())
    .context("failed to build profile service client")?;
  if forwarder.endpoint().is_none() {
    tracing::warn!("profile_service_url is unset; every profile forward will fail");
  }

  let processor = EventProcessor::new(ProfileExtractor::new(generator, publisher), forwarder)
    .with_max_deliveries(cfg.max_deliveries);
  let consumer_loop = ConsumerLoop::new(processor);

  if let Some(port) = cfg.health_port {
    let state = health::AppState::new(consumer_loop.counts());
    tokio::spawn(async move {
      if let Err(e) = health::serve(state, port).await {
        tracing::error!(error = %e, "health server stopped");
      }
    });
  }

  tracing::info!(
    stream = %cfg.events_stream,
    consumer = %cfg.consumer_name,
    max_deliveries = ?cfg.max_deliveries,
    "onboard consumer started"
  );

  let counts = consumer_loop
    .consume(&consumer, shutdown_signal())
    .await
    .context("consumer failed")?;

  tracing::info!(
    processed = counts.total(),
    delivered = counts.delivered,
    "draining NATS connection"
  );
  client.drain().await.context("failed to drain NATS connection")?;

  Ok(())
}
