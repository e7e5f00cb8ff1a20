//! NATS JetStream transport for the onboard pipeline.
//!
//! - [`setup`] provisions the inbound event stream, its durable consumer and
//!   the outbound mapping stream.
//! - [`JetStreamMappingPublisher`] implements
//!   [`MappingPublisher`](onboard_core::sink::MappingPublisher).
//! - [`JetStreamDelivery`] implements
//!   [`Delivery`](onboard_core::processor::Delivery) for one pulled message.
//! - [`ConsumerLoop`] drives an [`EventProcessor`](onboard_core::processor::EventProcessor)
//!   one message at a time until shutdown.

mod consumer;
mod delivery;
mod publisher;

pub mod error;
pub mod setup;
pub mod subjects;

pub use consumer::ConsumerLoop;
pub use delivery::JetStreamDelivery;
pub use error::{Error, Result};
pub use publisher::JetStreamMappingPublisher;
