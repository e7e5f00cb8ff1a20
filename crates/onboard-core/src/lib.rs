//! Core types and pipeline for the onboard webhook consumer.
//!
//! This crate is free of broker and HTTP dependencies. The
//! transport crates (`onboard-nats`, `onboard-http`) implement the capability
//! traits in [`sink`] and [`processor`]; everything here is testable with
//! in-memory fakes.

pub mod credential;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod processor;
pub mod profile;
pub mod sink;

pub use error::{CredentialLengthError, ExtractionError, Result};

/// The only webhook event type the pipeline acts on.
pub const SUPPORTED_EVENT: &str = "user.created";

/// Every valid subject id starts with this marker.
pub const SUBJECT_ID_PREFIX: &str = "user_";
