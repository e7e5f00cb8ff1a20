//! Runtime wiring for the onboard consumer: configuration, health endpoint
//! and shutdown signalling. The `onboard` binary in `main.rs` assembles the
//! pipeline from these pieces.

pub mod settings;
pub mod health;
pub mod signal;

pub use settings::ServiceConfig;
