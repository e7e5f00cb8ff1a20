//! HTTP delivery of profile records to the profile service.
//!
//! [`HttpProfileForwarder`] implements
//! [`ProfileForwarder`](onboard_core::sink::ProfileForwarder) over `reqwest`.

mod forwarder;

pub mod error;

pub use error::{Error, Result};
pub use forwarder::{
  FORWARD_TIMEOUT, HttpProfileForwarder, PROFILE_PATH, ProfileServiceConfig,
  normalize_base_url,
};
