//! API credential minting.
//!
//! A credential is a prefixed hex string of OS-random bytes plus its SHA-256
//! digest. Only the digest is ever recorded; the plaintext travels once, in
//! the forwarded profile.

use std::{
  collections::HashSet,
  sync::Mutex,
  time::{Duration, Instant},
};

use rand_core::{OsRng, RngCore as _};
use sha2::{Digest, Sha256};

use crate::CredentialLengthError;

/// Smallest accepted random length. Shorter secrets repeat soon enough to
/// stall generation on registry collisions.
pub const MIN_CREDENTIAL_BYTES: usize = 16;

/// Generation slower than this is reported as a warning.
pub const SLOW_GENERATION_THRESHOLD: Duration = Duration::from_millis(100);

// ─── Credential ──────────────────────────────────────────────────────────────

/// A freshly minted bearer secret and its one-way hash.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
  pub plaintext: String,
  pub hash:      String,
}

impl std::fmt::Debug for Credential {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Credential")
      .field("plaintext", &"<redacted>")
      .field("hash", &self.hash)
      .finish()
  }
}

/// Lowercase hex SHA-256 of `plaintext`.
pub fn hash_credential(plaintext: &str) -> String {
  hex::encode(Sha256::digest(plaintext.as_bytes()))
}

/// Shape of generated credentials.
#[derive(Debug, Clone)]
pub struct CredentialConfig {
  pub prefix:   String,
  /// Number of random bytes; the plaintext carries twice as many hex digits.
  pub byte_len: usize,
}

impl Default for CredentialConfig {
  fn default() -> Self {
    Self {
      prefix:   "mk_".to_string(),
      byte_len: 32,
    }
  }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Record of every hash issued so far.
///
/// `insert` returns `false` when the hash was already present, so a
/// check-then-insert race between two generators still cannot issue the same
/// hash twice.
pub trait HashRegistry: Send + Sync {
  fn contains(&self, hash: &str) -> bool;
  fn insert(&self, hash: &str) -> bool;
}

/// Process-local registry. Append-only and never pruned, so uniqueness holds
/// only for the lifetime of one process.
#[derive(Debug, Default)]
pub struct InMemoryHashRegistry {
  hashes: Mutex<HashSet<String>>,
}

impl InMemoryHashRegistry {
  pub fn new() -> Self { Self::default() }

  pub fn len(&self) -> usize {
    self.hashes.lock().unwrap_or_else(|e| e.into_inner()).len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl HashRegistry for InMemoryHashRegistry {
  fn contains(&self, hash: &str) -> bool {
    // A poisoned lock still holds a valid set; nothing is ever removed.
    let set = self.hashes.lock().unwrap_or_else(|e| e.into_inner());
    set.contains(hash)
  }

  fn insert(&self, hash: &str) -> bool {
    let mut set = self.hashes.lock().unwrap_or_else(|e| e.into_inner());
    set.insert(hash.to_string())
  }
}

impl<R: HashRegistry + ?Sized> HashRegistry for std::sync::Arc<R> {
  fn contains(&self, hash: &str) -> bool { (**self).contains(hash) }
  fn insert(&self, hash: &str) -> bool { (**self).insert(hash) }
}

// ─── Generator ───────────────────────────────────────────────────────────────

pub struct CredentialGenerator<R> {
  config:   CredentialConfig,
  registry: R,
}

impl<R: HashRegistry> CredentialGenerator<R> {
  /// Fails when `config.byte_len` is below [`MIN_CREDENTIAL_BYTES`].
  pub fn new(config: CredentialConfig, registry: R) -> Result<Self, CredentialLengthError> {
    if config.byte_len < MIN_CREDENTIAL_BYTES {
      return Err(CredentialLengthError(config.byte_len));
    }
    Ok(Self { config, registry })
  }

  pub fn registry(&self) -> &R { &self.registry }

  /// Mint a credential whose hash the registry has never seen.
  ///
  /// Loops until the registry accepts the hash. With 256 bits of entropy a
  /// second iteration is not expected in practice.
  pub fn generate(&self) -> Credential {
    let started = Instant::now();
    let mut attempts: u32 = 0;

    let credential = loop {
      attempts += 1;
      let candidate = self.candidate();
      if self.registry.contains(&candidate.hash) {
        continue;
      }
      if self.registry.insert(&candidate.hash) {
        break candidate;
      }
    };

    let elapsed = started.elapsed();
    let generation_time_ms = elapsed.as_secs_f64() * 1000.0;
    tracing::info!(generation_time_ms, attempts, "credential generated");
    if elapsed > SLOW_GENERATION_THRESHOLD {
      tracing::warn!(generation_time_ms, attempts, "credential generation slow");
    }

    credential
  }

  fn candidate(&self) -> Credential {
    let mut bytes = vec![0u8; self.config.byte_len];
    OsRng.fill_bytes(&mut bytes);
    let plaintext = format!("{}{}", self.config.prefix, hex::encode(&bytes));
    let hash = hash_credential(&plaintext);
    Credential { plaintext, hash }
  }
}
