//! Subject naming for mapping messages.
//!
//! Each mapping is published on `<base>.<subject token>` so the mapping
//! stream can keep the latest message per subject id. Ids that are not safe
//! NATS tokens are hex-encoded under an extra `hex` level, which no raw id
//! can collide with because raw ids never contain a dot.

/// True if `value` can be used verbatim as a single NATS subject token.
pub fn is_safe_token(value: &str) -> bool {
  !value.is_empty()
    && !value
      .chars()
      .any(|ch| ch == '.' || ch == '*' || ch == '>' || ch.is_whitespace())
}

/// Subject that carries the mapping for `subject_id`.
pub fn mapping_subject(base: &str, subject_id: &str) -> String {
  if is_safe_token(subject_id) {
    format!("{base}.{subject_id}")
  } else {
    format!("{base}.hex.{}", hex::encode(subject_id))
  }
}

/// Wildcard covering every mapping subject under `base`.
pub fn mapping_wildcard(base: &str) -> String { format!("{base}.>") }
