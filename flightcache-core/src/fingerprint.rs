//! Deterministic, order-independent canonicalization of arbitrary structured inputs
//! into a stable cache key.
//!
//! Mirrors the two-trait escape hatch the rest of the workspace uses for cache keys:
//! implement [`Fingerprintable`] directly for a hand-rolled, allocation-light key, or
//! opt a `Serialize` type into the default pipeline via [`DefaultFingerprint`].

use crate::error::FingerprintError;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Maximum nesting depth the canonicalizer will walk before giving up.
pub const MAX_DEPTH: usize = 10;

/// A value that can be turned into a stable, order-independent cache key.
pub trait Fingerprintable {
    /// Compute the fingerprint for this value.
    ///
    /// Implementations should be deterministic: the same logical value must always
    /// produce the same string, regardless of field insertion order.
    fn fingerprint(&self) -> Result<String, FingerprintError>;
}

/// Marker trait opting a `Serialize` type into the default canonicalization pipeline.
///
/// Implement this (an empty `impl DefaultFingerprint for MyType {}`) instead of
/// [`Fingerprintable`] directly when the derived `Serialize` shape is already a
/// faithful cache key. Implement `Fingerprintable` by hand instead when a cheaper or
/// more specific key is available; do not implement both.
pub trait DefaultFingerprint: Serialize {}

impl<T: DefaultFingerprint> Fingerprintable for T {
    fn fingerprint(&self) -> Result<String, FingerprintError> {
        let value = serde_json::to_value(self).map_err(|e| FingerprintError::Unsupported {
            reason: e.to_string(),
        })?;
        let canonical = canonicalize(&value, 0)?;
        Ok(digest(&canonical))
    }
}

/// A JSON value used directly as a fingerprinting input, bypassing `Serialize` entirely.
///
/// Useful when the caller already has a `serde_json::Value` (or wants to build one
/// dynamically) rather than a typed struct with a `Serialize` impl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonInput(pub Value);

impl Fingerprintable for JsonInput {
    fn fingerprint(&self) -> Result<String, FingerprintError> {
        let canonical = canonicalize(&self.0, 0)?;
        Ok(digest(&canonical))
    }
}

/// Walk `value`, sorting object keys and rejecting shapes the canonicalizer can't
/// represent deterministically (NaN/infinite floats), bounded to [`MAX_DEPTH`].
fn canonicalize(value: &Value, depth: usize) -> Result<Value, FingerprintError> {
    if depth > MAX_DEPTH {
        return Err(FingerprintError::DepthExceeded { limit: MAX_DEPTH });
    }
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(value.clone()),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if !f.is_finite() {
                    return Err(FingerprintError::Unsupported {
                        reason: "non-finite number cannot be canonicalized".to_string(),
                    });
                }
            }
            Ok(value.clone())
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(canonicalize(item, depth + 1)?);
            }
            Ok(Value::Array(out))
        }
        Value::Object(map) => {
            // BTreeMap sorts by key, making field order irrelevant to the result.
            let mut sorted: BTreeMap<String, Value> = BTreeMap::new();
            for (k, v) in map {
                sorted.insert(k.clone(), canonicalize(v, depth + 1)?);
            }
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k, v);
            }
            Ok(Value::Object(out))
        }
    }
}

/// Hash a canonical JSON value into a lowercase hex string.
///
/// Uses XXH3's 128-bit variant: fast, non-cryptographic, and more than sufficient
/// entropy for a cache key whose collisions only cost a redundant fetch.
fn digest(value: &Value) -> String {
    let bytes = serde_json::to_vec(value).expect("canonical value is always serializable");
    let hash = xxhash_rust::xxh3::xxh3_128(&bytes);
    format!("{hash:032x}")
}

impl DefaultFingerprint for String {}
impl DefaultFingerprint for &str {}
impl DefaultFingerprint for i32 {}
impl DefaultFingerprint for i64 {}
impl DefaultFingerprint for u32 {}
impl DefaultFingerprint for u64 {}
impl DefaultFingerprint for bool {}
