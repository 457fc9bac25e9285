//!
//! streamgate password hashing
//! ---------------------------
//! Argon2id hashing with a self-describing encoded format:
//!
//! `$argon2id$v=19$m=19456,t=2,p=1$<base64 salt>$<base64 hash>` (base64 unpadded)
//!
//! Stored hashes carry their own cost parameters, so verification keeps working for
//! existing records after the constants below are retuned. Never change the layout of
//! the encoded string itself.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use thiserror::Error;

use crate::secrets::constant_time_eq;

pub const ALGORITHM_ID: &str = "argon2id";

const VERSION: u32 = 0x13;
const MEMORY_KIB: u32 = 19 * 1024;
const ITERATIONS: u32 = 2;
const PARALLELISM: u32 = 1;
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 16;

/// Number of `$`-separated fields, counting the empty one before the leading `$`.
const FIELD_COUNT: usize = 6;

#[derive(Debug, Error)]
pub enum PasswordError {
    /// The encoded string does not follow the expected layout.
    #[error("invalid encoded hash: {0}")]
    Format(String),
    /// The hashing primitive or the system RNG failed.
    #[error("hashing failed: {0}")]
    Hash(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CostParams {
    memory_kib: u32,
    iterations: u32,
    parallelism: u32,
}

const DEFAULT_COST: CostParams = CostParams { memory_kib: MEMORY_KIB, iterations: ITERATIONS, parallelism: PARALLELISM };

fn derive_key(password: &str, salt: &[u8], version: Version, cost: CostParams, key_len: usize) -> Result<Vec<u8>, argon2::Error> {
    let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, Some(key_len))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, version, params);
    let mut out = vec![0u8; key_len];
    argon2.hash_password_into(password.as_bytes(), salt, &mut out)?;
    Ok(out)
}

/// Hash `password` with a fresh random salt. Two calls never return the same string.
pub fn hash(password: &str) -> Result<String, PasswordError> {
    let mut salt = [0u8; SALT_LEN];
    getrandom::getrandom(&mut salt).map_err(|e| PasswordError::Hash(e.to_string()))?;
    let key = derive_key(password, &salt, Version::V0x13, DEFAULT_COST, KEY_LEN)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(format!(
        "${}$v={}$m={},t={},p={}${}${}",
        ALGORITHM_ID,
        VERSION,
        DEFAULT_COST.memory_kib,
        DEFAULT_COST.iterations,
        DEFAULT_COST.parallelism,
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(key)
    ))
}

/// Check `password` against an encoded hash.
///
/// Returns `Ok(false)` for a mismatch and also for an encoded string produced by an
/// algorithm (or algorithm version) this module does not know. Structural problems with
/// the encoded string are `PasswordError::Format`.
pub fn verify(password: &str, encoded: &str) -> Result<bool, PasswordError> {
    let fields: Vec<&str> = encoded.split('$').collect();
    if fields.len() != FIELD_COUNT || !fields[0].is_empty() {
        return Err(PasswordError::Format(format!("expected {} fields, got {}", FIELD_COUNT, fields.len())));
    }
    if fields[1] != ALGORITHM_ID { return Ok(false); }

    let version = parse_version(fields[2])?;
    let Ok(version) = Version::try_from(version) else { return Ok(false); };
    let cost = parse_cost(fields[3])?;
    let salt = STANDARD_NO_PAD
        .decode(fields[4])
        .map_err(|e| PasswordError::Format(format!("salt: {}", e)))?;
    let stored = STANDARD_NO_PAD
        .decode(fields[5])
        .map_err(|e| PasswordError::Format(format!("hash: {}", e)))?;

    let computed = derive_key(password, &salt, version, cost, stored.len())
        .map_err(|e| PasswordError::Format(format!("parameters rejected: {}", e)))?;
    Ok(constant_time_eq(&stored, &computed))
}

fn parse_version(field: &str) -> Result<u32, PasswordError> {
    field
        .strip_prefix("v=")
        .and_then(|v| v.parse::<u32>().ok())
        .ok_or_else(|| PasswordError::Format(format!("version field '{}'", field)))
}

fn parse_cost(field: &str) -> Result<CostParams, PasswordError> {
    let (mut m, mut t, mut p) = (None, None, None);
    for pair in field.split(',') {
        let Some((k, v)) = pair.split_once('=') else {
            return Err(PasswordError::Format(format!("parameter '{}'", pair)));
        };
        let slot = match k {
            "m" => &mut m,
            "t" => &mut t,
            "p" => &mut p,
            _ => continue,
        };
        let n = v.parse::<u32>().map_err(|_| PasswordError::Format(format!("parameter {}='{}'", k, v)))?;
        *slot = Some(n);
    }
    match (m, t, p) {
        (Some(memory_kib), Some(iterations), Some(parallelism)) => Ok(CostParams { memory_kib, iterations, parallelism }),
        _ => Err(PasswordError::Format("missing cost parameters (need m, t, p)".into())),
    }
}

#[cfg(test)]
#[path = "passwords_tests.rs"]
mod tests;
