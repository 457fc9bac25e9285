//! Random secret generation and constant-time comparison.

use base64::Engine;

use crate::passwords::PasswordError;

/// 256-bit random token, base64url without padding. Safe to embed in query strings.
pub fn random_text() -> Result<String, PasswordError> {
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// Random id in `1..=i64::MAX`; zero is reserved for "no session".
pub fn random_session_id() -> Result<u64, PasswordError> {
    loop {
        let mut buf = [0u8; 8];
        getrandom::getrandom(&mut buf).map_err(|e| PasswordError::Hash(e.to_string()))?;
        let id = u64::from_le_bytes(buf) & (i64::MAX as u64);
        if id != 0 { return Ok(id); }
    }
}

/// Constant-time byte comparison. Only the lengths are compared eagerly.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_keys_compare_exactly() {
        let key = random_text().unwrap();
        let stored = key.clone();
        assert!(constant_time_eq(key.as_bytes(), stored.as_bytes()));
        // a truncated key never matches, even though every byte it has agrees
        assert!(!constant_time_eq(key.as_bytes(), key[..42].as_bytes()));
        assert!(!constant_time_eq(key[..1].as_bytes(), key.as_bytes()));
        let mut flipped = stored.into_bytes();
        let last = flipped.len() - 1;
        flipped[last] = if flipped[last] == b'A' { b'B' } else { b'A' };
        assert!(!constant_time_eq(key.as_bytes(), &flipped));
        assert!(!constant_time_eq(key.as_bytes(), random_text().unwrap().as_bytes()));
        assert!(!constant_time_eq(b"", key.as_bytes()));
    }

    #[test]
    fn session_id_strings_compare_by_value_and_length() {
        let id = random_session_id().unwrap().to_string();
        assert!(constant_time_eq(id.as_bytes(), id.as_bytes()));
        assert!(!constant_time_eq(id.as_bytes(), format!("{}0", id).as_bytes()));
        assert!(!constant_time_eq(id.as_bytes(), format!("0{}", id).as_bytes()));
        assert!(!constant_time_eq(b"123", b"124"));
    }

    #[test]
    fn random_text_is_url_safe_and_unique() {
        let a = random_text().unwrap();
        let b = random_text().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn session_ids_are_positive_63_bit() {
        for _ in 0..256 {
            let id = random_session_id().unwrap();
            assert!(id > 0);
            assert!(id <= i64::MAX as u64);
        }
    }
}
