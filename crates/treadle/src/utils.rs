use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::TryRngCore;
use rand::rngs::OsRng;

/// Draw `len` bytes from the operating system CSPRNG.
///
/// Panics only if the platform cannot provide secure randomness, in which
/// case no part of this crate may run anyway.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .expect("operating system CSPRNG unavailable");
    bytes
}

/// Generate a URL-safe random string of exactly `len` characters.
///
/// Draws `ceil(len / 4) * 3` random bytes, encodes them as unpadded
/// base64url and truncates to the requested length, so every character
/// carries full alphabet entropy.
pub fn random_token(len: usize) -> String {
    let mut token = URL_SAFE_NO_PAD.encode(random_bytes(len.div_ceil(4) * 3));
    token.truncate(len);
    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn is_url_safe(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '-' || c == '_'
    }

    #[test]
    fn token_has_requested_length_and_alphabet() {
        for len in 0..=128 {
            let token = random_token(len);
            assert_eq!(token.len(), len);
            assert!(token.chars().all(is_url_safe), "unexpected char in {token:?}");
        }
    }

    #[test]
    fn tokens_are_unique() {
        let tokens: HashSet<_> = (0..100).map(|_| random_token(16)).collect();
        assert_eq!(tokens.len(), 100);
    }

    #[test]
    fn random_bytes_len() {
        assert_eq!(random_bytes(0).len(), 0);
        assert_eq!(random_bytes(33).len(), 33);
    }
}
