/// One-time codes for e-mail confirmation and password reset
///
/// A code is 32 random bytes rendered as 64 lowercase hex characters. The
/// plaintext code only ever leaves the server inside an e-mail link; the
/// database keeps its SHA-256 digest so a leaked table cannot be replayed.
///
/// # Example
///
/// ```
/// use nhc_shared::auth::codes::{generate_code, hash_code};
///
/// let (code, hash) = generate_code();
/// assert_eq!(code.len(), 64);
/// assert_eq!(hash_code(&code), hash);
/// ```

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes in a code
const CODE_BYTES: usize = 32;

/// Generates a new one-time code
///
/// # Returns
///
/// `(code, hash)`: the plaintext code to mail out and the digest to store
pub fn generate_code() -> (String, String) {
    let mut bytes = [0u8; CODE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);

    let code = hex::encode(bytes);
    let hash = hash_code(&code);

    (code, hash)
}

/// Hashes a code for storage or lookup
///
/// Incoming codes are trimmed and lowercased first so that links copied with
/// stray whitespace or uppercased by a mail client still match.
pub fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.trim().to_ascii_lowercase().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_code() {
        let (code, hash) = generate_code();

        assert_eq!(code.len(), CODE_BYTES * 2);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash.len(), 64);
        assert_ne!(code, hash);
    }

    #[test]
    fn test_generated_codes_are_unique() {
        let (code1, _) = generate_code();
        let (code2, _) = generate_code();

        assert_ne!(code1, code2);
    }

    #[test]
    fn test_hash_code_normalizes_input() {
        let (code, hash) = generate_code();

        assert_eq!(hash_code(&format!("  {}\n", code)), hash);
        assert_eq!(hash_code(&code.to_uppercase()), hash);
        assert_ne!(hash_code("something-else"), hash);
    }
}
