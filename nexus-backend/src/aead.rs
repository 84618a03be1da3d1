//! Per-row authenticated encryption for secrets and policies at rest.
//!
//! Grounded on the same construction `enzoblain-Cryptal`'s
//! `encryption::chacha20poly1305` module documents: ChaCha20-Poly1305
//! (RFC 8439), a fresh random 12-byte nonce per record, nonce prepended to
//! the ciphertext on disk. Wrong-key decryption returns
//! [`AeadError::Decrypt`] rather than garbled plaintext, satisfying
//! `spec.md` §4.3's "wrong-key decryption must fail cleanly".

use chacha20poly1305::aead::{Aead, KeyInit, OsRng};
use chacha20poly1305::{AeadCore, ChaCha20Poly1305, Key, Nonce};

/// Error returned by [`encrypt`] or [`decrypt`].
#[derive(Debug, thiserror::Error)]
pub enum AeadError {
    /// The stored record is shorter than a nonce and cannot be a valid
    /// ciphertext.
    #[error("encrypted record is truncated")]
    Truncated,
    /// Decryption failed: either the wrong root key, or the record was
    /// tampered with.
    #[error("record does not decrypt under the supplied key")]
    Decrypt,
}

/// Encrypts `plaintext` under `root_key`, returning `nonce || ciphertext`.
pub fn encrypt(root_key: &[u8; 32], plaintext: &[u8]) -> Vec<u8> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(root_key));
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
    let mut ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .expect("chacha20poly1305 encryption does not fail for well-formed input");
    let mut out = nonce.to_vec();
    out.append(&mut ciphertext);
    out
}

/// Decrypts a record produced by [`encrypt`] under `root_key`.
pub fn decrypt(root_key: &[u8; 32], record: &[u8]) -> Result<Vec<u8>, AeadError> {
    if record.len() < 12 {
        return Err(AeadError::Truncated);
    }
    let (nonce_bytes, ciphertext) = record.split_at(12);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(root_key));
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| AeadError::Decrypt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_under_the_same_key() {
        let key = [9u8; 32];
        let ciphertext = encrypt(&key, b"hello nexus");
        let plaintext = decrypt(&key, &ciphertext).unwrap();
        assert_eq!(plaintext, b"hello nexus");
    }

    #[test]
    fn fails_cleanly_under_the_wrong_key() {
        let key = [9u8; 32];
        let other = [1u8; 32];
        let ciphertext = encrypt(&key, b"hello nexus");
        assert!(decrypt(&other, &ciphertext).is_err());
    }

    #[test]
    fn rejects_truncated_records() {
        assert!(matches!(decrypt(&[0u8; 32], b"x"), Err(AeadError::Truncated)));
    }
}
