//! # Symmetric Primitives
//!
//! The two symmetric capabilities the envelope cipher consumes, wrapped
//! behind one narrow interface:
//!
//! - AES-256-GCM (authenticated): `encrypt(plaintext, key, nonce) ->
//!   (ciphertext, tag)` / `decrypt(ciphertext, key, nonce, tag) ->
//!   plaintext | integrity failure`. The 16-byte tag travels separately
//!   from the ciphertext so envelopes can carry it as its own field.
//! - ChaCha20 (stream): confidentiality only, no tamper detection.
//!
//! Cipher internals are never reimplemented here; this module only
//! adapts the external implementations to the key/nonce/tag contract.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce as AesNonce,
};
use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::ChaCha20;
use rand::RngCore;
use zeroize::ZeroizeOnDrop;

use crate::error::{Error, Result};

/// Size of the symmetric key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Size of the nonce in bytes (96 bits), shared by both primitives
pub const NONCE_SIZE: usize = 12;

/// Size of the AEAD authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// A nonce (number used once)
///
/// Always drawn fresh from the CSPRNG per message. Random 96-bit nonces
/// are safe for up to 2^32 messages per key (birthday bound); a key here
/// encrypts exactly one message, so reuse cannot occur.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce(pub [u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a cryptographically random nonce
    pub fn random() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from existing bytes
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// A 256-bit symmetric key, zeroized when dropped
#[derive(ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw key bytes
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

// ============================================================================
// AEAD (AES-256-GCM)
// ============================================================================

/// Encrypt with AES-256-GCM, returning ciphertext and tag separately.
pub fn aead_encrypt(
    key: &SymmetricKey,
    nonce: &Nonce,
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_SIZE])> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))?;

    // The aead crate appends the tag to the ciphertext; split it off so
    // the envelope can carry it as a separate field.
    let mut combined = cipher
        .encrypt(AesNonce::from_slice(nonce.as_bytes()), plaintext)
        .map_err(|e| Error::EncryptionFailed(format!("AEAD encryption failed: {}", e)))?;

    let tag_offset = combined.len() - TAG_SIZE;
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&combined[tag_offset..]);
    combined.truncate(tag_offset);

    Ok((combined, tag))
}

/// Decrypt with AES-256-GCM, verifying the tag.
///
/// ## Errors
///
/// `DecryptionIntegrity` if the tag does not verify — the ciphertext,
/// tag, nonce, or key is wrong. No plaintext bytes are returned in that
/// case.
pub fn aead_decrypt(
    ciphertext: &[u8],
    key: &SymmetricKey,
    nonce: &Nonce,
    tag: &[u8; TAG_SIZE],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))?;

    let mut combined = Vec::with_capacity(ciphertext.len() + TAG_SIZE);
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);

    cipher
        .decrypt(AesNonce::from_slice(nonce.as_bytes()), combined.as_slice())
        .map_err(|_| Error::DecryptionIntegrity)
}

// ============================================================================
// STREAM (ChaCha20)
// ============================================================================

/// Encrypt with the ChaCha20 stream cipher. No integrity protection.
pub fn stream_encrypt(key: &SymmetricKey, nonce: &Nonce, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut buf = plaintext.to_vec();
    apply_keystream(key, nonce, &mut buf);
    Ok(buf)
}

/// Decrypt a ChaCha20 ciphertext. A wrong key or nonce yields garbage,
/// not an error; only the AEAD mode detects tampering.
pub fn stream_decrypt(ciphertext: &[u8], key: &SymmetricKey, nonce: &Nonce) -> Result<Vec<u8>> {
    let mut buf = ciphertext.to_vec();
    apply_keystream(key, nonce, &mut buf);
    Ok(buf)
}

fn apply_keystream(key: &SymmetricKey, nonce: &Nonce, buf: &mut [u8]) {
    let mut cipher = ChaCha20::new(key.as_bytes().into(), nonce.as_bytes().into());
    cipher.apply_keystream(buf);
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aead_round_trip() {
        let key = SymmetricKey::from_bytes([42u8; KEY_SIZE]);
        let nonce = Nonce::random();
        let plaintext = b"Hello, World!";

        let (ciphertext, tag) = aead_encrypt(&key, &nonce, plaintext).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len());

        let decrypted = aead_decrypt(&ciphertext, &key, &nonce, &tag).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_aead_empty_plaintext() {
        let key = SymmetricKey::from_bytes([42u8; KEY_SIZE]);
        let nonce = Nonce::random();

        let (ciphertext, tag) = aead_encrypt(&key, &nonce, b"").unwrap();
        assert!(ciphertext.is_empty());

        let decrypted = aead_decrypt(&ciphertext, &key, &nonce, &tag).unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn test_aead_tampered_ciphertext_fails() {
        let key = SymmetricKey::from_bytes([42u8; KEY_SIZE]);
        let nonce = Nonce::random();

        let (mut ciphertext, tag) = aead_encrypt(&key, &nonce, b"secret").unwrap();
        ciphertext[0] ^= 0x01;

        let result = aead_decrypt(&ciphertext, &key, &nonce, &tag);
        assert!(matches!(result, Err(Error::DecryptionIntegrity)));
    }

    #[test]
    fn test_aead_tampered_tag_fails() {
        let key = SymmetricKey::from_bytes([42u8; KEY_SIZE]);
        let nonce = Nonce::random();

        let (ciphertext, mut tag) = aead_encrypt(&key, &nonce, b"secret").unwrap();
        tag[TAG_SIZE - 1] ^= 0x80;

        let result = aead_decrypt(&ciphertext, &key, &nonce, &tag);
        assert!(matches!(result, Err(Error::DecryptionIntegrity)));
    }

    #[test]
    fn test_aead_wrong_key_fails() {
        let key1 = SymmetricKey::from_bytes([1u8; KEY_SIZE]);
        let key2 = SymmetricKey::from_bytes([2u8; KEY_SIZE]);
        let nonce = Nonce::random();

        let (ciphertext, tag) = aead_encrypt(&key1, &nonce, b"secret").unwrap();
        let result = aead_decrypt(&ciphertext, &key2, &nonce, &tag);
        assert!(matches!(result, Err(Error::DecryptionIntegrity)));
    }

    #[test]
    fn test_stream_round_trip() {
        let key = SymmetricKey::from_bytes([7u8; KEY_SIZE]);
        let nonce = Nonce::random();
        let plaintext = b"stream mode has no tag";

        let ciphertext = stream_encrypt(&key, &nonce, plaintext).unwrap();
        assert_ne!(&ciphertext, plaintext);

        let decrypted = stream_decrypt(&ciphertext, &key, &nonce).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_random_nonces_differ() {
        assert_ne!(Nonce::random().0, Nonce::random().0);
    }
}
