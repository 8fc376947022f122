//! # Elliptic-Curve Key Agreement
//!
//! Key pairs and ECDH shared-secret derivation on the system's one fixed
//! curve, Curve25519 (X25519). Every envelope in the system agrees on
//! this curve; there is no negotiation.
//!
//! The raw Diffie-Hellman output is never used as a key directly: it is
//! hashed with SHA-256 to produce the 32-byte symmetric key handed to the
//! envelope cipher.

use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use crate::crypto::symmetric::SymmetricKey;
use crate::error::{Error, Result};

/// Size of an encoded public key / private scalar in bytes
pub const EC_KEY_SIZE: usize = 32;

/// X25519 key pair for envelope encryption
///
/// The private scalar is zeroized on drop by `x25519_dalek` itself.
pub struct EcKeyPair {
    secret: StaticSecret,
    public: X25519PublicKey,
}

impl EcKeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Reconstruct a key pair from the 32-byte private scalar
    ///
    /// The public key is re-derived from the scalar, never trusted from
    /// an external source.
    pub fn from_bytes(bytes: &[u8; EC_KEY_SIZE]) -> Self {
        let secret = StaticSecret::from(*bytes);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Get the private scalar bytes (for persistence only)
    ///
    /// ## Security Warning
    ///
    /// Only use this for the key store. Never log or transmit these bytes.
    pub fn secret_bytes(&self) -> [u8; EC_KEY_SIZE] {
        self.secret.to_bytes()
    }

    /// Get the encoded public key bytes
    pub fn public_bytes(&self) -> [u8; EC_KEY_SIZE] {
        self.public.to_bytes()
    }

    /// Derive the 32-byte symmetric key shared with `their_public`.
    ///
    /// Performs X25519 ECDH and hashes the raw shared-secret bytes with
    /// SHA-256. Both sides of an exchange compute the same key:
    /// `ours.derive(theirs_pub) == theirs.derive(ours_pub)`.
    ///
    /// ## Errors
    ///
    /// `InvalidKeyMaterial` if `their_public` is not exactly 32 bytes, or
    /// if the exchange is non-contributory (the peer key is a small-order
    /// point, yielding an all-zero shared secret).
    pub fn derive_shared_secret(&self, their_public: &[u8]) -> Result<SymmetricKey> {
        let their_public: [u8; EC_KEY_SIZE] = their_public.try_into().map_err(|_| {
            Error::InvalidKeyMaterial(format!(
                "Peer public key must be {} bytes, got {}",
                EC_KEY_SIZE,
                their_public.len()
            ))
        })?;

        let shared = self
            .secret
            .diffie_hellman(&X25519PublicKey::from(their_public));
        if !shared.was_contributory() {
            return Err(Error::InvalidKeyMaterial(
                "Peer public key is a small-order point".into(),
            ));
        }

        let digest = Sha256::digest(shared.as_bytes());
        Ok(SymmetricKey::from_bytes(digest.into()))
    }
}

/// Serde helper for serializing 32-byte key fields as lowercase hex
pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("Invalid key length"))
    }
}

// ============================================================================
// TESTS
// ============================================================================
