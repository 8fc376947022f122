//! # Hybrid Envelope Cipher (ECIES)
//!
//! Encrypts arbitrary payloads under a recipient's static public key by
//! combining ephemeral ECDH key agreement with a symmetric primitive.
//!
//! ## Encryption Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      ENVELOPE ENCRYPTION FLOW                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  1. Ephemeral key pair (fresh per message, discarded after use)        │
//! │                                                                         │
//! │  2. ECDH: ephemeral_private × recipient_public → shared secret         │
//! │     SHA-256(shared secret) → 32-byte symmetric key                     │
//! │                                                                         │
//! │  3. Random 12-byte nonce                                               │
//! │                                                                         │
//! │  4. Symmetric encryption, selected by mode:                            │
//! │     AEAD   → AES-256-GCM   (ciphertext + 16-byte tag)                  │
//! │     STREAM → ChaCha20      (ciphertext only, legacy/opt-in)            │
//! │                                                                         │
//! │  Output: Envelope { mode, ephemeral public key, nonce, tag?, data }    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The envelope is opaque and self-describing: it carries everything
//! needed to decrypt knowing only the recipient's private key. Discarding
//! the ephemeral private key after encryption gives per-message forward
//! secrecy.
//!
//! The external wire form is base64 of a JSON object:
//! `{"mode", "ephemeral_public_key", "nonce", "tag"?, "data"}` with
//! base64-encoded binary fields.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::crypto::keys::{EcKeyPair, EC_KEY_SIZE};
use crate::crypto::symmetric::{self, Nonce, NONCE_SIZE, TAG_SIZE};
use crate::error::{Error, Result};

/// Which symmetric primitive seals the envelope
///
/// STREAM provides confidentiality only — no tamper detection — and is
/// kept as a legacy/opt-in mode. AEAD is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvelopeMode {
    /// AES-256-GCM: confidentiality + integrity
    #[default]
    #[serde(rename = "AEAD")]
    Aead,
    /// ChaCha20: confidentiality only
    #[serde(rename = "STREAM")]
    Stream,
}

/// A sealed envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EciesEnvelope {
    /// Symmetric primitive used for the payload
    pub mode: EnvelopeMode,
    /// Public half of the single-use key pair
    pub ephemeral_public_key: [u8; EC_KEY_SIZE],
    /// Nonce used by the symmetric primitive
    pub nonce: Nonce,
    /// Authentication tag; present iff `mode` is AEAD
    pub tag: Option<[u8; TAG_SIZE]>,
    /// Encrypted payload
    pub ciphertext: Vec<u8>,
}

/// External wire form of an envelope
#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    mode: EnvelopeMode,
    ephemeral_public_key: String,
    nonce: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
    data: String,
}

impl EciesEnvelope {
    /// Encode to the external wire form: base64 of the JSON object.
    pub fn encode(&self) -> Result<String> {
        let wire = WireEnvelope {
            mode: self.mode,
            ephemeral_public_key: BASE64.encode(self.ephemeral_public_key),
            nonce: BASE64.encode(self.nonce.as_bytes()),
            tag: self.tag.map(|t| BASE64.encode(t)),
            data: BASE64.encode(&self.ciphertext),
        };
        Ok(BASE64.encode(serde_json::to_vec(&wire)?))
    }

    /// Decode and structurally validate the external wire form.
    ///
    /// ## Errors
    ///
    /// `Serialization` for malformed base64/JSON, wrong field lengths, or
    /// a tag that is missing in AEAD mode / present in STREAM mode.
    pub fn decode(encoded: &str) -> Result<Self> {
        let json = BASE64
            .decode(encoded.trim())
            .map_err(|e| Error::Serialization(format!("Invalid envelope base64: {}", e)))?;
        let wire: WireEnvelope = serde_json::from_slice(&json)?;

        let ephemeral_public_key: [u8; EC_KEY_SIZE] = decode_field(&wire.ephemeral_public_key)?
            .try_into()
            .map_err(|_| {
                Error::Serialization("Ephemeral public key must be 32 bytes".into())
            })?;
        let nonce: [u8; NONCE_SIZE] = decode_field(&wire.nonce)?
            .try_into()
            .map_err(|_| Error::Serialization("Nonce must be 12 bytes".into()))?;

        let tag = match (wire.mode, wire.tag) {
            (EnvelopeMode::Aead, Some(t)) => {
                let t: [u8; TAG_SIZE] = decode_field(&t)?
                    .try_into()
                    .map_err(|_| Error::Serialization("Tag must be 16 bytes".into()))?;
                Some(t)
            }
            (EnvelopeMode::Aead, None) => {
                return Err(Error::Serialization(
                    "AEAD envelope is missing its authentication tag".into(),
                ))
            }
            (EnvelopeMode::Stream, None) => None,
            (EnvelopeMode::Stream, Some(_)) => {
                return Err(Error::Serialization(
                    "STREAM envelope must not carry a tag".into(),
                ))
            }
        };

        Ok(Self {
            mode: wire.mode,
            ephemeral_public_key,
            nonce: Nonce::from_bytes(nonce),
            tag,
            ciphertext: decode_field(&wire.data)?,
        })
    }
}

fn decode_field(encoded: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(encoded)
        .map_err(|e| Error::Serialization(format!("Invalid envelope field base64: {}", e)))
}

// ============================================================================
// ENCRYPT / DECRYPT
// ============================================================================

/// Seal `plaintext` for the holder of `recipient_public`.
///
/// A fresh ephemeral key pair is generated for this one message and
/// dropped before returning.
pub fn encrypt(
    plaintext: &[u8],
    recipient_public: &[u8],
    mode: EnvelopeMode,
) -> Result<EciesEnvelope> {
    let ephemeral = EcKeyPair::generate();
    let key = ephemeral.derive_shared_secret(recipient_public)?;
    let nonce = Nonce::random();

    let (ciphertext, tag) = match mode {
        EnvelopeMode::Aead => {
            let (ciphertext, tag) = symmetric::aead_encrypt(&key, &nonce, plaintext)?;
            (ciphertext, Some(tag))
        }
        EnvelopeMode::Stream => (symmetric::stream_encrypt(&key, &nonce, plaintext)?, None),
    };

    Ok(EciesEnvelope {
        mode,
        ephemeral_public_key: ephemeral.public_bytes(),
        nonce,
        tag,
        ciphertext,
    })
}

/// Open an envelope with the recipient's key pair.
///
/// ## Errors
///
/// `DecryptionIntegrity` if an AEAD tag does not verify; no plaintext is
/// returned in that case. STREAM envelopes decrypt unconditionally and
/// offer no tamper detection.
pub fn decrypt(envelope: &EciesEnvelope, recipient: &EcKeyPair) -> Result<Vec<u8>> {
    let key = recipient.derive_shared_secret(&envelope.ephemeral_public_key)?;

    match envelope.mode {
        EnvelopeMode::Aead => {
            let tag = envelope.tag.as_ref().ok_or_else(|| {
                Error::Serialization("AEAD envelope is missing its authentication tag".into())
            })?;
            symmetric::aead_decrypt(&envelope.ciphertext, &key, &envelope.nonce, tag)
        }
        EnvelopeMode::Stream => symmetric::stream_decrypt(&envelope.ciphertext, &key, &envelope.nonce),
    }
}

/// Decrypt a batch of named, wire-encoded envelopes, one outcome per
/// field.
///
/// A failure on one field never aborts the batch; callers (an
/// authentication flow loading a user's PII fields, say) proceed with
/// the fields that succeeded and handle the rest per their own policy.
pub fn decrypt_fields<'a, I>(fields: I, recipient: &EcKeyPair) -> Vec<(&'a str, Result<Vec<u8>>)>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    fields
        .into_iter()
        .map(|(name, encoded)| {
            let outcome =
                EciesEnvelope::decode(encoded).and_then(|envelope| decrypt(&envelope, recipient));
            if let Err(ref err) = outcome {
                warn!("Failed to decrypt field {}: {}", name, err);
            }
            (name, outcome)
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
