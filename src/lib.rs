//! # Veil Core
//!
//! A privacy core library that protects personally identifiable data and
//! enables arithmetic on encrypted values without decrypting them.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         VEIL CORE MODULES                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Caller (web app, auth flow, reporting job)                            │
//! │        │ user id + plaintext                  │ ciphertext out         │
//! │        ▼                                      ▲                        │
//! │  ┌──────────────────────┐      ┌──────────────────────────────────┐    │
//! │  │      Key Store       │      │            Crypto                │    │
//! │  │                      │      │                                  │    │
//! │  │ - get-or-create      │─────►│  paillier:  Enc/Dec/⊕ (sums     │    │
//! │  │ - per-key locking    │ keys │             over ciphertexts)    │    │
//! │  │ - all-or-nothing     │      │  envelope:  ECIES (X25519 +      │    │
//! │  │   persistence        │      │             AES-GCM / ChaCha20)  │    │
//! │  │ - 0600/0700 files    │      │  keys:      ECDH agreement       │    │
//! │  └──────────────────────┘      │  symmetric: wrapped primitives   │    │
//! │                                └──────────────────────────────────┘    │
//! │                                                                         │
//! │  Homomorphic addition touches only ciphertexts + a public key; it      │
//! │  never goes near the Key Store.                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - The two cryptographic tracks and their primitives
//!   - [`crypto::paillier`] - Additively homomorphic encryption
//!   - [`crypto::keys`] - EC key pairs and ECDH agreement
//!   - [`crypto::envelope`] - Hybrid ECIES envelopes
//!   - [`crypto::symmetric`] - Wrapped AEAD and stream primitives
//! - [`keystore`] - Per-user, per-scheme key persistence
//!
//! ## Usage
//!
//! ```ignore
//! let store = KeyStore::new("/var/lib/veil/keys")?;
//!
//! // Homomorphic track: total encrypted salaries server-side.
//! let record = store.get_or_create_keys("user-42", KeyScheme::Paillier)?;
//! let pair = record.paillier().expect("paillier record");
//! let base = paillier::encrypt(&BigUint::from(52_000u32), &pair.public)?;
//! let bonus = paillier::encrypt(&BigUint::from(4_500u32), &pair.public)?;
//! let gross = paillier::add_encrypted(&base, &bonus, &pair.public)?;
//! assert_eq!(
//!     paillier::decrypt(&gross, &pair.private, &pair.public)?,
//!     BigUint::from(56_500u32)
//! );
//!
//! // Envelope track: seal a PII field for the same user.
//! let record = store.get_or_create_keys("user-42", KeyScheme::Ec)?;
//! let ec = record.ec().expect("ec record");
//! let sealed = envelope::encrypt(b"ada@example.org", &ec.public_bytes(), EnvelopeMode::Aead)?;
//! let wire = sealed.encode()?; // opaque blob for the caller's own storage
//! ```
//!
//! The `KeyStore` is constructed once at process start and passed by
//! handle to every caller; there is no global instance.

pub mod crypto;
pub mod error;
pub mod keystore;

// Re-export the primary types at the crate root
pub use crypto::envelope::{EciesEnvelope, EnvelopeMode};
pub use crypto::keys::EcKeyPair;
pub use crypto::paillier::{PaillierCiphertext, PaillierKeyPair, PaillierPublicKey};
pub use error::{Error, Result};
pub use keystore::{KeyRecord, KeyScheme, KeyStore};
