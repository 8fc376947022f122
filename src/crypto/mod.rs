//! # Cryptography Module
//!
//! The two cryptographic tracks of the system and the primitives behind
//! them.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Track 1: Homomorphic totals (Paillier)                                │
//! │  ──────────────────────────────────────                                 │
//! │  1024-bit modulus, g = n + 1 variant.                                  │
//! │  Enc(m₁) · Enc(m₂) mod n²  decrypts to  m₁ + m₂ mod n, so sums are     │
//! │  computed server-side without ever seeing a value.                     │
//! │                                                                         │
//! │  Track 2: Confidential fields (ECIES envelopes)                        │
//! │  ──────────────────────────────────────────────                         │
//! │  1. Key Agreement: X25519 ECDH, ephemeral key per message             │
//! │     ephemeral_private × recipient_public → shared secret              │
//! │  2. Key Derivation: SHA-256(shared secret) → 256-bit key              │
//! │  3. Payload: AES-256-GCM (default) or ChaCha20 (legacy stream)        │
//! │     • 96-bit random nonce per message                                 │
//! │     • 128-bit authentication tag (AEAD mode)                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices & Rationale
//!
//! | Algorithm | Purpose | Why Chosen |
//! |-----------|---------|------------|
//! | Paillier (g = n+1) | Homomorphic sums | Additive homomorphism, simple μ |
//! | X25519 | Key exchange | Fast ECDH, no point-validation pitfalls |
//! | AES-256-GCM | Envelope payload | Hardware acceleration, AEAD |
//! | ChaCha20 | Legacy envelopes | Pre-existing data, opt-in only |
//! | SHA-256 | Secret derivation | Fixed hash of the raw DH output |

pub mod envelope;
pub mod keys;
pub mod paillier;
pub mod symmetric;

pub use envelope::{EciesEnvelope, EnvelopeMode};
pub use keys::{EcKeyPair, EC_KEY_SIZE};
pub use paillier::{
    PaillierCiphertext, PaillierKeyPair, PaillierPrivateKey, PaillierPublicKey, DEFAULT_KEY_BITS,
};
pub use symmetric::{Nonce, SymmetricKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
