//! # Error Handling
//!
//! This module provides the error types for Veil Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Configuration       - Unusable crypto parameters (fatal)          │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── InvalidKeyMaterial  - Malformed or missing key fields         │
//! │  │   ├── ValueRange          - Plaintext/ciphertext outside domain     │
//! │  │   ├── KeyMismatch         - Homomorphic operands vs. wrong modulus  │
//! │  │   ├── DecryptionIntegrity - AEAD tag verification failure           │
//! │  │   └── EncryptionFailed    - Symmetric primitive failure             │
//! │  │                                                                      │
//! │  └── Storage Errors                                                    │
//! │      ├── Storage             - I/O failure on key records              │
//! │      └── Serialization       - JSON/base64 encode/decode failure       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for Veil Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Veil Core
///
/// Errors are categorized by the contract they break, so callers can
/// distinguish "your input was out of range" from "your key record is
/// corrupt" from "this ciphertext has been tampered with".
#[derive(Error, Debug)]
pub enum Error {
    /// Crypto parameters are unusable; no operation can proceed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed, missing, or structurally invalid key fields
    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// A plaintext or ciphertext integer lies outside its valid domain
    #[error("Value out of range: {0}")]
    ValueRange(String),

    /// Homomorphic operands are inconsistent with the supplied public key
    #[error("Key mismatch: {0}")]
    KeyMismatch(String),

    /// AEAD tag verification failed; no plaintext is returned
    #[error("Decryption integrity check failed")]
    DecryptionIntegrity,

    /// A symmetric primitive rejected its inputs
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// I/O failure reading or writing key records
    #[error("Storage error: {0}")]
    Storage(String),

    /// Wire-form or key-record encoding failure
    #[error("Serialization error: {0}")]
    Serialization(String),
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = Error::ValueRange("plaintext must be in [0, n)".into());
        assert!(err.to_string().contains("[0, n)"));

        let err = Error::DecryptionIntegrity;
        assert_eq!(err.to_string(), "Decryption integrity check failed");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn test_serde_error_conversion() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json");
        let err: Error = bad.unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
