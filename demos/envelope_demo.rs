//! Envelope encryption demo: seal PII fields to a user's public key,
//! open them with the private key, and show AEAD tamper detection.
//!
//! Run with: `cargo run --example envelope_demo`

use veil_core::crypto::envelope::{self, EnvelopeMode};
use veil_core::{EciesEnvelope, KeyScheme, KeyStore, Result};

fn main() -> Result<()> {
    let dir = tempfile::tempdir().map_err(veil_core::Error::from)?;
    let store = KeyStore::new(dir.path().join("keys"))?;

    let record = store.get_or_create_keys("user-1", KeyScheme::Ec)?;
    let ec = record.ec().expect("ec record");

    // Seal each PII field separately, the way a registration flow would.
    let fields = [
        ("name", "Ada Lovelace"),
        ("email", "ada@example.org"),
        ("phone", "+44 20 7946 0101"),
    ];

    let mut sealed = Vec::new();
    for (name, value) in fields {
        let wire = envelope::encrypt(value.as_bytes(), &ec.public_bytes(), EnvelopeMode::Aead)?
            .encode()?;
        println!("{:>5}: {} bytes of envelope", name, wire.len());
        sealed.push((name, wire));
    }

    // Open them all; a login flow proceeds with whatever decrypts.
    let borrowed: Vec<(&str, &str)> = sealed
        .iter()
        .map(|(name, wire)| (*name, wire.as_str()))
        .collect();
    for (name, outcome) in envelope::decrypt_fields(borrowed, ec) {
        match outcome {
            Ok(plain) => println!("{:>5}: {}", name, String::from_utf8_lossy(&plain)),
            Err(err) => println!("{:>5}: <failed: {}>", name, err),
        }
    }

    // Flip one ciphertext bit: the AEAD envelope must refuse to open.
    let mut tampered = EciesEnvelope::decode(&sealed[0].1)?;
    tampered.ciphertext[0] ^= 0x01;
    match envelope::decrypt(&tampered, ec) {
        Ok(_) => unreachable!("tampering must not go undetected"),
        Err(err) => println!("Tampered envelope rejected: {}", err),
    }

    Ok(())
}
