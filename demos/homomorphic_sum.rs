//! Homomorphic addition demo: a server totals encrypted values it cannot
//! read.
//!
//! Run with: `cargo run --example homomorphic_sum`

use num_bigint::BigUint;
use veil_core::crypto::paillier;
use veil_core::{KeyScheme, KeyStore, Result};

fn main() -> Result<()> {
    let dir = tempfile::tempdir().map_err(veil_core::Error::from)?;
    let store = KeyStore::new(dir.path().join("keys"))?;

    let record = store.get_or_create_keys("user-1", KeyScheme::Paillier)?;
    let pair = record.paillier().expect("paillier record");

    let values = [10u32, 100, 55];
    println!("Plain values: {:?}", values);

    let encrypted: Vec<_> = values
        .iter()
        .map(|v| paillier::encrypt(&BigUint::from(*v), &pair.public))
        .collect::<Result<_>>()?;

    for (value, ciphertext) in values.iter().zip(&encrypted) {
        let wire = ciphertext.to_decimal();
        println!("Enc({:>3}) = {}...{}", value, &wire[..24], &wire[wire.len() - 8..]);
    }

    // ((10 + 100) + 55), computed entirely on ciphertexts.
    let partial = paillier::add_encrypted(&encrypted[0], &encrypted[1], &pair.public)?;
    let total = paillier::add_encrypted(&partial, &encrypted[2], &pair.public)?;

    let decrypted = paillier::decrypt(&total, &pair.private, &pair.public)?;
    println!("Decrypted sum: {}", decrypted);
    assert_eq!(decrypted, BigUint::from(165u32));

    Ok(())
}
