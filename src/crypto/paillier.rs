//! # Paillier Cryptosystem
//!
//! Additively homomorphic public-key encryption: multiplying two
//! ciphertexts modulo n² yields a ciphertext of the *sum* of their
//! plaintexts, so a server can total encrypted values it cannot read.
//!
//! ## Scheme
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      PAILLIER OPERATIONS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Key generation                                                        │
//! │    p, q   ← random primes of bits/2 each                               │
//! │    n      = p · q          g = n + 1                                   │
//! │    λ      = lcm(p−1, q−1)  μ = λ⁻¹ mod n                               │
//! │                                                                         │
//! │  Encrypt m ∈ [0, n)                                                    │
//! │    r ← random ∈ [1, n−1]                                               │
//! │    c = g^m · r^n mod n²                                                │
//! │                                                                         │
//! │  Decrypt c ∈ [0, n²)                                                   │
//! │    m = L(c^λ mod n²) · μ mod n      where L(u) = (u−1)/n               │
//! │                                                                         │
//! │  Add (homomorphic)                                                     │
//! │    c₁ ⊕ c₂ = c₁ · c₂ mod n²    ⇒   Dec(c₁ ⊕ c₂) = m₁ + m₂ mod n       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `g = n + 1` is the simplified variant where `L(g^λ mod n²) = 1`, which
//! lets μ be computed directly as `λ⁻¹ mod n`. It is as secure as the
//! general form and standard practice for same-length p, q.
//!
//! Ciphertexts and key fields exceed native integer width, so the
//! canonical external encoding everywhere is a base-10 decimal string.

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_prime::nt_funcs::is_prime;
use num_prime::PrimalityTestConfig;
use num_traits::One;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Default modulus size in bits (two 512-bit primes)
pub const DEFAULT_KEY_BITS: u64 = 1024;

/// Smallest modulus size accepted by key generation.
///
/// Anything near this floor is for tests only; real deployments use
/// [`DEFAULT_KEY_BITS`] or larger.
pub const MIN_KEY_BITS: u64 = 64;

/// Paillier public key
///
/// Invariant: `g = n + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaillierPublicKey {
    /// Modulus n = p·q
    #[serde(with = "decimal")]
    pub n: BigUint,
    /// Generator g = n + 1
    #[serde(with = "decimal")]
    pub g: BigUint,
}

impl PaillierPublicKey {
    /// n², the ciphertext modulus
    pub fn n_squared(&self) -> BigUint {
        &self.n * &self.n
    }
}

/// Paillier private key
///
/// λ is the Carmichael function of n; μ its inverse mod n. Both are
/// secret; the struct intentionally does not implement `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaillierPrivateKey {
    /// λ = lcm(p−1, q−1)
    #[serde(with = "decimal")]
    pub lambda: BigUint,
    /// μ = λ⁻¹ mod n
    #[serde(with = "decimal")]
    pub mu: BigUint,
}

/// A generated Paillier key pair
#[derive(Clone, PartialEq, Eq)]
pub struct PaillierKeyPair {
    /// Public half, safe to share
    pub public: PaillierPublicKey,
    /// Private half
    pub private: PaillierPrivateKey,
}

/// A Paillier ciphertext: a big integer in `[0, n²)`
///
/// Carries no key fingerprint; callers track which public key produced
/// which ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaillierCiphertext(BigUint);

impl PaillierCiphertext {
    /// Parse the canonical decimal-string form
    pub fn from_decimal(s: &str) -> Result<Self> {
        let value = BigUint::from_str(s.trim())
            .map_err(|e| Error::Serialization(format!("Invalid ciphertext encoding: {}", e)))?;
        Ok(Self(value))
    }

    /// Render the canonical decimal-string form
    pub fn to_decimal(&self) -> String {
        self.0.to_str_radix(10)
    }

    /// The raw integer value
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }
}

impl fmt::Display for PaillierCiphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal())
    }
}

impl FromStr for PaillierCiphertext {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_decimal(s)
    }
}

// ============================================================================
// KEY GENERATION
// ============================================================================

/// Generate a Paillier key pair with a modulus of `bits` bits.
///
/// Draws two independent, distinct primes of `bits/2` each, so n has bit
/// length `bits` or `bits − 1`.
///
/// ## Errors
///
/// `Configuration` if `bits` is odd or below [`MIN_KEY_BITS`];
/// `InvalidKeyMaterial` in the (practically unreachable) case that λ is
/// not invertible mod n.
pub fn generate_keypair(bits: u64) -> Result<PaillierKeyPair> {
    if bits < MIN_KEY_BITS || bits % 2 != 0 {
        return Err(Error::Configuration(format!(
            "Paillier modulus size must be an even number of bits >= {}, got {}",
            MIN_KEY_BITS, bits
        )));
    }

    let half = bits / 2;
    let p = generate_prime(half);
    let mut q = generate_prime(half);
    while q == p {
        q = generate_prime(half);
    }

    let n = &p * &q;
    let g = &n + BigUint::one();
    let lambda = (&p - BigUint::one()).lcm(&(&q - BigUint::one()));
    let mu = lambda.modinv(&n).ok_or_else(|| {
        Error::InvalidKeyMaterial("lambda is not invertible modulo n".into())
    })?;

    Ok(PaillierKeyPair {
        public: PaillierPublicKey { n, g },
        private: PaillierPrivateKey { lambda, mu },
    })
}

/// Generate a random prime of exactly `bits` length by rejection sampling.
fn generate_prime(bits: u64) -> BigUint {
    let mut rng = OsRng;
    loop {
        let mut candidate = rng.gen_biguint(bits);
        // Force the top bit so the length is exact, and the low bit so
        // the candidate is odd.
        candidate |= BigUint::one() << (bits - 1);
        candidate |= BigUint::one();
        if is_prime(&candidate, Some(PrimalityTestConfig::default())).probably() {
            return candidate;
        }
    }
}

// ============================================================================
// ENCRYPT / DECRYPT / ADD
// ============================================================================

/// Encrypt `m` under `public`.
///
/// Randomized: repeated calls with the same plaintext produce different
/// ciphertexts, all decrypting to `m`.
///
/// ## Errors
///
/// `ValueRange` unless `0 <= m < n`.
pub fn encrypt(m: &BigUint, public: &PaillierPublicKey) -> Result<PaillierCiphertext> {
    if *m >= public.n {
        return Err(Error::ValueRange(
            "Paillier plaintext must be in [0, n)".into(),
        ));
    }

    let n_squared = public.n_squared();
    let mut rng = OsRng;
    let r = rng.gen_biguint_range(&BigUint::one(), &public.n);

    // c = g^m * r^n mod n^2
    let gm = public.g.modpow(m, &n_squared);
    let rn = r.modpow(&public.n, &n_squared);
    Ok(PaillierCiphertext((gm * rn) % n_squared))
}

/// Decrypt `c` under the matching key pair.
///
/// ## Errors
///
/// `ValueRange` unless `0 <= c < n²`.
pub fn decrypt(
    c: &PaillierCiphertext,
    private: &PaillierPrivateKey,
    public: &PaillierPublicKey,
) -> Result<BigUint> {
    let n_squared = public.n_squared();
    if c.0 >= n_squared {
        return Err(Error::ValueRange(
            "Paillier ciphertext must be in [0, n^2)".into(),
        ));
    }

    // m = L(c^lambda mod n^2) * mu mod n, where L(u) = (u - 1) / n
    let u = c.0.modpow(&private.lambda, &n_squared);
    let l = (u - BigUint::one()) / &public.n;
    Ok((l * &private.mu) % &public.n)
}

/// Homomorphically add two ciphertexts: `Dec(add(c1, c2)) = m1 + m2 mod n`.
///
/// Both operands must have been produced under the same `n`; the core
/// cannot verify provenance, but an operand outside `[0, n²)` is
/// structurally inconsistent with this key and is rejected.
///
/// ## Errors
///
/// `KeyMismatch` if either operand lies outside `[0, n²)`.
pub fn add_encrypted(
    c1: &PaillierCiphertext,
    c2: &PaillierCiphertext,
    public: &PaillierPublicKey,
) -> Result<PaillierCiphertext> {
    let n_squared = public.n_squared();
    if c1.0 >= n_squared || c2.0 >= n_squared {
        return Err(Error::KeyMismatch(
            "ciphertext is not in [0, n^2) for the supplied public key".into(),
        ));
    }
    Ok(PaillierCiphertext((&c1.0 * &c2.0) % n_squared))
}

// ============================================================================
// CANONICAL DECIMAL ENCODING
// ============================================================================

/// Serde helper serializing big integers as base-10 decimal strings.
///
/// This is the documented canonical encoding for every big-integer field
/// in key records and ciphertexts; fixed-width native integers cannot
/// hold 1024+-bit values.
pub(crate) mod decimal {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub fn serialize<S>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BigUint::from_str(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn small_keypair() -> PaillierKeyPair {
        generate_keypair(256).unwrap()
    }

    #[test]
    fn test_keypair_invariants() {
        let kp = small_keypair();
        assert_eq!(kp.public.g, &kp.public.n + BigUint::one());

        // mu * lambda == 1 mod n
        let product = (&kp.private.mu * &kp.private.lambda) % &kp.public.n;
        assert_eq!(product, BigUint::one());
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let kp = small_keypair();
        let m = BigUint::from(55u32);

        let c = encrypt(&m, &kp.public).unwrap();
        let recovered = decrypt(&c, &kp.private, &kp.public).unwrap();

        assert_eq!(recovered, m);
    }

    #[test]
    fn test_encryption_is_randomized() {
        let kp = small_keypair();
        let m = BigUint::from(42u32);

        let c1 = encrypt(&m, &kp.public).unwrap();
        let c2 = encrypt(&m, &kp.public).unwrap();

        assert_ne!(c1, c2);
        assert_eq!(decrypt(&c1, &kp.private, &kp.public).unwrap(), m);
        assert_eq!(decrypt(&c2, &kp.private, &kp.public).unwrap(), m);
    }

    #[test]
    fn test_homomorphic_addition() {
        let kp = small_keypair();

        let c1 = encrypt(&BigUint::from(10u32), &kp.public).unwrap();
        let c2 = encrypt(&BigUint::from(100u32), &kp.public).unwrap();

        let sum = add_encrypted(&c1, &c2, &kp.public).unwrap();
        let recovered = decrypt(&sum, &kp.private, &kp.public).unwrap();

        assert_eq!(recovered, BigUint::from(110u32));
    }

    #[test]
    fn test_addition_associative_and_commutative() {
        let kp = small_keypair();

        let c1 = encrypt(&BigUint::from(7u32), &kp.public).unwrap();
        let c2 = encrypt(&BigUint::from(11u32), &kp.public).unwrap();
        let c3 = encrypt(&BigUint::from(13u32), &kp.public).unwrap();

        let left = add_encrypted(&add_encrypted(&c1, &c2, &kp.public).unwrap(), &c3, &kp.public)
            .unwrap();
        let right = add_encrypted(&c1, &add_encrypted(&c2, &c3, &kp.public).unwrap(), &kp.public)
            .unwrap();
        let swapped = add_encrypted(&c2, &c1, &kp.public).unwrap();

        let expected = BigUint::from(31u32);
        assert_eq!(decrypt(&left, &kp.private, &kp.public).unwrap(), expected);
        assert_eq!(decrypt(&right, &kp.private, &kp.public).unwrap(), expected);
        assert_eq!(
            decrypt(&swapped, &kp.private, &kp.public).unwrap(),
            BigUint::from(18u32)
        );
    }

    #[test]
    fn test_addition_wraps_at_modulus() {
        let kp = generate_keypair(128).unwrap();

        let a = &kp.public.n - BigUint::one();
        let b = BigUint::from(2u32);

        let ca = encrypt(&a, &kp.public).unwrap();
        let cb = encrypt(&b, &kp.public).unwrap();
        let sum = add_encrypted(&ca, &cb, &kp.public).unwrap();

        // (n - 1 + 2) mod n == 1
        assert_eq!(
            decrypt(&sum, &kp.private, &kp.public).unwrap(),
            BigUint::one()
        );
    }

    #[test]
    fn test_generate_1024_bit_modulus() {
        let kp = generate_keypair(1024).unwrap();
        let bits = kp.public.n.bits();
        assert!((1023..=1024).contains(&bits), "n has {} bits", bits);

        let c1 = encrypt(&BigUint::from(10u32), &kp.public).unwrap();
        let c2 = encrypt(&BigUint::from(100u32), &kp.public).unwrap();
        let sum = add_encrypted(&c1, &c2, &kp.public).unwrap();
        assert_eq!(
            decrypt(&sum, &kp.private, &kp.public).unwrap(),
            BigUint::from(110u32)
        );
    }

    #[test]
    fn test_plaintext_out_of_range_rejected() {
        let kp = small_keypair();

        let result = encrypt(&kp.public.n, &kp.public);
        assert!(matches!(result, Err(Error::ValueRange(_))));
    }

    #[test]
    fn test_ciphertext_out_of_range_rejected() {
        let kp = small_keypair();

        let too_big = PaillierCiphertext(kp.public.n_squared());
        let result = decrypt(&too_big, &kp.private, &kp.public);
        assert!(matches!(result, Err(Error::ValueRange(_))));
    }

    #[test]
    fn test_add_foreign_ciphertext_rejected() {
        let kp = small_keypair();

        let valid = encrypt(&BigUint::from(5u32), &kp.public).unwrap();
        let foreign = PaillierCiphertext(kp.public.n_squared() + BigUint::one());

        let result = add_encrypted(&valid, &foreign, &kp.public);
        assert!(matches!(result, Err(Error::KeyMismatch(_))));
    }

    #[test]
    fn test_degenerate_bits_rejected() {
        assert!(matches!(
            generate_keypair(32),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            generate_keypair(129),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_key_record_json_format() {
        let kp = small_keypair();

        let public = serde_json::to_value(&kp.public).unwrap();
        assert!(public["n"].as_str().unwrap().bytes().all(|b| b.is_ascii_digit()));
        assert!(public["g"].as_str().is_some());

        let private = serde_json::to_value(&kp.private).unwrap();
        assert!(private["lambda"].as_str().is_some());
        assert!(private["mu"].as_str().is_some());

        let restored: PaillierPublicKey = serde_json::from_value(public).unwrap();
        assert_eq!(restored, kp.public);
    }

    #[test]
    fn test_ciphertext_decimal_round_trip() {
        let kp = small_keypair();
        let c = encrypt(&BigUint::from(99u32), &kp.public).unwrap();

        let wire = c.to_decimal();
        let restored = PaillierCiphertext::from_decimal(&wire).unwrap();
        assert_eq!(restored, c);

        assert!(PaillierCiphertext::from_decimal("not a number").is_err());
    }
}
