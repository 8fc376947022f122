//! # Key Store
//!
//! Persists and retrieves per-user, per-scheme key material, and owns the
//! get-or-create semantics both cryptographic tracks rely on.
//!
//! ## Storage Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        KEY STORE LAYOUT                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  <root>/                          (0700, owner-only)                   │
//! │  ├── paillier_public_<userId>     {"n": "...", "g": "..."}             │
//! │  ├── paillier_private_<userId>    {"lambda": "...", "mu": "..."}       │
//! │  ├── ec_public_<userId>           {"public": "<hex>"}                  │
//! │  └── ec_private_<userId>          {"private": "<hex>"}                 │
//! │                                                                         │
//! │  One JSON file per (scheme, half, user) — plain JSON, not PEM.         │
//! │  Private halves are written 0600.                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency Model
//!
//! A user has either a *complete* key record for a scheme or none:
//!
//! - Creation runs under a per-(user, scheme) exclusive lock, so two
//!   concurrent first-accesses cannot both generate; one wins and the
//!   other observes the winner's record.
//! - If persistence fails partway, every half already written for that
//!   (user, scheme) is removed before the error propagates.
//! - A partial record found on read (one half present) is cleaned up and
//!   treated as absent.
//! - A complete record that fails to parse propagates
//!   [`Error::InvalidKeyMaterial`]; the store never regenerates over
//!   possibly corrupted key material.
//!
//! One logical `KeyStore` exists per process: construct it once with its
//! storage root and pass the handle to every caller. There is no hidden
//! global instance.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::crypto::keys::{hex_bytes, EcKeyPair, EC_KEY_SIZE};
use crate::crypto::paillier::{
    self, PaillierKeyPair, PaillierPrivateKey, PaillierPublicKey, DEFAULT_KEY_BITS, MIN_KEY_BITS,
};
use crate::error::{Error, Result};

/// The cryptographic schemes the store keeps key material for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyScheme {
    /// Paillier key pair for homomorphic totals
    Paillier,
    /// X25519 key pair for envelope encryption
    Ec,
}

impl KeyScheme {
    fn prefix(self) -> &'static str {
        match self {
            KeyScheme::Paillier => "paillier",
            KeyScheme::Ec => "ec",
        }
    }
}

/// Which half of a record a file holds
#[derive(Clone, Copy)]
enum Half {
    Public,
    Private,
}

impl Half {
    fn name(self) -> &'static str {
        match self {
            Half::Public => "public",
            Half::Private => "private",
        }
    }
}

/// A complete key record for one (user, scheme) pair
pub enum KeyRecord {
    /// Paillier key pair
    Paillier(PaillierKeyPair),
    /// EC key pair
    Ec(EcKeyPair),
}

impl KeyRecord {
    /// The Paillier pair, if this record holds one
    pub fn paillier(&self) -> Option<&PaillierKeyPair> {
        match self {
            KeyRecord::Paillier(pair) => Some(pair),
            KeyRecord::Ec(_) => None,
        }
    }

    /// The EC pair, if this record holds one
    pub fn ec(&self) -> Option<&EcKeyPair> {
        match self {
            KeyRecord::Ec(pair) => Some(pair),
            KeyRecord::Paillier(_) => None,
        }
    }
}

/// Persisted form of the EC public half
#[derive(Serialize, Deserialize)]
struct EcPublicRecord {
    #[serde(with = "hex_bytes")]
    public: [u8; EC_KEY_SIZE],
}

/// Persisted form of the EC private half
#[derive(Serialize, Deserialize)]
struct EcPrivateRecord {
    #[serde(with = "hex_bytes")]
    private: [u8; EC_KEY_SIZE],
}

/// Per-user, per-scheme key persistence
///
/// See the module docs for the storage layout and consistency model.
pub struct KeyStore {
    root: PathBuf,
    paillier_bits: u64,
    /// One exclusive lock per (user, scheme); serializes key creation
    locks: Mutex<HashMap<(String, KeyScheme), Arc<Mutex<()>>>>,
}

impl KeyStore {
    /// Open (creating if needed) a key store rooted at `root`, with the
    /// default Paillier modulus size.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_key_bits(root, DEFAULT_KEY_BITS)
    }

    /// Open a key store with an explicit Paillier modulus size.
    ///
    /// Smaller-than-default sizes exist for tests; production callers
    /// should use [`KeyStore::new`].
    pub fn with_key_bits(root: impl Into<PathBuf>, paillier_bits: u64) -> Result<Self> {
        if paillier_bits < MIN_KEY_BITS || paillier_bits % 2 != 0 {
            return Err(Error::Configuration(format!(
                "Paillier modulus size must be an even number of bits >= {}, got {}",
                MIN_KEY_BITS, paillier_bits
            )));
        }

        let root = root.into();
        ensure_root(&root)?;

        Ok(Self {
            root,
            paillier_bits,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// The storage root this store was constructed with
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the persisted record for (user, scheme), generating and
    /// persisting a new one if none exists.
    ///
    /// Idempotent: once a complete record exists, this never regenerates
    /// or overwrites it. Race-free: concurrent first calls for the same
    /// (user, scheme) are serialized, so exactly one generation wins.
    pub fn get_or_create_keys(&self, user_id: &str, scheme: KeyScheme) -> Result<KeyRecord> {
        validate_user_id(user_id)?;

        let lock = self.key_lock(user_id, scheme);
        let _guard = lock.lock();

        if let Some(record) = self.load(user_id, scheme)? {
            debug!("Loaded {} key record for user {}", scheme.prefix(), user_id);
            return Ok(record);
        }
        self.generate_locked(user_id, scheme)
    }

    /// Unconditionally generate and persist a new key pair, overwriting
    /// any existing record for (user, scheme).
    ///
    /// Existing ciphertexts produced under the old keys become
    /// undecryptable; this is for fresh accounts and explicit resets,
    /// not rotation.
    pub fn generate_keys(&self, user_id: &str, scheme: KeyScheme) -> Result<KeyRecord> {
        validate_user_id(user_id)?;

        let lock = self.key_lock(user_id, scheme);
        let _guard = lock.lock();

        self.generate_locked(user_id, scheme)
    }

    /// Whether a complete record exists for (user, scheme)
    pub fn has_keys(&self, user_id: &str, scheme: KeyScheme) -> Result<bool> {
        validate_user_id(user_id)?;
        Ok(self.key_path(user_id, scheme, Half::Public).exists()
            && self.key_path(user_id, scheme, Half::Private).exists())
    }

    /// Remove the record for (user, scheme), if any.
    ///
    /// Returns whether anything was removed. Supports the account-deletion
    /// collaborator, which must remove key records along with the account.
    pub fn delete_keys(&self, user_id: &str, scheme: KeyScheme) -> Result<bool> {
        validate_user_id(user_id)?;

        let lock = self.key_lock(user_id, scheme);
        let _guard = lock.lock();

        let removed = self.remove_key_files(user_id, scheme)?;
        if removed {
            info!("Deleted {} key record for user {}", scheme.prefix(), user_id);
        }
        Ok(removed)
    }

    /// Remove every scheme's record for `user_id`.
    pub fn delete_all_keys(&self, user_id: &str) -> Result<bool> {
        let mut removed = false;
        for scheme in [KeyScheme::Paillier, KeyScheme::Ec] {
            removed |= self.delete_keys(user_id, scheme)?;
        }
        Ok(removed)
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn key_lock(&self, user_id: &str, scheme: KeyScheme) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry((user_id.to_string(), scheme))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Generate and persist a record. Caller holds the per-key lock.
    fn generate_locked(&self, user_id: &str, scheme: KeyScheme) -> Result<KeyRecord> {
        info!("Generating {} key pair for user {}", scheme.prefix(), user_id);

        let record = match scheme {
            KeyScheme::Paillier => {
                KeyRecord::Paillier(paillier::generate_keypair(self.paillier_bits)?)
            }
            KeyScheme::Ec => KeyRecord::Ec(EcKeyPair::generate()),
        };

        if let Err(err) = self.persist(user_id, scheme, &record) {
            // A caller must never observe a half-written record.
            if let Err(cleanup_err) = self.remove_key_files(user_id, scheme) {
                warn!(
                    "Failed to clean up partial {} key record for user {}: {}",
                    scheme.prefix(),
                    user_id,
                    cleanup_err
                );
            }
            return Err(err);
        }

        Ok(record)
    }

    /// Load the record for (user, scheme), treating a partial record as
    /// absent after cleaning it up.
    fn load(&self, user_id: &str, scheme: KeyScheme) -> Result<Option<KeyRecord>> {
        let public_path = self.key_path(user_id, scheme, Half::Public);
        let private_path = self.key_path(user_id, scheme, Half::Private);

        match (public_path.exists(), private_path.exists()) {
            (false, false) => Ok(None),
            (true, true) => self
                .read_record(user_id, scheme, &public_path, &private_path)
                .map(Some),
            _ => {
                warn!(
                    "Partial {} key record for user {}; removing leftovers",
                    scheme.prefix(),
                    user_id
                );
                self.remove_key_files(user_id, scheme)?;
                Ok(None)
            }
        }
    }

    fn read_record(
        &self,
        user_id: &str,
        scheme: KeyScheme,
        public_path: &Path,
        private_path: &Path,
    ) -> Result<KeyRecord> {
        let public_json = fs::read_to_string(public_path)?;
        let private_json = fs::read_to_string(private_path)?;

        match scheme {
            KeyScheme::Paillier => {
                let public: PaillierPublicKey =
                    serde_json::from_str(&public_json).map_err(|e| {
                        Error::InvalidKeyMaterial(format!(
                            "Malformed Paillier public key for user {}: {}",
                            user_id, e
                        ))
                    })?;
                let private: PaillierPrivateKey =
                    serde_json::from_str(&private_json).map_err(|e| {
                        Error::InvalidKeyMaterial(format!(
                            "Malformed Paillier private key for user {}: {}",
                            user_id, e
                        ))
                    })?;
                Ok(KeyRecord::Paillier(PaillierKeyPair { public, private }))
            }
            KeyScheme::Ec => {
                let public: EcPublicRecord = serde_json::from_str(&public_json).map_err(|e| {
                    Error::InvalidKeyMaterial(format!(
                        "Malformed EC public key for user {}: {}",
                        user_id, e
                    ))
                })?;
                let private: EcPrivateRecord =
                    serde_json::from_str(&private_json).map_err(|e| {
                        Error::InvalidKeyMaterial(format!(
                            "Malformed EC private key for user {}: {}",
                            user_id, e
                        ))
                    })?;

                // The public half is re-derived from the scalar; the stored
                // copy must agree or the record is corrupt.
                let pair = EcKeyPair::from_bytes(&private.private);
                if pair.public_bytes() != public.public {
                    return Err(Error::InvalidKeyMaterial(format!(
                        "EC key record for user {} is inconsistent",
                        user_id
                    )));
                }
                Ok(KeyRecord::Ec(pair))
            }
        }
    }

    /// Write both halves, private first, each owner-only.
    fn persist(&self, user_id: &str, scheme: KeyScheme, record: &KeyRecord) -> Result<()> {
        let (public_json, private_json) = match record {
            KeyRecord::Paillier(pair) => (
                serde_json::to_string(&pair.public)?,
                serde_json::to_string(&pair.private)?,
            ),
            KeyRecord::Ec(pair) => (
                serde_json::to_string(&EcPublicRecord {
                    public: pair.public_bytes(),
                })?,
                serde_json::to_string(&EcPrivateRecord {
                    private: pair.secret_bytes(),
                })?,
            ),
        };

        write_half(&self.key_path(user_id, scheme, Half::Private), &private_json)?;
        write_half(&self.key_path(user_id, scheme, Half::Public), &public_json)?;
        Ok(())
    }

    fn remove_key_files(&self, user_id: &str, scheme: KeyScheme) -> Result<bool> {
        let mut removed = false;
        for half in [Half::Private, Half::Public] {
            let path = self.key_path(user_id, scheme, half);
            match fs::remove_file(&path) {
                Ok(()) => removed = true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }

    fn key_path(&self, user_id: &str, scheme: KeyScheme, half: Half) -> PathBuf {
        self.root
            .join(format!("{}_{}_{}", scheme.prefix(), half.name(), user_id))
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// User ids become file-name components, so only a conservative character
/// set is accepted.
fn validate_user_id(user_id: &str) -> Result<()> {
    let valid = !user_id.is_empty()
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'));
    if !valid {
        return Err(Error::Storage(format!(
            "Invalid key-store user id: {:?}",
            user_id
        )));
    }
    Ok(())
}

/// Create the root directory owner-only, widening permissions only as
/// needed to keep it writable.
fn ensure_root(root: &Path) -> Result<()> {
    if !root.exists() {
        fs::create_dir_all(root)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(root, fs::Permissions::from_mode(0o700))?;
        }
    }

    let metadata = fs::metadata(root)?;
    if !metadata.is_dir() {
        return Err(Error::Storage(format!(
            "Key store root {} is not a directory",
            root.display()
        )));
    }

    let mut permissions = metadata.permissions();
    if permissions.readonly() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            permissions.set_mode(0o700);
        }
        #[cfg(not(unix))]
        permissions.set_readonly(false);
        fs::set_permissions(root, permissions)?;
    }
    Ok(())
}

/// Write one record half with owner-only permission.
fn write_half(path: &Path, json: &str) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::envelope::{self, EnvelopeMode};
    use crate::crypto::paillier::{add_encrypted, decrypt, encrypt};
    use num_bigint::BigUint;

    const TEST_BITS: u64 = 128;

    fn test_store(dir: &tempfile::TempDir) -> KeyStore {
        KeyStore::with_key_bits(dir.path().join("keys"), TEST_BITS).unwrap()
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);

        let first = store.get_or_create_keys("user-42", KeyScheme::Paillier).unwrap();
        let second = store.get_or_create_keys("user-42", KeyScheme::Paillier).unwrap();

        let first = first.paillier().unwrap();
        let second = second.paillier().unwrap();
        assert_eq!(first.public, second.public);
        // PaillierPrivateKey intentionally does not implement Debug (secret
        // material), so assert on the equality directly rather than via assert_eq!.
        assert!(first.private == second.private);
    }

    #[test]
    fn test_get_or_create_round_trips_through_paillier() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);

        let record = store.get_or_create_keys("alice", KeyScheme::Paillier).unwrap();
        let pair = record.paillier().unwrap();

        let c1 = encrypt(&BigUint::from(10u32), &pair.public).unwrap();
        let c2 = encrypt(&BigUint::from(100u32), &pair.public).unwrap();
        let sum = add_encrypted(&c1, &c2, &pair.public).unwrap();

        assert_eq!(
            decrypt(&sum, &pair.private, &pair.public).unwrap(),
            BigUint::from(110u32)
        );
    }

    #[test]
    fn test_get_or_create_is_race_free() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);

        let moduli: Vec<BigUint> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        let record = store
                            .get_or_create_keys("user-42", KeyScheme::Paillier)
                            .unwrap();
                        record.paillier().unwrap().public.n.clone()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        // Exactly one generation won; every caller observed it.
        assert!(moduli.windows(2).all(|w| w[0] == w[1]));

        let persisted = store
            .get_or_create_keys("user-42", KeyScheme::Paillier)
            .unwrap();
        assert_eq!(persisted.paillier().unwrap().public.n, moduli[0]);
    }

    #[test]
    fn test_generate_keys_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);

        let old = store.get_or_create_keys("bob", KeyScheme::Paillier).unwrap();
        let new = store.generate_keys("bob", KeyScheme::Paillier).unwrap();
        assert_ne!(
            old.paillier().unwrap().public.n,
            new.paillier().unwrap().public.n
        );

        let current = store.get_or_create_keys("bob", KeyScheme::Paillier).unwrap();
        assert_eq!(
            current.paillier().unwrap().public.n,
            new.paillier().unwrap().public.n
        );
    }

    #[test]
    fn test_ec_record_round_trips_through_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);

        let created = store.get_or_create_keys("carol", KeyScheme::Ec).unwrap();
        let sealed = envelope::encrypt(
            b"carol@example.org",
            &created.ec().unwrap().public_bytes(),
            EnvelopeMode::Aead,
        )
        .unwrap();

        // Reload from disk and decrypt with the persisted private half.
        let reloaded = store.get_or_create_keys("carol", KeyScheme::Ec).unwrap();
        let opened = envelope::decrypt(&sealed, reloaded.ec().unwrap()).unwrap();
        assert_eq!(opened, b"carol@example.org");
    }

    #[test]
    fn test_partial_record_is_cleaned_up_and_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);

        store.get_or_create_keys("dave", KeyScheme::Paillier).unwrap();
        let public_path = store.key_path("dave", KeyScheme::Paillier, Half::Public);
        fs::remove_file(&public_path).unwrap();

        let regenerated = store.get_or_create_keys("dave", KeyScheme::Paillier).unwrap();
        assert!(regenerated.paillier().is_some());
        assert!(store.has_keys("dave", KeyScheme::Paillier).unwrap());
    }

    #[test]
    fn test_corrupt_record_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);

        store.get_or_create_keys("erin", KeyScheme::Paillier).unwrap();
        let private_path = store.key_path("erin", KeyScheme::Paillier, Half::Private);
        fs::write(&private_path, "{\"lambda\": \"oops\"}").unwrap();

        let result = store.get_or_create_keys("erin", KeyScheme::Paillier);
        assert!(matches!(result, Err(Error::InvalidKeyMaterial(_))));

        // The corrupt record stays in place; it is never silently
        // regenerated.
        assert!(store.has_keys("erin", KeyScheme::Paillier).unwrap());
    }

    #[test]
    fn test_inconsistent_ec_record_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);

        store.get_or_create_keys("frank", KeyScheme::Ec).unwrap();
        let public_path = store.key_path("frank", KeyScheme::Ec, Half::Public);
        let other = EcKeyPair::generate();
        let forged = serde_json::to_string(&EcPublicRecord {
            public: other.public_bytes(),
        })
        .unwrap();
        fs::write(&public_path, forged).unwrap();

        let result = store.get_or_create_keys("frank", KeyScheme::Ec);
        assert!(matches!(result, Err(Error::InvalidKeyMaterial(_))));
    }

    #[test]
    fn test_delete_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);

        store.get_or_create_keys("grace", KeyScheme::Paillier).unwrap();
        store.get_or_create_keys("grace", KeyScheme::Ec).unwrap();

        assert!(store.delete_keys("grace", KeyScheme::Paillier).unwrap());
        assert!(!store.delete_keys("grace", KeyScheme::Paillier).unwrap());
        assert!(!store.has_keys("grace", KeyScheme::Paillier).unwrap());

        assert!(store.delete_all_keys("grace").unwrap());
        assert!(!store.has_keys("grace", KeyScheme::Ec).unwrap());
        assert!(!store.delete_all_keys("grace").unwrap());
    }

    #[test]
    fn test_file_layout_matches_contract() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);

        store.get_or_create_keys("user-1", KeyScheme::Paillier).unwrap();
        store.get_or_create_keys("user-1", KeyScheme::Ec).unwrap();

        for name in [
            "paillier_public_user-1",
            "paillier_private_user-1",
            "ec_public_user-1",
            "ec_private_user-1",
        ] {
            assert!(store.root().join(name).exists(), "missing {}", name);
        }

        let ec_public: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.root().join("ec_public_user-1")).unwrap())
                .unwrap();
        assert!(ec_public["public"].as_str().unwrap().len() == EC_KEY_SIZE * 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_private_halves_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);
        store.get_or_create_keys("heidi", KeyScheme::Ec).unwrap();

        let root_mode = fs::metadata(store.root()).unwrap().permissions().mode();
        assert_eq!(root_mode & 0o777, 0o700);

        let private_path = store.key_path("heidi", KeyScheme::Ec, Half::Private);
        let mode = fs::metadata(&private_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_invalid_user_ids_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir);

        for bad in ["", "../evil", "a/b", "a\\b", "user id"] {
            let result = store.get_or_create_keys(bad, KeyScheme::Ec);
            assert!(matches!(result, Err(Error::Storage(_))), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_degenerate_key_bits_rejected_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        let result = KeyStore::with_key_bits(dir.path().join("keys"), 33);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
