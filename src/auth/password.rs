use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString, rand_core::OsRng,
    },
};

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};

const ARGON2_MEMORY_KIB: u32 = 19 * 1024;
const ARGON2_ITERATIONS: u32 = 2;
const ARGON2_PARALLELISM: u32 = 1;
const ARGON2_OUTPUT_LEN: usize = 32;

const DUMMY_PASSWORD: &str = "memolink-no-such-account";

/// Salted Argon2id hashing for account passwords.
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    /// Stand-in hash checked when there is no account, so a miss costs the
    /// same as a wrong password.
    dummy_hash: OnceLock<String>,
    verifications: AtomicU64,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher {
    #[must_use]
    pub fn new() -> Self {
        let params = Params::new(
            ARGON2_MEMORY_KIB,
            ARGON2_ITERATIONS,
            ARGON2_PARALLELISM,
            Some(ARGON2_OUTPUT_LEN),
        )
        .expect("invalid argon2 params");

        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            dummy_hash: OnceLock::new(),
            verifications: AtomicU64::new(0),
        }
    }

    /// Hashes a password with a fresh random salt, in PHC string format.
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Config(format!("failed to hash password: {e}")))?;
        Ok(hash.to_string())
    }

    /// Returns false for a wrong password and for a hash that cannot be parsed.
    #[must_use]
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        self.verifications.fetch_add(1, Ordering::Relaxed);
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            tracing::warn!("Stored password hash is not in PHC format");
            return false;
        };

        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Runs a full verification against the stand-in hash. Always false.
    pub fn verify_dummy(&self, password: &str) -> bool {
        let dummy = self.dummy_hash.get_or_init(|| {
            self.hash(DUMMY_PASSWORD).unwrap_or_else(|e| {
                tracing::error!(error = %e, "Could not build stand-in password hash");
                String::new()
            })
        });
        self.verify(password, dummy);
        false
    }

    /// Number of password verifications run so far.
    pub fn verifications(&self) -> u64 {
        self.verifications.load(Ordering::Relaxed)
    }
}
