use std::sync::Arc;

use chrono::Duration;

use super::password::PasswordHasher;
use super::reset::ResetTokens;
use super::token::{AccessToken, AccessTokens, Claims};
use crate::error::Result;
use crate::store::Store;

/// Password hashing plus the access and reset token lifecycles.
pub struct CredentialService {
    passwords: PasswordHasher,
    access: AccessTokens,
    reset: ResetTokens,
}

impl CredentialService {
    pub fn new(
        store: Arc<dyn Store>,
        jwt_secret: &[u8],
        access_ttl: Duration,
        reset_ttl: Duration,
    ) -> Self {
        Self {
            passwords: PasswordHasher::new(),
            access: AccessTokens::new(jwt_secret, access_ttl),
            reset: ResetTokens::new(store, reset_ttl),
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        self.passwords.hash(password)
    }

    #[must_use]
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        self.passwords.verify(password, hash)
    }

    /// Pays the cost of a password check for a login with no matching
    /// account. Always false.
    pub fn reject_password(&self, password: &str) -> bool {
        self.passwords.verify_dummy(password)
    }

    pub fn password_verifications(&self) -> u64 {
        self.passwords.verifications()
    }

    pub fn issue_access_token(
        &self,
        user_id: &str,
        email: Option<&str>,
        ttl: Option<Duration>,
    ) -> Result<AccessToken> {
        self.access.issue(user_id, email, ttl)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims> {
        self.access.verify(token)
    }

    pub fn issue_reset_token(&self, user_id: &str) -> Result<String> {
        self.reset.issue(user_id)
    }

    pub fn verify_reset_token(&self, token: &str) -> Result<String> {
        self.reset.verify(token)
    }

    pub fn consume_reset_token(&self, token: &str) -> Result<()> {
        self.reset.consume(token)
    }
}
