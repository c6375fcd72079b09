use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::PasswordResetToken;

const TOKEN_BYTES: usize = 32;

/// Single-use, time-limited tokens for the forgot-password flow.
///
/// Only a SHA-256 digest is persisted; the plaintext leaves this type once,
/// as the return value of `issue`.
pub struct ResetTokens {
    store: Arc<dyn Store>,
    ttl: Duration,
}

impl ResetTokens {
    pub fn new(store: Arc<dyn Store>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn issue(&self, user_id: &str) -> Result<String> {
        let token = generate_token();
        let now = Utc::now();

        self.store.create_reset_token(&PasswordResetToken {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            token_hash: digest(&token),
            created_at: now,
            expires_at: now + self.ttl,
            used: false,
        })?;

        tracing::info!(user_id, "Issued password reset token");
        Ok(token)
    }

    /// Resolves the owning user id. Unknown, used and expired tokens are all
    /// reported as `Error::InvalidToken`.
    pub fn verify(&self, token: &str) -> Result<String> {
        let Some(record) = self.store.get_reset_token(&digest(token))? else {
            tracing::debug!("Reset token not found");
            return Err(Error::InvalidToken);
        };

        if record.used {
            tracing::info!(user_id = %record.user_id, "Reset token already used");
            return Err(Error::InvalidToken);
        }
        if !record.is_valid_at(Utc::now()) {
            tracing::info!(user_id = %record.user_id, "Reset token expired");
            return Err(Error::InvalidToken);
        }

        Ok(record.user_id)
    }

    /// Marks the token used. A second call fails with `Error::InvalidToken`.
    pub fn consume(&self, token: &str) -> Result<()> {
        if self.store.mark_reset_token_used(&digest(token))? {
            Ok(())
        } else {
            Err(Error::InvalidToken)
        }
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
