use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const TOKEN_TYPE: &str = "bearer";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
}

/// Issues and checks HS256-signed bearer tokens.
pub struct AccessTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    default_ttl: Duration,
}

impl AccessTokens {
    #[must_use]
    pub fn new(secret: &[u8], default_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            default_ttl,
        }
    }

    pub fn issue(&self, user_id: &str, email: Option<&str>, ttl: Option<Duration>) -> Result<AccessToken> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.map(str::to_string),
            iat: now.timestamp(),
            exp: (now + ttl.unwrap_or(self.default_ttl)).timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Config(format!("failed to sign token: {e}")))?;

        Ok(AccessToken {
            access_token: token,
            token_type: TOKEN_TYPE.to_string(),
        })
    }

    /// Returns the claims of a valid token. Bad signature, expiry and a
    /// missing subject all collapse into `Error::Unauthorized`.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected access token");
                Error::Unauthorized
            })?;

        if data.claims.sub.is_empty() {
            return Err(Error::Unauthorized);
        }

        Ok(data.claims)
    }
}
