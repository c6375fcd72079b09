use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignedMethod {
    Get,
    Put,
}

impl SignedMethod {
    fn as_str(self) -> &'static str {
        match self {
            SignedMethod::Get => "GET",
            SignedMethod::Put => "PUT",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SignedUrl {
    pub signed_url: String,
    pub path: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues time-limited storage URLs bound to one object and one HTTP method.
pub struct UrlSigner {
    key: Vec<u8>,
    base_url: String,
    ttl: Duration,
}

impl UrlSigner {
    pub fn new(key: &[u8], base_url: &str, ttl: Duration) -> Self {
        Self {
            key: key.to_vec(),
            base_url: base_url.trim_end_matches('/').to_string(),
            ttl,
        }
    }

    fn mac(&self, method: SignedMethod, user_id: &str, file_name: &str, expires: i64) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("hmac accepts any key length");
        mac.update(b"storage\n");
        mac.update(method.as_str().as_bytes());
        mac.update(b"\n");
        mac.update(user_id.as_bytes());
        mac.update(b"/");
        mac.update(file_name.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac
    }

    #[must_use]
    pub fn sign(&self, method: SignedMethod, user_id: &str, file_name: &str) -> SignedUrl {
        self.sign_at(method, user_id, file_name, Utc::now())
    }

    #[must_use]
    pub fn sign_at(
        &self,
        method: SignedMethod,
        user_id: &str,
        file_name: &str,
        now: DateTime<Utc>,
    ) -> SignedUrl {
        let expires_at = now + self.ttl;
        let expires = expires_at.timestamp();
        let signature = hex::encode(
            self.mac(method, user_id, file_name, expires)
                .finalize()
                .into_bytes(),
        );

        SignedUrl {
            signed_url: format!(
                "{}/storage/{}/{}?expires={expires}&signature={signature}",
                self.base_url,
                urlencoding::encode(user_id),
                urlencoding::encode(file_name),
            ),
            path: format!("{user_id}/{file_name}"),
            expires_at,
        }
    }

    /// Constant-time check of the signature plus the expiry.
    #[must_use]
    pub fn verify(
        &self,
        method: SignedMethod,
        user_id: &str,
        file_name: &str,
        expires: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> bool {
        if expires <= now.timestamp() {
            return false;
        }
        let Ok(signature) = hex::decode(signature) else {
            return false;
        };

        self.mac(method, user_id, file_name, expires)
            .verify_slice(&signature)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> UrlSigner {
        UrlSigner::new(b"key", "http://localhost:8080/", Duration::minutes(15))
    }

    fn query_param<'a>(url: &'a str, name: &str) -> &'a str {
        url.split(['?', '&'])
            .find_map(|part| part.strip_prefix(&format!("{name}=")))
            .unwrap()
    }

    #[test]
    fn test_signed_url_verifies() {
        let signer = signer();
        let now = Utc::now();
        let url = signer.sign_at(SignedMethod::Put, "u-1", "beach.png", now);

        assert!(url.signed_url.starts_with("http://localhost:8080/storage/u-1/beach.png?"));
        assert_eq!(url.path, "u-1/beach.png");

        let expires: i64 = query_param(&url.signed_url, "expires").parse().unwrap();
        let signature = query_param(&url.signed_url, "signature");

        assert!(signer.verify(SignedMethod::Put, "u-1", "beach.png", expires, signature, now));
        assert!(!signer.verify(SignedMethod::Get, "u-1", "beach.png", expires, signature, now));
        assert!(!signer.verify(SignedMethod::Put, "u-2", "beach.png", expires, signature, now));
        assert!(!signer.verify(SignedMethod::Put, "u-1", "beach.png", expires + 1, signature, now));
    }

    #[test]
    fn test_expired_url_rejected() {
        let signer = signer();
        let now = Utc::now();
        let url = signer.sign_at(SignedMethod::Get, "u-1", "beach.png", now);
        let expires: i64 = query_param(&url.signed_url, "expires").parse().unwrap();
        let signature = query_param(&url.signed_url, "signature");

        let later = now + Duration::minutes(16);
        assert!(!signer.verify(SignedMethod::Get, "u-1", "beach.png", expires, signature, later));
    }

    #[test]
    fn test_garbage_signature_rejected() {
        let signer = signer();
        let expires = (Utc::now() + Duration::minutes(1)).timestamp();
        assert!(!signer.verify(SignedMethod::Get, "u-1", "a.png", expires, "zz", Utc::now()));
    }
}
