use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Public base URL for external access (e.g., "https://api.memolink.app").
    /// Signed storage URLs are built on top of it.
    pub public_base_url: String,
    /// HS256 secret for access tokens. A random one is generated when unset.
    pub jwt_secret: Option<String>,
    pub access_token_ttl_minutes: i64,
    pub reset_token_ttl_minutes: i64,
    pub signed_url_ttl_seconds: i64,
    /// Where the web app lives; reset emails link into it.
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
    pub max_body_bytes: usize,
    pub max_inline_image_bytes: usize,
    pub upstream_timeout_seconds: u64,
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub from_email: String,
    /// Without a key, reset emails are written to the log instead.
    pub sendgrid_api_key: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from_email: "noreply@memolink.app".to_string(),
            sendgrid_api_key: None,
        }
    }
}

impl ServerConfig {
    /// Reads a TOML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str(&content)
                    .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup("MEMOLINK_JWT_SECRET") {
            self.jwt_secret = Some(secret);
        }
        if let Some(key) = lookup("MEMOLINK_SENDGRID_API_KEY") {
            self.mail.sendgrid_api_key = Some(key);
        }
        if let Some(url) = lookup("MEMOLINK_FRONTEND_URL") {
            self.frontend_url = url;
        }
        if let Some(url) = lookup("MEMOLINK_PUBLIC_BASE_URL") {
            self.public_base_url = url;
        }
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("memolink.db")
    }

    #[must_use]
    pub fn access_token_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_ttl_minutes)
    }

    #[must_use]
    pub fn reset_token_ttl(&self) -> Duration {
        Duration::minutes(self.reset_token_ttl_minutes)
    }

    #[must_use]
    pub fn signed_url_ttl(&self) -> Duration {
        Duration::seconds(self.signed_url_ttl_seconds)
    }

    #[must_use]
    pub fn upstream_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.upstream_timeout_seconds)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            public_base_url: "http://127.0.0.1:8080".to_string(),
            jwt_secret: None,
            access_token_ttl_minutes: 30,
            reset_token_ttl_minutes: 60,
            signed_url_ttl_seconds: 900,
            frontend_url: "http://localhost:3000".to_string(),
            cors_origins: Vec::new(),
            max_body_bytes: 16 * 1024 * 1024,
            max_inline_image_bytes: 8 * 1024 * 1024,
            upstream_timeout_seconds: 10,
            mail: MailConfig::default(),
        }
    }
}
