use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("email or password do not match")]
    InvalidCredentials,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("not found")]
    NotFound,

    #[error("memory limit of {limit} reached")]
    QuotaExceeded { limit: i64 },

    #[error("email already registered")]
    DuplicateEmail,

    #[error("node creation failed")]
    CreationFailed,

    #[error("upstream failure: {message}")]
    Upstream { message: String, retryable: bool },

    #[error("{0} timed out")]
    Timeout(&'static str),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            retryable: false,
        }
    }

    /// Whether repeating the same call later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout(_) => true,
            Error::Upstream { retryable, .. } => *retryable,
            Error::Database(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_are_retryable() {
        assert!(Error::Timeout("image storage").is_retryable());
        assert!(!Error::NotFound.is_retryable());
        assert!(!Error::upstream("bad request").is_retryable());
    }

    #[test]
    fn test_busy_database_is_retryable() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(Error::Database(busy).is_retryable());
    }

    #[test]
    fn test_quota_message_contains_limit() {
        let err = Error::QuotaExceeded { limit: 30 };
        assert!(err.to_string().contains("30"));
    }
}
