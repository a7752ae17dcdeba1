//! Error types for lease operations and store adapters

/// Error returned by a [`LockStore`](crate::store::LockStore) implementation
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("unexpected reply: {0}")]
    Protocol(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Error type for lease acquisition and release
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("lock '{key}' is held by another owner")]
    LockHeld { key: String },

    #[error("lease '{key}' is no longer owned by {owner}")]
    NotOwner { key: String, owner: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid usage: {0}")]
    Usage(String),
}

impl LockError {
    /// Whether a fresh attempt may succeed without any change on the caller side.
    ///
    /// Contention and dropped connections are transient; ownership loss and
    /// API misuse are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LockError::LockHeld { .. } | LockError::Store(StoreError::Connection(_))
        )
    }

    pub(crate) fn usage(message: impl Into<String>) -> Self {
        LockError::Usage(message.into())
    }
}

pub type Result<T> = std::result::Result<T, LockError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LockError::LockHeld {
            key: "orders".to_string(),
        };
        assert_eq!(err.to_string(), "lock 'orders' is held by another owner");

        let err = LockError::NotOwner {
            key: "orders".to_string(),
            owner: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "lease 'orders' is no longer owned by abc");

        let err = LockError::usage("lease is not held");
        assert_eq!(err.to_string(), "invalid usage: lease is not held");

        let err: LockError = StoreError::Connection("refused".to_string()).into();
        assert_eq!(err.to_string(), "store error: connection error: refused");
    }

    #[test]
    fn test_is_retryable() {
        assert!(
            LockError::LockHeld {
                key: "k".to_string()
            }
            .is_retryable()
        );
        assert!(LockError::Store(StoreError::Connection("reset".to_string())).is_retryable());
        assert!(!LockError::Store(StoreError::Backend("NOSCRIPT".to_string())).is_retryable());
        assert!(!LockError::usage("double unlock").is_retryable());
        assert!(
            !LockError::NotOwner {
                key: "k".to_string(),
                owner: "o".to_string()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_from_anyhow() {
        let err: StoreError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, StoreError::Other(_)));
        assert_eq!(err.to_string(), "boom");
    }
}
