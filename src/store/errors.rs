// ============================================================================
// Store Errors
// ============================================================================

/// Failures reported by a backing store.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("order not found: {0}")]
    NotFound(String),

    #[error("order already exists: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("backing store unavailable: {0}")]
    Unavailable(String),

    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        operation: &'static str,
        attempts: u32,
        source: Box<RepositoryError>,
    },
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound(_))
    }

    /// Read-path retry classifier: a missing record is a logical absence and
    /// is never retried; every other failure is treated as transient.
    pub fn is_retryable(&self) -> bool {
        !self.is_not_found()
    }
}

/// Connection-level failures mean the database could not be reached at all;
/// anything else is an error reported by the database.
impl From<sqlx::Error> for RepositoryError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                RepositoryError::Unavailable(error.to_string())
            }
            other => RepositoryError::Database(other),
        }
    }
}

/// Outcome of a cache-aside store operation that did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("order not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Backend(RepositoryError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<RepositoryError> for StoreError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(id) => StoreError::NotFound(id),
            other => StoreError::Backend(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_not_found_is_permanent() {
        assert!(!RepositoryError::NotFound("a".into()).is_retryable());
        assert!(RepositoryError::Conflict("a".into()).is_retryable());
        assert!(RepositoryError::Unavailable("timeout".into()).is_retryable());
        assert!(RepositoryError::Database(sqlx::Error::PoolTimedOut).is_retryable());
    }

    #[test]
    fn test_not_found_stays_distinct_through_store_error() {
        let err: StoreError = RepositoryError::NotFound("abc".into()).into();
        assert!(err.is_not_found());

        let err: StoreError = RepositoryError::Unavailable("down".into()).into();
        assert!(matches!(err, StoreError::Backend(_)));
        assert_eq!(err.to_string(), "backing store unavailable: down");
    }

    #[test]
    fn test_connection_failures_map_to_unavailable() {
        let err = RepositoryError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, RepositoryError::Unavailable(_)));
        assert!(err.is_retryable());

        let err = RepositoryError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, RepositoryError::Database(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn test_exhausted_retries_message() {
        let err = RepositoryError::RetriesExhausted {
            operation: "get",
            attempts: 3,
            source: Box::new(RepositoryError::Unavailable("connection refused".into())),
        };
        assert_eq!(
            err.to_string(),
            "get failed after 3 attempts: backing store unavailable: connection refused"
        );
    }
}
