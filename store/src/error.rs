//! Error types for palette-billing storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("not found")]
    NotFound,

    /// Insufficient credits for a debit.
    #[error("insufficient credits: free={free}, purchased={purchased}")]
    InsufficientCredits {
        /// Free credits remaining.
        free: i64,
        /// Purchased credits remaining.
        purchased: i64,
    },

    /// Effect already claimed (idempotency).
    ///
    /// Callers treat this as "already handled", not as a failure.
    #[error("duplicate effect: {key}")]
    DuplicateEffect {
        /// The encoded effect key that was already claimed.
        key: String,
    },
}
