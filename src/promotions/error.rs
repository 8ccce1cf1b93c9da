// Error types for promotions
// Infrastructure and input failures. Validity failures are values, see `InvalidReason`.

use thiserror::Error;

/// Main error type for promotion operations
#[derive(Debug, Error)]
pub enum PromoError {
    /// Database operation errors
    /// Automatically converted from sqlx::Error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failures when preparing the schema
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Administrative input failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No live discount code with this code string
    #[error("Discount code not found: {0}")]
    CodeNotFound(String),

    /// No live discount code with this id
    #[error("Discount code not found: id {0}")]
    CodeIdNotFound(i32),

    /// No live pre-sale offer with this id
    #[error("Pre-sale offer not found: {0}")]
    OfferNotFound(i32),

    /// A code with this string already exists
    #[error("Discount code already exists: {0}")]
    DuplicateCode(String),
}

/// Result type alias for promotion operations
pub type PromoResult<T> = Result<T, PromoError>;

impl From<validator::ValidationErrors> for PromoError {
    fn from(err: validator::ValidationErrors) -> Self {
        PromoError::Validation(err.to_string())
    }
}

impl PromoError {
    /// Map a unique-constraint violation on `code` to `DuplicateCode`
    pub(crate) fn from_insert(err: sqlx::Error, code: &str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                PromoError::DuplicateCode(code.to_string())
            }
            _ => PromoError::Database(err),
        }
    }
}
