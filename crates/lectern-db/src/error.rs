//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CoreError ← What the Loan Engine and the API layer branch on          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (in lectern-api) ← Serialized for HTTP clients               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use lectern_core::{Conflict, CoreError, Entity, ValidationError};
use thiserror::Error;
use tracing::error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: i64 },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate ISBN
    /// - Duplicate reader or librarian email
    /// - Second outstanding loan for the same pair
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// CHECK constraint violation (negative copy counter).
    #[error("Check constraint failed: {0}")]
    CheckViolation(String),

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Write lock not obtained within the busy timeout.
    #[error("Database is busy: {0}")]
    Busy(String),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed to begin or commit.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Input rejected before reaching SQL.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A business rule refused the write (e.g. delete while on loan).
    #[error(transparent)]
    Conflict(#[from] Conflict),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: Entity, id: i64) -> Self {
        DbError::NotFound { entity, id }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Fills in the offending value of a UniqueViolation raised on `field`.
    ///
    /// SQLite only reports the column, so the repository that issued the
    /// write supplies the value it sent.
    pub fn with_unique_value(self, field: &str, value: Option<&str>) -> Self {
        match (self, value) {
            (DbError::UniqueViolation { field: f, .. }, Some(value)) if f == field => {
                DbError::duplicate(f, value)
            }
            (other, _) => other,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::PoolClosed     → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite error messages for constraints:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>[, ...]"
                // CHECK constraint: "CHECK constraint failed: <expr>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if let Some(columns) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: unique_field(columns),
                        value: "unknown".to_string(),
                    }
                } else if msg.starts_with("CHECK constraint failed") {
                    DbError::CheckViolation(msg.to_string())
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked") || msg.contains("database is busy") {
                    DbError::Busy(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

/// `"books.isbn"` → `"isbn"`, `"loans.book_id, loans.reader_id"` → `"book_id, reader_id"`.
fn unique_field(columns: &str) -> String {
    columns
        .split(", ")
        .map(|col| col.rsplit('.').next().unwrap_or(col))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Collapse database failures into the domain taxonomy.
///
/// ```text
/// NotFound                      → CoreError::NotFound
/// UniqueViolation               → Conflict::DuplicateUniqueField
/// Validation / Conflict         → passed through
/// everything else               → CoreError::StorageFailure (logged)
/// ```
impl From<DbError> for CoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CoreError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } => {
                Conflict::DuplicateUniqueField { field, value }.into()
            }
            DbError::Validation(err) => CoreError::Validation(err),
            DbError::Conflict(conflict) => CoreError::Conflict(conflict),
            other => {
                error!(error = %other, "Storage operation failed");
                CoreError::StorageFailure(other.to_string())
            }
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
