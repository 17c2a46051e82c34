//! # Error Types
//!
//! Domain-specific error types for lectern-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  lectern-core errors (this file)                                       │
//! │  ├── CoreError        - Taxonomy every caller can distinguish          │
//! │  │   ├── NotFound        Book | Reader | Loan | Librarian              │
//! │  │   ├── Conflict        see `Conflict`                                │
//! │  │   ├── Validation      see `ValidationError`                         │
//! │  │   └── StorageFailure  commit could not complete (retryable)         │
//! │  ├── Conflict         - Business rule refusals                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  lectern-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  lectern-api errors (in app)                                           │
//! │  └── ApiError         - What HTTP clients see (serialized)             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ← DbError;  CoreError → ApiError    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (book id, reader id, field)
//! 3. Errors are enum variants, never String
//! 4. Each variant maps to exactly one transport-level code

use std::fmt;

use thiserror::Error;

// =============================================================================
// Entity
// =============================================================================

/// The kinds of records a lookup can fail to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Book,
    Reader,
    Loan,
    Librarian,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Book => "Book",
            Entity::Reader => "Reader",
            Entity::Loan => "Loan",
            Entity::Librarian => "Librarian",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Conflict
// =============================================================================

/// A request that is well-formed but refused by a business rule.
///
/// ## Loan Lifecycle Conflicts
/// ```text
/// borrow_book ──► copies_available == 0      ──► NoCopiesAvailable
///             ──► reader holds 3 loans       ──► BorrowLimitExceeded
///             ──► reader already has it      ──► AlreadyBorrowed
///
/// return_book ──► no outstanding loan row    ──► NoActiveLoan
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
    /// Every copy of the book is out on loan.
    #[error("No copies of book {book_id} are available")]
    NoCopiesAvailable { book_id: i64 },

    /// The reader already holds the maximum number of outstanding loans.
    #[error("Reader {reader_id} already has the maximum of {limit} books on loan")]
    BorrowLimitExceeded { reader_id: i64, limit: i64 },

    /// Return attempted for a pair with no outstanding loan.
    #[error("Book {book_id} is not currently borrowed by reader {reader_id}, or was already returned")]
    NoActiveLoan { book_id: i64, reader_id: i64 },

    /// The reader already has an outstanding loan of this very book.
    #[error("Reader {reader_id} already has book {book_id} on loan")]
    AlreadyBorrowed { book_id: i64, reader_id: i64 },

    /// A create/update collides with a uniqueness constraint (email, isbn).
    #[error("{field} '{value}' already exists")]
    DuplicateUniqueField { field: String, value: String },

    /// A delete was refused because the record is referenced by outstanding loans.
    #[error("{entity} {id} still has books on loan")]
    OutstandingLoans { entity: Entity, id: i64 },
}

impl Conflict {
    /// Creates a DuplicateUniqueField conflict.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        Conflict::DuplicateUniqueField {
            field: field.into(),
            value: value.into(),
        }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
///
/// Every operation of the Loan Engine and of the stores reports one of
/// these, so callers can tell the taxonomy cases apart without parsing text.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: i64 },

    /// A business rule refused the operation.
    #[error(transparent)]
    Conflict(#[from] Conflict),

    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The store could not complete the operation; none of its effects persist.
    ///
    /// ## When This Occurs
    /// - Commit failed
    /// - Write lock could not be acquired within the busy timeout
    /// - Connection lost mid-transaction
    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

impl CoreError {
    /// Creates a NotFound error for a given entity and ID.
    pub fn not_found(entity: Entity, id: i64) -> Self {
        CoreError::NotFound { entity, id }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::StorageFailure(_))
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any store is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
