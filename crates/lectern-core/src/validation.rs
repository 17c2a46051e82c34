//! # Validation Module
//!
//! Input validation rules for catalog, reader and librarian fields.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (axum Json / Query)                           │
//! │  └── Type validation (deserialization)                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Lengths, ranges, formats                                          │
//! │  └── Runs before any store is touched                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (copies_available >= 0)                                     │
//! │  ├── UNIQUE (isbn, email)                                              │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use lectern_core::validation::{validate_isbn, validate_copies};
//!
//! validate_isbn("9780132350884").unwrap();
//! validate_copies(3).unwrap();
//! assert!(validate_copies(-1).is_err());
//! ```

use crate::error::ValidationError;
use crate::MAX_PAGE_LIMIT;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Upper bound for free-text fields (title, author, name, email).
pub const MAX_TEXT_LEN: usize = 255;

pub const MIN_ISBN_LEN: usize = 9;
pub const MAX_ISBN_LEN: usize = 13;

pub const MAX_PASSWORD_LEN: usize = 128;

// =============================================================================
// String Validators
// =============================================================================

/// Required text of 1 to `MAX_TEXT_LEN` characters.
fn validate_text(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        });
    }

    Ok(())
}

/// Validates a book title.
pub fn validate_title(title: &str) -> ValidationResult<()> {
    validate_text("title", title)
}

/// Validates a book author.
pub fn validate_author(author: &str) -> ValidationResult<()> {
    validate_text("author", author)
}

/// Validates a reader's display name.
pub fn validate_reader_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name)
}

/// Validates an ISBN.
///
/// ## Rules
/// - Between 9 and 13 characters
/// - No checksum verification
///
/// ## Example
/// ```rust
/// use lectern_core::validation::validate_isbn;
///
/// assert!(validate_isbn("9780132350884").is_ok());
/// assert!(validate_isbn("12345").is_err());
/// ```
pub fn validate_isbn(isbn: &str) -> ValidationResult<()> {
    let len = isbn.chars().count();

    if len < MIN_ISBN_LEN {
        return Err(ValidationError::TooShort {
            field: "isbn".to_string(),
            min: MIN_ISBN_LEN,
        });
    }

    if len > MAX_ISBN_LEN {
        return Err(ValidationError::TooLong {
            field: "isbn".to_string(),
            max: MAX_ISBN_LEN,
        });
    }

    Ok(())
}

/// Canonical stored form of an email: surrounding whitespace removed,
/// lowercased. Uniqueness and login lookups compare this form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates an email address.
///
/// ## Rules
/// - At most 255 characters
/// - Exactly one `@` with a non-empty local part
/// - Domain contains a dot that is neither first nor last
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    if email.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_TEXT_LEN,
        });
    }

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| invalid("missing '@'"))?;

    if local.is_empty() || domain.contains('@') {
        return Err(invalid("expected exactly one '@' after a local part"));
    }

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace"));
    }

    match domain.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < domain.len() && !domain.starts_with('.') => Ok(()),
        _ => Err(invalid("domain must contain a dot")),
    }
}

/// Validates a librarian password (1 to 128 characters).
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    if password.chars().count() > MAX_PASSWORD_LEN {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: MAX_PASSWORD_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a copy count. Zero is allowed, negative is not.
pub fn validate_copies(copies: i64) -> ValidationResult<()> {
    if copies < 0 {
        return Err(ValidationError::OutOfRange {
            field: "copies_available".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a system-assigned identifier supplied by a caller.
pub fn validate_id(field: &str, id: i64) -> ValidationResult<()> {
    if id < 1 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a listing window.
pub fn validate_page(skip: i64, limit: i64) -> ValidationResult<()> {
    if skip < 0 {
        return Err(ValidationError::OutOfRange {
            field: "skip".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_PAGE_LIMIT,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
