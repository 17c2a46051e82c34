//! # Domain Types
//!
//! Core domain types used throughout Lectern.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Book       │   │      Loan       │   │     Reader      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  book_id (FK)   │   │  id             │       │
//! │  │  title, author  │   │  reader_id (FK) │──►│  name           │       │
//! │  │  isbn (unique)  │   │  borrow_date    │   │  email (unique) │       │
//! │  │  copies_avail.  │   │  return_date?   │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  NewBook/Reader │   │   BookUpdate    │   │   Librarian     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  create input   │   │  Option<field>  │   │  email (unique) │       │
//! │  │  validate()     │   │  per column     │   │  password_hash  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Partial Updates
//! Update requests are explicit structs with one `Option` per column. For a
//! nullable column the field is `Option<Option<T>>`:
//! - key absent → `None` (leave unchanged)
//! - key `null` → `Some(None)` (clear)
//! - key set    → `Some(Some(v))`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Conflict, CoreResult};
use crate::validation::{self, ValidationResult};
use crate::{DEFAULT_COPIES, DEFAULT_PAGE_LIMIT};

// =============================================================================
// Book
// =============================================================================

/// A catalog record and its available-copy counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Book {
    /// System-assigned identifier.
    pub id: i64,

    pub title: String,

    pub author: String,

    pub year_published: Option<i32>,

    /// Unique when present.
    pub isbn: Option<String>,

    /// Copies not covered by an outstanding loan. Never negative.
    pub copies_available: i64,

    pub description: Option<String>,
}

impl Book {
    /// Checks if at least one copy can be lent out.
    #[inline]
    pub fn is_available(&self) -> bool {
        self.copies_available >= 1
    }
}

/// Fields for a new catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub year_published: Option<i32>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default = "default_copies")]
    pub copies_available: i64,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_copies() -> i64 {
    DEFAULT_COPIES
}

impl NewBook {
    /// Creates a request with the default copy count and no optional fields.
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        NewBook {
            title: title.into(),
            author: author.into(),
            year_published: None,
            isbn: None,
            copies_available: DEFAULT_COPIES,
            description: None,
        }
    }

    /// Sets the ISBN.
    pub fn isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = Some(isbn.into());
        self
    }

    /// Sets the number of copies.
    pub fn copies(mut self, copies: i64) -> Self {
        self.copies_available = copies;
        self
    }

    /// Sets the publication year.
    pub fn year(mut self, year: i32) -> Self {
        self.year_published = Some(year);
        self
    }

    /// Checks every field rule.
    pub fn validate(&self) -> ValidationResult<()> {
        validation::validate_title(&self.title)?;
        validation::validate_author(&self.author)?;
        if let Some(isbn) = &self.isbn {
            validation::validate_isbn(isbn)?;
        }
        validation::validate_copies(self.copies_available)?;
        Ok(())
    }
}

/// Partial update of a catalog record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BookUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub year_published: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub isbn: Option<Option<String>>,
    #[serde(default)]
    pub copies_available: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

impl BookUpdate {
    /// Applies the present fields to `book` and validates the result.
    pub fn apply(&self, mut book: Book) -> ValidationResult<Book> {
        if let Some(title) = &self.title {
            book.title = title.clone();
        }
        if let Some(author) = &self.author {
            book.author = author.clone();
        }
        if let Some(year) = self.year_published {
            book.year_published = year;
        }
        if let Some(isbn) = &self.isbn {
            book.isbn = isbn.clone();
        }
        if let Some(copies) = self.copies_available {
            book.copies_available = copies;
        }
        if let Some(description) = &self.description {
            book.description = description.clone();
        }

        validation::validate_title(&book.title)?;
        validation::validate_author(&book.author)?;
        if let Some(isbn) = &book.isbn {
            validation::validate_isbn(isbn)?;
        }
        validation::validate_copies(book.copies_available)?;
        Ok(book)
    }
}

// =============================================================================
// Reader
// =============================================================================

/// A library patron. Read-only from the Loan Engine's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Reader {
    pub id: i64,
    pub name: String,
    /// Unique across readers.
    pub email: String,
}

/// Fields for a new reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReader {
    pub name: String,
    pub email: String,
}

impl NewReader {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        NewReader {
            name: name.into(),
            email: email.into(),
        }
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validation::validate_reader_name(&self.name)?;
        validation::validate_email(&self.email)?;
        Ok(())
    }
}

/// Partial update of a reader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReaderUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl ReaderUpdate {
    /// Applies the present fields to `reader` and validates the result.
    pub fn apply(&self, mut reader: Reader) -> ValidationResult<Reader> {
        if let Some(name) = &self.name {
            reader.name = name.clone();
        }
        if let Some(email) = &self.email {
            reader.email = validation::normalize_email(email);
        }

        validation::validate_reader_name(&reader.name)?;
        validation::validate_email(&reader.email)?;
        Ok(reader)
    }
}

// =============================================================================
// Loan
// =============================================================================

/// One physical borrow event linking a reader to a book.
///
/// ```text
///   outstanding ──(return_book)──► returned
///   one-way, one-shot: a returned loan is never reused
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Loan {
    pub id: i64,
    pub book_id: i64,
    pub reader_id: i64,
    pub borrow_date: DateTime<Utc>,
    /// `None` while the loan is outstanding.
    pub return_date: Option<DateTime<Utc>>,
}

impl Loan {
    /// A loan is outstanding iff it has no return date.
    #[inline]
    pub fn is_outstanding(&self) -> bool {
        self.return_date.is_none()
    }

    /// Performs the outstanding to returned transition.
    ///
    /// ## Returns
    /// * `Ok(())` - `return_date` is now `at`
    /// * `Err(Conflict::NoActiveLoan)` - the loan was already returned;
    ///   the record is left untouched
    pub fn mark_returned(&mut self, at: DateTime<Utc>) -> CoreResult<()> {
        if !self.is_outstanding() {
            return Err(Conflict::NoActiveLoan {
                book_id: self.book_id,
                reader_id: self.reader_id,
            }
            .into());
        }
        self.return_date = Some(at);
        Ok(())
    }
}

// =============================================================================
// Librarian
// =============================================================================

/// A staff account allowed to call mutating operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Librarian {
    pub id: i64,
    pub email: String,
    /// PHC-format hash. Never serialized.
    #[serde(skip_serializing)]
    pub password_hash: String,
}

// =============================================================================
// Pagination
// =============================================================================

/// Offset pagination window for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    /// Creates a validated page window.
    pub fn new(skip: i64, limit: i64) -> ValidationResult<Self> {
        validation::validate_page(skip, limit)?;
        Ok(Page { skip, limit })
    }
}

impl Default for Page {
    fn default() -> Self {
        Page {
            skip: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

// =============================================================================
// Serde Helpers
// =============================================================================

/// Maps a present key to `Some(value)`, so `null` becomes `Some(None)`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// =============================================================================
// Unit Tests
// =============================================================================
