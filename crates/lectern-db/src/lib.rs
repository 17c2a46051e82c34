//! # lectern-db: Database Layer for Lectern
//!
//! This crate provides all database operations for the library backend.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         lectern-db Structure                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                        Database                                 │   │
//! │  │  (Main entry point - holds connection pool)                     │   │
//! │  │                                                                 │   │
//! │  │   db.books()      → BookRepository                              │   │
//! │  │   db.readers()    → ReaderRepository                            │   │
//! │  │   db.loans()      → LoanRepository (history, read-only)         │   │
//! │  │   db.librarians() → LibrarianRepository                         │   │
//! │  │   db.loan_engine()→ LoanEngine<SqliteLibraryStore>              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                              │                                          │
//! │                              ▼                                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      SqlitePool                                 │   │
//! │  │  WAL mode • foreign keys • busy timeout                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                              │                                          │
//! │                              ▼                                          │
//! │                     lectern.db (SQLite)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lectern_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./lectern.db")).await?;
//!
//! let loan = db.loan_engine().borrow_book(book_id, reader_id).await?;
//! let books = db.books().list(Page::default()).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{BookRepository, LibrarianRepository, LoanRepository, ReaderRepository};
pub use store::{SqliteLibraryStore, SqliteLoanTransaction};
