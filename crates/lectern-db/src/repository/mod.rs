//! # Repository Module
//!
//! Database repository implementations for Lectern.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │  db.books().list(page)                                         │
//! │       ▼                                                                 │
//! │  BookRepository                                                        │
//! │  ├── create / get_by_id / list                                         │
//! │  └── update / delete           (own transaction, row locked first)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Loan mutations never go through a repository: they belong to the     │
//! │  Loan Engine, which reaches the same SQL through SqliteLibraryStore.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Functions taking `&mut SqliteConnection` are shared between the
//! repositories (pool connection) and the loan store (open transaction).

pub mod book;
pub mod librarian;
pub mod loan;
pub mod reader;

pub use book::BookRepository;
pub use librarian::LibrarianRepository;
pub use loan::LoanRepository;
pub use reader::ReaderRepository;
