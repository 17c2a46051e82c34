//! # lectern-core: Domain Logic for Lectern
//!
//! This crate is the **heart** of Lectern. It holds the library domain types,
//! the field validation rules, and the Loan Engine that enforces every
//! borrowing invariant.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Lectern Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    lectern-api (axum)                           │   │
//! │  │   /books  /readers  /rent_book  /return_book  /login           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ lectern-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  engine   │  │   store   │  │ validation│  │   │
//! │  │   │   Book    │  │LoanEngine │  │  traits   │  │   rules   │  │   │
//! │  │   │   Loan    │  │ borrow    │  │ LoanTx    │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO DATABASE • NO NETWORK • STORAGE VIA TRAITS ONLY           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  lectern-db (Database Layer)                    │   │
//! │  │        SQLite queries, migrations, SqliteLibraryStore           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Book, Reader, Loan, Librarian, update structs)
//! - [`error`] - Domain error taxonomy (NotFound, Conflict, Validation, StorageFailure)
//! - [`validation`] - Field validation rules
//! - [`store`] - Storage contracts consumed by the Loan Engine
//! - [`engine`] - The Loan Engine (borrow, return, outstanding listing)
//! - [`memory`] - In-memory store implementing the storage contracts
//!
//! ## Example Usage
//!
//! ```rust
//! use lectern_core::engine::LoanEngine;
//! use lectern_core::memory::MemoryStore;
//!
//! # tokio_test();
//! # fn tokio_test() {
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let store = MemoryStore::new();
//! let book = store.add_book("Refactoring", "Martin Fowler", 1).await;
//! let reader = store.add_reader("John Doe", "john.doe@example.com").await;
//!
//! let engine = LoanEngine::new(store.clone());
//! let loan = engine.borrow_book(book.id, reader.id).await.unwrap();
//! assert!(loan.is_outstanding());
//! # });
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod memory;
pub mod store;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use engine::LoanEngine;
pub use error::{Conflict, CoreError, CoreResult, Entity, ValidationError};
pub use store::{LibraryStore, LoanTransaction};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of outstanding loans a reader may hold at once.
pub const MAX_OUTSTANDING_LOANS: i64 = 3;

/// Copies assigned to a new book when the request does not say.
pub const DEFAULT_COPIES: i64 = 1;

/// Page size used when a listing request gives no `limit`.
pub const DEFAULT_PAGE_LIMIT: i64 = 10;

/// Largest page a listing request may ask for.
pub const MAX_PAGE_LIMIT: i64 = 100;
