//! # Storage Contracts
//!
//! The traits the Loan Engine consumes. lectern-core never talks to a
//! database directly; it asks a [`LibraryStore`] for a [`LoanTransaction`]
//! and runs every precondition and mutation of one operation inside it.
//!
//! ## Transaction Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   store.begin() ──► lock_book(book_id)      first statement, takes the │
//! │                     │                       write lock                 │
//! │                     ▼                                                   │
//! │                     reader_exists / count_outstanding / find_outstanding│
//! │                     │                                                   │
//! │              ┌──────┴──────┐                                            │
//! │              ▼             ▼                                            │
//! │       precondition     take_copy + insert_loan                          │
//! │       fails            (or restore_copy + mark_returned)                │
//! │              │             │                                            │
//! │              ▼             ▼                                            │
//! │       tx dropped       tx.commit()                                      │
//! │       = rollback       = all effects visible at once                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Implementations
//! - `lectern_core::memory::MemoryStore` (tests, examples)
//! - `lectern_db::SqliteLibraryStore` (production)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreResult;
use crate::types::{Book, Loan};

/// Source of loan transactions.
///
/// Cloning a store handle is expected to be cheap; the engine holds one and
/// opens a fresh transaction per operation.
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Opens a new transaction. All reads and writes made through it are
    /// isolated from concurrent transactions until `commit`.
    async fn begin(&self) -> CoreResult<Box<dyn LoanTransaction>>;
}

/// One atomic unit of work against the loan ledger.
///
/// Dropping the transaction without calling [`commit`](Self::commit) must
/// discard every change made through it.
#[async_trait]
pub trait LoanTransaction: Send {
    /// Locks the book for the rest of the transaction and returns its
    /// current state, or `None` if no such book exists.
    async fn lock_book(&mut self, book_id: i64) -> CoreResult<Option<Book>>;

    async fn reader_exists(&mut self, reader_id: i64) -> CoreResult<bool>;

    /// Number of outstanding loans held by the reader across all books.
    async fn count_outstanding(&mut self, reader_id: i64) -> CoreResult<i64>;

    /// The outstanding loan for the pair, if any.
    async fn find_outstanding(&mut self, book_id: i64, reader_id: i64)
        -> CoreResult<Option<Loan>>;

    /// Decrements `copies_available`. Fails with `NoCopiesAvailable` instead
    /// of going below zero.
    async fn take_copy(&mut self, book_id: i64) -> CoreResult<()>;

    /// Increments `copies_available`.
    async fn restore_copy(&mut self, book_id: i64) -> CoreResult<()>;

    /// Inserts an outstanding loan. Fails with `AlreadyBorrowed` if the pair
    /// already has one.
    async fn insert_loan(
        &mut self,
        book_id: i64,
        reader_id: i64,
        at: DateTime<Utc>,
    ) -> CoreResult<Loan>;

    /// Sets `return_date` on an outstanding loan. Fails with `NoActiveLoan`
    /// if the loan was returned in the meantime.
    async fn mark_returned(&mut self, loan_id: i64, at: DateTime<Utc>) -> CoreResult<Loan>;

    /// Books of every outstanding loan of the reader, oldest loan first.
    async fn outstanding_books(&mut self, reader_id: i64) -> CoreResult<Vec<Book>>;

    /// Makes every change visible at once. A failure leaves none of them.
    async fn commit(self: Box<Self>) -> CoreResult<()>;
}
