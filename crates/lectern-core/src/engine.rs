//! # Loan Engine
//!
//! The only component that mutates the loan ledger and the book copy
//! counters. Every operation runs inside one [`LoanTransaction`], so the
//! precondition checks and the mutations that follow them are a single
//! atomic unit.
//!
//! ## Borrow Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  borrow_book(book_id, reader_id)                                        │
//! │                                                                         │
//! │  1. lock_book          None          ──► NotFound(Book)                │
//! │  2. reader_exists      false         ──► NotFound(Reader)              │
//! │  3. copies_available   0             ──► NoCopiesAvailable             │
//! │  4. count_outstanding  >= 3          ──► BorrowLimitExceeded           │
//! │  5. find_outstanding   Some          ──► AlreadyBorrowed               │
//! │                                                                         │
//! │  take_copy + insert_loan + commit    ──► Loan (outstanding)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Return Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  return_book(book_id, reader_id)                                        │
//! │                                                                         │
//! │  1. find_outstanding   None          ──► NoActiveLoan                  │
//! │  2. lock_book          None          ──► NotFound(Book)                │
//! │                                                                         │
//! │  restore_copy + mark_returned + commit ──► Loan (Returned)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed check returns early and drops the transaction, which rolls it
//! back. Nothing is ever half-applied.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{Conflict, CoreError, CoreResult, Entity};
use crate::store::LibraryStore;
use crate::types::{Book, Loan};
use crate::MAX_OUTSTANDING_LOANS;

/// Enforces the borrowing rules over any [`LibraryStore`].
#[derive(Debug, Clone)]
pub struct LoanEngine<S> {
    store: S,
}

impl<S: LibraryStore> LoanEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Lends one copy of a book to a reader.
    ///
    /// ## Errors
    /// Checked in order, the first failure wins:
    /// `NotFound(Book)`, `NotFound(Reader)`, `Conflict(NoCopiesAvailable)`,
    /// `Conflict(BorrowLimitExceeded)`, `Conflict(AlreadyBorrowed)`.
    /// `StorageFailure` if the store cannot commit.
    pub async fn borrow_book(&self, book_id: i64, reader_id: i64) -> CoreResult<Loan> {
        debug!(book_id, reader_id, "Borrowing book");

        let mut tx = self.store.begin().await?;

        let book = tx
            .lock_book(book_id)
            .await?
            .ok_or_else(|| CoreError::not_found(Entity::Book, book_id))?;

        if !tx.reader_exists(reader_id).await? {
            return Err(CoreError::not_found(Entity::Reader, reader_id));
        }

        if !book.is_available() {
            return Err(reject(Conflict::NoCopiesAvailable { book_id }));
        }

        if tx.count_outstanding(reader_id).await? >= MAX_OUTSTANDING_LOANS {
            return Err(reject(Conflict::BorrowLimitExceeded {
                reader_id,
                limit: MAX_OUTSTANDING_LOANS,
            }));
        }

        if tx.find_outstanding(book_id, reader_id).await?.is_some() {
            return Err(reject(Conflict::AlreadyBorrowed { book_id, reader_id }));
        }

        tx.take_copy(book_id).await?;
        let loan = tx.insert_loan(book_id, reader_id, Utc::now()).await?;
        tx.commit().await?;

        info!(loan_id = loan.id, book_id, reader_id, "Book borrowed");
        Ok(loan)
    }

    /// Takes back a book the reader currently holds.
    ///
    /// ## Errors
    /// `Conflict(NoActiveLoan)` if the pair has no outstanding loan (never
    /// borrowed, or already returned), then `NotFound(Book)`.
    /// `StorageFailure` if the store cannot commit.
    pub async fn return_book(&self, book_id: i64, reader_id: i64) -> CoreResult<Loan> {
        debug!(book_id, reader_id, "Returning book");

        let mut tx = self.store.begin().await?;

        let book = tx.lock_book(book_id).await?;

        let loan = match tx.find_outstanding(book_id, reader_id).await? {
            Some(loan) => loan,
            None => return Err(reject(Conflict::NoActiveLoan { book_id, reader_id })),
        };

        if book.is_none() {
            return Err(CoreError::not_found(Entity::Book, book_id));
        }

        tx.restore_copy(book_id).await?;
        let loan = tx.mark_returned(loan.id, Utc::now()).await?;
        tx.commit().await?;

        info!(loan_id = loan.id, book_id, reader_id, "Book returned");
        Ok(loan)
    }

    /// Books the reader currently holds, oldest loan first.
    pub async fn outstanding_books_for_reader(&self, reader_id: i64) -> CoreResult<Vec<Book>> {
        let mut tx = self.store.begin().await?;

        if !tx.reader_exists(reader_id).await? {
            return Err(CoreError::not_found(Entity::Reader, reader_id));
        }

        tx.outstanding_books(reader_id).await
    }
}

fn reject(conflict: Conflict) -> CoreError {
    warn!(%conflict, "Loan request rejected");
    conflict.into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::memory::MemoryStore;

    async fn setup() -> (MemoryStore, LoanEngine<MemoryStore>) {
        let store = MemoryStore::new();
        let engine = LoanEngine::new(store.clone());
        (store, engine)
    }

    #[tokio::test]
    async fn test_borrow_decrements_copies_and_records_loan() {
        let (store, engine) = setup().await;
        let book = store.add_book("Clean Code", "Robert Martin", 2).await;
        let reader = store.add_reader("John Doe", "john.doe@example.com").await;

        let loan = engine.borrow_book(book.id, reader.id).await.unwrap();

        assert_eq!(loan.book_id, book.id);
        assert_eq!(loan.reader_id, reader.id);
        assert!(loan.is_outstanding());
        assert_eq!(store.book(book.id).await.unwrap().copies_available, 1);
        assert_eq!(store.loans().await.len(), 1);
    }

    #[tokio::test]
    async fn test_borrow_unknown_book_or_reader() {
        let (store, engine) = setup().await;
        let book = store.add_book("Clean Code", "Robert Martin", 1).await;
        let reader = store.add_reader("John Doe", "john.doe@example.com").await;

        let err = engine.borrow_book(999, reader.id).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: Entity::Book, id: 999 }));

        let err = engine.borrow_book(book.id, 999).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: Entity::Reader, id: 999 }));

        // Book is checked before reader
        let err = engine.borrow_book(999, 998).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: Entity::Book, .. }));
    }

    #[tokio::test]
    async fn test_last_copy_then_no_copies() {
        let (store, engine) = setup().await;
        let book = store.add_book("Design Patterns", "Gang of Four", 1).await;
        let first = store.add_reader("John Doe", "john.doe@example.com").await;
        let second = store.add_reader("Jane Smith", "jane.smith@example.com").await;

        engine.borrow_book(book.id, first.id).await.unwrap();
        assert_eq!(store.book(book.id).await.unwrap().copies_available, 0);

        let err = engine.borrow_book(book.id, second.id).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Conflict(Conflict::NoCopiesAvailable { .. })
        ));
        assert_eq!(store.book(book.id).await.unwrap().copies_available, 0);
        assert_eq!(store.loans().await.len(), 1);
    }

    #[tokio::test]
    async fn test_borrow_limit_is_three() {
        let (store, engine) = setup().await;
        let reader = store.add_reader("John Doe", "john.doe@example.com").await;
        let mut books = Vec::new();
        for i in 0..4 {
            books.push(store.add_book(&format!("Book {i}"), "Author", 1).await);
        }

        for book in &books[..3] {
            engine.borrow_book(book.id, reader.id).await.unwrap();
        }

        let err = engine.borrow_book(books[3].id, reader.id).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Conflict(Conflict::BorrowLimitExceeded { limit: 3, .. })
        ));
        assert_eq!(store.book(books[3].id).await.unwrap().copies_available, 1);
    }

    #[tokio::test]
    async fn test_no_copies_reported_before_limit() {
        let (store, engine) = setup().await;
        let reader = store.add_reader("John Doe", "john.doe@example.com").await;
        for i in 0..3 {
            let book = store.add_book(&format!("Book {i}"), "Author", 1).await;
            engine.borrow_book(book.id, reader.id).await.unwrap();
        }
        let empty = store.add_book("Empty", "Author", 0).await;

        let err = engine.borrow_book(empty.id, reader.id).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Conflict(Conflict::NoCopiesAvailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_same_pair_cannot_hold_two_loans() {
        let (store, engine) = setup().await;
        let book = store.add_book("Refactoring", "Martin Fowler", 4).await;
        let reader = store.add_reader("John Doe", "john.doe@example.com").await;

        engine.borrow_book(book.id, reader.id).await.unwrap();
        let err = engine.borrow_book(book.id, reader.id).await.unwrap_err();

        assert!(matches!(
            err,
            CoreError::Conflict(Conflict::AlreadyBorrowed { .. })
        ));
        assert_eq!(store.book(book.id).await.unwrap().copies_available, 3);
    }

    #[tokio::test]
    async fn test_borrow_return_roundtrip_restores_copies() {
        let (store, engine) = setup().await;
        let book = store.add_book("Refactoring", "Martin Fowler", 4).await;
        let reader = store.add_reader("John Doe", "john.doe@example.com").await;

        let borrowed = engine.borrow_book(book.id, reader.id).await.unwrap();
        let returned = engine.return_book(book.id, reader.id).await.unwrap();

        assert_eq!(borrowed.id, returned.id);
        assert!(!returned.is_outstanding());
        assert!(returned.return_date.unwrap() >= returned.borrow_date);
        assert_eq!(store.book(book.id).await.unwrap().copies_available, 4);

        let loans = store.loans().await;
        assert_eq!(loans.len(), 1);
        assert!(loans[0].return_date.is_some());
    }

    #[tokio::test]
    async fn test_second_return_fails_without_double_increment() {
        let (store, engine) = setup().await;
        let book = store.add_book("Refactoring", "Martin Fowler", 1).await;
        let reader = store.add_reader("John Doe", "john.doe@example.com").await;

        engine.borrow_book(book.id, reader.id).await.unwrap();
        engine.return_book(book.id, reader.id).await.unwrap();

        let err = engine.return_book(book.id, reader.id).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Conflict(Conflict::NoActiveLoan { .. })
        ));
        assert_eq!(store.book(book.id).await.unwrap().copies_available, 1);
    }

    #[tokio::test]
    async fn test_return_never_borrowed_and_unknown_book() {
        let (store, engine) = setup().await;
        let book = store.add_book("Refactoring", "Martin Fowler", 1).await;
        let reader = store.add_reader("John Doe", "john.doe@example.com").await;

        let err = engine.return_book(book.id, reader.id).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Conflict(Conflict::NoActiveLoan { .. })
        ));

        // No loan can exist for a missing book, so the loan check answers first
        let err = engine.return_book(999, reader.id).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Conflict(Conflict::NoActiveLoan { book_id: 999, .. })
        ));
    }

    #[tokio::test]
    async fn test_returned_slot_can_be_reused() {
        let (store, engine) = setup().await;
        let reader = store.add_reader("John Doe", "john.doe@example.com").await;
        let mut books = Vec::new();
        for i in 0..4 {
            books.push(store.add_book(&format!("Book {i}"), "Author", 1).await);
        }
        for book in &books[..3] {
            engine.borrow_book(book.id, reader.id).await.unwrap();
        }

        engine.return_book(books[0].id, reader.id).await.unwrap();
        engine.borrow_book(books[3].id, reader.id).await.unwrap();

        // Borrowing the returned book again creates a fresh loan row
        engine.return_book(books[1].id, reader.id).await.unwrap();
        let again = engine.borrow_book(books[0].id, reader.id).await.unwrap();
        assert!(again.is_outstanding());
        assert_eq!(store.loans().await.len(), 5);
    }

    #[tokio::test]
    async fn test_outstanding_books_oldest_first() {
        let (store, engine) = setup().await;
        let reader = store.add_reader("John Doe", "john.doe@example.com").await;
        let first = store.add_book("First", "Author", 1).await;
        let second = store.add_book("Second", "Author", 1).await;
        let third = store.add_book("Third", "Author", 1).await;

        engine.borrow_book(second.id, reader.id).await.unwrap();
        engine.borrow_book(first.id, reader.id).await.unwrap();
        engine.borrow_book(third.id, reader.id).await.unwrap();
        engine.return_book(first.id, reader.id).await.unwrap();

        let books = engine.outstanding_books_for_reader(reader.id).await.unwrap();
        let titles: Vec<_> = books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Second", "Third"]);

        let err = engine.outstanding_books_for_reader(999).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: Entity::Reader, .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_borrows_of_last_copy() {
        let store = MemoryStore::new();
        let book = store.add_book("Design Patterns", "Gang of Four", 1).await;
        let mut readers = Vec::new();
        for i in 0..8 {
            readers.push(
                store
                    .add_reader(&format!("Reader {i}"), &format!("reader{i}@example.com"))
                    .await,
            );
        }
        let engine = Arc::new(LoanEngine::new(store.clone()));

        let handles: Vec<_> = readers
            .iter()
            .map(|reader| {
                let engine = Arc::clone(&engine);
                let (book_id, reader_id) = (book.id, reader.id);
                tokio::spawn(async move { engine.borrow_book(book_id, reader_id).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(err) => assert!(matches!(
                    err,
                    CoreError::Conflict(Conflict::NoCopiesAvailable { .. })
                )),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(store.book(book.id).await.unwrap().copies_available, 0);
        assert_eq!(store.loans().await.len(), 1);
    }
}
