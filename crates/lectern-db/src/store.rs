//! # SQLite Library Store
//!
//! [`LibraryStore`] and [`LoanTransaction`] over a `sqlx::Transaction`.
//!
//! ## Isolation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN (deferred)                                                      │
//! │  UPDATE books SET id = id WHERE id = ?   ← write lock, no read yet     │
//! │  SELECT ... FROM books / readers / loans ← nobody else can write now   │
//! │  UPDATE books ... AND copies_available > 0                             │
//! │  INSERT INTO loans ...                   ← partial unique index        │
//! │  COMMIT                                  ← or rollback on drop         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A second transaction issuing its own lock statement waits on the busy
//! timeout until the first commits or rolls back, then sees its effects.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_core::{
    Book, Conflict, CoreError, CoreResult, Entity, LibraryStore, Loan, LoanTransaction,
};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::DbError;
use crate::repository::{book, loan, reader};

/// Loan Engine store backed by the SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteLibraryStore {
    pool: SqlitePool,
}

impl SqliteLibraryStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteLibraryStore { pool }
    }
}

#[async_trait]
impl LibraryStore for SqliteLibraryStore {
    async fn begin(&self) -> CoreResult<Box<dyn LoanTransaction>> {
        let tx = self.pool.begin().await.map_err(DbError::from)?;
        Ok(Box::new(SqliteLoanTransaction { tx }))
    }
}

/// One open SQLite transaction. Dropped without commit, it rolls back.
pub struct SqliteLoanTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl LoanTransaction for SqliteLoanTransaction {
    async fn lock_book(&mut self, book_id: i64) -> CoreResult<Option<Book>> {
        debug!(book_id, "Locking book row");
        Ok(book::lock_book_row(&mut self.tx, book_id).await?)
    }

    async fn reader_exists(&mut self, reader_id: i64) -> CoreResult<bool> {
        Ok(reader::reader_exists(&mut self.tx, reader_id).await?)
    }

    async fn count_outstanding(&mut self, reader_id: i64) -> CoreResult<i64> {
        Ok(loan::count_outstanding(&mut self.tx, reader_id).await?)
    }

    async fn find_outstanding(
        &mut self,
        book_id: i64,
        reader_id: i64,
    ) -> CoreResult<Option<Loan>> {
        Ok(loan::find_outstanding(&mut self.tx, book_id, reader_id).await?)
    }

    async fn take_copy(&mut self, book_id: i64) -> CoreResult<()> {
        if book::take_copy(&mut self.tx, book_id).await? {
            Ok(())
        } else {
            Err(Conflict::NoCopiesAvailable { book_id }.into())
        }
    }

    async fn restore_copy(&mut self, book_id: i64) -> CoreResult<()> {
        if book::restore_copy(&mut self.tx, book_id).await? {
            Ok(())
        } else {
            Err(CoreError::not_found(Entity::Book, book_id))
        }
    }

    async fn insert_loan(
        &mut self,
        book_id: i64,
        reader_id: i64,
        at: DateTime<Utc>,
    ) -> CoreResult<Loan> {
        match loan::insert_loan(&mut self.tx, book_id, reader_id, at).await {
            Ok(loan) => Ok(loan),
            Err(DbError::UniqueViolation { .. }) => {
                Err(Conflict::AlreadyBorrowed { book_id, reader_id }.into())
            }
            Err(other) => Err(other.into()),
        }
    }

    async fn mark_returned(&mut self, loan_id: i64, at: DateTime<Utc>) -> CoreResult<Loan> {
        match loan::mark_returned(&mut self.tx, loan_id, at).await? {
            Some(loan) => Ok(loan),
            None => {
                let loan = loan::find_by_id(&mut self.tx, loan_id)
                    .await?
                    .ok_or_else(|| CoreError::not_found(Entity::Loan, loan_id))?;
                Err(Conflict::NoActiveLoan {
                    book_id: loan.book_id,
                    reader_id: loan.reader_id,
                }
                .into())
            }
        }
    }

    async fn outstanding_books(&mut self, reader_id: i64) -> CoreResult<Vec<Book>> {
        Ok(loan::outstanding_books(&mut self.tx, reader_id).await?)
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| CoreError::from(DbError::TransactionFailed(e.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lectern_core::{LoanEngine, NewBook, NewReader};

    use super::*;
    use crate::{Database, DbConfig};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn add_book(db: &Database, title: &str, copies: i64) -> Book {
        db.books()
            .create(&NewBook::new(title, "Author").copies(copies))
            .await
            .unwrap()
    }

    async fn add_reader(db: &Database, n: usize) -> i64 {
        db.readers()
            .create(&NewReader::new(format!("Reader {n}"), format!("reader{n}@example.com")))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_borrow_and_return_persist() {
        let db = setup().await;
        let book = add_book(&db, "Refactoring", 4).await;
        let reader = add_reader(&db, 1).await;
        let engine = db.loan_engine();

        let loan = engine.borrow_book(book.id, reader).await.unwrap();
        assert!(loan.is_outstanding());
        assert_eq!(db.books().get_by_id(book.id).await.unwrap().copies_available, 3);

        let returned = engine.return_book(book.id, reader).await.unwrap();
        assert_eq!(returned.id, loan.id);
        assert!(returned.return_date.is_some());
        assert_eq!(db.books().get_by_id(book.id).await.unwrap().copies_available, 4);
        assert_eq!(db.loans().count().await.unwrap(), 1);

        let err = engine.return_book(book.id, reader).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(Conflict::NoActiveLoan { .. })));
        assert_eq!(db.books().get_by_id(book.id).await.unwrap().copies_available, 4);
    }

    #[tokio::test]
    async fn test_precondition_order() {
        let db = setup().await;
        let empty = add_book(&db, "Empty", 0).await;
        let reader = add_reader(&db, 1).await;
        let engine = db.loan_engine();

        let err = engine.borrow_book(999, reader).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: Entity::Book, .. }));

        let err = engine.borrow_book(empty.id, 999).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: Entity::Reader, .. }));

        let err = engine.borrow_book(empty.id, reader).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(Conflict::NoCopiesAvailable { .. })));
        assert_eq!(db.loans().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_limit_and_duplicate_pair() {
        let db = setup().await;
        let reader = add_reader(&db, 1).await;
        let engine = db.loan_engine();

        let mut books = Vec::new();
        for i in 0..4 {
            books.push(add_book(&db, &format!("Book {i}"), 2).await);
        }

        engine.borrow_book(books[0].id, reader).await.unwrap();
        let err = engine.borrow_book(books[0].id, reader).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(Conflict::AlreadyBorrowed { .. })));

        engine.borrow_book(books[1].id, reader).await.unwrap();
        engine.borrow_book(books[2].id, reader).await.unwrap();
        let err = engine.borrow_book(books[3].id, reader).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Conflict(Conflict::BorrowLimitExceeded { limit: 3, .. })
        ));

        assert_eq!(db.books().get_by_id(books[3].id).await.unwrap().copies_available, 2);
        let held = engine.outstanding_books_for_reader(reader).await.unwrap();
        let titles: Vec<_> = held.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Book 0", "Book 1", "Book 2"]);
    }

    #[tokio::test]
    async fn test_unique_index_rejects_second_outstanding_loan() {
        let db = setup().await;
        let book = add_book(&db, "SICP", 3).await;
        let reader = add_reader(&db, 1).await;
        let store = db.library_store();

        let mut tx = store.begin().await.unwrap();
        tx.insert_loan(book.id, reader, Utc::now()).await.unwrap();
        let err = tx.insert_loan(book.id, reader, Utc::now()).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(Conflict::AlreadyBorrowed { .. })));
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let db = setup().await;
        let book = add_book(&db, "SICP", 1).await;
        let reader = add_reader(&db, 1).await;
        let store = db.library_store();

        {
            let mut tx = store.begin().await.unwrap();
            tx.lock_book(book.id).await.unwrap();
            tx.take_copy(book.id).await.unwrap();
            tx.insert_loan(book.id, reader, Utc::now()).await.unwrap();

            let err = tx.take_copy(book.id).await.unwrap_err();
            assert!(matches!(err, CoreError::Conflict(Conflict::NoCopiesAvailable { .. })));
        }

        assert_eq!(db.books().get_by_id(book.id).await.unwrap().copies_available, 1);
        assert_eq!(db.loans().count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_borrows_of_last_copy() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("lectern.db")).max_connections(8);
        let db = Database::new(config).await.unwrap();

        let book = add_book(&db, "Design Patterns", 1).await;
        let mut readers = Vec::new();
        for n in 0..8 {
            readers.push(add_reader(&db, n).await);
        }

        let engine = Arc::new(LoanEngine::new(db.library_store()));
        let handles: Vec<_> = readers
            .into_iter()
            .map(|reader| {
                let engine = Arc::clone(&engine);
                let book_id = book.id;
                tokio::spawn(async move { engine.borrow_book(book_id, reader).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(err) => assert!(
                    matches!(err, CoreError::Conflict(Conflict::NoCopiesAvailable { .. })),
                    "unexpected error: {err}"
                ),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(db.books().get_by_id(book.id).await.unwrap().copies_available, 0);
        assert_eq!(db.loans().count().await.unwrap(), 1);
        db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_borrow_and_return_keep_counter_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("lectern.db")).max_connections(8);
        let db = Database::new(config).await.unwrap();

        let book = add_book(&db, "Refactoring", 2).await;
        let mut readers = Vec::new();
        for n in 0..6 {
            readers.push(add_reader(&db, n).await);
        }

        let engine = Arc::new(LoanEngine::new(db.library_store()));
        let handles: Vec<_> = readers
            .iter()
            .copied()
            .map(|reader| {
                let engine = Arc::clone(&engine);
                let book_id = book.id;
                tokio::spawn(async move {
                    if engine.borrow_book(book_id, reader).await.is_ok() {
                        engine.return_book(book_id, reader).await.map(|_| ())
                    } else {
                        Ok(())
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(db.books().get_by_id(book.id).await.unwrap().copies_available, 2);
        for reader in readers {
            assert_eq!(db.loans().count_outstanding(reader).await.unwrap(), 0);
        }
        db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_borrows_by_one_reader_respect_limit() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("lectern.db")).max_connections(8);
        let db = Database::new(config).await.unwrap();

        let reader = add_reader(&db, 1).await;
        let mut books = Vec::new();
        for i in 0..8 {
            books.push(add_book(&db, &format!("Volume {i}"), 1).await);
        }

        let engine = Arc::new(LoanEngine::new(db.library_store()));
        let handles: Vec<_> = books
            .iter()
            .map(|book| {
                let engine = Arc::clone(&engine);
                let book_id = book.id;
                tokio::spawn(async move { engine.borrow_book(book_id, reader).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(err) => assert!(
                    matches!(
                        err,
                        CoreError::Conflict(Conflict::BorrowLimitExceeded { limit: 3, .. })
                    ),
                    "unexpected error: {err}"
                ),
            }
        }

        assert_eq!(successes, 3);
        assert_eq!(db.loans().count_outstanding(reader).await.unwrap(), 3);

        let mut copies_out = 0;
        for book in &books {
            copies_out += 1 - db.books().get_by_id(book.id).await.unwrap().copies_available;
        }
        assert_eq!(copies_out, 3);
        db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_returns_of_one_loan() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("lectern.db")).max_connections(8);
        let db = Database::new(config).await.unwrap();

        let book = add_book(&db, "The Mythical Man-Month", 2).await;
        let reader = add_reader(&db, 1).await;

        let engine = Arc::new(LoanEngine::new(db.library_store()));
        engine.borrow_book(book.id, reader).await.unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let book_id = book.id;
                tokio::spawn(async move { engine.return_book(book_id, reader).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(loan) => {
                    assert!(loan.return_date.is_some());
                    successes += 1;
                }
                Err(err) => assert!(
                    matches!(err, CoreError::Conflict(Conflict::NoActiveLoan { .. })),
                    "unexpected error: {err}"
                ),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(db.books().get_by_id(book.id).await.unwrap().copies_available, 2);
        assert_eq!(db.loans().count_outstanding(reader).await.unwrap(), 0);
        assert_eq!(db.loans().count().await.unwrap(), 1);
        db.close().await;
    }
}
