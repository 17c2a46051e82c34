//! # In-Memory Store
//!
//! A [`LibraryStore`] kept entirely in process memory.
//!
//! One `tokio::sync::Mutex` guards the committed state. A transaction holds
//! the lock from `begin` until it is committed or dropped and works on a
//! staged copy, which replaces the committed state only on `commit`.
//! Concurrent transactions therefore run one after another.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{Conflict, CoreError, CoreResult, Entity};
use crate::store::{LibraryStore, LoanTransaction};
use crate::types::{Book, Loan, Reader};

#[derive(Debug, Clone, Default)]
struct State {
    books: BTreeMap<i64, Book>,
    readers: BTreeMap<i64, Reader>,
    loans: BTreeMap<i64, Loan>,
    next_book_id: i64,
    next_reader_id: i64,
    next_loan_id: i64,
}

impl State {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

/// Shared handle to an in-memory library. Clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a catalog record directly, bypassing validation.
    pub async fn add_book(&self, title: &str, author: &str, copies: i64) -> Book {
        let mut state = self.state.lock().await;
        let id = State::next_id(&mut state.next_book_id);
        let book = Book {
            id,
            title: title.to_string(),
            author: author.to_string(),
            year_published: None,
            isbn: None,
            copies_available: copies,
            description: None,
        };
        state.books.insert(id, book.clone());
        book
    }

    /// Adds a reader directly, bypassing validation.
    pub async fn add_reader(&self, name: &str, email: &str) -> Reader {
        let mut state = self.state.lock().await;
        let id = State::next_id(&mut state.next_reader_id);
        let reader = Reader {
            id,
            name: name.to_string(),
            email: email.to_string(),
        };
        state.readers.insert(id, reader.clone());
        reader
    }

    /// Committed state of a book.
    pub async fn book(&self, id: i64) -> Option<Book> {
        self.state.lock().await.books.get(&id).cloned()
    }

    /// Every committed loan row in id order.
    pub async fn loans(&self) -> Vec<Loan> {
        self.state.lock().await.loans.values().cloned().collect()
    }
}

#[async_trait]
impl LibraryStore for MemoryStore {
    async fn begin(&self) -> CoreResult<Box<dyn LoanTransaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, staged }))
    }
}

/// A transaction over a [`MemoryStore`]. Holds the store lock while alive.
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<State>,
    staged: State,
}

impl MemoryTransaction {
    fn book_mut(&mut self, book_id: i64) -> CoreResult<&mut Book> {
        self.staged
            .books
            .get_mut(&book_id)
            .ok_or_else(|| CoreError::not_found(Entity::Book, book_id))
    }
}

#[async_trait]
impl LoanTransaction for MemoryTransaction {
    async fn lock_book(&mut self, book_id: i64) -> CoreResult<Option<Book>> {
        Ok(self.staged.books.get(&book_id).cloned())
    }

    async fn reader_exists(&mut self, reader_id: i64) -> CoreResult<bool> {
        Ok(self.staged.readers.contains_key(&reader_id))
    }

    async fn count_outstanding(&mut self, reader_id: i64) -> CoreResult<i64> {
        let count = self
            .staged
            .loans
            .values()
            .filter(|loan| loan.reader_id == reader_id && loan.is_outstanding())
            .count();
        Ok(count as i64)
    }

    async fn find_outstanding(
        &mut self,
        book_id: i64,
        reader_id: i64,
    ) -> CoreResult<Option<Loan>> {
        Ok(self
            .staged
            .loans
            .values()
            .find(|loan| {
                loan.book_id == book_id && loan.reader_id == reader_id && loan.is_outstanding()
            })
            .cloned())
    }

    async fn take_copy(&mut self, book_id: i64) -> CoreResult<()> {
        let book = self.book_mut(book_id)?;
        if book.copies_available < 1 {
            return Err(Conflict::NoCopiesAvailable { book_id }.into());
        }
        book.copies_available -= 1;
        Ok(())
    }

    async fn restore_copy(&mut self, book_id: i64) -> CoreResult<()> {
        self.book_mut(book_id)?.copies_available += 1;
        Ok(())
    }

    async fn insert_loan(
        &mut self,
        book_id: i64,
        reader_id: i64,
        at: DateTime<Utc>,
    ) -> CoreResult<Loan> {
        if self.find_outstanding(book_id, reader_id).await?.is_some() {
            return Err(Conflict::AlreadyBorrowed { book_id, reader_id }.into());
        }

        let id = State::next_id(&mut self.staged.next_loan_id);
        let loan = Loan {
            id,
            book_id,
            reader_id,
            borrow_date: at,
            return_date: None,
        };
        self.staged.loans.insert(id, loan.clone());
        Ok(loan)
    }

    async fn mark_returned(&mut self, loan_id: i64, at: DateTime<Utc>) -> CoreResult<Loan> {
        let loan = self
            .staged
            .loans
            .get_mut(&loan_id)
            .ok_or_else(|| CoreError::not_found(Entity::Loan, loan_id))?;
        loan.mark_returned(at)?;
        Ok(loan.clone())
    }

    async fn outstanding_books(&mut self, reader_id: i64) -> CoreResult<Vec<Book>> {
        let mut loans: Vec<&Loan> = self
            .staged
            .loans
            .values()
            .filter(|loan| loan.reader_id == reader_id && loan.is_outstanding())
            .collect();
        loans.sort_by_key(|loan| loan.borrow_date);

        Ok(loans
            .into_iter()
            .filter_map(|loan| self.staged.books.get(&loan.book_id).cloned())
            .collect())
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        let MemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
