//! # Book Repository
//!
//! Catalog CRUD. The copy counter is only ever moved by the Loan Engine;
//! here it is set directly by a librarian's create or update.
//!
//! ## Delete Rules
//! ```text
//! delete(id) ──► book has outstanding loans ──► Conflict(OutstandingLoans)
//!            └─► otherwise                  ──► row + returned history removed
//!                                                (loans ON DELETE CASCADE)
//! ```

use lectern_core::{Book, BookUpdate, Conflict, Entity, NewBook, Page};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::loan;

/// Takes the write lock on the book row, then reads it.
///
/// The no-op UPDATE is the first statement of the caller's transaction, so
/// SQLite grants the database write lock before anything is read.
pub(crate) async fn lock_book_row(
    conn: &mut SqliteConnection,
    book_id: i64,
) -> DbResult<Option<Book>> {
    sqlx::query("UPDATE books SET id = id WHERE id = ?")
        .bind(book_id)
        .execute(&mut *conn)
        .await?;

    fetch_book(conn, book_id).await
}

pub(crate) async fn fetch_book(
    conn: &mut SqliteConnection,
    book_id: i64,
) -> DbResult<Option<Book>> {
    let book = sqlx::query_as::<_, Book>(
        r#"
        SELECT id, title, author, year_published, isbn, copies_available, description
        FROM books
        WHERE id = ?
        "#,
    )
    .bind(book_id)
    .fetch_optional(conn)
    .await?;

    Ok(book)
}

/// Decrements the counter only while it is positive.
///
/// ## Returns
/// * `Ok(true)` - one copy taken
/// * `Ok(false)` - no copy left (or no such book); nothing changed
pub(crate) async fn take_copy(conn: &mut SqliteConnection, book_id: i64) -> DbResult<bool> {
    let result = sqlx::query(
        "UPDATE books SET copies_available = copies_available - 1 WHERE id = ? AND copies_available > 0",
    )
    .bind(book_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub(crate) async fn restore_copy(conn: &mut SqliteConnection, book_id: i64) -> DbResult<bool> {
    let result =
        sqlx::query("UPDATE books SET copies_available = copies_available + 1 WHERE id = ?")
            .bind(book_id)
            .execute(conn)
            .await?;

    Ok(result.rows_affected() == 1)
}

/// Repository for catalog records.
#[derive(Debug, Clone)]
pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    /// Creates a new BookRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BookRepository { pool }
    }

    /// Inserts a new book.
    ///
    /// ## Errors
    /// * `DbError::Validation` - a field rule failed
    /// * `DbError::UniqueViolation` - ISBN already in the catalog
    pub async fn create(&self, new: &NewBook) -> DbResult<Book> {
        new.validate()?;

        debug!(title = %new.title, "Creating book");

        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, year_published, isbn, copies_available, description)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, title, author, year_published, isbn, copies_available, description
            "#,
        )
        .bind(&new.title)
        .bind(&new.author)
        .bind(new.year_published)
        .bind(&new.isbn)
        .bind(new.copies_available)
        .bind(&new.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_unique_value("isbn", new.isbn.as_deref()))?;

        debug!(book_id = book.id, "Book created");
        Ok(book)
    }

    /// Gets a book by its ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Book> {
        let mut conn = self.pool.acquire().await?;
        fetch_book(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found(Entity::Book, id))
    }

    /// Lists books in id order.
    pub async fn list(&self, page: Page) -> DbResult<Vec<Book>> {
        debug!(skip = page.skip, limit = page.limit, "Listing books");

        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, author, year_published, isbn, copies_available, description
            FROM books
            ORDER BY id
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Applies a partial update.
    ///
    /// Runs in its own transaction with the row locked first, so it cannot
    /// interleave with a borrow or return of the same book.
    pub async fn update(&self, id: i64, update: &BookUpdate) -> DbResult<Book> {
        debug!(book_id = id, "Updating book");

        let mut tx = self.pool.begin().await?;

        let current = lock_book_row(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found(Entity::Book, id))?;
        let book = update.apply(current)?;

        sqlx::query(
            r#"
            UPDATE books
            SET title = ?, author = ?, year_published = ?, isbn = ?,
                copies_available = ?, description = ?
            WHERE id = ?
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.year_published)
        .bind(&book.isbn)
        .bind(book.copies_available)
        .bind(&book.description)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_unique_value("isbn", book.isbn.as_deref()))?;

        tx.commit().await?;
        Ok(book)
    }

    /// Deletes a book and its returned-loan history.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no such book
    /// * `DbError::Conflict(OutstandingLoans)` - a copy is still out
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(book_id = id, "Deleting book");

        let mut tx = self.pool.begin().await?;

        if lock_book_row(&mut tx, id).await?.is_none() {
            return Err(DbError::not_found(Entity::Book, id));
        }

        if loan::count_outstanding_for_book(&mut tx, id).await? > 0 {
            return Err(Conflict::OutstandingLoans {
                entity: Entity::Book,
                id,
            }
            .into());
        }

        sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Number of books in the catalog.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
