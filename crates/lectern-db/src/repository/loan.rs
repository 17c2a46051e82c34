//! # Loan Repository
//!
//! Read side of the loan ledger. Rows are written only by the Loan Engine
//! through [`SqliteLibraryStore`](crate::store::SqliteLibraryStore); the
//! statements it needs live here as connection-level functions.
//!
//! ## Orderings
//! ```text
//! outstanding_books(reader)   borrow_date ASC   (oldest loan first)
//! list_for_reader / list_for_book   borrow_date DESC  (history, newest first)
//! ```

use chrono::{DateTime, Utc};
use lectern_core::{Book, Entity, Loan};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

pub(crate) async fn find_by_id(conn: &mut SqliteConnection, loan_id: i64) -> DbResult<Option<Loan>> {
    let loan = sqlx::query_as::<_, Loan>(
        "SELECT id, book_id, reader_id, borrow_date, return_date FROM loans WHERE id = ?",
    )
    .bind(loan_id)
    .fetch_optional(conn)
    .await?;
    Ok(loan)
}

pub(crate) async fn count_outstanding(
    conn: &mut SqliteConnection,
    reader_id: i64,
) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM loans WHERE reader_id = ? AND return_date IS NULL",
    )
    .bind(reader_id)
    .fetch_one(conn)
    .await?;
    Ok(count)
}

pub(crate) async fn count_outstanding_for_book(
    conn: &mut SqliteConnection,
    book_id: i64,
) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM loans WHERE book_id = ? AND return_date IS NULL",
    )
    .bind(book_id)
    .fetch_one(conn)
    .await?;
    Ok(count)
}

pub(crate) async fn find_outstanding(
    conn: &mut SqliteConnection,
    book_id: i64,
    reader_id: i64,
) -> DbResult<Option<Loan>> {
    let loan = sqlx::query_as::<_, Loan>(
        r#"
        SELECT id, book_id, reader_id, borrow_date, return_date
        FROM loans
        WHERE book_id = ? AND reader_id = ? AND return_date IS NULL
        "#,
    )
    .bind(book_id)
    .bind(reader_id)
    .fetch_optional(conn)
    .await?;
    Ok(loan)
}

/// Inserts an outstanding loan. A second outstanding loan for the same pair
/// is rejected by the partial unique index.
pub(crate) async fn insert_loan(
    conn: &mut SqliteConnection,
    book_id: i64,
    reader_id: i64,
    at: DateTime<Utc>,
) -> DbResult<Loan> {
    let loan = sqlx::query_as::<_, Loan>(
        r#"
        INSERT INTO loans (book_id, reader_id, borrow_date, return_date)
        VALUES (?, ?, ?, NULL)
        RETURNING id, book_id, reader_id, borrow_date, return_date
        "#,
    )
    .bind(book_id)
    .bind(reader_id)
    .bind(at)
    .fetch_one(conn)
    .await?;
    Ok(loan)
}

/// Sets the return date of a loan that is still outstanding.
///
/// ## Returns
/// * `Ok(Some(Loan))` - the loan, now returned
/// * `Ok(None)` - no outstanding loan with that id; nothing changed
pub(crate) async fn mark_returned(
    conn: &mut SqliteConnection,
    loan_id: i64,
    at: DateTime<Utc>,
) -> DbResult<Option<Loan>> {
    let loan = sqlx::query_as::<_, Loan>(
        r#"
        UPDATE loans
        SET return_date = ?
        WHERE id = ? AND return_date IS NULL
        RETURNING id, book_id, reader_id, borrow_date, return_date
        "#,
    )
    .bind(at)
    .bind(loan_id)
    .fetch_optional(conn)
    .await?;
    Ok(loan)
}

pub(crate) async fn outstanding_books(
    conn: &mut SqliteConnection,
    reader_id: i64,
) -> DbResult<Vec<Book>> {
    let books = sqlx::query_as::<_, Book>(
        r#"
        SELECT b.id, b.title, b.author, b.year_published, b.isbn,
               b.copies_available, b.description
        FROM loans l
        INNER JOIN books b ON b.id = l.book_id
        WHERE l.reader_id = ? AND l.return_date IS NULL
        ORDER BY l.borrow_date ASC, l.id ASC
        "#,
    )
    .bind(reader_id)
    .fetch_all(conn)
    .await?;
    Ok(books)
}

/// Repository for loan history queries.
#[derive(Debug, Clone)]
pub struct LoanRepository {
    pool: SqlitePool,
}

impl LoanRepository {
    /// Creates a new LoanRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LoanRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Loan> {
        let mut conn = self.pool.acquire().await?;
        find_by_id(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found(Entity::Loan, id))
    }

    /// Every loan of a reader, outstanding and returned, newest first.
    pub async fn list_for_reader(&self, reader_id: i64) -> DbResult<Vec<Loan>> {
        debug!(reader_id, "Listing loan history for reader");

        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT id, book_id, reader_id, borrow_date, return_date
            FROM loans
            WHERE reader_id = ?
            ORDER BY borrow_date DESC, id DESC
            "#,
        )
        .bind(reader_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    /// Every loan of a book, outstanding and returned, newest first.
    pub async fn list_for_book(&self, book_id: i64) -> DbResult<Vec<Loan>> {
        debug!(book_id, "Listing loan history for book");

        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT id, book_id, reader_id, borrow_date, return_date
            FROM loans
            WHERE book_id = ?
            ORDER BY borrow_date DESC, id DESC
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    /// Number of outstanding loans held by a reader.
    pub async fn count_outstanding(&self, reader_id: i64) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        count_outstanding(&mut conn, reader_id).await
    }

    /// Total number of loan rows.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
