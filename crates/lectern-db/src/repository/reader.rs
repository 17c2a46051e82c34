//! # Reader Repository
//!
//! Patron CRUD. Emails are stored trimmed and lowercased and are unique in
//! that form; a reader with books still on loan cannot be deleted.

use lectern_core::validation::normalize_email;
use lectern_core::{Conflict, Entity, NewReader, Page, Reader, ReaderUpdate};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::loan;

pub(crate) async fn reader_exists(conn: &mut SqliteConnection, reader_id: i64) -> DbResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM readers WHERE id = ?")
        .bind(reader_id)
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

async fn fetch_reader(conn: &mut SqliteConnection, reader_id: i64) -> DbResult<Option<Reader>> {
    let reader = sqlx::query_as::<_, Reader>("SELECT id, name, email FROM readers WHERE id = ?")
        .bind(reader_id)
        .fetch_optional(conn)
        .await?;
    Ok(reader)
}

/// Write-locks the database through the reader row, then reads it.
async fn lock_reader_row(
    conn: &mut SqliteConnection,
    reader_id: i64,
) -> DbResult<Option<Reader>> {
    sqlx::query("UPDATE readers SET id = id WHERE id = ?")
        .bind(reader_id)
        .execute(&mut *conn)
        .await?;

    fetch_reader(conn, reader_id).await
}

/// Repository for library patrons.
#[derive(Debug, Clone)]
pub struct ReaderRepository {
    pool: SqlitePool,
}

impl ReaderRepository {
    /// Creates a new ReaderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReaderRepository { pool }
    }

    /// Inserts a new reader.
    ///
    /// ## Errors
    /// * `DbError::Validation` - empty name or malformed email
    /// * `DbError::UniqueViolation` - email already registered
    pub async fn create(&self, new: &NewReader) -> DbResult<Reader> {
        new.validate()?;
        let email = normalize_email(&new.email);

        debug!(email = %email, "Creating reader");

        let reader = sqlx::query_as::<_, Reader>(
            "INSERT INTO readers (name, email) VALUES (?, ?) RETURNING id, name, email",
        )
        .bind(&new.name)
        .bind(&email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_unique_value("email", Some(email.as_str())))?;

        Ok(reader)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Reader> {
        let mut conn = self.pool.acquire().await?;
        fetch_reader(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found(Entity::Reader, id))
    }

    /// Lists readers in id order.
    pub async fn list(&self, page: Page) -> DbResult<Vec<Reader>> {
        let readers = sqlx::query_as::<_, Reader>(
            "SELECT id, name, email FROM readers ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(page.limit)
        .bind(page.skip)
        .fetch_all(&self.pool)
        .await?;

        Ok(readers)
    }

    /// Applies a partial update.
    pub async fn update(&self, id: i64, update: &ReaderUpdate) -> DbResult<Reader> {
        debug!(reader_id = id, "Updating reader");

        let mut tx = self.pool.begin().await?;

        let current = lock_reader_row(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found(Entity::Reader, id))?;
        let reader = update.apply(current)?;

        sqlx::query("UPDATE readers SET name = ?, email = ? WHERE id = ?")
            .bind(&reader.name)
            .bind(&reader.email)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::from(e).with_unique_value("email", Some(reader.email.as_str())))?;

        tx.commit().await?;
        Ok(reader)
    }

    /// Deletes a reader and their returned-loan history.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no such reader
    /// * `DbError::Conflict(OutstandingLoans)` - the reader still holds books
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(reader_id = id, "Deleting reader");

        let mut tx = self.pool.begin().await?;

        if lock_reader_row(&mut tx, id).await?.is_none() {
            return Err(DbError::not_found(Entity::Reader, id));
        }

        if loan::count_outstanding(&mut tx, id).await? > 0 {
            return Err(Conflict::OutstandingLoans {
                entity: Entity::Reader,
                id,
            }
            .into());
        }

        sqlx::query("DELETE FROM readers WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM readers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use lectern_core::NewBook;

    use super::*;
    use crate::{Database, DbConfig};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_duplicate_email() {
        let db = setup().await;
        let new = NewReader::new("John Doe", "john.doe@example.com");

        let reader = db.readers().create(&new).await.unwrap();
        assert_eq!(db.readers().get_by_id(reader.id).await.unwrap(), reader);
        assert!(matches!(
            db.readers().get_by_id(999).await,
            Err(DbError::NotFound { entity: Entity::Reader, id: 999 })
        ));

        let err = db.readers().create(&new).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::UniqueViolation { ref field, ref value } if field == "email" && value == "john.doe@example.com"
        ));
    }

    #[tokio::test]
    async fn test_email_stored_normalized() {
        let db = setup().await;

        let reader = db
            .readers()
            .create(&NewReader::new("John Doe", "  John.Doe@Example.com "))
            .await
            .unwrap();
        assert_eq!(reader.email, "john.doe@example.com");

        let err = db
            .readers()
            .create(&NewReader::new("Other John", "john.doe@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "email"));

        let update = ReaderUpdate {
            email: Some(" JD@Example.com".to_string()),
            ..Default::default()
        };
        let updated = db.readers().update(reader.id, &update).await.unwrap();
        assert_eq!(updated.email, "jd@example.com");
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let db = setup().await;
        let err = db
            .readers()
            .create(&NewReader::new("John Doe", "not-an-email"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_email_collision() {
        let db = setup().await;
        db.readers()
            .create(&NewReader::new("John Doe", "john.doe@example.com"))
            .await
            .unwrap();
        let jane = db
            .readers()
            .create(&NewReader::new("Jane Smith", "jane.smith@example.com"))
            .await
            .unwrap();

        let update = ReaderUpdate {
            email: Some("john.doe@example.com".to_string()),
            ..Default::default()
        };
        let err = db.readers().update(jane.id, &update).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let update = ReaderUpdate {
            name: Some("Jane Doe".to_string()),
            ..Default::default()
        };
        let renamed = db.readers().update(jane.id, &update).await.unwrap();
        assert_eq!(renamed.name, "Jane Doe");
        assert_eq!(renamed.email, "jane.smith@example.com");
    }

    #[tokio::test]
    async fn test_delete_refused_while_holding_books() {
        let db = setup().await;
        let book = db
            .books()
            .create(&NewBook::new("SICP", "Abelson"))
            .await
            .unwrap();
        let reader = db
            .readers()
            .create(&NewReader::new("John Doe", "john.doe@example.com"))
            .await
            .unwrap();

        db.loan_engine().borrow_book(book.id, reader.id).await.unwrap();
        let err = db.readers().delete(reader.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Conflict(Conflict::OutstandingLoans { entity: Entity::Reader, .. })
        ));

        db.loan_engine().return_book(book.id, reader.id).await.unwrap();
        db.readers().delete(reader.id).await.unwrap();
        assert_eq!(db.readers().count().await.unwrap(), 0);

        let err = db.readers().delete(reader.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
