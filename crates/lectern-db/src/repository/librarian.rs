//! # Librarian Repository
//!
//! Staff accounts for the access gate. Only the password hash is stored;
//! hashing happens in the API layer. Emails are stored and looked up in
//! normalized form.

use lectern_core::validation::normalize_email;
use lectern_core::Librarian;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct LibrarianRepository {
    pool: SqlitePool,
}

impl LibrarianRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LibrarianRepository { pool }
    }

    /// Stores a new account.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - email already registered
    pub async fn create(&self, email: &str, password_hash: &str) -> DbResult<Librarian> {
        let email = normalize_email(email);
        debug!(email = %email, "Creating librarian");

        sqlx::query_as::<_, Librarian>(
            "INSERT INTO librarians (email, password_hash) VALUES (?, ?) RETURNING id, email, password_hash",
        )
        .bind(&email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_unique_value("email", Some(email.as_str())))
    }

    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<Librarian>> {
        let librarian = sqlx::query_as::<_, Librarian>(
            "SELECT id, email, password_hash FROM librarians WHERE email = ?",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;
        Ok(librarian)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_create_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.librarians();

        let created = repo.create("test@library.com", "$argon2id$hash").await.unwrap();
        let found = repo.get_by_email("test@library.com").await.unwrap().unwrap();
        assert_eq!(found, created);
        assert!(repo.get_by_email("nobody@library.com").await.unwrap().is_none());

        let err = repo.create("test@library.com", "other").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "email"));
    }

    #[tokio::test]
    async fn test_padded_email_matches_plain() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.librarians();

        let created = repo.create("  Test@Library.com ", "$argon2id$hash").await.unwrap();
        assert_eq!(created.email, "test@library.com");
        assert_eq!(repo.get_by_email("test@library.com").await.unwrap(), Some(created.clone()));
        assert_eq!(repo.get_by_email(" TEST@library.com").await.unwrap(), Some(created));

        assert!(repo.create("test@library.com", "other").await.is_err());
    }
}
