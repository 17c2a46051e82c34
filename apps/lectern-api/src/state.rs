//! Shared application state handed to every handler.

use std::sync::Arc;

use lectern_core::LoanEngine;
use lectern_db::{Database, SqliteLibraryStore};

use crate::auth::JwtManager;

/// Cloned per request; every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// Pool and repositories
    pub db: Database,

    /// Loan Engine over the SQLite store
    pub engine: Arc<LoanEngine<SqliteLibraryStore>>,

    /// Token issuance and validation
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(db: Database, jwt: JwtManager) -> Self {
        let engine = Arc::new(db.loan_engine());
        AppState {
            db,
            engine,
            jwt: Arc::new(jwt),
        }
    }
}
