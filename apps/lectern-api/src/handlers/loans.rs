//! `/rent_book` and `/return_book`: the Loan Engine over HTTP.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use lectern_core::validation::validate_id;
use lectern_core::Loan;
use serde::Deserialize;

use crate::auth::AuthenticatedLibrarian;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoanRequest {
    pub book_id: i64,
    pub reader_id: i64,
}

impl LoanRequest {
    fn validate(&self) -> ApiResult<()> {
        validate_id("book_id", self.book_id)?;
        validate_id("reader_id", self.reader_id)?;
        Ok(())
    }
}

pub async fn rent_book(
    _auth: AuthenticatedLibrarian,
    State(state): State<AppState>,
    Json(body): Json<LoanRequest>,
) -> ApiResult<(StatusCode, Json<Loan>)> {
    body.validate()?;
    let loan = state.engine.borrow_book(body.book_id, body.reader_id).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

pub async fn return_book(
    _auth: AuthenticatedLibrarian,
    State(state): State<AppState>,
    Json(body): Json<LoanRequest>,
) -> ApiResult<Json<Loan>> {
    body.validate()?;
    let loan = state.engine.return_book(body.book_id, body.reader_id).await?;
    Ok(Json(loan))
}
