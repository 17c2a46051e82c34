//! Reader registry routes. All of them need a bearer token.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use lectern_core::{Book, NewReader, Reader, ReaderUpdate};
use tracing::info;

use super::PageParams;
use crate::auth::AuthenticatedLibrarian;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_readers(
    _auth: AuthenticatedLibrarian,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Vec<Reader>>> {
    let readers = state.db.readers().list(params.into_page()?).await?;
    Ok(Json(readers))
}

pub async fn get_reader(
    _auth: AuthenticatedLibrarian,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Reader>> {
    let reader = state.db.readers().get_by_id(id).await?;
    Ok(Json(reader))
}

pub async fn create_reader(
    AuthenticatedLibrarian(librarian): AuthenticatedLibrarian,
    State(state): State<AppState>,
    Json(body): Json<NewReader>,
) -> ApiResult<(StatusCode, Json<Reader>)> {
    let reader = state.db.readers().create(&body).await?;
    info!(reader_id = reader.id, librarian_id = librarian.id, "Reader registered");
    Ok((StatusCode::CREATED, Json(reader)))
}

pub async fn update_reader(
    _auth: AuthenticatedLibrarian,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ReaderUpdate>,
) -> ApiResult<Json<Reader>> {
    let reader = state.db.readers().update(id, &body).await?;
    Ok(Json(reader))
}

pub async fn delete_reader(
    AuthenticatedLibrarian(librarian): AuthenticatedLibrarian,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.db.readers().delete(id).await?;
    info!(reader_id = id, librarian_id = librarian.id, "Reader removed");
    Ok(StatusCode::NO_CONTENT)
}

/// Books the reader currently holds, oldest loan first.
pub async fn borrowed_books(
    _auth: AuthenticatedLibrarian,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Book>>> {
    let books = state.engine.outstanding_books_for_reader(id).await?;
    Ok(Json(books))
}
