//! Catalog routes. Listing is public; everything else needs a bearer token.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use lectern_core::{Book, BookUpdate, NewBook};
use tracing::info;

use super::PageParams;
use crate::auth::AuthenticatedLibrarian;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<Vec<Book>>> {
    let books = state.db.books().list(params.into_page()?).await?;
    Ok(Json(books))
}

pub async fn get_book(
    _auth: AuthenticatedLibrarian,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Book>> {
    let book = state.db.books().get_by_id(id).await?;
    Ok(Json(book))
}

pub async fn create_book(
    AuthenticatedLibrarian(librarian): AuthenticatedLibrarian,
    State(state): State<AppState>,
    Json(body): Json<NewBook>,
) -> ApiResult<(StatusCode, Json<Book>)> {
    let book = state.db.books().create(&body).await?;
    info!(book_id = book.id, librarian_id = librarian.id, "Book added to catalog");
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn update_book(
    _auth: AuthenticatedLibrarian,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<BookUpdate>,
) -> ApiResult<Json<Book>> {
    let book = state.db.books().update(id, &body).await?;
    Ok(Json(book))
}

pub async fn delete_book(
    AuthenticatedLibrarian(librarian): AuthenticatedLibrarian,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.db.books().delete(id).await?;
    info!(book_id = id, librarian_id = librarian.id, "Book removed from catalog");
    Ok(StatusCode::NO_CONTENT)
}
