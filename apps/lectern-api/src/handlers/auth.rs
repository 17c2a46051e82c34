//! `/register` and `/login`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use lectern_core::validation::{validate_email, validate_password};
use lectern_core::Librarian;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> ApiResult<(StatusCode, Json<Librarian>)> {
    validate_email(&body.email)?;
    validate_password(&body.password)?;

    let password_hash = hash_password(&body.password)?;
    let librarian = state
        .db
        .librarians()
        .create(&body.email, &password_hash)
        .await?;

    info!(librarian_id = librarian.id, email = %librarian.email, "Librarian registered");
    Ok((StatusCode::CREATED, Json(librarian)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> ApiResult<Json<TokenResponse>> {
    let librarian = state.db.librarians().get_by_email(&body.email).await?;

    let librarian = match librarian {
        Some(l) if verify_password(&body.password, &l.password_hash) => l,
        _ => {
            warn!(email = %body.email, "Rejected login");
            return Err(ApiError::unauthenticated("Incorrect email or password"));
        }
    };

    let access_token = state.jwt.generate_access_token(&librarian.email)?;
    info!(librarian_id = librarian.id, "Librarian logged in");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}
