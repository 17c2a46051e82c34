//! # Route Table
//!
//! ```text
//! POST   /register                 public
//! POST   /login                    public
//! GET    /books                    public
//! GET    /books/{id}               bearer
//! POST   /books                    bearer
//! PUT    /books/{id}               bearer
//! DELETE /books/{id}               bearer
//! GET    /readers                  bearer
//! POST   /readers                  bearer
//! GET    /readers/{id}             bearer
//! PUT    /readers/{id}             bearer
//! DELETE /readers/{id}             bearer
//! GET    /readers/{id}/borrowed    bearer
//! POST   /rent_book                bearer
//! POST   /return_book              bearer
//! GET    /health                   public
//! ```
//!
//! Authentication is declared per handler by taking an
//! [`AuthenticatedLibrarian`](crate::auth::AuthenticatedLibrarian) argument.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, books, health, loans, readers};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/{id}",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        .route("/readers", get(readers::list_readers).post(readers::create_reader))
        .route(
            "/readers/{id}",
            get(readers::get_reader)
                .put(readers::update_reader)
                .delete(readers::delete_reader),
        )
        .route("/readers/{id}/borrowed", get(readers::borrowed_books))
        .route("/rent_book", post(loans::rent_book))
        .route("/return_book", post(loans::return_book))
        .route("/health", get(health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
