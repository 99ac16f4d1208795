//! # Record Service Module
//!
//! Routes under `/api/records` for single recipients. Adding a record sends its
//! message right away, within the request.

mod crud;

use actix_web::web::{delete, get, post, put, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/records";

/// # Registered Routes:
///
/// *   **`POST /`**: add a record to a batch and send it.
/// *   **`GET|PUT|DELETE /{record_id}`**: fetch, update contact details, delete.
/// *   **`POST /{record_id}/send`**: send one record again.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(crud::create))
        .route("/{record_id}", get().to(crud::get))
        .route("/{record_id}", put().to(crud::update))
        .route("/{record_id}", delete().to(crud::delete))
        .route("/{record_id}/send", post().to(crud::send))
}
