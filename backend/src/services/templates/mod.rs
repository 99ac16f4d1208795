//! # Template Service Module
//!
//! Routes for the template registry under `/api/templates`.
//!
//! ## Sub-modules:
//! - `crud`: list, fetch, create, update and delete templates.
//! - `fields`: add, update and delete the fields of a template.
//! - `sheet`: the header-only CSV staff fill in before an upload.
//! - `preview`: the preview image of a channel template, served from the docs
//!   directory.

mod crud;
mod fields;
mod preview;
mod sheet;

use actix_web::web::{delete, get, post, put, scope};
use actix_web::Scope;

/// The base path for all template-related API endpoints.
const API_PATH: &str = "/api/templates";

/// Configures and returns the Actix `Scope` for all template-related routes.
///
/// # Registered Routes:
///
/// *   **`GET /`** (`?name=` optional): all templates with their fields, or the one
///     with that name.
/// *   **`POST /`**: create a template from a `CreateTemplateRequest`.
/// *   **`GET|PUT|DELETE /{template_id}`**: fetch, partially update, delete. Delete
///     is refused while batches use the template.
/// *   **`POST /{template_id}/fields`**, **`PUT|DELETE /fields/{field_id}`**: field
///     management. Active fields must keep distinct sequence numbers.
/// *   **`GET /{template_id}/sheet`**: CSV header row for uploads.
/// *   **`GET /preview/{channel_template}`**: PNG preview of the channel template.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(crud::list))
        .route("", post().to(crud::create))
        .route("/preview/{channel_template}", get().to(preview::process))
        .route("/fields/{field_id}", put().to(fields::update))
        .route("/fields/{field_id}", delete().to(fields::delete))
        .route("/{template_id}", get().to(crud::get))
        .route("/{template_id}", put().to(crud::update))
        .route("/{template_id}", delete().to(crud::delete))
        .route("/{template_id}/fields", post().to(fields::create))
        .route("/{template_id}/sheet", get().to(sheet::process))
}
