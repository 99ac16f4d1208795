//! # Batch Service Module
//!
//! Routes under `/api/batches`: CSV upload, batch bookkeeping, resends and the
//! delivery ledger of each batch.
//!
//! Uploads and resends only schedule the dispatch; the response carries a
//! `job_id` to poll at `/api/jobs/{job_id}`.

mod crud;
mod exports;
mod resend;
mod upload;

use actix_web::web::{delete, get, post, put, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/batches";

/// Configures and returns the Actix `Scope` for batch routes.
///
/// # Registered Routes:
///
/// *   **`GET /`** (`?template_id=` optional): batch summaries, newest first.
/// *   **`POST /upload`**: multipart upload. A `json` part with a
///     `CreateBatchRequest` must come before the `file` part holding the CSV.
/// *   **`GET|PUT|DELETE /{batch_id}`**: summary, partial update, delete with
///     every record of the batch.
/// *   **`POST /{batch_id}/resend`**: dispatch every record of the batch again.
/// *   **`GET /{batch_id}/records`**: the ledger with values labelled by field.
/// *   **`GET /{batch_id}/records.csv`**, **`GET /{batch_id}/failures.csv`**:
///     the ledger, or only the records not sent, as CSV.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(crud::list))
        .route("/upload", post().to(upload::process))
        .route("/{batch_id}", get().to(crud::get))
        .route("/{batch_id}", put().to(crud::update))
        .route("/{batch_id}", delete().to(crud::delete))
        .route("/{batch_id}/resend", post().to(resend::process))
        .route("/{batch_id}/records", get().to(exports::records))
        .route("/{batch_id}/records.csv", get().to(exports::records_csv))
        .route("/{batch_id}/failures.csv", get().to(exports::failures_csv))
}
