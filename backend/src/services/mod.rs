//! HTTP services.
//!
//! Thin adapters from Actix routes to the store and the dispatch pipeline. Each
//! area exposes a `configure_routes` returning its `Scope`; handlers are named
//! after the operation they expose and turn pipeline errors into responses via
//! [`error_response`].

pub mod batches;
pub mod jobs;
pub mod records;
pub mod templates;

use crate::error::PipelineError;
use actix_web::HttpResponse;
use log::error;

/// Map an error to a response: request problems are 400, unknown ids 404,
/// anything else 500.
pub(crate) fn error_response(e: &PipelineError) -> HttpResponse {
    match e {
        PipelineError::NotFound { .. } => HttpResponse::NotFound().body(e.to_string()),
        e if e.is_client_error() => HttpResponse::BadRequest().body(e.to_string()),
        e => {
            error!("request failed: {}", e);
            HttpResponse::InternalServerError().body(e.to_string())
        }
    }
}

/// `200 OK` with a CSV attachment named `filename`.
pub(crate) fn csv_attachment(filename: &str, body: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            actix_web::http::header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(body)
}
