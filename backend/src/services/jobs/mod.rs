//! Status of background dispatch jobs.

mod get_status;

use actix_web::web::{get, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/jobs";

/// *   **`GET /{job_id}`**: the `JobStatus` of a job, or 404 for unknown ids.
pub fn configure_routes() -> Scope {
    scope(API_PATH).route("/{job_id}", get().to(get_status::process))
}
