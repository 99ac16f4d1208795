//! Data model shared by the admissions notification backend and its clients.
//!
//! - `model`: templates (alerts), batches (events), records (students) and
//!   their delivery outcome.
//! - `jobs`: status of background dispatch jobs.
//! - `requests`: request payloads accepted by the HTTP services.

pub mod jobs;
pub mod model;
pub mod requests;
