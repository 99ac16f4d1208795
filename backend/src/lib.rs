//! Admissions notification backend.
//!
//! Staff define message templates, upload a CSV of recipients as a batch, and
//! the backend sends one WhatsApp template message per recipient, keeping the
//! outcome of every attempt.

pub mod channel;
pub mod config;
pub mod error;
pub mod job_controller;
pub mod pipeline;
pub mod services;
pub mod store;
