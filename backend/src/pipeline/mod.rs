//! # Notification Dispatch Pipeline
//!
//! Turns an uploaded spreadsheet into one templated message per row and keeps
//! track of what was delivered.
//!
//! ## Workflow:
//!
//! 1.  **Decode** (`decode`): raw CSV bytes become a `Dataset` of header names and
//!     rows keyed by header.
//! 2.  **Ingest** (`ingest`): the dataset is checked against the template's active
//!     fields and converted into `NewRecord`s. A missing column rejects the whole
//!     upload.
//! 3.  **Resolve** (`resolve`): for each record, the template's active fields in
//!     sequence order are mapped to the record's values, giving the positional
//!     parameter list the channel expects.
//! 4.  **Dispatch** (`dispatch`): records are sent one at a time through a
//!     `MessageChannel`; each outcome is written before the next record starts.
//! 5.  **Ledger** (`ledger`): outcomes are stored per record and can be queried
//!     per batch to find failures and resend them.
//!
//! `export` renders the upload sheet for a template and CSV exports of records.

pub mod decode;
pub mod dispatch;
pub mod export;
pub mod ingest;
pub mod ledger;
pub mod resolve;
