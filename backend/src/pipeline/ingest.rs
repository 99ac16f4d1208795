//! Record ingestion: validates a dataset against a template and turns each row
//! into a `NewRecord`.

use super::decode::Dataset;
use crate::config::IngestConfig;
use crate::error::{PipelineError, Result};
use common::model::record::NewRecord;
use common::model::template::Template;
use rayon::prelude::*;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Header comparison key: trimmed, inner whitespace runs collapsed to one space.
pub fn column_key(name: &str) -> String {
    WHITESPACE
        .replace_all(&name.replace('\u{00A0}', " "), " ")
        .trim()
        .to_string()
}

/// Check that every active field of `template`, plus the contact column, is
/// present among `headers`.
///
/// Missing names are reported in resolution order, the contact column last.
pub fn validate_headers(template: &Template, headers: &[String], contact_column: &str) -> Result<()> {
    let present: HashSet<String> = headers.iter().map(|h| column_key(h)).collect();

    let mut missing: Vec<String> = template
        .ordered_fields()
        .into_iter()
        .filter(|f| !present.contains(&column_key(&f.name)))
        .map(|f| f.name.trim().to_string())
        .collect();
    if !present.contains(&column_key(contact_column)) {
        missing.push(contact_column.trim().to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::MissingColumns(missing))
    }
}

/// Convert every row of `dataset` into a record for `template`.
///
/// Fails wholesale with `MissingColumns` before converting any row. A blank
/// cell gives an empty value; a cell absent from a short row gives no value.
pub fn ingest(template: &Template, dataset: &Dataset, columns: &IngestConfig) -> Result<Vec<NewRecord>> {
    validate_headers(template, &dataset.headers, &columns.contact_column)?;

    // Row maps are keyed by the header text as decoded; look fields up by the
    // header that matched them.
    let header_for = |name: &str| -> Option<&String> {
        let key = column_key(name);
        dataset.headers.iter().find(|h| column_key(h) == key)
    };
    let fields: Vec<(i64, &String)> = template
        .ordered_fields()
        .into_iter()
        .filter_map(|f| header_for(&f.name).map(|h| (f.id, h)))
        .collect();
    let contact_header = header_for(&columns.contact_column);
    let email_header = header_for(&columns.email_column);

    let records = dataset
        .rows
        .par_iter()
        .map(|row| {
            let cell = |header: Option<&String>| {
                header
                    .and_then(|h| row.get(h))
                    .map(|v| v.trim().to_string())
            };
            NewRecord {
                contact: cell(contact_header).unwrap_or_default(),
                email: cell(email_header).filter(|e| !e.is_empty()),
                values: fields
                    .iter()
                    .filter_map(|(field_id, header)| {
                        row.get(*header).map(|v| (*field_id, v.trim().to_string()))
                    })
                    .collect(),
            }
        })
        .collect();

    Ok(records)
}

/// Build a record for `template` from values keyed by field name.
///
/// Names are matched like headers. Names that are not active fields of the
/// template are rejected; fields without a value are left unset.
pub fn record_from_values(
    template: &Template,
    contact: &str,
    email: Option<&str>,
    values: &BTreeMap<String, String>,
) -> Result<NewRecord> {
    let fields = template.ordered_fields();
    let unknown: Vec<&str> = values
        .keys()
        .filter(|name| {
            let key = column_key(name);
            !fields.iter().any(|f| column_key(&f.name) == key)
        })
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(PipelineError::InvalidInput(format!(
            "unknown fields for template '{}': {}",
            template.name,
            unknown.join(", ")
        )));
    }

    let values = fields
        .iter()
        .filter_map(|f| {
            let key = column_key(&f.name);
            values
                .iter()
                .find(|(name, _)| column_key(name) == key)
                .map(|(_, v)| (f.id, v.trim().to_string()))
        })
        .collect();

    Ok(NewRecord {
        contact: contact.trim().to_string(),
        email: email.map(str::trim).filter(|e| !e.is_empty()).map(str::to_string),
        values,
    })
}
