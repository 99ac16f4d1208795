//! Delivery ledger: the last outcome of every record, queryable per batch.
//!
//! Only the latest attempt is kept; a resend overwrites the previous outcome.

use crate::error::Result;
use crate::store::{batches, records, templates, Store};
use common::model::record::{DeliveryOutcome, EnrichedRecord, Record};
use std::collections::{BTreeMap, HashMap};

/// Store the result of a send attempt on the record.
pub fn mark_outcome(store: &Store, record_id: i64, delivered: bool) -> Result<Record> {
    records::set_outcome(store, record_id, DeliveryOutcome::from_delivered(delivered))
}

/// Records of the batch that have not been delivered (failed or never tried).
pub fn list_failed(store: &Store, batch_id: i64) -> Result<Vec<Record>> {
    records::list_failed(store, batch_id)
}

/// All records of the batch, labelled with batch and template names and with
/// their values keyed by field name.
pub fn find_by_batch(store: &Store, batch_id: i64) -> Result<Vec<EnrichedRecord>> {
    let batch = batches::get(store, batch_id)?;
    let template = templates::get(store, batch.template_id)?;
    let field_names: HashMap<i64, &str> = template
        .fields
        .iter()
        .map(|f| (f.id, f.name.as_str()))
        .collect();

    let enriched = records::list_by_batch(store, batch_id)?
        .into_iter()
        .map(|record| EnrichedRecord {
            id: record.id,
            batch_name: batch.name.clone(),
            template_name: template.name.clone(),
            values_by_name: record
                .values
                .into_iter()
                .map(|v| {
                    let name = field_names
                        .get(&v.field_id)
                        .map(|n| n.to_string())
                        .unwrap_or(v.field_name);
                    (name, v.value)
                })
                .collect::<BTreeMap<_, _>>(),
            contact: record.contact,
            email: record.email,
            outcome: record.outcome,
        })
        .collect();
    Ok(enriched)
}
