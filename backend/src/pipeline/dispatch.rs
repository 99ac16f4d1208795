//! # Dispatch Engine
//!
//! Sends one message per record through a [`MessageChannel`] and writes the
//! outcome back through the ledger.
//!
//! Records of a batch are processed strictly one after the other: resolve,
//! send, store the outcome, then the next record. [`outcomes`] exposes this as
//! a lazy stream so the caller decides how far to drive it; [`dispatch_batch`]
//! drives it to the end or to the first fault.
//!
//! Failure classes:
//! - The channel answers but does not deliver: the record is marked `Failed`
//!   and the run continues.
//! - The channel cannot be reached (`ChannelFault`) or storage fails: the
//!   error is returned and the run stops. Records not yet reached keep their
//!   previous outcome (`Pending` for a first run).

use super::ledger;
use super::resolve::resolve;
use crate::channel::MessageChannel;
use crate::error::Result;
use crate::store::{batches, records, templates, Store};
use common::model::batch::DispatchReport;
use common::model::record::{DeliveryOutcome, Record};
use common::model::template::Template;
use futures_util::stream::{self, Stream, StreamExt};
use log::{debug, info, warn};

/// Single send attempt. No retry, no local timeout.
///
/// `Ok(false)` is a soft failure reported by the channel; faults propagate.
pub async fn dispatch_one(
    channel: &dyn MessageChannel,
    contact: &str,
    params: &[String],
    channel_template: &str,
) -> Result<bool> {
    channel.send(contact, channel_template, params).await
}

/// Resolve, send and record the outcome of one record. Returns the record as
/// stored after the attempt.
async fn deliver(
    store: &Store,
    channel: &dyn MessageChannel,
    template: &Template,
    record: Record,
) -> Result<Record> {
    let params = resolve(&record, template);

    let delivered = if record.contact.trim().is_empty() {
        warn!("record {} has no contact, marking it failed", record.id);
        false
    } else {
        debug!(
            "sending '{}' to {} via {}",
            template.channel_template,
            record.contact,
            channel.name()
        );
        dispatch_one(channel, &record.contact, &params, &template.channel_template).await?
    };

    let record_id = record.id;
    store
        .run_blocking(move |store| ledger::mark_outcome(store, record_id, delivered))
        .await
}

/// Lazily dispatch `records` one at a time, yielding each stored result.
///
/// Nothing is sent until the stream is polled. The template is shared by all
/// records; it is not reloaded per record.
pub fn outcomes<'a>(
    store: &'a Store,
    channel: &'a dyn MessageChannel,
    template: &'a Template,
    records: Vec<Record>,
) -> impl Stream<Item = Result<Record>> + Send + 'a {
    stream::iter(records).then(move |record| deliver(store, channel, template, record))
}

/// Dispatch every record of a batch: used for the first send after an upload
/// and for resends.
///
/// `progress` is called with `(processed, total)` after each stored outcome.
/// Records are never duplicated; each attempt overwrites the previous outcome.
pub async fn dispatch_batch(
    store: &Store,
    channel: &dyn MessageChannel,
    batch_id: i64,
    mut progress: impl FnMut(usize, usize) + Send,
) -> Result<DispatchReport> {
    let (batch, template, records) = store
        .run_blocking(move |store| {
            let batch = batches::get(store, batch_id)?;
            let template = templates::get(store, batch.template_id)?;
            let records = records::list_by_batch(store, batch_id)?;
            Ok((batch, template, records))
        })
        .await?;

    let mut report = DispatchReport {
        batch_id,
        total: records.len(),
        ..Default::default()
    };
    info!(
        "dispatching batch {} ('{}'): {} record(s) with template '{}'",
        batch.id, batch.name, report.total, template.channel_template
    );

    let mut sent = std::pin::pin!(outcomes(store, channel, &template, records));
    while let Some(result) = sent.next().await {
        match result {
            Ok(record) => {
                report.attempted += 1;
                match record.outcome {
                    DeliveryOutcome::Sent => report.sent += 1,
                    _ => report.failed += 1,
                }
                progress(report.attempted, report.total);
            }
            Err(e) => {
                warn!(
                    "dispatch of batch {} stopped after {} of {} record(s): {}",
                    batch_id, report.attempted, report.total, e
                );
                return Err(e);
            }
        }
    }

    info!(
        "batch {} dispatched: {} sent, {} failed",
        batch_id, report.sent, report.failed
    );
    Ok(report)
}

/// Send one existing record using its batch's template.
pub async fn dispatch_record(
    store: &Store,
    channel: &dyn MessageChannel,
    record_id: i64,
) -> Result<Record> {
    let (record, template) = store
        .run_blocking(move |store| {
            let record = records::get(store, record_id)?;
            let batch = batches::get(store, record.batch_id)?;
            let template = templates::get(store, batch.template_id)?;
            Ok((record, template))
        })
        .await?;
    deliver(store, channel, &template, record).await
}
