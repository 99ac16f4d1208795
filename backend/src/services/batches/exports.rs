use crate::error::Result;
use crate::pipeline::{export, ledger};
use crate::services::{csv_attachment, error_response};
use crate::store::{batches, records, templates, Store};
use actix_web::{web, HttpResponse, Responder};
use common::model::record::Record;

pub async fn records(store: web::Data<Store>, batch_id: web::Path<i64>) -> impl Responder {
    match ledger::find_by_batch(store.get_ref(), batch_id.into_inner()) {
        Ok(enriched) => HttpResponse::Ok().json(enriched),
        Err(e) => error_response(&e),
    }
}

pub async fn records_csv(store: web::Data<Store>, batch_id: web::Path<i64>) -> HttpResponse {
    let batch_id = batch_id.into_inner();
    export_csv(&store, batch_id, "records", |store| records::list_by_batch(store, batch_id))
}

pub async fn failures_csv(store: web::Data<Store>, batch_id: web::Path<i64>) -> HttpResponse {
    let batch_id = batch_id.into_inner();
    export_csv(&store, batch_id, "failures", |store| ledger::list_failed(store, batch_id))
}

fn export_csv(
    store: &Store,
    batch_id: i64,
    suffix: &str,
    select: impl FnOnce(&Store) -> Result<Vec<Record>>,
) -> HttpResponse {
    let result = batches::get(store, batch_id).and_then(|batch| {
        let template = templates::get(store, batch.template_id)?;
        export::records_csv(&template, &select(store)?)
    });
    match result {
        Ok(body) => csv_attachment(&format!("batch-{}-{}.csv", batch_id, suffix), body),
        Err(e) => error_response(&e),
    }
}
