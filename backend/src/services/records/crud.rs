use crate::channel::MessageChannel;
use crate::error::Result;
use crate::pipeline::dispatch::dispatch_record;
use crate::pipeline::ingest::record_from_values;
use crate::services::error_response;
use crate::store::{batches, records, templates, Store};
use actix_web::{web, HttpResponse, Responder};
use common::model::record::Record;
use common::requests::{CreateRecordRequest, UpdateRecordRequest};
use log::info;

pub async fn create(
    store: web::Data<Store>,
    channel: web::Data<dyn MessageChannel>,
    payload: web::Json<CreateRecordRequest>,
) -> impl Responder {
    match create_and_send(&store, channel.get_ref(), &payload).await {
        Ok(record) => HttpResponse::Created().json(record),
        Err(e) => error_response(&e),
    }
}

/// The record is stored before the send, so a channel fault leaves it
/// `Pending` in the batch.
async fn create_and_send(
    store: &Store,
    channel: &dyn MessageChannel,
    req: &CreateRecordRequest,
) -> Result<Record> {
    let batch = batches::get(store, req.batch_id)?;
    let template = templates::get(store, batch.template_id)?;
    let new_record = record_from_values(&template, &req.contact, req.email.as_deref(), &req.values)?;
    let record = records::insert(store, batch.id, &new_record)?;
    info!("record {} added to batch {}", record.id, batch.id);
    dispatch_record(store, channel, record.id).await
}

pub async fn get(store: web::Data<Store>, record_id: web::Path<i64>) -> impl Responder {
    match records::get(store.get_ref(), record_id.into_inner()) {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(e) => error_response(&e),
    }
}

pub async fn update(
    store: web::Data<Store>,
    record_id: web::Path<i64>,
    payload: web::Json<UpdateRecordRequest>,
) -> impl Responder {
    match records::update(store.get_ref(), record_id.into_inner(), &payload) {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(e) => error_response(&e),
    }
}

pub async fn delete(store: web::Data<Store>, record_id: web::Path<i64>) -> impl Responder {
    match records::delete(store.get_ref(), record_id.into_inner()) {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(e) => error_response(&e),
    }
}

pub async fn send(
    store: web::Data<Store>,
    channel: web::Data<dyn MessageChannel>,
    record_id: web::Path<i64>,
) -> impl Responder {
    match dispatch_record(store.get_ref(), channel.get_ref(), record_id.into_inner()).await {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(e) => error_response(&e),
    }
}
