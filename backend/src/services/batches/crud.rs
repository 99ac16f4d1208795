use crate::services::error_response;
use crate::store::{batches, Store};
use actix_web::{web, HttpResponse, Responder};
use common::requests::UpdateBatchRequest;
use log::info;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct BatchQuery {
    pub template_id: Option<i64>,
}

pub async fn list(store: web::Data<Store>, query: web::Query<BatchQuery>) -> impl Responder {
    match batches::list(store.get_ref(), query.template_id) {
        Ok(all) => HttpResponse::Ok().json(all),
        Err(e) => error_response(&e),
    }
}

pub async fn get(store: web::Data<Store>, batch_id: web::Path<i64>) -> impl Responder {
    match batches::summary(store.get_ref(), batch_id.into_inner()) {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(e) => error_response(&e),
    }
}

pub async fn update(
    store: web::Data<Store>,
    batch_id: web::Path<i64>,
    payload: web::Json<UpdateBatchRequest>,
) -> impl Responder {
    match batches::update(store.get_ref(), batch_id.into_inner(), &payload) {
        Ok(batch) => HttpResponse::Ok().json(batch),
        Err(e) => error_response(&e),
    }
}

pub async fn delete(store: web::Data<Store>, batch_id: web::Path<i64>) -> impl Responder {
    match batches::delete(store.get_ref(), batch_id.into_inner()) {
        Ok(batch) => {
            info!("batch {} '{}' deleted", batch.id, batch.name);
            HttpResponse::Ok().json(batch)
        }
        Err(e) => error_response(&e),
    }
}
