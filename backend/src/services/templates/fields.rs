use crate::services::error_response;
use crate::store::{templates, Store};
use actix_web::{web, HttpResponse, Responder};
use common::requests::{FieldRequest, UpdateFieldRequest};

pub async fn create(
    store: web::Data<Store>,
    template_id: web::Path<i64>,
    payload: web::Json<FieldRequest>,
) -> impl Responder {
    match templates::add_field(store.get_ref(), template_id.into_inner(), &payload) {
        Ok(field) => HttpResponse::Created().json(field),
        Err(e) => error_response(&e),
    }
}

pub async fn update(
    store: web::Data<Store>,
    field_id: web::Path<i64>,
    payload: web::Json<UpdateFieldRequest>,
) -> impl Responder {
    match templates::update_field(store.get_ref(), field_id.into_inner(), &payload) {
        Ok(field) => HttpResponse::Ok().json(field),
        Err(e) => error_response(&e),
    }
}

pub async fn delete(store: web::Data<Store>, field_id: web::Path<i64>) -> impl Responder {
    match templates::delete_field(store.get_ref(), field_id.into_inner()) {
        Ok(field) => HttpResponse::Ok().json(field),
        Err(e) => error_response(&e),
    }
}
