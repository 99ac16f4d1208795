use crate::services::error_response;
use crate::store::{templates, Store};
use actix_web::{web, HttpResponse, Responder};
use common::requests::{CreateTemplateRequest, UpdateTemplateRequest};
use log::info;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct TemplateQuery {
    pub name: Option<String>,
}

pub async fn list(store: web::Data<Store>, query: web::Query<TemplateQuery>) -> impl Responder {
    match &query.name {
        Some(name) => match templates::find_by_name(store.get_ref(), name) {
            Ok(Some(template)) => HttpResponse::Ok().json(template),
            Ok(None) => HttpResponse::NotFound().body(format!("template '{}' not found", name)),
            Err(e) => error_response(&e),
        },
        None => match templates::list(store.get_ref()) {
            Ok(all) => HttpResponse::Ok().json(all),
            Err(e) => error_response(&e),
        },
    }
}

pub async fn get(store: web::Data<Store>, template_id: web::Path<i64>) -> impl Responder {
    match templates::get(store.get_ref(), template_id.into_inner()) {
        Ok(template) => HttpResponse::Ok().json(template),
        Err(e) => error_response(&e),
    }
}

pub async fn create(
    store: web::Data<Store>,
    payload: web::Json<CreateTemplateRequest>,
) -> impl Responder {
    match templates::create(store.get_ref(), &payload) {
        Ok(template) => {
            info!("template '{}' created with id {}", template.name, template.id);
            HttpResponse::Created().json(template)
        }
        Err(e) => error_response(&e),
    }
}

pub async fn update(
    store: web::Data<Store>,
    template_id: web::Path<i64>,
    payload: web::Json<UpdateTemplateRequest>,
) -> impl Responder {
    match templates::update(store.get_ref(), template_id.into_inner(), &payload) {
        Ok(template) => HttpResponse::Ok().json(template),
        Err(e) => error_response(&e),
    }
}

pub async fn delete(store: web::Data<Store>, template_id: web::Path<i64>) -> impl Responder {
    match templates::delete(store.get_ref(), template_id.into_inner()) {
        Ok(template) => {
            info!("template '{}' deleted", template.name);
            HttpResponse::Ok().json(template)
        }
        Err(e) => error_response(&e),
    }
}
