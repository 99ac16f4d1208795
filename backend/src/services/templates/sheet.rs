use crate::config::AppConfig;
use crate::pipeline::export::upload_sheet;
use crate::services::{csv_attachment, error_response};
use crate::store::{templates, Store};
use actix_web::{web, Responder};

/// `GET /api/templates/{template_id}/sheet`: the empty upload sheet,
/// named after the channel template.
pub async fn process(
    store: web::Data<Store>,
    config: web::Data<AppConfig>,
    template_id: web::Path<i64>,
) -> impl Responder {
    let result = templates::get(store.get_ref(), template_id.into_inner()).and_then(|template| {
        upload_sheet(&template, &config.ingest.contact_column)
            .map(|sheet| (template.channel_template, sheet))
    });
    match result {
        Ok((name, sheet)) => csv_attachment(&format!("{}-template.csv", name), sheet),
        Err(e) => error_response(&e),
    }
}
