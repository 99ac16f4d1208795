use crate::channel::MessageChannel;
use crate::config::AppConfig;
use crate::error::{PipelineError, Result};
use crate::job_controller::dispatch::schedule_dispatch_job;
use crate::job_controller::state::JobsState;
use crate::pipeline::decode::decode_csv;
use crate::pipeline::ingest::ingest;
use crate::services::error_response;
use crate::store::{batches, templates, Store};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use common::requests::{CreateBatchRequest, DispatchScheduled};
use futures_util::StreamExt;
use log::info;
use md5::Context;
use serde_json::from_slice;

/// `POST /api/batches/upload`: `202 Accepted` with a `DispatchScheduled` body.
pub async fn process(
    payload: Multipart,
    store: web::Data<Store>,
    state: web::Data<JobsState>,
    channel: web::Data<dyn MessageChannel>,
    config: web::Data<AppConfig>,
) -> impl Responder {
    match upload_batch(payload, &store, &state, &channel, &config).await {
        Ok(scheduled) => HttpResponse::Accepted().json(scheduled),
        Err(e) => error_response(&e),
    }
}

fn multipart_error(e: actix_multipart::MultipartError) -> PipelineError {
    PipelineError::InvalidInput(format!("malformed upload: {}", e))
}

/// Reads the batch metadata and the CSV, stores the batch with all of its
/// records, then schedules the dispatch.
///
/// Nothing is stored when the sheet lacks a required column.
async fn upload_batch(
    mut payload: Multipart,
    store: &web::Data<Store>,
    state: &JobsState,
    channel: &web::Data<dyn MessageChannel>,
    config: &AppConfig,
) -> Result<DispatchScheduled> {
    let mut request: Option<CreateBatchRequest> = None;
    let mut contents: Option<Vec<u8>> = None;
    let mut md5_hasher = Context::new();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(multipart_error)?;
        let part_name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));

        match part_name.as_deref() {
            Some("json") => {
                let mut bytes = Vec::new();
                while let Some(chunk) = field.next().await {
                    bytes.extend_from_slice(&chunk.map_err(multipart_error)?);
                }
                let req: CreateBatchRequest = from_slice(&bytes)
                    .map_err(|e| PipelineError::InvalidInput(format!("invalid batch: {}", e)))?;
                request = Some(req);
            }
            Some("file") => {
                if request.is_none() {
                    return Err(PipelineError::InvalidInput(
                        "batch JSON must be sent before the file".to_string(),
                    ));
                }
                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
                    .unwrap_or_default();
                if !filename.to_lowercase().ends_with(".csv") {
                    return Err(PipelineError::InvalidInput(
                        "the file must end with .csv".to_string(),
                    ));
                }

                let mut bytes = Vec::new();
                while let Some(chunk) = field.next().await {
                    let chunk = chunk.map_err(multipart_error)?;
                    md5_hasher.consume(&chunk);
                    bytes.extend_from_slice(&chunk);
                }
                contents = Some(bytes);
            }
            _ => {}
        }
    }

    let request =
        request.ok_or_else(|| PipelineError::InvalidInput("missing batch JSON".to_string()))?;
    let contents = contents.ok_or_else(|| PipelineError::InvalidInput("missing file".to_string()))?;
    let source_md5 = format!("{:x}", md5_hasher.finalize());

    let template = templates::get(store, request.template_id)?;
    let dataset = decode_csv(&contents)?;
    let new_records = ingest(&template, &dataset, &config.ingest)?;
    let batch = batches::create_with_records(store, &request, Some(&source_md5), &new_records)?;
    info!(
        "batch {} '{}' stored with {} records for template '{}'",
        batch.id,
        batch.name,
        new_records.len(),
        template.name
    );

    let job_id =
        schedule_dispatch_job(state, store.get_ref().clone(), channel.clone().into_inner(), batch.id)
            .await?;
    Ok(DispatchScheduled {
        batch_id: batch.id,
        job_id,
    })
}
