use crate::channel::MessageChannel;
use crate::job_controller::dispatch::schedule_dispatch_job;
use crate::job_controller::state::JobsState;
use crate::services::error_response;
use crate::store::{batches, Store};
use actix_web::{web, HttpResponse, Responder};
use common::requests::DispatchScheduled;
use log::info;

/// `POST /api/batches/{batch_id}/resend`: dispatch every record again,
/// overwriting previous outcomes. `202 Accepted` with the job id, `400` while
/// the batch is still being dispatched.
pub async fn process(
    store: web::Data<Store>,
    state: web::Data<JobsState>,
    channel: web::Data<dyn MessageChannel>,
    batch_id: web::Path<i64>,
) -> impl Responder {
    let batch_id = batch_id.into_inner();
    if let Err(e) = batches::get(store.get_ref(), batch_id) {
        return error_response(&e);
    }

    match schedule_dispatch_job(
        state.get_ref(),
        store.get_ref().clone(),
        channel.into_inner(),
        batch_id,
    )
    .await
    {
        Ok(job_id) => {
            info!("resending batch {} as job {}", batch_id, job_id);
            HttpResponse::Accepted().json(DispatchScheduled { batch_id, job_id })
        }
        Err(e) => error_response(&e),
    }
}
