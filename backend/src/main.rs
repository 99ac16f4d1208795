use actix_web::{web, App, HttpServer};
use backend::channel::{self, MessageChannel};
use backend::config::AppConfig;
use backend::job_controller::state::{start_job_updater, JobsState};
use backend::services;
use backend::store::Store;
use env_logger::Env;
use log::{error, info};
use std::io;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::load().map_err(io::Error::other)?;
    let store = Store::open(&config.database.path).map_err(io::Error::other)?;
    let channel: Arc<dyn MessageChannel> =
        channel::from_config(&config.channel).map_err(io::Error::other)?;
    info!(
        "database at {}, sending through the {} channel",
        config.database.path.display(),
        channel.name()
    );

    // Initialize job controller state
    let (jobs_state, rx) = JobsState::new(100);
    tokio::spawn(start_job_updater(jobs_state.jobs.clone(), rx));

    let host = config.server.host.clone();
    let port = config.server.port;
    let body_limit = config.server.body_limit;
    info!("Server running at http://{}:{}", host, port);

    let app_store = store.clone();
    let app_config = web::Data::new(config);
    let app_channel: web::Data<dyn MessageChannel> = web::Data::from(channel);
    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(body_limit))
            .app_data(web::PayloadConfig::default().limit(body_limit))
            .app_data(web::Data::new(app_store.clone()))
            .app_data(web::Data::new(jobs_state.clone()))
            .app_data(app_channel.clone())
            .app_data(app_config.clone())
            .service(services::templates::configure_routes())
            .service(services::batches::configure_routes())
            .service(services::records::configure_routes())
            .service(services::jobs::configure_routes())
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    if let Err(e) = store.close() {
        error!("closing the database failed: {}", e);
    }
    info!("Server stopped");
    Ok(())
}
