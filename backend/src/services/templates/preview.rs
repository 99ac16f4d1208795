use crate::config::AppConfig;
use actix_files::NamedFile;
use actix_web::{web, HttpRequest, HttpResponse};
use log::debug;

/// `GET /api/templates/preview/{channel_template}`: serves
/// `<docs.preview_dir>/<channel_template>.png`.
pub async fn process(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    channel_template: web::Path<String>,
) -> HttpResponse {
    let name = channel_template.into_inner();
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return HttpResponse::BadRequest().body("Invalid template name");
    }

    let Some(dir) = config.docs.preview_dir.as_ref() else {
        return HttpResponse::NotFound().body("Preview image not found");
    };
    let path = dir.join(format!("{}.png", name));
    match NamedFile::open_async(&path).await {
        Ok(file) => file.into_response(&req),
        Err(e) => {
            debug!("preview {} unavailable: {}", path.display(), e);
            HttpResponse::NotFound().body("Preview image not found")
        }
    }
}
