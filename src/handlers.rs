// src/handlers.rs
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use futures_util::TryStreamExt;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::AppState;
use crate::errors::StudioError;
use crate::models::{EncodedImage, ImageStyle, ProcessingConfig};

/// Multipart upload. Each file is encoded independently; a rejected file is
/// reported alongside the accepted ones and never blocks its siblings.
pub async fn upload_images(
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let mut uploaded = Vec::new();
    let mut rejected = Vec::new();

    while let Some(mut field) = payload.try_next().await? {
        let filename = field
            .content_disposition()
            .get_filename()
            .unwrap_or("upload")
            .to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            bytes.extend_from_slice(&chunk);
        }

        match data.batch.add_file(&filename, &bytes).await {
            Ok(id) => uploaded.push(id),
            Err(e) => rejected.push(json!({
                "filename": filename,
                "error": e.to_string()
            })),
        }
    }

    Ok(HttpResponse::Ok().json(json!({
        "uploaded": uploaded,
        "rejected": rejected,
        "count": uploaded.len()
    })))
}

pub async fn list_images(data: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let images = data.batch.summaries().await;
    Ok(HttpResponse::Ok().json(json!({
        "count": images.len(),
        "images": images
    })))
}

pub async fn get_image(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();
    let summary = data
        .batch
        .summary(id)
        .await
        .ok_or(StudioError::NotFound(id))?;
    Ok(HttpResponse::Ok().json(summary))
}

pub async fn download_original(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();
    let image = data
        .batch
        .original_image(id)
        .await
        .ok_or(StudioError::NotFound(id))?;
    Ok(HttpResponse::Ok()
        .content_type(image.mime_type.clone())
        .body(image.data))
}

pub async fn download_processed(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();
    let image = data
        .batch
        .processed_image(id)
        .await
        .ok_or(StudioError::NotFound(id))?;
    Ok(HttpResponse::Ok()
        .content_type(image.mime_type.clone())
        .body(image.data))
}

pub async fn process_all(data: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let report = data.batch.process_all().await?;
    Ok(HttpResponse::Ok().json(report))
}

pub async fn retry_image(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();
    let summary = data
        .batch
        .retry(id)
        .await?
        .ok_or(StudioError::NotFound(id))?;
    Ok(HttpResponse::Ok().json(summary))
}

pub async fn remove_image(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();
    let removed = data.batch.remove(id).await;
    Ok(HttpResponse::Ok().json(json!({ "removed": removed })))
}

pub async fn clear_images(data: web::Data<AppState>) -> Result<HttpResponse, Error> {
    data.batch.clear().await;
    Ok(HttpResponse::Ok().json(json!({ "cleared": true })))
}

pub async fn get_config(data: web::Data<AppState>) -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().json(data.batch.config().await))
}

pub async fn update_config(
    body: web::Json<ProcessingConfig>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    data.batch.set_config(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(data.batch.config().await))
}

/// Request body of the credential-holding proxy endpoints. `base64Image`
/// carries no data-URI prefix.
#[derive(Debug, Deserialize)]
pub struct ProxyImageRequest {
    #[serde(rename = "base64Image")]
    pub base64_image: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub style: Option<ImageStyle>,
    pub category: Option<String>,
}

/// `POST /api/process-image` — the proxy contract: forwards one image to the
/// model using the server-held credential and answers with a data-URI image,
/// or a non-200 `{error}` body.
pub async fn proxy_process_image(
    body: web::Json<ProxyImageRequest>,
    data: web::Data<AppState>,
) -> HttpResponse {
    let Some(gemini) = &data.gemini else {
        return HttpResponse::InternalServerError()
            .json(json!({ "error": "GEMINI_API_KEY secret is not set" }));
    };

    let image = match EncodedImage::from_base64(&body.mime_type, &body.base64_image) {
        Ok(image) => image,
        Err(e) => return HttpResponse::BadRequest().json(json!({ "error": e.to_string() })),
    };
    let style = body.style.unwrap_or(ImageStyle::Minimal);

    match gemini
        .process_product_image(&image, style, body.category.as_deref())
        .await
    {
        Ok(Some(result)) => HttpResponse::Ok().json(json!({ "image": result.to_data_uri() })),
        Ok(None) => {
            HttpResponse::InternalServerError().json(json!({ "error": "No image generated" }))
        }
        Err(e) => HttpResponse::InternalServerError().json(json!({ "error": e.to_string() })),
    }
}

/// `POST /api/generate-description` — sibling proxy route with the same
/// request and error shapes.
pub async fn proxy_generate_description(
    body: web::Json<ProxyImageRequest>,
    data: web::Data<AppState>,
) -> HttpResponse {
    use crate::services::enhancer::EnhancementProvider;

    let Some(gemini) = &data.gemini else {
        return HttpResponse::InternalServerError()
            .json(json!({ "error": "GEMINI_API_KEY secret is not set" }));
    };

    let image = match EncodedImage::from_base64(&body.mime_type, &body.base64_image) {
        Ok(image) => image,
        Err(e) => return HttpResponse::BadRequest().json(json!({ "error": e.to_string() })),
    };

    match gemini.generate_description(&image).await {
        Ok(Some(description)) => HttpResponse::Ok().json(json!({ "description": description })),
        Ok(None) => {
            HttpResponse::InternalServerError().json(json!({ "error": "No description generated" }))
        }
        Err(e) => HttpResponse::InternalServerError().json(json!({ "error": e.to_string() })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::BatchController;
    use actix_web::{App, test};
    use std::sync::Arc;

    fn state() -> AppState {
        AppState {
            batch: Arc::new(BatchController::new(None)),
            gemini: None,
        }
    }

    #[actix_web::test]
    async fn config_round_trip() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .route("/config", web::get().to(get_config))
                .route("/config", web::put().to(update_config)),
        )
        .await;

        let req = test::TestRequest::get().uri("/config").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["resolution"], 1080);
        assert_eq!(body["style"], "minimal");
        assert_eq!(body["aspect_ratio"], "1:1");

        let req = test::TestRequest::put()
            .uri("/config")
            .set_json(json!({
                "style": "luxury",
                "aspect_ratio": "4:5",
                "resolution": 720,
                "brightness": 110,
                "contrast": 95,
                "sharpness": 100
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["style"], "luxury");
        assert_eq!(body["resolution"], 720);
    }

    #[actix_web::test]
    async fn update_config_rejects_out_of_range_values() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .route("/config", web::put().to(update_config)),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/config")
            .set_json(json!({
                "style": "minimal",
                "aspect_ratio": "1:1",
                "resolution": 1080,
                "brightness": 400,
                "contrast": 100,
                "sharpness": 100
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn process_all_without_provider_is_service_unavailable() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .route("/process", web::post().to(process_all)),
        )
        .await;

        let req = test::TestRequest::post().uri("/process").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 503);
    }

    #[actix_web::test]
    async fn proxy_without_credential_reports_error_shape() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .route("/api/process-image", web::post().to(proxy_process_image)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/process-image")
            .set_json(json!({
                "base64Image": "AQID",
                "mimeType": "image/png",
                "style": "minimal"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 500);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "GEMINI_API_KEY secret is not set");
    }

    #[actix_web::test]
    async fn unknown_record_lookups_are_not_found() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .route("/images/{id}", web::get().to(get_image))
                .route("/images/{id}/processed", web::get().to(download_processed)),
        )
        .await;

        let id = Uuid::new_v4();
        for uri in [format!("/images/{}", id), format!("/images/{}/processed", id)] {
            let req = test::TestRequest::get().uri(&uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 404);
        }
    }
}
