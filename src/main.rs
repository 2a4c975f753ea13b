// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use log::{info, warn};
use std::sync::Arc;

mod errors;
mod handlers;
mod models;
mod services;

use crate::handlers::{
    clear_images, download_original, download_processed, get_config, get_image, list_images,
    process_all, proxy_generate_description, proxy_process_image, remove_image, retry_image,
    update_config, upload_images,
};
use crate::services::{BatchController, EnhancementProvider, GeminiClient, ProxyEnhancer};

#[derive(Clone)]
pub struct AppState {
    batch: Arc<BatchController>,
    gemini: Option<Arc<GeminiClient>>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting pics-studio service...");

    let gemini = read_api_key().map(|key| Arc::new(GeminiClient::new(key)));

    // Deployment-selected enhancement provider: an upstream proxy when one
    // is configured, else the direct client, else disabled-AI mode.
    let enhancer: Option<Arc<dyn EnhancementProvider>> = match std::env::var("ENHANCER_PROXY_URL") {
        Ok(url) if !url.trim().is_empty() => {
            info!("Using enhancement proxy at {}", url);
            Some(Arc::new(ProxyEnhancer::new(url)))
        }
        _ => gemini
            .clone()
            .map(|client| client as Arc<dyn EnhancementProvider>),
    };

    if enhancer.is_none() {
        warn!(
            "GEMINI_API_KEY is not set and no ENHANCER_PROXY_URL is configured; \
             AI processing is disabled, uploads and listing remain available"
        );
    }

    let app_state = AppState {
        batch: Arc::new(BatchController::new(enhancer)),
        gemini,
    };

    info!("Starting HTTP server on 0.0.0.0:8080");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .service(
                web::scope("/api/v1")
                    .route("/upload", web::post().to(upload_images))
                    .route("/images", web::get().to(list_images))
                    .route("/images", web::delete().to(clear_images))
                    .route("/images/{id}", web::get().to(get_image))
                    .route("/images/{id}", web::delete().to(remove_image))
                    .route("/images/{id}/retry", web::post().to(retry_image))
                    .route("/images/{id}/original", web::get().to(download_original))
                    .route("/images/{id}/processed", web::get().to(download_processed))
                    .route("/process", web::post().to(process_all))
                    .route("/config", web::get().to(get_config))
                    .route("/config", web::put().to(update_config)),
            )
            .route("/api/process-image", web::post().to(proxy_process_image))
            .route(
                "/api/generate-description",
                web::post().to(proxy_generate_description),
            )
            .route("/health", web::get().to(health_check))
    })
    .bind("0.0.0.0:8080")?
    .run()
    .await
}

/// Placeholder values left over from deployment templates count as unset.
fn read_api_key() -> Option<String> {
    match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() && key != "MY_GEMINI_API_KEY" => Some(key),
        _ => None,
    }
}

async fn health_check(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "pics-studio",
        "version": env!("CARGO_PKG_VERSION"),
        "ai_enabled": data.batch.ai_enabled()
    }))
}
