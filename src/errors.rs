// src/errors.rs
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("Image decode error: {0}")]
    Decode(String),

    // Carries the remote-provided message verbatim so a record's error text
    // matches the upstream payload exactly.
    #[error("{0}")]
    RemoteService(String),

    #[error("AI failed to process image")]
    AbsentResult,

    #[error("AI processing is disabled: set GEMINI_API_KEY or ENHANCER_PROXY_URL")]
    AiDisabled,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Image not found: {0}")]
    NotFound(Uuid),
}

impl ResponseError for StudioError {
    fn error_response(&self) -> HttpResponse {
        match self {
            StudioError::Decode(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Image decode error",
                "message": self.to_string()
            })),
            StudioError::RemoteService(_) | StudioError::AbsentResult => {
                HttpResponse::ServiceUnavailable().json(serde_json::json!({
                    "error": "AI service error",
                    "message": self.to_string()
                }))
            }
            StudioError::AiDisabled => {
                HttpResponse::ServiceUnavailable().json(serde_json::json!({
                    "error": "AI processing disabled",
                    "message": self.to_string()
                }))
            }
            StudioError::Validation(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Validation error",
                "message": self.to_string()
            })),
            StudioError::NotFound(_) => HttpResponse::NotFound().json(serde_json::json!({
                "error": "Not found",
                "message": self.to_string()
            })),
        }
    }
}
