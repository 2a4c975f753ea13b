// src/services/enhancer.rs
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::errors::StudioError;
use crate::models::{EncodedImage, ImageStyle};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const IMAGE_MODEL: &str = "gemini-2.5-flash-image";
const TEXT_MODEL: &str = "gemini-2.5-flash";

/// The remote enhancement capability. Two implementations exist: a direct
/// client holding the service credential, and a proxy client for deployments
/// where the credential lives elsewhere. The deployment picks one at startup.
#[async_trait]
pub trait EnhancementProvider: Send + Sync {
    /// Returns `Ok(None)` when the remote response carries no image payload.
    async fn replace_background(
        &self,
        image: &EncodedImage,
        style: ImageStyle,
    ) -> Result<Option<EncodedImage>, StudioError>;

    /// Short marketing copy for the product in the image. Independent of
    /// `replace_background`; callers may issue both concurrently.
    async fn generate_description(
        &self,
        image: &EncodedImage,
    ) -> Result<Option<String>, StudioError>;
}

fn background_prompt(style: ImageStyle, category: Option<&str>) -> String {
    let category_line = category
        .map(|c| format!("The product category is \"{}\".\n", c))
        .unwrap_or_default();
    format!(
        "You are a professional e-commerce product photographer and editor.\n\
         Task: Remove the background of the main product in this image and replace it with a new background.\n\
         {category_line}\
         Requirements:\n\
         1. Detect the main product accurately.\n\
         2. Remove the existing background completely.\n\
         3. Generate a new background in \"{style}\" style: {guide}\n\
         4. The new background should complement the product's colors and theme.\n\
         5. Ensure professional studio-quality lighting and shadows that make the product pop.\n\
         6. Keep the product at its original scale but centered.\n\
         7. Output ONLY the edited image.",
        style = style.as_str(),
        guide = style.background_guide(),
    )
}

const DESCRIPTION_PROMPT: &str = "You are an e-commerce copywriter. Write a short, compelling \
    marketing description (2-3 sentences) for the product in this image. Highlight its key \
    visual qualities and likely use. Output ONLY the description text.";

/// Direct client against the Gemini API. Holds the long-lived credential and
/// must therefore only run in a trusted server-side process.
pub struct GeminiClient {
    api_key: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
        }
    }

    /// Sends one inline image plus a text instruction to `model` and returns
    /// the parsed response body.
    async fn generate(
        &self,
        model: &str,
        image: &EncodedImage,
        prompt: &str,
    ) -> Result<Value, StudioError> {
        let response = self
            .client
            .post(format!("{}/{}:generateContent", API_BASE, model))
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({
                "contents": [{
                    "parts": [
                        {
                            "inlineData": {
                                "mimeType": image.mime_type,
                                "data": image.to_base64()
                            }
                        },
                        { "text": prompt }
                    ]
                }]
            }))
            .send()
            .await
            .map_err(|e| StudioError::RemoteService(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(StudioError::RemoteService(gemini_error_message(
                status.as_u16(),
                &body,
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            StudioError::RemoteService(format!("failed to parse Gemini response: {}", e))
        })
    }

    /// Background replacement with an optional category hint; used by the
    /// proxy endpoint, which accepts a category field the batch config does
    /// not carry.
    pub async fn process_product_image(
        &self,
        image: &EncodedImage,
        style: ImageStyle,
        category: Option<&str>,
    ) -> Result<Option<EncodedImage>, StudioError> {
        let prompt = background_prompt(style, category);
        let response = self.generate(IMAGE_MODEL, image, &prompt).await?;
        Ok(first_inline_image(&response))
    }
}

#[async_trait]
impl EnhancementProvider for GeminiClient {
    async fn replace_background(
        &self,
        image: &EncodedImage,
        style: ImageStyle,
    ) -> Result<Option<EncodedImage>, StudioError> {
        self.process_product_image(image, style, None).await
    }

    async fn generate_description(
        &self,
        image: &EncodedImage,
    ) -> Result<Option<String>, StudioError> {
        let response = self.generate(TEXT_MODEL, image, DESCRIPTION_PROMPT).await?;
        Ok(first_text(&response).map(|s| s.trim().to_string()))
    }
}

/// Client for a deployment where another process holds the credential and
/// exposes the proxy contract: `POST {base}/api/process-image` and
/// `POST {base}/api/generate-description`, errors as non-200 `{error}`.
pub struct ProxyEnhancer {
    base_url: String,
    client: Client,
}

impl ProxyEnhancer {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    async fn post(&self, route: &str, body: Value) -> Result<Value, StudioError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, route))
            .json(&body)
            .send()
            .await
            .map_err(|e| StudioError::RemoteService(format!("proxy request failed: {}", e)))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(StudioError::RemoteService(proxy_error_message(
                status.as_u16(),
                &text,
            )));
        }

        serde_json::from_str(&text).map_err(|e| {
            StudioError::RemoteService(format!("failed to parse proxy response: {}", e))
        })
    }
}

#[async_trait]
impl EnhancementProvider for ProxyEnhancer {
    async fn replace_background(
        &self,
        image: &EncodedImage,
        style: ImageStyle,
    ) -> Result<Option<EncodedImage>, StudioError> {
        let body = self
            .post(
                "/api/process-image",
                json!({
                    "base64Image": image.to_base64(),
                    "mimeType": image.mime_type,
                    "style": style.as_str(),
                }),
            )
            .await?;

        match body["image"].as_str() {
            Some(uri) => Ok(Some(EncodedImage::from_data_uri(uri)?)),
            None => Ok(None),
        }
    }

    async fn generate_description(
        &self,
        image: &EncodedImage,
    ) -> Result<Option<String>, StudioError> {
        let body = self
            .post(
                "/api/generate-description",
                json!({
                    "base64Image": image.to_base64(),
                    "mimeType": image.mime_type,
                }),
            )
            .await?;

        Ok(body["description"]
            .as_str()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()))
    }
}

/// First response part carrying inline image data, if any.
fn first_inline_image(response: &Value) -> Option<EncodedImage> {
    let parts = response["candidates"][0]["content"]["parts"].as_array()?;
    for part in parts {
        let inline = &part["inlineData"];
        if let Some(data) = inline["data"].as_str() {
            let mime_type = inline["mimeType"].as_str().unwrap_or("image/png");
            if let Ok(image) = EncodedImage::from_base64(mime_type, data) {
                return Some(image);
            }
        }
    }
    None
}

/// First text part of the response, if any.
fn first_text(response: &Value) -> Option<String> {
    let parts = response["candidates"][0]["content"]["parts"].as_array()?;
    parts
        .iter()
        .find_map(|part| part["text"].as_str())
        .map(|s| s.to_string())
}

/// Prefers the structured `error.message` Gemini returns; falls back to the
/// raw body, then to the HTTP status.
fn gemini_error_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value["error"]["message"].as_str() {
            return message.to_string();
        }
    }
    if body.trim().is_empty() {
        format!("Gemini returned HTTP {}", status)
    } else {
        body.trim().to_string()
    }
}

/// Proxy errors are `{error: string}`; the message is surfaced verbatim.
fn proxy_error_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value["error"].as_str() {
            return message.to_string();
        }
    }
    if body.trim().is_empty() {
        format!("proxy returned HTTP {}", status)
    } else {
        body.trim().to_string()
    }
}
