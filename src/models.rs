// src/models.rs
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::StudioError;

/// Background style presets sent to the image model as part of its
/// instruction text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStyle {
    Minimal,
    Luxury,
    Tech,
    Soft,
    Premium,
    Outdoor,
    Studio,
}

impl ImageStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageStyle::Minimal => "minimal",
            ImageStyle::Luxury => "luxury",
            ImageStyle::Tech => "tech",
            ImageStyle::Soft => "soft",
            ImageStyle::Premium => "premium",
            ImageStyle::Outdoor => "outdoor",
            ImageStyle::Studio => "studio",
        }
    }

    /// One-line art direction for the background generator.
    pub fn background_guide(&self) -> &'static str {
        match self {
            ImageStyle::Minimal => {
                "Clean, solid or very subtle gradient background, often white or light gray."
            }
            ImageStyle::Luxury => {
                "Premium textures like marble, silk, or dark elegant wood with dramatic lighting."
            }
            ImageStyle::Tech => {
                "Modern, sleek, maybe some subtle glow or geometric patterns, cool tones."
            }
            ImageStyle::Soft => "Pastel colors, soft shadows, warm inviting atmosphere.",
            ImageStyle::Premium => {
                "High-end studio look with professional depth of field and clean surfaces."
            }
            ImageStyle::Outdoor => {
                "Natural lighting, blurred nature or urban background that fits the product."
            }
            ImageStyle::Studio => {
                "Classic professional product photography setup with softbox lighting."
            }
        }
    }
}

/// Output proportions for the final composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:5")]
    Portrait,
    #[serde(rename = "16:9")]
    Widescreen,
}

impl AspectRatio {
    pub fn parts(&self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (1, 1),
            AspectRatio::Portrait => (4, 5),
            AspectRatio::Widescreen => (16, 9),
        }
    }

    /// Target height for a given target width, rounded to the nearest pixel.
    pub fn target_height(&self, width: u32) -> u32 {
        let (w, h) = self.parts();
        ((width as f64) * (h as f64) / (w as f64)).round() as u32
    }
}

/// Settings applied to an image at upload time. A record keeps the snapshot
/// taken when it was created; later global changes do not reach it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub style: ImageStyle,
    pub aspect_ratio: AspectRatio,
    pub resolution: u32,
    pub brightness: u16,
    pub contrast: u16,
    /// Accepted and carried, but the compositing step does not apply it yet.
    pub sharpness: u16,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            style: ImageStyle::Minimal,
            aspect_ratio: AspectRatio::Square,
            resolution: 1080,
            brightness: 100,
            contrast: 100,
            sharpness: 100,
        }
    }
}

impl ProcessingConfig {
    pub fn validate(&self) -> Result<(), StudioError> {
        if self.resolution == 0 {
            return Err(StudioError::Validation(
                "resolution must be a positive pixel size".to_string(),
            ));
        }
        for (name, value) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("sharpness", self.sharpness),
        ] {
            if !(50..=150).contains(&value) {
                return Err(StudioError::Validation(format!(
                    "{} must be between 50 and 150, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// A raster image as a MIME-tagged byte payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl EncodedImage {
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.data)
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    pub fn from_base64(mime_type: &str, payload: &str) -> Result<Self, StudioError> {
        let data = general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| StudioError::Decode(format!("invalid base64 payload: {}", e)))?;
        Ok(Self {
            mime_type: mime_type.to_string(),
            data,
        })
    }

    /// Parses a `data:<mime>;base64,<payload>` URI.
    pub fn from_data_uri(uri: &str) -> Result<Self, StudioError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| StudioError::Decode("missing data URI prefix".to_string()))?;
        let (mime_type, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| StudioError::Decode("data URI is not base64 encoded".to_string()))?;
        Self::from_base64(mime_type, payload)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// One uploaded image and its processing state. Mutated only by the batch
/// controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: Uuid,
    pub filename: String,
    pub original: EncodedImage,
    pub processed: Option<EncodedImage>,
    pub description: Option<String>,
    pub status: ImageStatus,
    pub error: Option<String>,
    pub config: ProcessingConfig,
    pub uploaded_at: DateTime<Utc>,
}

impl ImageRecord {
    pub fn new(filename: &str, original: EncodedImage, config: ProcessingConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            original,
            processed: None,
            description: None,
            status: ImageStatus::Pending,
            error: None,
            config,
            uploaded_at: Utc::now(),
        }
    }
}

/// Listing view of a record, without the image payloads.
#[derive(Debug, Clone, Serialize)]
pub struct RecordSummary {
    pub id: Uuid,
    pub filename: String,
    pub status: ImageStatus,
    pub description: Option<String>,
    pub error: Option<String>,
    pub processed: bool,
    pub config: ProcessingConfig,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&ImageRecord> for RecordSummary {
    fn from(record: &ImageRecord) -> Self {
        Self {
            id: record.id,
            filename: record.filename.clone(),
            status: record.status,
            description: record.description.clone(),
            error: record.error.clone(),
            processed: record.processed.is_some(),
            config: record.config.clone(),
            uploaded_at: record.uploaded_at,
        }
    }
}

/// Outcome counts of one `process_all` run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub completed: usize,
    pub failed: usize,
}
