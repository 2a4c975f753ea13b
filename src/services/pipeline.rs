// src/services/pipeline.rs
use std::sync::Arc;

use crate::errors::StudioError;
use crate::models::{EncodedImage, ProcessingConfig};
use crate::services::codec::ImageCodec;
use crate::services::enhancer::EnhancementProvider;

/// Result of one successful pipeline run.
#[derive(Debug)]
pub struct PipelineOutput {
    pub image: EncodedImage,
    pub description: Option<String>,
}

/// Per-image processing: the two remote calls issued concurrently and
/// joined, then the deterministic local composite. Holds no record state;
/// the batch controller owns status transitions.
pub struct Pipeline {
    enhancer: Arc<dyn EnhancementProvider>,
    codec: ImageCodec,
}

impl Pipeline {
    pub fn new(enhancer: Arc<dyn EnhancementProvider>) -> Self {
        Self {
            enhancer,
            codec: ImageCodec::new(),
        }
    }

    pub async fn run(
        &self,
        original: &EncodedImage,
        config: &ProcessingConfig,
    ) -> Result<PipelineOutput, StudioError> {
        let (background, description) = tokio::join!(
            self.enhancer.replace_background(original, config.style),
            self.enhancer.generate_description(original),
        );

        // A failed or empty background result aborts the run; whatever the
        // description call produced is discarded with it.
        let enhanced = background?.ok_or(StudioError::AbsentResult)?;
        let description = description?;

        let target_w = config.resolution;
        let target_h = config.aspect_ratio.target_height(target_w);
        let image = self.codec.composite_and_crop(
            &enhanced,
            target_w,
            target_h,
            config.brightness,
            config.contrast,
        )?;

        Ok(PipelineOutput { image, description })
    }
}
