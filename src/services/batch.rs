// src/services/batch.rs
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::StudioError;
use crate::models::{
    BatchReport, EncodedImage, ImageRecord, ImageStatus, ProcessingConfig, RecordSummary,
};
use crate::services::codec::ImageCodec;
use crate::services::enhancer::EnhancementProvider;
use crate::services::pipeline::Pipeline;

const DEFAULT_ERROR_MESSAGE: &str = "Unknown error";

/// Owns the ordered record collection and the current global config. All
/// mutation goes through these methods; the write lock keeps every update
/// atomic, so readers never observe a half-updated record.
///
/// Built without a provider, the controller stays usable for upload and
/// listing but refuses to process (disabled-AI mode).
pub struct BatchController {
    records: RwLock<Vec<ImageRecord>>,
    config: RwLock<ProcessingConfig>,
    codec: ImageCodec,
    pipeline: Option<Pipeline>,
}

impl BatchController {
    pub fn new(enhancer: Option<Arc<dyn EnhancementProvider>>) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            config: RwLock::new(ProcessingConfig::default()),
            codec: ImageCodec::new(),
            pipeline: enhancer.map(Pipeline::new),
        }
    }

    pub fn ai_enabled(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Encodes one uploaded file and appends a Pending record carrying a
    /// snapshot of the current global config. Callers add files one at a
    /// time, so one undecodable file never blocks its batch siblings.
    pub async fn add_file(&self, filename: &str, data: &[u8]) -> Result<Uuid, StudioError> {
        let encoded = self.codec.encode(data)?;
        let config = self.config.read().await.clone();
        let record = ImageRecord::new(filename, encoded, config);
        let id = record.id;
        self.records.write().await.push(record);
        Ok(id)
    }

    pub async fn summaries(&self) -> Vec<RecordSummary> {
        self.records.read().await.iter().map(RecordSummary::from).collect()
    }

    pub async fn summary(&self, id: Uuid) -> Option<RecordSummary> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .map(RecordSummary::from)
    }

    pub async fn original_image(&self, id: Uuid) -> Option<EncodedImage> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.original.clone())
    }

    pub async fn processed_image(&self, id: Uuid) -> Option<EncodedImage> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .and_then(|r| r.processed.clone())
    }

    pub async fn config(&self) -> ProcessingConfig {
        self.config.read().await.clone()
    }

    /// Replaces the global config used for future uploads. Existing records
    /// keep their snapshots.
    pub async fn set_config(&self, config: ProcessingConfig) -> Result<(), StudioError> {
        config.validate()?;
        *self.config.write().await = config;
        Ok(())
    }

    /// Runs the pipeline for one record. Unknown ids resolve to `Ok(None)`.
    /// Only Pending and Failed records are startable; a record already
    /// Processing or Completed is returned untouched. A record removed while
    /// its remote calls are in flight is not resurrected: the completion
    /// write-back finds it gone and drops the result.
    pub async fn process(&self, id: Uuid) -> Result<Option<RecordSummary>, StudioError> {
        let pipeline = self.pipeline.as_ref().ok_or(StudioError::AiDisabled)?;

        let job = {
            let mut records = self.records.write().await;
            match records.iter_mut().find(|r| r.id == id) {
                None => return Ok(None),
                Some(record)
                    if matches!(record.status, ImageStatus::Pending | ImageStatus::Failed) =>
                {
                    record.status = ImageStatus::Processing;
                    record.error = None;
                    // A new attempt discards any previous result before the
                    // remote calls start.
                    record.processed = None;
                    record.description = None;
                    Some((record.original.clone(), record.config.clone()))
                }
                Some(_) => None,
            }
        };

        let Some((original, config)) = job else {
            return Ok(self.summary(id).await);
        };

        let outcome = pipeline.run(&original, &config).await;

        let mut records = self.records.write().await;
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        match outcome {
            Ok(output) => {
                record.processed = Some(output.image);
                record.description = output.description;
                record.error = None;
                record.status = ImageStatus::Completed;
            }
            Err(err) => {
                let message = err.to_string();
                record.error = Some(if message.is_empty() {
                    DEFAULT_ERROR_MESSAGE.to_string()
                } else {
                    message
                });
                record.status = ImageStatus::Failed;
            }
        }
        Ok(Some(RecordSummary::from(&*record)))
    }

    /// Processes every Pending or Failed record in collection order, one at
    /// a time, awaiting each before the next starts. Sequential on purpose:
    /// the remote service is rate- and cost-limited, so the batch trades
    /// latency for a bounded request rate. A record failing never stops the
    /// loop.
    pub async fn process_all(&self) -> Result<BatchReport, StudioError> {
        if self.pipeline.is_none() {
            return Err(StudioError::AiDisabled);
        }

        let ids: Vec<Uuid> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| matches!(r.status, ImageStatus::Pending | ImageStatus::Failed))
            .map(|r| r.id)
            .collect();

        let mut report = BatchReport::default();
        for id in ids {
            if let Some(summary) = self.process(id).await? {
                report.processed += 1;
                match summary.status {
                    ImageStatus::Completed => report.completed += 1,
                    ImageStatus::Failed => report.failed += 1,
                    _ => {}
                }
            }
        }
        Ok(report)
    }

    /// Re-runs one record; a no-op returning `None` for unknown ids.
    pub async fn retry(&self, id: Uuid) -> Result<Option<RecordSummary>, StudioError> {
        self.process(id).await
    }

    /// Deletes the record at any status. An in-flight pipeline run for it
    /// becomes a no-op on completion.
    pub async fn remove(&self, id: Uuid) -> bool {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        records.len() != before
    }

    pub async fn clear(&self) {
        self.records.write().await.clear();
    }
}
