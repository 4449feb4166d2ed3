//! Extraction pipeline shared by the CLI and library callers.
//! Rectify, classify, infer connectivity, assemble.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::ai::{GatewayError, ModelGateway};
use crate::classifier::ComponentClassifier;
use crate::config::{ConfigError, Settings};
use crate::connections::ConnectionInferencer;
use crate::detector::{Detection, RegionDetector, SheetDetector};
use crate::schema::{CircuitSchema, Component, Connection};

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Could not detect a circuit diagram in the image")]
    DiagramNotFound,
    #[error(transparent)]
    Model(#[from] GatewayError),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ExtractionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExtractionError::Model(e) if e.is_timeout())
    }

    pub fn is_invalid_response(&self) -> bool {
        matches!(self, ExtractionError::Model(e) if e.is_invalid_response())
    }

    /// Whether the photo itself was unusable, as opposed to a failure
    /// further down the pipeline.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ExtractionError::DiagramNotFound)
    }
}

/// Runs the extraction pipeline over one photo at a time.
///
/// Stages run strictly in sequence. The classifier and the inferencer share one
/// request limiter, so the number of in-flight model calls across a run never
/// exceeds its permit count.
pub struct CircuitExtractor {
    detector: Arc<dyn RegionDetector>,
    classifier: ComponentClassifier,
    inferencer: ConnectionInferencer,
}

impl CircuitExtractor {
    pub fn new(
        detector: Arc<dyn RegionDetector>,
        classifier: ComponentClassifier,
        inferencer: ConnectionInferencer,
    ) -> Self {
        Self {
            detector,
            classifier,
            inferencer,
        }
    }

    /// Wire the real providers, detector and limiter from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, ExtractionError> {
        Self::with_gateway(Arc::new(settings.build_gateway()), settings)
    }

    /// Same as `from_settings` with a caller-supplied gateway.
    pub fn with_gateway(
        gateway: Arc<ModelGateway>,
        settings: &Settings,
    ) -> Result<Self, ExtractionError> {
        let prompts = Arc::new(settings.component_prompts()?);
        let limiter = Arc::new(Semaphore::new(settings.max_parallel_requests.max(1)));
        let detector = SheetDetector::new(gateway.clone(), settings.detector_config());

        tracing::debug!(
            "Extractor ready (model: {}, parallel requests: {}, policy: {})",
            settings.model_name,
            settings.max_parallel_requests,
            settings.rectification_policy
        );

        Ok(Self::new(
            Arc::new(detector),
            ComponentClassifier::new(gateway.clone(), prompts.clone(), limiter.clone()),
            ConnectionInferencer::new(gateway, prompts, limiter),
        ))
    }

    /// Full pipeline: components and their wiring.
    pub async fn extract_schema(&self, image: &[u8]) -> Result<CircuitSchema, ExtractionError> {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("extract_schema", %run_id);
        async move {
            tracing::info!("Starting extraction ({} bytes)", image.len());

            let rectified = match self.detector.detect(image, run_id).await? {
                Detection::Found { image, region } => {
                    tracing::debug!(
                        "Drawing found at ({}, {}) size {}x{}",
                        region.x,
                        region.y,
                        region.width,
                        region.height
                    );
                    image
                }
                Detection::NotFound => {
                    tracing::warn!("No circuit diagram detected");
                    return Err(ExtractionError::DiagramNotFound);
                }
            };

            let components = self.classifier.identify(&rectified).await?;
            let connections = self.inferencer.infer(&components, &rectified).await?;

            tracing::info!(
                "Extraction complete: {} component(s), {} with connections",
                components.len(),
                connections.iter().filter(|c| !c.connections.is_empty()).count()
            );
            Ok(CircuitSchema::new(components, connections))
        }
        .instrument(span)
        .await
    }

    /// Component presence on the image exactly as supplied (no rectification).
    pub async fn extract_components(&self, image: &[u8]) -> Result<Vec<Component>, ExtractionError> {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("extract_components", %run_id);
        self.classifier.identify(image).instrument(span).await
    }

    /// Connectivity for an externally supplied component list.
    pub async fn connect(
        &self,
        components: &[Component],
        image: &[u8],
    ) -> Result<Vec<Connection>, ExtractionError> {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("connect", %run_id);
        self.inferencer.infer(components, image).instrument(span).await
    }
}
