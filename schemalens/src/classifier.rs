//! Component Classifier
//!
//! Decides which of the fixed component types appear in a rectified drawing.
//! A free-text layout description is requested first and shared as context by
//! every per-type presence check; the checks then run concurrently, gated by
//! the process-wide request limiter.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::ai::prompts::{build_presence_prompt, LAYOUT_PROMPT};
use crate::ai::{GatewayError, ModelGateway, ModelRequest, StructuredResponse};
use crate::config::ComponentPrompts;
use crate::core::ExtractionError;
use crate::schema::{Component, ComponentType};

/// Model judgment for one component type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentPresence {
    pub reasoning: String,
    pub approximate_location: String,
    pub is_present: bool,
}

impl StructuredResponse for ComponentPresence {
    fn json_schema() -> serde_json::Value {
        json!({
            "title": "ComponentPresence",
            "type": "object",
            "properties": {
                "reasoning": {
                    "type": "string",
                    "description": "Step-by-step reasoning about whether the component is drawn"
                },
                "approximate_location": {
                    "type": "string",
                    "description": "Where in the drawing the component is, or 'none'"
                },
                "is_present": {
                    "type": "boolean",
                    "description": "True only if the component is clearly drawn"
                }
            },
            "required": ["reasoning", "approximate_location", "is_present"]
        })
    }
}

pub struct ComponentClassifier {
    gateway: Arc<ModelGateway>,
    prompts: Arc<ComponentPrompts>,
    limiter: Arc<Semaphore>,
}

impl ComponentClassifier {
    pub fn new(
        gateway: Arc<ModelGateway>,
        prompts: Arc<ComponentPrompts>,
        limiter: Arc<Semaphore>,
    ) -> Self {
        Self {
            gateway,
            prompts,
            limiter,
        }
    }

    /// Free-text description of the drawing's structure.
    pub async fn describe_layout(&self, image: &[u8]) -> Result<String, GatewayError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| GatewayError::LimiterClosed)?;
        let layout = self
            .gateway
            .communicate(ModelRequest::new(LAYOUT_PROMPT, image))
            .await?;
        tracing::debug!("Layout description: {}", layout.trim());
        Ok(layout)
    }

    /// One presence check. Waits for a limiter permit before calling the model.
    pub async fn check(
        &self,
        component_type: ComponentType,
        image: &[u8],
        layout: &str,
    ) -> Result<ComponentPresence, GatewayError> {
        let prompt = build_presence_prompt(component_type, &self.prompts.get(component_type), layout);
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| GatewayError::LimiterClosed)?;
        let presence: ComponentPresence = self
            .gateway
            .communicate_structured(ModelRequest::new(prompt, image))
            .await?;
        tracing::debug!(
            "{} present: {} ({})",
            component_type,
            presence.is_present,
            presence.approximate_location
        );
        Ok(presence)
    }

    /// Presence of every type, in canonical order.
    ///
    /// All checks run to completion; if any failed, the first failure in
    /// canonical order is returned and no partial result is produced.
    pub async fn detect_presence(
        &self,
        image: &[u8],
    ) -> Result<Vec<(ComponentType, bool)>, ExtractionError> {
        let layout = self.describe_layout(image).await?;

        let checks = ComponentType::ALL
            .iter()
            .map(|&component_type| self.check(component_type, image, &layout));
        let results = join_all(checks).await;

        let mut presence = Vec::with_capacity(results.len());
        for (component_type, result) in ComponentType::ALL.iter().zip(results) {
            match result {
                Ok(answer) => presence.push((*component_type, answer.is_present)),
                Err(e) => {
                    tracing::error!("Presence check for {} failed: {}", component_type, e);
                    return Err(e.into());
                }
            }
        }
        Ok(presence)
    }

    /// Components present in the drawing, in canonical type order.
    pub async fn identify(&self, image: &[u8]) -> Result<Vec<Component>, ExtractionError> {
        let components: Vec<Component> = self
            .detect_presence(image)
            .await?
            .into_iter()
            .filter(|(_, present)| *present)
            .map(|(component_type, _)| Component::new(component_type))
            .collect();

        tracing::info!(
            "Identified {} component(s): {}",
            components.len(),
            components
                .iter()
                .map(|c| c.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(components)
    }
}
