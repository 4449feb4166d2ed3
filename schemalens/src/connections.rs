//! Connection Inferencer
//!
//! Asks the model, pair by pair, whether two identified components are wired
//! directly to each other. Only pairs of differing types are checked; answers
//! are folded into an undirected graph so the result is symmetric.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::ai::prompts::build_connection_prompt;
use crate::ai::{GatewayError, ModelGateway, ModelRequest, StructuredResponse};
use crate::config::ComponentPrompts;
use crate::core::ExtractionError;
use crate::graph::ConnectionGraph;
use crate::schema::{Component, Connection};

/// Sampling temperature for pairwise checks.
pub const CONNECTION_TEMPERATURE: f32 = 0.2;

/// Model judgment for one component pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentConnection {
    pub reasoning: String,
    pub is_connected: bool,
}

impl StructuredResponse for ComponentConnection {
    fn json_schema() -> serde_json::Value {
        json!({
            "title": "ComponentConnection",
            "type": "object",
            "properties": {
                "reasoning": {
                    "type": "string",
                    "description": "Explanation of the connection path between the two components"
                },
                "is_connected": {
                    "type": "boolean",
                    "description": "True if the two components are directly connected"
                }
            },
            "required": ["reasoning", "is_connected"]
        })
    }
}

/// Index pairs `(i, j)`, `i < j`, whose component types differ.
pub fn candidate_pairs(components: &[Component]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for i in 0..components.len() {
        for j in (i + 1)..components.len() {
            if components[i].component_type != components[j].component_type {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

pub struct ConnectionInferencer {
    gateway: Arc<ModelGateway>,
    prompts: Arc<ComponentPrompts>,
    limiter: Arc<Semaphore>,
}

impl ConnectionInferencer {
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

    /// Whether `first` and `second` are directly connected.
    pub async fn check_pair(
        &self,
        first: &Component,
        second: &Component,
        image: &[u8],
    ) -> Result<bool, GatewayError> {
        let prompt = build_connection_prompt(
            first,
            &self.prompts.get(first.component_type),
            second,
            &self.prompts.get(second.component_type),
        );
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| GatewayError::LimiterClosed)?;
        let answer: ComponentConnection = self
            .gateway
            .communicate_structured(
                ModelRequest::new(prompt, image).with_temperature(CONNECTION_TEMPERATURE),
            )
            .await?;
        tracing::debug!(
            "{} <-> {}: {} ({})",
            first.id,
            second.id,
            answer.is_connected,
            answer.reasoning.trim()
        );
        Ok(answer.is_connected)
    }

    /// Adjacency for `components`: one entry per component, in input order.
    ///
    /// A pair whose check timed out counts as not connected. Any other
    /// failure, a malformed answer included, fails the whole stage with the
    /// first failing pair in pair order, after every check has finished.
    pub async fn infer(
        &self,
        components: &[Component],
        image: &[u8],
    ) -> Result<Vec<Connection>, ExtractionError> {
        let pairs = candidate_pairs(components);
        tracing::info!(
            "Checking {} candidate pair(s) among {} component(s)",
            pairs.len(),
            components.len()
        );

        let checks = pairs
            .iter()
            .map(|&(i, j)| self.check_pair(&components[i], &components[j], image));
        let results = join_all(checks).await;

        let mut graph = ConnectionGraph::new(components);
        for (&(i, j), result) in pairs.iter().zip(results) {
            match result {
                Ok(true) => graph.connect(i, j),
                Ok(false) => {}
                Err(e) if e.is_timeout() => {
                    tracing::warn!(
                        "Treating {} <-> {} as not connected: {}",
                        components[i].id,
                        components[j].id,
                        e
                    );
                }
                Err(e) => {
                    tracing::error!(
                        "Connection check {} <-> {} failed: {}",
                        components[i].id,
                        components[j].id,
                        e
                    );
                    return Err(e.into());
                }
            }
        }

        Ok(graph.to_connections())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::PromptResponder;
    use crate::schema::ComponentType;
    use std::time::Duration;

    fn answer(connected: bool) -> String {
        json!({"reasoning": "a line joins them", "is_connected": connected}).to_string()
    }

    fn inferencer(provider: &Arc<PromptResponder>) -> ConnectionInferencer {
        ConnectionInferencer::new(
            provider.gateway(),
            Arc::new(ComponentPrompts::builtin()),
            Arc::new(Semaphore::new(2)),
        )
    }

    #[test]
    fn test_candidate_pairs_skip_same_type() {
        let components = vec![
            Component::with_id("b1", ComponentType::Battery),
            Component::with_id("b2", ComponentType::Battery),
            Component::with_id("r1", ComponentType::Resistor),
        ];
        assert_eq!(candidate_pairs(&components), vec![(0, 2), (1, 2)]);
        assert!(candidate_pairs(&components[..2]).is_empty());
        assert!(candidate_pairs(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_connected_pair_is_symmetric() {
        let provider = Arc::new(PromptResponder::new(|_| Ok(answer(true))));
        let components = vec![
            Component::new(ComponentType::Battery),
            Component::new(ComponentType::Resistor),
        ];

        let connections = inferencer(&provider).infer(&components, b"img").await.unwrap();
        assert_eq!(
            connections,
            vec![
                Connection {
                    component: "b1".to_string(),
                    connections: vec!["r1".to_string()],
                },
                Connection {
                    component: "r1".to_string(),
                    connections: vec!["b1".to_string()],
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_unconnected_pair_leaves_empty_lists() {
        let provider = Arc::new(PromptResponder::new(|_| Ok(answer(false))));
        let components = vec![
            Component::new(ComponentType::Led),
            Component::new(ComponentType::Switch),
        ];
        let connections = inferencer(&provider).infer(&components, b"img").await.unwrap();
        assert!(connections.iter().all(|c| c.connections.is_empty()));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_answer_fails_stage() {
        let provider = Arc::new(PromptResponder::new(|_| Ok("I cannot tell, sorry".to_string())));
        let components = vec![
            Component::new(ComponentType::Battery),
            Component::new(ComponentType::Resistor),
        ];

        let err = inferencer(&provider).infer(&components, b"img").await.unwrap_err();
        assert!(err.is_invalid_response());
        assert!(!err.is_timeout());
    }

    #[tokio::test]
    async fn test_one_malformed_pair_fails_despite_other_answers() {
        let provider = Arc::new(PromptResponder::new(|prompt| {
            if prompt.contains("Component 2: LED") {
                Ok("maybe?".to_string())
            } else {
                Ok(answer(true))
            }
        }));
        let components = vec![
            Component::new(ComponentType::Battery),
            Component::new(ComponentType::Led),
            Component::new(ComponentType::Switch),
        ];

        let err = inferencer(&provider).infer(&components, b"img").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Model(GatewayError::InvalidResponse(_))));
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_timeout_tolerated_but_api_error_fatal() {
        let provider = Arc::new(PromptResponder::new(|_| {
            Err(GatewayError::Timeout {
                provider: "scripted".to_string(),
                after: Duration::from_secs(1),
            })
        }));
        let components = vec![
            Component::new(ComponentType::Battery),
            Component::new(ComponentType::Resistor),
        ];
        let connections = inferencer(&provider).infer(&components, b"img").await.unwrap();
        assert!(connections[0].connections.is_empty());

        let provider = Arc::new(PromptResponder::new(|_| {
            Err(GatewayError::Api {
                status: 503,
                message: "unavailable".to_string(),
            })
        }));
        let err = inferencer(&provider).infer(&components, b"img").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Model(GatewayError::Api { status: 503, .. })));
    }
}
