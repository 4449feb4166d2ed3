//! Scripted provider shared by unit tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::ai::provider::{ChatRequest, VisionProvider};
use crate::ai::{GatewayError, GenerationDefaults, ModelGateway, ProviderKind};

type Responder = dyn Fn(&str) -> Result<String, GatewayError> + Send + Sync;

/// Answers each request by handing its prompt to a closure.
pub struct PromptResponder {
    respond: Box<Responder>,
    delay: Duration,
    pub prompts: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
}

impl PromptResponder {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&str) -> Result<String, GatewayError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            delay: Duration::from_millis(5),
            prompts: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn gateway(self: &Arc<Self>) -> Arc<ModelGateway> {
        Arc::new(
            ModelGateway::new(GenerationDefaults::default())
                .with_provider(ProviderKind::OpenAi, self.clone()),
        )
    }
}

#[async_trait]
impl VisionProvider for PromptResponder {
    fn name(&self) -> &str {
        "scripted"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, GatewayError> {
        let prompt = request.prompt();
        self.prompts.lock().unwrap().push(prompt.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        (self.respond)(&prompt)
    }
}
