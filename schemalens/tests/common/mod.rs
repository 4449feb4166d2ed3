//! Shared helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use schemalens::ai::{ChatRequest, GenerationDefaults};
use schemalens::{ComponentType, GatewayError, ModelGateway, ProviderKind, VisionProvider};
use serde_json::json;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Script = dyn Fn(&str) -> Result<String, GatewayError> + Send + Sync;

/// Vision provider that answers from a script and records what it was asked.
pub struct MockVision {
    script: Box<Script>,
    delay: Duration,
    timeout: Duration,
    prompts: Mutex<Vec<String>>,
    temperatures: Mutex<Vec<f32>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockVision {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&str) -> Result<String, GatewayError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            delay: Duration::from_millis(10),
            timeout: Duration::from_secs(5),
            prompts: Mutex::new(Vec::new()),
            temperatures: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn temperatures(&self) -> Vec<f32> {
        self.temperatures.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionProvider for MockVision {
    fn name(&self) -> &str {
        "mock"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, GatewayError> {
        let prompt = request.prompt();
        self.prompts.lock().unwrap().push(prompt.clone());
        self.temperatures.lock().unwrap().push(request.temperature);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        (self.script)(&prompt)
    }
}

pub fn gateway(mock: &Arc<MockVision>) -> Arc<ModelGateway> {
    Arc::new(
        ModelGateway::new(GenerationDefaults::default())
            .with_provider(ProviderKind::OpenAi, mock.clone()),
    )
}

pub fn is_structured(prompt: &str) -> bool {
    prompt.contains("Output MUST EXACTLY match this JSON schema")
}

pub fn is_presence_check(prompt: &str) -> bool {
    is_structured(prompt) && prompt.contains("is_present")
}

pub fn is_connection_check(prompt: &str) -> bool {
    is_structured(prompt) && prompt.contains("is_connected")
}

pub fn is_location_request(prompt: &str) -> bool {
    is_structured(prompt) && prompt.contains("relative_x")
}

pub fn presence(present: bool) -> String {
    json!({
        "reasoning": "inspected the drawing",
        "approximate_location": "center",
        "is_present": present
    })
    .to_string()
}

pub fn connection(connected: bool) -> String {
    json!({"reasoning": "followed the wire", "is_connected": connected}).to_string()
}

pub fn location(x: f64, y: f64, confidence: f64) -> String {
    json!({"relative_x": x, "relative_y": y, "confidence": confidence}).to_string()
}

/// Encode an RGB canvas as PNG bytes.
pub fn png_bytes(canvas: RgbImage) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(canvas)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

pub fn white(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
}

/// Component type a presence prompt asks about.
pub fn presence_target(prompt: &str) -> Option<ComponentType> {
    [
        ("contains a battery", ComponentType::Battery),
        ("contains a resistor", ComponentType::Resistor),
        ("contains an LED", ComponentType::Led),
        ("contains a switch", ComponentType::Switch),
    ]
    .into_iter()
    .find(|(marker, _)| prompt.contains(marker))
    .map(|(_, component_type)| component_type)
}

/// Display names of the two components a connection prompt asks about.
pub fn connection_pair(prompt: &str) -> Option<(String, String)> {
    let name_after = |marker: &str| -> Option<String> {
        let start = prompt.find(marker)? + marker.len();
        let rest = &prompt[start..];
        let end = rest.find(" (")?;
        Some(rest[..end].to_string())
    };
    Some((name_after("Component 1: ")?, name_after("Component 2: ")?))
}
