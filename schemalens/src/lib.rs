//! SchemaLens - component graphs from photos of hand-drawn circuit sketches
//!
//! This library locates the drawing inside an arbitrary photo, rectifies it,
//! asks a vision model which component types are present and how they are
//! wired, and returns a typed [`CircuitSchema`].
//!
//! # Quick Start
//!
//! ```no_run
//! use schemalens::{CircuitExtractor, Settings};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::from_env()?;
//! settings.validate()?;
//!
//! let extractor = CircuitExtractor::from_settings(&settings)?;
//! let photo = std::fs::read("sketch.jpg")?;
//! let schema = extractor.extract_schema(&photo).await?;
//!
//! for component in &schema.components {
//!     println!("{} ({})", component.id, component.component_type);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Pipeline
//!
//! - **Detection**: model-estimated location, then contour extraction and
//!   rectification of the drawing region
//! - **Classification**: concurrent per-type presence checks sharing one
//!   layout description
//! - **Connectivity**: concurrent pairwise checks folded into a symmetric graph

pub mod ai;
pub mod classifier;
pub mod config;
pub mod connections;
pub mod core;
pub mod detector;
pub mod graph;
pub mod ingress;
pub mod schema;

// Re-export main types
pub use ai::{GatewayError, ModelGateway, ModelRequest, ProviderKind, VisionProvider};
pub use classifier::{ComponentClassifier, ComponentPresence};
pub use config::{ComponentPrompt, ComponentPrompts, ConfigError, Settings};
pub use connections::{ComponentConnection, ConnectionInferencer};
pub use core::{CircuitExtractor, ExtractionError};
pub use detector::{Detection, DetectorConfig, RectificationPolicy, RegionDetector, SheetDetector};
pub use graph::ConnectionGraph;
pub use ingress::{decode_base64, ImageValidator, ValidationError};
pub use schema::{CircuitLocation, CircuitSchema, Component, ComponentType, Connection};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        CircuitExtractor, CircuitSchema, Component, ComponentType, Connection, ExtractionError,
        Settings,
    };
}
