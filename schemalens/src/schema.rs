//! Circuit data model
//!
//! Types produced by the extraction pipeline. `CircuitSchema` is the terminal
//! artifact handed to callers; `CircuitLocation` is an intermediate model answer
//! consumed only by the detector.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;

use crate::ai::response::StructuredResponse;

/// The closed set of component types the pipeline recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Battery,
    Resistor,
    Led,
    Switch,
}

impl ComponentType {
    /// All types in canonical checking order.
    pub const ALL: [ComponentType; 4] = [
        ComponentType::Battery,
        ComponentType::Resistor,
        ComponentType::Led,
        ComponentType::Switch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Battery => "battery",
            ComponentType::Resistor => "resistor",
            ComponentType::Led => "led",
            ComponentType::Switch => "switch",
        }
    }

    /// Name used inside prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            ComponentType::Battery => "battery",
            ComponentType::Resistor => "resistor",
            ComponentType::Led => "LED",
            ComponentType::Switch => "switch",
        }
    }

    /// Deterministic id for the (single) instance of this type in a circuit.
    pub fn component_id(&self) -> String {
        let prefix = self.as_str().chars().next().unwrap_or('c');
        format!("{}1", prefix)
    }

    /// Built-in discriminative instructions for the presence check.
    pub fn identification(&self) -> &'static str {
        match self {
            ComponentType::Battery => {
                "Determine whether the hand-drawn circuit diagram contains a battery. \
A battery is drawn as two or more parallel lines perpendicular to the wire, \
alternating between a longer line and a shorter line, with a small gap between them. \
Do not confuse it with a switch gap or the end of a wire."
            }
            ComponentType::Resistor => {
                "Determine whether the hand-drawn circuit diagram contains a resistor. \
A resistor is drawn as a zigzag line inserted in the wire, or as a small elongated \
rectangle in line with the wire. Loops, circles and parallel plates are not resistors."
            }
            ComponentType::Led => {
                "Determine whether the hand-drawn circuit diagram contains an LED. \
Look for a hand-drawn small loop, a circular shape, or an ellipse in the diagram whose \
interior is empty, with no additional markings or symbols inside. Zigzags and parallel \
lines are not LEDs."
            }
            ComponentType::Switch => {
                "Determine whether the hand-drawn circuit diagram contains a switch. \
A switch makes a gap in the line of the circuit wire where one side suddenly becomes \
diagonal (30 to 60 degrees to the wire) and separates two parts of the circuit. \
The diagonal must not resemble the zigzag of a resistor, the small loop of an LED, or \
the parallel lines of a battery. Do not consider loops or circular shapes as switches. \
All of these characteristics must be present for a switch to be present."
            }
        }
    }

    /// Built-in short description of how the symbol looks on paper.
    pub fn visual_representation(&self) -> &'static str {
        match self {
            ComponentType::Battery => "two parallel lines (one longer, one shorter)",
            ComponentType::Resistor => "zigzag line",
            ComponentType::Led => "circular loop with connecting lines",
            ComponentType::Switch => "line with a gap between terminals",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "battery" => Ok(ComponentType::Battery),
            "resistor" => Ok(ComponentType::Resistor),
            "led" => Ok(ComponentType::Led),
            "switch" => Ok(ComponentType::Switch),
            other => Err(format!("unknown component type '{}'", other)),
        }
    }
}

/// A component identified in the sketch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
}

impl Component {
    /// Component with the id derived from its type.
    pub fn new(component_type: ComponentType) -> Self {
        Self {
            id: component_type.component_id(),
            component_type,
        }
    }

    /// Component with an explicit id, for externally supplied lists.
    pub fn with_id(id: impl Into<String>, component_type: ComponentType) -> Self {
        Self {
            id: id.into(),
            component_type,
        }
    }
}

/// Adjacency entry for one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// ID of the component making the connections
    pub component: String,
    /// IDs of components this component is connected to
    pub connections: Vec<String>,
}

/// Components plus their symmetric adjacency lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitSchema {
    pub components: Vec<Component>,
    pub connections: Vec<Connection>,
}

impl CircuitSchema {
    pub fn new(components: Vec<Component>, connections: Vec<Connection>) -> Self {
        Self {
            components,
            connections,
        }
    }

    /// Adjacency list of a component, if it has an entry.
    pub fn connections_of(&self, id: &str) -> Option<&[String]> {
        self.connections
            .iter()
            .find(|c| c.component == id)
            .map(|c| c.connections.as_slice())
    }

    /// True when every listed edge appears in both directions and no component
    /// lists itself.
    pub fn is_symmetric(&self) -> bool {
        self.connections.iter().all(|entry| {
            entry.connections.iter().all(|other| {
                other != &entry.component
                    && self
                        .connections_of(other)
                        .map(|back| back.contains(&entry.component))
                        .unwrap_or(false)
            })
        })
    }
}

/// Approximate position of the drawing inside the photo, as estimated by the
/// vision model. All fields are fractions in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircuitLocation {
    pub relative_x: f64,
    pub relative_y: f64,
    pub confidence: f64,
}

impl StructuredResponse for CircuitLocation {
    fn json_schema() -> serde_json::Value {
        json!({
            "title": "CircuitLocation",
            "type": "object",
            "properties": {
                "relative_x": {
                    "type": "number",
                    "minimum": 0.0,
                    "maximum": 1.0,
                    "description": "Position from left to right of the image (0.0 to 1.0)"
                },
                "relative_y": {
                    "type": "number",
                    "minimum": 0.0,
                    "maximum": 1.0,
                    "description": "Position from top to bottom of the image (0.0 to 1.0)"
                },
                "confidence": {
                    "type": "number",
                    "minimum": 0.0,
                    "maximum": 1.0,
                    "description": "Confidence level in the detected location (0.0 to 1.0)"
                }
            },
            "required": ["relative_x", "relative_y", "confidence"]
        })
    }

    fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("relative_x", self.relative_x),
            ("relative_y", self.relative_y),
            ("confidence", self.confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be within [0, 1], got {}", name, value));
            }
        }
        Ok(())
    }
}
