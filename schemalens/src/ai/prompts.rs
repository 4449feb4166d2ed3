use crate::config::ComponentPrompt;
use crate::schema::{Component, ComponentType};

pub const LOCATION_PROMPT: &str = r#"Analyze this image and identify the approximate location of the hand-drawn circuit diagram.
Provide the relative position as coordinates where:
- relative_x: 0.0 is leftmost, 1.0 is rightmost
- relative_y: 0.0 is topmost, 1.0 is bottommost
- confidence: how confident you are in this location (0.0 to 1.0)

Focus on finding black drawings on white paper. Ignore tables, furniture, hands or other objects."#;

pub const LAYOUT_PROMPT: &str = r#"You are an expert electronics teacher looking at a hand-drawn circuit diagram.

Describe the structure of the circuit as precisely as you can:
1. The overall shape of the wiring (single loop, branches, parallel paths)
2. Every symbol you can see and where it sits (top, bottom, left, right, corners)
3. Which symbols share a wire with each other

Do not guess component values. Describe only what is drawn."#;

/// Suffix that tells the model the exact output structure.
pub fn schema_suffix(schema: &serde_json::Value) -> String {
    let rendered = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!("\n\nOutput MUST EXACTLY match this JSON schema:\n{}", rendered)
}

pub fn build_presence_prompt(
    component_type: ComponentType,
    prompt: &ComponentPrompt,
    layout: &str,
) -> String {
    format!(
        r#"You are analyzing a hand-drawn circuit diagram from an electronics class.

CIRCUIT LAYOUT (described earlier):
{}

TASK: {}

A {} is usually drawn as: {}.

Answer only for the {}. Set "is_present" to true only if the symbol is clearly drawn."#,
        layout.trim(),
        prompt.identification.trim(),
        component_type.display_name(),
        prompt.visual_representation.trim(),
        component_type.display_name(),
    )
}

pub fn build_connection_prompt(
    first: &Component,
    first_prompt: &ComponentPrompt,
    second: &Component,
    second_prompt: &ComponentPrompt,
) -> String {
    format!(
        r#"You are analyzing a hand-sketched circuit diagram. Your ONLY task is to determine if there is a direct
connection between these two specific components:

Component 1: {} (represented as {})
Component 2: {} (represented as {})

A direct connection exists if:
1. The components are joined by a continuous line
2. The line does not pass through any other component symbol
3. There is a clear path for electrical current to flow between them along that line

Important rules:
- Only focus on these two specific components
- The connecting line may bend or be made of multiple segments
- If you cannot tell, answer false

Respond with true if a direct connection exists, false otherwise."#,
        first.component_type.display_name(),
        first_prompt.visual_representation.trim(),
        second.component_type.display_name(),
        second_prompt.visual_representation.trim(),
    )
}
