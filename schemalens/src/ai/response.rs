//! Structured response parsing and validation.

use serde::de::DeserializeOwned;

use crate::ai::GatewayError;

/// A value the model is asked to return as JSON.
///
/// `json_schema` is appended to the prompt so the model knows the exact shape;
/// serde checks required fields and types, `validate` checks value constraints.
pub trait StructuredResponse: DeserializeOwned + Send {
    fn json_schema() -> serde_json::Value;

    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Parse and validate a model answer against `T`.
pub fn parse_structured<T: StructuredResponse>(text: &str) -> Result<T, GatewayError> {
    let json_text = extract_json_from_text(text);

    let value: serde_json::Value = serde_json::from_str(&json_text)
        .map_err(|e| GatewayError::InvalidResponse(format!("Invalid JSON response: {}", e)))?;

    let parsed: T = serde_json::from_value(value).map_err(|e| {
        GatewayError::InvalidResponse(format!("Response validation failed: {}", e))
    })?;

    parsed.validate().map_err(|reason| {
        GatewayError::InvalidResponse(format!("Response validation failed: {}", reason))
    })?;

    Ok(parsed)
}

/// Pull the JSON object out of a model answer that may be wrapped in markdown
/// fences or surrounded by prose.
pub fn extract_json_from_text(text: &str) -> String {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        if let Some(end) = text.rfind("```") {
            if end > start + 7 {
                return text[start + 7..end].trim().to_string();
            }
        }
    }

    if let Some(start) = text.find("```") {
        if let Some(end) = text.rfind("```") {
            if end > start + 3 {
                let content = text[start + 3..end].trim();
                if content.starts_with('{') {
                    return content.to_string();
                }
            }
        }
    }

    if let Some(start) = text.find('{') {
        if let Some(end) = text.rfind('}') {
            if end > start {
                return text[start..=end].to_string();
            }
        }
    }

    // No object found; let the JSON parser report the failure
    text.to_string()
}
