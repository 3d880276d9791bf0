use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProviderError;
use crate::models::{ModelDescriptor, Prompt};

/// Field names checked, in order, for a model identifier in a listing entry
const IDENTIFIER_FIELDS: &[&str] = &["name", "id", "model"];
const MODEL_PATH_PREFIX: &str = "models/";

/// Remote service that lists models and turns prompts into text
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Enumerate models in the provider's own order
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, ProviderError>;

    /// Run one generation call and return the raw model text
    async fn generate(&self, model: &str, prompt: &Prompt) -> Result<String, ProviderError>;
}

/// Normalize one listing entry into a [`ModelDescriptor`].
///
/// Accepts a bare string or an object carrying `name`, `id` or `model`
/// (first non-empty wins). Returns `None` when no identifier is present.
pub fn normalize_descriptor(entry: &Value) -> Option<ModelDescriptor> {
    let raw = match entry {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => IDENTIFIER_FIELDS
            .iter()
            .filter_map(|field| map.get(*field).and_then(Value::as_str))
            .find(|s| !s.trim().is_empty()),
        _ => None,
    }?;

    let identifier = raw.trim();
    let identifier = identifier
        .strip_prefix(MODEL_PATH_PREFIX)
        .unwrap_or(identifier)
        .to_string();
    if identifier.is_empty() {
        return None;
    }

    // Absent method lists are treated as generation-capable
    let supports_generation = entry
        .get("supportedGenerationMethods")
        .and_then(Value::as_array)
        .map(|methods| methods.iter().any(|m| m.as_str() == Some("generateContent")))
        .unwrap_or(true);

    Some(ModelDescriptor {
        identifier,
        supports_generation,
    })
}
