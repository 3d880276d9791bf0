use tracing::{info, warn};

use super::provider::GenerationProvider;
use crate::error::ServiceError;
use crate::models::{ModelDescriptor, Prompt};

/// Text produced by a successful generation call and the model that made it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub model: String,
    pub text: String,
    pub used_fallback: bool,
}

/// Two-tier model selection: the preferred model, then one discovered fallback.
///
/// Discovery only runs after the preferred model fails, and at most two
/// generation calls are issued per request.
pub struct ModelResolver<'a> {
    provider: &'a dyn GenerationProvider,
    family_markers: &'a [String],
}

impl<'a> ModelResolver<'a> {
    pub fn new(provider: &'a dyn GenerationProvider, family_markers: &'a [String]) -> Self {
        Self {
            provider,
            family_markers,
        }
    }

    pub async fn generate(&self, preferred: &str, prompt: &Prompt) -> Result<Generation, ServiceError> {
        info!(model = preferred, "🧠 Trying preferred model");
        let first_err = match self.provider.generate(preferred, prompt).await {
            Ok(text) => {
                info!(model = preferred, "✅ Responded with preferred model");
                return Ok(Generation {
                    model: preferred.to_string(),
                    text,
                    used_fallback: false,
                });
            }
            Err(e) => e,
        };
        warn!(model = preferred, error = %first_err, "⚠️ Preferred model failed");

        let (models, list_err) = match self.provider.list_models().await {
            Ok(models) => (models, None),
            Err(e) => {
                warn!(error = %e, "Could not list models");
                (Vec::new(), Some(e))
            }
        };

        let candidate = match select_fallback(&models, self.family_markers) {
            Some(candidate) => candidate.identifier.clone(),
            None => {
                let mut detail = format!(
                    "preferred model '{}' failed ({}) and no fallback candidate was found",
                    preferred, first_err
                );
                if let Some(e) = list_err {
                    detail.push_str(&format!("; model listing failed ({})", e));
                }
                return Err(ServiceError::ModelUnavailable(detail));
            }
        };

        info!(model = %candidate, "🔄 Trying fallback model");
        match self.provider.generate(&candidate, prompt).await {
            Ok(text) => {
                info!(model = %candidate, "✅ Responded with fallback model");
                Ok(Generation {
                    model: candidate,
                    text,
                    used_fallback: true,
                })
            }
            Err(e) => Err(ServiceError::ModelUnavailable(format!(
                "fallback model '{}' failed ({})",
                candidate, e
            ))),
        }
    }
}

/// First generation-capable model whose identifier contains a family marker,
/// case-insensitively, in listing order.
pub fn select_fallback<'m>(
    models: &'m [ModelDescriptor],
    family_markers: &[String],
) -> Option<&'m ModelDescriptor> {
    models.iter().filter(|m| m.supports_generation).find(|m| {
        let lname = m.identifier.to_lowercase();
        family_markers
            .iter()
            .any(|marker| lname.contains(&marker.to_lowercase()))
    })
}
