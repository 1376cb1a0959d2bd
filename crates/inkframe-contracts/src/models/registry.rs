use indexmap::IndexMap;

use crate::error::StudioError;
use crate::operation::ResponseMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub provider: String,
    pub capabilities: Vec<String>,
}

impl ModelSpec {
    fn new(name: &str, provider: &str, capabilities: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            provider: provider.to_string(),
            capabilities: capabilities.iter().map(|item| item.to_string()).collect(),
        }
    }

    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|item| item == capability)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    /// Set when the requested model could not be used.
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        let models = [
            // First entry per capability is the default.
            ModelSpec::new("gemini-2.5-flash", "gemini", &["text", "vision"]),
            ModelSpec::new("gemini-2.5-flash-image", "gemini", &["image"]),
            ModelSpec::new("gemini-2.5-pro", "gemini", &["text", "vision"]),
            ModelSpec::new("gemini-3-pro-preview", "gemini", &["text", "vision"]),
            ModelSpec::new("gemini-3-pro-image-preview", "gemini", &["image"]),
            ModelSpec::new("dryrun-text-1", "dryrun", &["text"]),
            ModelSpec::new("dryrun-image-1", "dryrun", &["image"]),
        ];
        Self::from_models(models)
    }
}

impl ModelRegistry {
    pub fn from_models(models: impl IntoIterator<Item = ModelSpec>) -> Self {
        Self {
            models: models
                .into_iter()
                .map(|model| (model.name.clone(), model))
                .collect(),
        }
    }

    /// Picks the model serving `mode`. A requested model that is unknown or
    /// lacks the capability falls back to the registry default for the mode.
    pub fn select(
        &self,
        requested: Option<&str>,
        mode: ResponseMode,
    ) -> Result<ModelSelection, StudioError> {
        let capability = mode.capability();
        let requested = requested.map(str::trim).filter(|name| !name.is_empty());
        if let Some(model) = requested
            .and_then(|name| self.models.get(name))
            .filter(|model| model.supports(capability))
        {
            return Ok(ModelSelection {
                model: model.clone(),
                fallback_reason: None,
            });
        }

        let model = self
            .models
            .values()
            .find(|model| model.supports(capability))
            .cloned()
            .ok_or_else(|| StudioError::NoModelForCapability {
                capability: capability.to_string(),
            })?;
        let fallback_reason = requested.map(|name| match self.models.get(name) {
            Some(_) => format!("model '{name}' has no '{capability}' capability"),
            None => format!("model '{name}' is not registered"),
        });
        Ok(ModelSelection {
            model,
            fallback_reason,
        })
    }
}
