use std::sync::Arc;

use anyhow::Context;
use inkframe_contracts::models::{ModelRegistry, ModelSelection};
use inkframe_contracts::{ObjectSchema, Operation, ResponseMode, StudioResult};
use sha2::{Digest, Sha256};

use crate::backend::{Backend, BackendRequest, BackendResponse, RequestPart};
use crate::prompt::PromptPlan;

/// Packages prompt plans into backend requests, picks the model for the
/// operation's response mode, and performs the single backend round trip.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn Backend>,
    registry: ModelRegistry,
    text_model: Option<String>,
    image_model: Option<String>,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            registry: ModelRegistry::default(),
            text_model: None,
            image_model: None,
        }
    }

    pub fn with_models(mut self, text_model: Option<String>, image_model: Option<String>) -> Self {
        self.text_model = text_model;
        self.image_model = image_model;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn model_for(&self, mode: ResponseMode) -> StudioResult<ModelSelection> {
        let requested = match mode {
            ResponseMode::StructuredText => self.text_model.as_deref(),
            ResponseMode::MultiModal => self.image_model.as_deref(),
        };
        let selection = self.registry.select(requested, mode)?;
        if let Some(reason) = selection.fallback_reason.as_deref() {
            tracing::warn!(
                requested = requested.unwrap_or_default(),
                model = %selection.model.name,
                reason,
                "model fallback"
            );
        }
        Ok(selection)
    }

    pub fn dispatch(
        &self,
        operation: Operation,
        plan: PromptPlan,
        schema: Option<ObjectSchema>,
        aspect_ratio: Option<&str>,
    ) -> StudioResult<BackendResponse> {
        let selection = self.model_for(operation.mode())?;
        let request = BackendRequest::from_plan(operation, selection.model.name, plan)
            .with_schema(schema)
            .with_aspect_ratio(aspect_ratio);

        tracing::info!(
            %operation,
            backend = self.backend.name(),
            model = %request.model,
            attachments = request.inline_images().count(),
            request_id = %request_fingerprint(&request),
            "dispatching request"
        );
        tracing::debug!(
            instruction_chars = request.instruction().chars().count(),
            payload_bytes = request
                .inline_images()
                .map(|image| image.payload_len())
                .sum::<usize>(),
            structured = request.schema.is_some(),
            "request size"
        );

        let response = self
            .backend
            .generate(&request)
            .with_context(|| format!("{operation}: {} backend call failed", self.backend.name()))?;

        tracing::debug!(
            %operation,
            candidates = response.candidates.len(),
            "response received"
        );
        Ok(response)
    }
}

/// Short stable digest of the request contents, for correlating log lines.
pub fn request_fingerprint(request: &BackendRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.operation.name().as_bytes());
    hasher.update(request.model.as_bytes());
    for part in &request.parts {
        match part {
            RequestPart::Text(text) => hasher.update(text.as_bytes()),
            RequestPart::InlineData(image) => {
                hasher.update(image.mime_type.as_bytes());
                hasher.update(image.data.as_bytes());
            }
        }
    }
    hex::encode(&hasher.finalize()[..6])
}

#[cfg(test)]
mod tests {
    use inkframe_contracts::StudioError;

    use super::*;
    use crate::testing::ScriptedBackend;

    fn plan(text: &str) -> PromptPlan {
        PromptPlan {
            text: text.to_string(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn structured_operations_use_the_text_model() -> anyhow::Result<()> {
        let backend = Arc::new(ScriptedBackend::replying_text("{}"));
        let dispatcher = Dispatcher::new(backend.clone())
            .with_models(Some("gemini-2.5-pro".to_string()), None);

        dispatcher.dispatch(
            Operation::AnalyzeAndSuggestCorrections,
            plan("check"),
            None,
            None,
        )?;
        dispatcher.dispatch(Operation::GenerateMangaPage, plan("draw"), None, Some("3:4"))?;

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].model, "gemini-2.5-pro");
        assert_eq!(requests[0].mode, ResponseMode::StructuredText);
        assert_eq!(requests[1].model, "gemini-2.5-flash-image");
        assert_eq!(requests[1].mode, ResponseMode::MultiModal);
        assert_eq!(requests[1].aspect_ratio.as_deref(), Some("3:4"));
        Ok(())
    }

    #[test]
    fn unknown_model_falls_back_to_capability_default() -> anyhow::Result<()> {
        let backend = Arc::new(ScriptedBackend::replying_text("ok"));
        let dispatcher =
            Dispatcher::new(backend).with_models(None, Some("gemini-2.5-flash".to_string()));
        let selection = dispatcher.model_for(ResponseMode::MultiModal)?;
        assert_eq!(selection.model.name, "gemini-2.5-flash-image");
        assert!(selection.fallback_reason.is_some());
        Ok(())
    }

    #[test]
    fn backend_failures_surface_as_backend_errors() {
        let backend = Arc::new(ScriptedBackend::failing("connection refused"));
        let err = Dispatcher::new(backend)
            .dispatch(Operation::GenerateWorldview, plan("world"), None, None)
            .err();
        let Some(StudioError::Backend(err)) = err else {
            panic!("expected backend error");
        };
        let rendered = format!("{err:#}");
        assert!(rendered.contains("generate_worldview: scripted backend call failed"));
        assert!(rendered.contains("connection refused"));
    }

    #[test]
    fn fingerprint_changes_with_attachments() {
        let base = BackendRequest::from_plan(Operation::EditMangaPage, "m", plan("edit"));
        let mut with_image = base.clone();
        with_image.parts.insert(
            0,
            RequestPart::InlineData(inkframe_contracts::InlineImage::new("image/png", "AAAA")),
        );
        assert_eq!(request_fingerprint(&base).len(), 12);
        assert_eq!(request_fingerprint(&base), request_fingerprint(&base.clone()));
        assert_ne!(request_fingerprint(&base), request_fingerprint(&with_image));
    }
}
