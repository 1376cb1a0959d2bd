use std::sync::Arc;

use inkframe_contracts::{
    lookup_profile, AnalysisResult, CastMember, Character, ColorMode, EncodedImage,
    GeneratedContent, Operation, StorySuggestion, StudioError, StudioResult,
};

use crate::backend::{Backend, DryrunBackend, GeminiBackend};
use crate::config::StudioConfig;
use crate::dispatch::Dispatcher;
use crate::extract::{extract_analysis, extract_image, extract_structured, extract_text};
use crate::prompt::{
    self, AnalysisRequest, ColorizeRequest, LayoutRequest, PageEditRequest, PageRequest,
    StoryRequest,
};

/// The studio's public operations. Holds no per-call state, so one instance
/// can serve many threads behind an `Arc`.
#[derive(Clone)]
pub struct Studio {
    dispatcher: Dispatcher,
}

impl Studio {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            dispatcher: Dispatcher::new(backend),
        }
    }

    pub fn from_config(config: &StudioConfig) -> StudioResult<Self> {
        let backend: Arc<dyn Backend> = if config.dryrun {
            Arc::new(DryrunBackend)
        } else {
            Arc::new(GeminiBackend::from_config(config)?)
        };
        let studio = Self::new(backend)
            .with_models(config.text_model.clone(), config.image_model.clone());
        tracing::debug!(
            backend = studio.backend_name(),
            text_model = config.text_model.as_deref().unwrap_or("default"),
            image_model = config.image_model.as_deref().unwrap_or("default"),
            "studio configured"
        );
        Ok(studio)
    }

    pub fn with_models(mut self, text_model: Option<String>, image_model: Option<String>) -> Self {
        self.dispatcher = self.dispatcher.with_models(text_model, image_model);
        self
    }

    pub fn backend_name(&self) -> &str {
        self.dispatcher.backend_name()
    }

    pub fn generate_worldview(&self, characters: &[Character]) -> StudioResult<String> {
        let operation = Operation::GenerateWorldview;
        let plan = prompt::worldview(characters);
        let response = self.dispatcher.dispatch(operation, plan, None, None)?;
        extract_text(operation, &response)
    }

    pub fn generate_detailed_story_suggestion(
        &self,
        request: &StoryRequest<'_>,
    ) -> StudioResult<StorySuggestion> {
        let operation = Operation::GenerateStorySuggestion;
        let plan = prompt::story_suggestion(request);
        let response =
            self.dispatcher
                .dispatch(operation, plan, Some(StorySuggestion::schema()), None)?;
        extract_structured(operation, &response)
    }

    /// Rough panel layout for one page. Characters without a sheet are
    /// described by name only.
    pub fn generate_layout_proposal(
        &self,
        request: &LayoutRequest<'_>,
    ) -> StudioResult<GeneratedContent> {
        let operation = Operation::GenerateLayoutProposal;
        let ratio = lookup_profile(request.aspect_ratio).ratio;
        let plan = prompt::layout_proposal(request);
        let response = self.dispatcher.dispatch(operation, plan, None, Some(ratio))?;
        extract_image(operation, &response)
    }

    pub fn generate_character_sheet(
        &self,
        references: &[EncodedImage],
        name: &str,
        color_mode: ColorMode,
    ) -> StudioResult<GeneratedContent> {
        let operation = Operation::GenerateCharacterSheet;
        let plan = prompt::character_sheet(references, name, color_mode);
        self.generate_image(operation, plan)
    }

    pub fn generate_character_from_reference(
        &self,
        references: &[EncodedImage],
        name: &str,
        concept: &str,
        color_mode: ColorMode,
    ) -> StudioResult<GeneratedContent> {
        let operation = Operation::GenerateCharacterFromReference;
        let plan = prompt::character_from_reference(references, name, concept, color_mode);
        self.generate_image(operation, plan)
    }

    pub fn edit_character_sheet(
        &self,
        sheet: &EncodedImage,
        name: &str,
        instruction: &str,
    ) -> StudioResult<GeneratedContent> {
        let operation = Operation::EditCharacterSheet;
        let plan = prompt::edit_character_sheet(sheet, name, instruction);
        self.generate_image(operation, plan)
    }

    pub fn generate_manga_page(&self, request: &PageRequest<'_>) -> StudioResult<GeneratedContent> {
        let operation = Operation::GenerateMangaPage;
        let cast = resolve_cast(operation, request.characters)?;
        let plan = prompt::manga_page(request, &cast);
        self.generate_image(operation, plan)
    }

    /// Every character must have a sheet.
    pub fn colorize_manga_page(
        &self,
        request: &ColorizeRequest<'_>,
    ) -> StudioResult<GeneratedContent> {
        let operation = Operation::ColorizeMangaPage;
        let cast = resolve_cast(operation, request.characters)?;
        let plan = prompt::colorize_manga_page(request, &cast);
        self.generate_image(operation, plan)
    }

    pub fn edit_manga_page(&self, request: &PageEditRequest<'_>) -> StudioResult<GeneratedContent> {
        let operation = Operation::EditMangaPage;
        let plan = prompt::edit_manga_page(request);
        self.generate_image(operation, plan)
    }

    pub fn analyze_and_suggest_corrections(
        &self,
        request: &AnalysisRequest<'_>,
    ) -> StudioResult<AnalysisResult> {
        let operation = Operation::AnalyzeAndSuggestCorrections;
        let plan = prompt::analysis(request);
        let response =
            self.dispatcher
                .dispatch(operation, plan, Some(AnalysisResult::schema()), None)?;
        let result = extract_analysis(operation, &response)?;
        tracing::info!(
            %operation,
            has_discrepancies = result.has_discrepancies,
            "analysis complete"
        );
        Ok(result)
    }

    fn generate_image(
        &self,
        operation: Operation,
        plan: prompt::PromptPlan,
    ) -> StudioResult<GeneratedContent> {
        let response = self.dispatcher.dispatch(operation, plan, None, None)?;
        extract_image(operation, &response)
    }
}

fn resolve_cast(operation: Operation, characters: &[Character]) -> StudioResult<Vec<CastMember<'_>>> {
    characters
        .iter()
        .map(|character| {
            character
                .cast_member()
                .ok_or_else(|| StudioError::MissingCharacterSheet {
                    operation,
                    character: character.name.clone(),
                })
        })
        .collect()
}
