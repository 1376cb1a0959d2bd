use std::fmt;

/// How the backend is asked to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseMode {
    /// Text only, optionally constrained to a JSON schema.
    StructuredText,
    /// Image plus optional caption text.
    MultiModal,
}

impl ResponseMode {
    /// Model registry capability needed to serve this mode.
    pub fn capability(self) -> &'static str {
        match self {
            ResponseMode::StructuredText => "text",
            ResponseMode::MultiModal => "image",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GenerateWorldview,
    GenerateStorySuggestion,
    GenerateLayoutProposal,
    GenerateCharacterSheet,
    GenerateCharacterFromReference,
    EditCharacterSheet,
    GenerateMangaPage,
    ColorizeMangaPage,
    EditMangaPage,
    AnalyzeAndSuggestCorrections,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::GenerateWorldview => "generate_worldview",
            Operation::GenerateStorySuggestion => "generate_detailed_story_suggestion",
            Operation::GenerateLayoutProposal => "generate_layout_proposal",
            Operation::GenerateCharacterSheet => "generate_character_sheet",
            Operation::GenerateCharacterFromReference => "generate_character_from_reference",
            Operation::EditCharacterSheet => "edit_character_sheet",
            Operation::GenerateMangaPage => "generate_manga_page",
            Operation::ColorizeMangaPage => "colorize_manga_page",
            Operation::EditMangaPage => "edit_manga_page",
            Operation::AnalyzeAndSuggestCorrections => "analyze_and_suggest_corrections",
        }
    }

    pub fn mode(self) -> ResponseMode {
        match self {
            Operation::GenerateWorldview
            | Operation::GenerateStorySuggestion
            | Operation::AnalyzeAndSuggestCorrections => ResponseMode::StructuredText,
            _ => ResponseMode::MultiModal,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
