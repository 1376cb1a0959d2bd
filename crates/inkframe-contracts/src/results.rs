use serde::{Deserialize, Serialize};

use crate::codec::EncodedImage;
use crate::schema::{FieldType, ObjectSchema};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panel {
    pub panel: i64,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorySuggestion {
    pub summary: String,
    pub panels: Vec<Panel>,
}

impl StorySuggestion {
    pub fn schema() -> ObjectSchema {
        let panel = ObjectSchema::new()
            .required("panel", FieldType::Integer, "Panel number, starting at 1.")
            .required(
                "description",
                FieldType::String,
                "What the panel shows: framing, characters, action, setting.",
            )
            .optional(
                "dialogue",
                FieldType::String,
                "Spoken lines or narration for the panel, empty when silent.",
            );
        ObjectSchema::new()
            .required(
                "summary",
                FieldType::String,
                "One or two sentences summarising what happens on the page.",
            )
            .required(
                "panels",
                FieldType::Array(Box::new(FieldType::Object(panel))),
                "Panels in reading order.",
            )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis: String,
    pub has_discrepancies: bool,
    pub correction_prompt: String,
}

impl AnalysisResult {
    pub fn schema() -> ObjectSchema {
        ObjectSchema::new()
            .required(
                "analysis",
                FieldType::String,
                "Human-readable comparison of the generated page against the layout and script.",
            )
            .required(
                "has_discrepancies",
                FieldType::Boolean,
                "True when the generated page deviates from the layout, poses or script.",
            )
            .required(
                "correction_prompt",
                FieldType::String,
                "Edit instruction that fixes the discrepancies; empty string when there are none.",
            )
    }
}

/// Output of an image-producing operation. The image is mandatory; a caption
/// alone never counts as a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub image: EncodedImage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}
