mod dryrun;
mod gemini;

use anyhow::Context;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use inkframe_contracts::{InlineImage, ObjectSchema, Operation, ResponseMode};
use serde_json::Value;

use crate::prompt::PromptPlan;

pub use dryrun::DryrunBackend;
pub use gemini::GeminiBackend;

/// One generative backend. A call is a single request/response round trip.
pub trait Backend: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, request: &BackendRequest) -> anyhow::Result<BackendResponse>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestPart {
    Text(String),
    InlineData(InlineImage),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub operation: Operation,
    pub mode: ResponseMode,
    pub model: String,
    pub parts: Vec<RequestPart>,
    pub schema: Option<ObjectSchema>,
    /// Preferred output ratio such as `16:9`; backends may snap it.
    pub aspect_ratio: Option<String>,
}

impl BackendRequest {
    /// Lays out each attachment as a label part followed by its image, then the
    /// instruction text last.
    pub fn from_plan(operation: Operation, model: impl Into<String>, plan: PromptPlan) -> Self {
        let mut parts = Vec::with_capacity(plan.attachments.len() * 2 + 1);
        for attachment in plan.attachments {
            parts.push(RequestPart::Text(format!("[{}]", attachment.label)));
            parts.push(RequestPart::InlineData(attachment.image));
        }
        parts.push(RequestPart::Text(plan.text));
        Self {
            operation,
            mode: operation.mode(),
            model: model.into(),
            parts,
            schema: None,
            aspect_ratio: None,
        }
    }

    pub fn with_schema(mut self, schema: Option<ObjectSchema>) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_aspect_ratio(mut self, ratio: Option<&str>) -> Self {
        self.aspect_ratio = ratio.map(str::to_string);
        self
    }

    pub fn inline_images(&self) -> impl Iterator<Item = &InlineImage> {
        self.parts.iter().filter_map(|part| match part {
            RequestPart::InlineData(image) => Some(image),
            RequestPart::Text(_) => None,
        })
    }

    pub fn instruction(&self) -> &str {
        match self.parts.last() {
            Some(RequestPart::Text(text)) => text,
            _ => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePart {
    Text(String),
    InlineData(InlineImage),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Candidate {
    pub parts: Vec<ResponsePart>,
    pub finish_reason: Option<String>,
}

impl Candidate {
    pub fn first_image(&self) -> Option<&InlineImage> {
        self.parts.iter().find_map(|part| match part {
            ResponsePart::InlineData(image) => Some(image),
            ResponsePart::Text(_) => None,
        })
    }

    pub fn first_text(&self) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            ResponsePart::Text(text) => Some(text.as_str()),
            ResponsePart::InlineData(_) => None,
        })
    }

    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ResponsePart::Text(text) => Some(text.as_str()),
                ResponsePart::InlineData(_) => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BackendResponse {
    pub candidates: Vec<Candidate>,
    /// Prompt-level block reason reported when no candidates were produced.
    pub block_reason: Option<String>,
}

impl BackendResponse {
    pub fn from_parts(parts: Vec<ResponsePart>) -> Self {
        Self {
            candidates: vec![Candidate {
                parts,
                finish_reason: Some("STOP".to_string()),
            }],
            block_reason: None,
        }
    }

    /// Accepts both camelCase and snake_case field spellings.
    pub fn from_gemini_value(payload: &Value) -> anyhow::Result<Self> {
        let candidates = payload
            .get("candidates")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let mut out = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let raw_parts = candidate
                .get("content")
                .and_then(Value::as_object)
                .and_then(|content| content.get("parts"))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let mut parts = Vec::with_capacity(raw_parts.len());
            for part in raw_parts {
                if let Some(inline) = part
                    .get("inlineData")
                    .or_else(|| part.get("inline_data"))
                    .and_then(Value::as_object)
                {
                    let data = inline
                        .get("data")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    if data.is_empty() {
                        continue;
                    }
                    BASE64
                        .decode(data.as_bytes())
                        .context("inline image base64 decode failed")?;
                    let mime_type = inline
                        .get("mimeType")
                        .or_else(|| inline.get("mime_type"))
                        .and_then(Value::as_str)
                        .unwrap_or(inkframe_contracts::codec::FALLBACK_MEDIA_TYPE);
                    parts.push(ResponsePart::InlineData(InlineImage::new(mime_type, data)));
                } else if let Some(text) = part.get("text").and_then(Value::as_str) {
                    // Gemini marks reasoning summaries with `thought: true`.
                    if part.get("thought").and_then(Value::as_bool) == Some(true) {
                        continue;
                    }
                    parts.push(ResponsePart::Text(text.to_string()));
                }
            }
            let finish_reason = candidate
                .get("finishReason")
                .or_else(|| candidate.get("finish_reason"))
                .and_then(Value::as_str)
                .map(str::to_string);
            out.push(Candidate {
                parts,
                finish_reason,
            });
        }

        let block_reason = payload
            .get("promptFeedback")
            .or_else(|| payload.get("prompt_feedback"))
            .and_then(|feedback| {
                feedback
                    .get("blockReason")
                    .or_else(|| feedback.get("block_reason"))
            })
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            candidates: out,
            block_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use inkframe_contracts::codec;
    use serde_json::json;

    use super::*;
    use crate::prompt::{LabeledAttachment, PromptPlan};

    #[test]
    fn from_plan_puts_labels_before_images_and_instruction_last() {
        let plan = PromptPlan {
            text: "Draw it.".to_string(),
            attachments: vec![
                LabeledAttachment {
                    label: "Panel Layout".to_string(),
                    image: codec::decode(&codec::encode("image/png", "AAAA")),
                },
                LabeledAttachment {
                    label: "Reference 1".to_string(),
                    image: codec::decode(&codec::encode("image/jpeg", "BBBB")),
                },
            ],
        };
        let request = BackendRequest::from_plan(Operation::EditMangaPage, "model-x", plan);
        assert_eq!(request.mode, ResponseMode::MultiModal);
        assert_eq!(request.parts.len(), 5);
        assert_eq!(request.parts[0], RequestPart::Text("[Panel Layout]".to_string()));
        assert_eq!(
            request.parts[3],
            RequestPart::InlineData(InlineImage::new("image/jpeg", "BBBB"))
        );
        assert_eq!(request.instruction(), "Draw it.");
        assert_eq!(request.inline_images().count(), 2);
    }

    #[test]
    fn gemini_response_parsing_handles_both_spellings() -> anyhow::Result<()> {
        let payload = json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "thinking", "thought": true},
                    {"text": "Here you go."},
                    {"inline_data": {"mime_type": "image/jpeg", "data": "QUJD"}},
                    {"inlineData": {"mimeType": "image/png", "data": ""}}
                ]},
                "finishReason": "STOP"
            }]
        });
        let response = BackendResponse::from_gemini_value(&payload)?;
        assert_eq!(response.candidates.len(), 1);
        let candidate = &response.candidates[0];
        assert_eq!(candidate.parts.len(), 2);
        assert_eq!(candidate.first_text(), Some("Here you go."));
        assert_eq!(
            candidate.first_image(),
            Some(&InlineImage::new("image/jpeg", "QUJD"))
        );
        assert_eq!(candidate.finish_reason.as_deref(), Some("STOP"));
        Ok(())
    }

    #[test]
    fn gemini_response_without_candidates_keeps_block_reason() -> anyhow::Result<()> {
        let payload = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let response = BackendResponse::from_gemini_value(&payload)?;
        assert!(response.candidates.is_empty());
        assert_eq!(response.block_reason.as_deref(), Some("SAFETY"));
        Ok(())
    }

    #[test]
    fn gemini_response_rejects_corrupt_inline_data() {
        let payload = json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "image/png", "data": "not base64!"}}
            ]}}]
        });
        let err = BackendResponse::from_gemini_value(&payload).err();
        assert!(err
            .map(|err| err.to_string().contains("base64 decode failed"))
            .unwrap_or(false));
    }
}
