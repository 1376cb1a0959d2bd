use inkframe_contracts::{
    AnalysisResult, GeneratedContent, Operation, PayloadFault, StudioError, StudioResult,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::backend::{BackendResponse, Candidate};

pub fn extract_text(operation: Operation, response: &BackendResponse) -> StudioResult<String> {
    let candidate = first_candidate(operation, response)?;
    let text = candidate.joined_text();
    let text = text.trim();
    if text.is_empty() {
        return Err(StudioError::MissingExpectedOutput {
            operation,
            detail: "response carried no text".to_string(),
        });
    }
    Ok(text.to_string())
}

pub fn extract_structured<T: DeserializeOwned>(
    operation: Operation,
    response: &BackendResponse,
) -> StudioResult<T> {
    let value = structured_value(operation, response)?;
    from_structured_value(operation, value)
}

/// No discrepancies means an empty correction prompt.
pub fn extract_analysis(
    operation: Operation,
    response: &BackendResponse,
) -> StudioResult<AnalysisResult> {
    let mut value = structured_value(operation, response)?;
    if let Some(object) = value.as_object_mut() {
        if object.get("has_discrepancies").and_then(Value::as_bool) == Some(false) {
            object.insert("correction_prompt".to_string(), Value::String(String::new()));
        }
    }
    let mut result: AnalysisResult = from_structured_value(operation, value)?;
    if result.has_discrepancies {
        let trimmed = result.correction_prompt.trim();
        if trimmed.is_empty() {
            return Err(StudioError::InvalidStructuredPayload {
                operation,
                cause: PayloadFault::Shape(
                    "has_discrepancies is true but correction_prompt is empty".to_string(),
                ),
            });
        }
        result.correction_prompt = trimmed.to_string();
    }
    Ok(result)
}

/// First image of the first candidate, with its first text part as caption.
pub fn extract_image(
    operation: Operation,
    response: &BackendResponse,
) -> StudioResult<GeneratedContent> {
    let candidate = first_candidate(operation, response)?;
    let text = candidate.first_text().filter(|text| !text.trim().is_empty());
    let Some(image) = candidate.first_image() else {
        tracing::warn!(
            %operation,
            finish_reason = candidate.finish_reason.as_deref().unwrap_or("unknown"),
            "model replied without an image"
        );
        return Err(StudioError::MissingExpectedImage {
            operation,
            model_text: text.map(str::to_string),
            finish_reason: candidate.finish_reason.clone(),
        });
    };
    Ok(GeneratedContent {
        image: image.encode(),
        text: text.map(|text| text.trim().to_string()),
    })
}

pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    match body.split_once('\n') {
        Some((tag, inner)) if !tag.trim().contains(char::is_whitespace) => inner.trim(),
        _ => body.trim(),
    }
}

fn first_candidate(operation: Operation, response: &BackendResponse) -> StudioResult<&Candidate> {
    response.candidates.first().ok_or_else(|| {
        tracing::warn!(
            %operation,
            block_reason = response.block_reason.as_deref().unwrap_or("none"),
            "backend returned no candidates"
        );
        StudioError::EmptyResponse { operation }
    })
}

fn structured_value(operation: Operation, response: &BackendResponse) -> StudioResult<Value> {
    let candidate = first_candidate(operation, response)?;
    if candidate.first_text().is_none() {
        return Err(StudioError::MissingExpectedOutput {
            operation,
            detail: "response carried no text".to_string(),
        });
    }
    let text = candidate.joined_text();
    serde_json::from_str(strip_code_fence(&text)).map_err(|err| {
        StudioError::InvalidStructuredPayload {
            operation,
            cause: PayloadFault::Parse(err),
        }
    })
}

fn from_structured_value<T: DeserializeOwned>(
    operation: Operation,
    value: Value,
) -> StudioResult<T> {
    serde_json::from_value(value).map_err(|err| StudioError::InvalidStructuredPayload {
        operation,
        cause: PayloadFault::Shape(err.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use inkframe_contracts::{InlineImage, StorySuggestion};

    use super::*;
    use crate::backend::ResponsePart;

    fn text_response(text: &str) -> BackendResponse {
        BackendResponse::from_parts(vec![ResponsePart::Text(text.to_string())])
    }

    #[test]
    fn story_payload_parses_with_optional_dialogue() -> anyhow::Result<()> {
        let response = text_response(
            r#"{"summary":"Test","panels":[{"panel":1,"description":"A hero stands."}]}"#,
        );
        let story: StorySuggestion =
            extract_structured(Operation::GenerateStorySuggestion, &response)?;
        assert_eq!(story.summary, "Test");
        assert_eq!(story.panels.len(), 1);
        assert_eq!(story.panels[0].panel, 1);
        assert_eq!(story.panels[0].description, "A hero stands.");
        assert!(story.panels[0].dialogue.is_none());
        Ok(())
    }

    #[test]
    fn story_payload_missing_panels_is_a_shape_fault() {
        let response = text_response(r#"{"summary":"Test"}"#);
        let err = extract_structured::<StorySuggestion>(Operation::GenerateStorySuggestion, &response)
            .err();
        assert!(matches!(
            err,
            Some(StudioError::InvalidStructuredPayload {
                operation: Operation::GenerateStorySuggestion,
                cause: PayloadFault::Shape(_),
            })
        ));
    }

    #[test]
    fn non_json_text_is_a_parse_fault() {
        let response = text_response("Sure! Here is your story.");
        let err = extract_structured::<StorySuggestion>(Operation::GenerateStorySuggestion, &response)
            .err();
        assert!(matches!(
            err,
            Some(StudioError::InvalidStructuredPayload {
                cause: PayloadFault::Parse(_),
                ..
            })
        ));
    }

    #[test]
    fn fenced_json_is_accepted() -> anyhow::Result<()> {
        let response = text_response(
            "```json\n{\"analysis\":\"Fine.\",\"has_discrepancies\":false,\"correction_prompt\":\"\"}\n```",
        );
        let result = extract_analysis(Operation::AnalyzeAndSuggestCorrections, &response)?;
        assert_eq!(result.analysis, "Fine.");
        assert!(!result.has_discrepancies);
        Ok(())
    }

    #[test]
    fn strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```{}```"), "{}");
        assert_eq!(strip_code_fence("```unterminated"), "```unterminated");
    }

    #[test]
    fn text_only_candidate_fails_image_extraction_with_the_text() {
        let response = text_response("I cannot draw that.");
        let err = extract_image(Operation::GenerateMangaPage, &response).err();
        let Some(err) = err else {
            panic!("expected missing image error");
        };
        assert!(err.to_string().contains("I cannot draw that."));
        assert!(matches!(
            err,
            StudioError::MissingExpectedImage {
                operation: Operation::GenerateMangaPage,
                ..
            }
        ));
    }

    #[test]
    fn zero_candidates_is_an_empty_response() {
        let response = BackendResponse {
            candidates: Vec::new(),
            block_reason: Some("SAFETY".to_string()),
        };
        assert!(matches!(
            extract_image(Operation::ColorizeMangaPage, &response),
            Err(StudioError::EmptyResponse {
                operation: Operation::ColorizeMangaPage
            })
        ));
        assert!(matches!(
            extract_text(Operation::GenerateWorldview, &response),
            Err(StudioError::EmptyResponse { .. })
        ));
    }

    #[test]
    fn image_extraction_uses_first_image_and_keeps_text() -> anyhow::Result<()> {
        let response = BackendResponse::from_parts(vec![
            ResponsePart::Text("Here is the page.".to_string()),
            ResponsePart::InlineData(InlineImage::new("image/jpeg", "QUJD")),
            ResponsePart::InlineData(InlineImage::new("image/png", "REVG")),
        ]);
        let content = extract_image(Operation::EditMangaPage, &response)?;
        assert_eq!(content.image.as_str(), "data:image/jpeg;base64,QUJD");
        assert_eq!(content.text.as_deref(), Some("Here is the page."));
        Ok(())
    }

    #[test]
    fn caption_is_the_first_text_part_only() -> anyhow::Result<()> {
        let response = BackendResponse::from_parts(vec![
            ResponsePart::Text("Here is the page.".to_string()),
            ResponsePart::InlineData(InlineImage::new("image/png", "QUJD")),
            ResponsePart::Text("Let me know if you want changes.".to_string()),
        ]);
        let content = extract_image(Operation::GenerateMangaPage, &response)?;
        assert_eq!(content.text.as_deref(), Some("Here is the page."));
        Ok(())
    }

    #[test]
    fn refusal_keeps_the_model_text_verbatim() {
        let refusal = "I can't draw that.\n";
        let response = BackendResponse::from_parts(vec![
            ResponsePart::Text(refusal.to_string()),
            ResponsePart::Text("Try another scene.".to_string()),
        ]);
        let err = extract_image(Operation::GenerateMangaPage, &response).err();
        let Some(err) = err else {
            panic!("expected missing image error");
        };
        assert!(err.to_string().contains(refusal));
        assert!(!err.to_string().contains("Try another scene."));
        assert!(matches!(
            err,
            StudioError::MissingExpectedImage { model_text: Some(ref text), .. } if text == refusal
        ));
    }

    #[test]
    fn blank_refusal_text_is_omitted() {
        let response = text_response("  ");
        assert!(matches!(
            extract_image(Operation::EditCharacterSheet, &response),
            Err(StudioError::MissingExpectedImage { model_text: None, .. })
        ));
    }

    #[test]
    fn analysis_without_discrepancies_clears_correction_prompt() -> anyhow::Result<()> {
        let response = text_response(
            r#"{"analysis":"Matches.","has_discrepancies":false,"correction_prompt":"Redraw panel 2."}"#,
        );
        let result = extract_analysis(Operation::AnalyzeAndSuggestCorrections, &response)?;
        assert_eq!(result.correction_prompt, "");

        let missing_prompt =
            text_response(r#"{"analysis":"Matches.","has_discrepancies":false}"#);
        let result = extract_analysis(Operation::AnalyzeAndSuggestCorrections, &missing_prompt)?;
        assert_eq!(result.correction_prompt, "");
        Ok(())
    }

    #[test]
    fn analysis_with_discrepancies_requires_a_prompt() -> anyhow::Result<()> {
        let blank = text_response(
            r#"{"analysis":"Panel 2 is off.","has_discrepancies":true,"correction_prompt":"  "}"#,
        );
        assert!(matches!(
            extract_analysis(Operation::AnalyzeAndSuggestCorrections, &blank),
            Err(StudioError::InvalidStructuredPayload {
                cause: PayloadFault::Shape(_),
                ..
            })
        ));

        let good = text_response(
            r#"{"analysis":"Panel 2 is off.","has_discrepancies":true,"correction_prompt":" Move the hero left. "}"#,
        );
        let result = extract_analysis(Operation::AnalyzeAndSuggestCorrections, &good)?;
        assert_eq!(result.correction_prompt, "Move the hero left.");
        Ok(())
    }

    #[test]
    fn worldview_text_is_trimmed_and_required() -> anyhow::Result<()> {
        let text = extract_text(
            Operation::GenerateWorldview,
            &text_response("\n  A drowned city of bells.  \n"),
        )?;
        assert_eq!(text, "A drowned city of bells.");
        assert!(matches!(
            extract_text(Operation::GenerateWorldview, &text_response("   ")),
            Err(StudioError::MissingExpectedOutput { .. })
        ));
        Ok(())
    }
}
