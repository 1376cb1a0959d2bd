use crate::operation::Operation;

pub type StudioResult<T> = Result<T, StudioError>;

#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    #[error("{operation}: backend returned no candidates (the request was likely blocked)")]
    EmptyResponse { operation: Operation },

    #[error("{operation}: model replied without an image{}", refusal_detail(.model_text, .finish_reason))]
    MissingExpectedImage {
        operation: Operation,
        model_text: Option<String>,
        finish_reason: Option<String>,
    },

    #[error("{operation}: no usable output ({detail})")]
    MissingExpectedOutput { operation: Operation, detail: String },

    #[error("{operation}: invalid structured payload: {cause}")]
    InvalidStructuredPayload {
        operation: Operation,
        #[source]
        cause: PayloadFault,
    },

    #[error("{operation}: character '{character}' has no sheet image")]
    MissingCharacterSheet {
        operation: Operation,
        character: String,
    },

    #[error("no models available for capability '{capability}'")]
    NoModelForCapability { capability: String },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Why a structured payload was rejected. Both kinds surface as
/// [`StudioError::InvalidStructuredPayload`].
#[derive(Debug, thiserror::Error)]
pub enum PayloadFault {
    #[error("not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("shape mismatch: {0}")]
    Shape(String),
}

fn refusal_detail(model_text: &Option<String>, finish_reason: &Option<String>) -> String {
    let mut detail = String::new();
    if let Some(reason) = finish_reason {
        detail.push_str(&format!(" (finish reason: {reason})"));
    }
    if let Some(text) = model_text {
        detail.push_str(&format!("; model said: {text}"));
    }
    detail
}
