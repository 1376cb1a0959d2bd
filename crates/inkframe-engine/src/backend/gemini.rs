use anyhow::{bail, Context, Result};
use inkframe_contracts::ResponseMode;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Map, Value};

use super::{Backend, BackendRequest, BackendResponse, RequestPart};
use crate::config::StudioConfig;

const SUPPORTED_RATIOS: [(&str, f64); 10] = [
    ("1:1", 1.0),
    ("2:3", 2.0 / 3.0),
    ("3:2", 3.0 / 2.0),
    ("3:4", 3.0 / 4.0),
    ("4:3", 4.0 / 3.0),
    ("4:5", 4.0 / 5.0),
    ("5:4", 5.0 / 4.0),
    ("9:16", 9.0 / 16.0),
    ("16:9", 16.0 / 9.0),
    ("21:9", 21.0 / 9.0),
];

pub struct GeminiBackend {
    api_base: String,
    api_key: String,
    safety_threshold: String,
    http: HttpClient,
}

impl GeminiBackend {
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        safety_threshold: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into().trim().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            safety_threshold: safety_threshold.into(),
            http: HttpClient::new(),
        }
    }

    pub fn from_config(config: &StudioConfig) -> Result<Self> {
        let Some(api_key) = config.api_key.clone() else {
            bail!("GEMINI_API_KEY or GOOGLE_API_KEY not set");
        };
        Ok(Self::new(
            api_key,
            config.api_base.clone(),
            config.safety_threshold.clone(),
        ))
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn build_parts(request: &BackendRequest) -> Vec<Value> {
        request
            .parts
            .iter()
            .map(|part| match part {
                RequestPart::Text(text) => json!({ "text": text }),
                RequestPart::InlineData(image) => json!({
                    "inlineData": {
                        "mimeType": image.mime_type,
                        "data": image.data,
                    }
                }),
            })
            .collect()
    }

    fn generation_config(request: &BackendRequest) -> Map<String, Value> {
        let mut config = Map::new();
        match request.mode {
            ResponseMode::StructuredText => {
                if let Some(schema) = request.schema.as_ref() {
                    config.insert(
                        "responseMimeType".to_string(),
                        Value::String("application/json".to_string()),
                    );
                    config.insert("responseSchema".to_string(), schema.to_gemini_value());
                }
            }
            ResponseMode::MultiModal => {
                config.insert("responseModalities".to_string(), json!(["IMAGE", "TEXT"]));
                if let Some(ratio) = request
                    .aspect_ratio
                    .as_deref()
                    .and_then(Self::nearest_supported_ratio)
                {
                    config.insert("imageConfig".to_string(), json!({ "aspectRatio": ratio }));
                }
            }
        }
        config
    }

    /// Snaps a `w:h` ratio to the closest one `imageConfig.aspectRatio` accepts.
    fn nearest_supported_ratio(raw: &str) -> Option<String> {
        let normalized = raw.trim();
        let (left, right) = normalized.split_once(':')?;
        let left = left.trim().parse::<f64>().ok().filter(|value| *value > 0.0)?;
        let right = right.trim().parse::<f64>().ok().filter(|value| *value > 0.0)?;
        let target_ratio = left / right;

        let mut best_key = "1:1";
        let mut best_delta = f64::MAX;
        for (key, ratio) in SUPPORTED_RATIOS {
            let delta = (ratio - target_ratio).abs();
            if delta < best_delta {
                best_key = key;
                best_delta = delta;
            }
        }
        if best_key != normalized {
            tracing::warn!(
                requested = normalized,
                snapped = best_key,
                "Gemini aspect ratio snapped"
            );
        }
        Some(best_key.to_string())
    }

    fn safety_settings(&self) -> Vec<Value> {
        [
            "HARM_CATEGORY_HARASSMENT",
            "HARM_CATEGORY_HATE_SPEECH",
            "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            "HARM_CATEGORY_DANGEROUS_CONTENT",
        ]
        .into_iter()
        .map(|category| {
            json!({
                "category": category,
                "threshold": self.safety_threshold,
            })
        })
        .collect()
    }

    fn build_payload(&self, request: &BackendRequest) -> Value {
        let mut payload = Map::new();
        payload.insert(
            "contents".to_string(),
            Value::Array(vec![json!({
                "role": "user",
                "parts": Self::build_parts(request),
            })]),
        );
        let generation_config = Self::generation_config(request);
        if !generation_config.is_empty() {
            payload.insert(
                "generationConfig".to_string(),
                Value::Object(generation_config),
            );
        }
        payload.insert(
            "safetySettings".to_string(),
            Value::Array(self.safety_settings()),
        );
        Value::Object(payload)
    }
}

impl Backend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, request: &BackendRequest) -> Result<BackendResponse> {
        let endpoint = self.endpoint_for_model(&request.model);
        let payload = self.build_payload(request);
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        let response_payload = response_json_or_error("Gemini", response)?;
        BackendResponse::from_gemini_value(&response_payload)
    }
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
