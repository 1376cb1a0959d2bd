use std::env;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_SAFETY_THRESHOLD: &str = "OFF";

/// Backend settings, resolved from the environment and overridable by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
    pub safety_threshold: String,
    pub dryrun: bool,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            text_model: None,
            image_model: None,
            safety_threshold: DEFAULT_SAFETY_THRESHOLD.to_string(),
            dryrun: false,
        }
    }
}

impl StudioConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(non_empty_env)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            api_key: lookup("GEMINI_API_KEY").or_else(|| lookup("GOOGLE_API_KEY")),
            api_base: lookup("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.api_base),
            text_model: lookup("INKFRAME_TEXT_MODEL"),
            image_model: lookup("INKFRAME_IMAGE_MODEL"),
            safety_threshold: lookup("INKFRAME_SAFETY_THRESHOLD")
                .map(|value| value.to_ascii_uppercase())
                .unwrap_or(defaults.safety_threshold),
            dryrun: false,
        }
    }

    pub fn with_text_model(mut self, model: Option<String>) -> Self {
        if model.is_some() {
            self.text_model = model;
        }
        self
    }

    pub fn with_image_model(mut self, model: Option<String>) -> Self {
        if model.is_some() {
            self.image_model = model;
        }
        self
    }

    pub fn with_dryrun(mut self, dryrun: bool) -> Self {
        self.dryrun = dryrun;
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
