use std::sync::Mutex;

use anyhow::{anyhow, Result};
use inkframe_contracts::InlineImage;

use crate::backend::{Backend, BackendRequest, BackendResponse, ResponsePart};

enum Reply {
    Respond(BackendResponse),
    Fail(String),
}

/// In-memory backend that records every request and answers each one with
/// the same canned reply.
pub struct ScriptedBackend {
    reply: Reply,
    requests: Mutex<Vec<BackendRequest>>,
}

impl ScriptedBackend {
    pub fn replying(response: BackendResponse) -> Self {
        Self {
            reply: Reply::Respond(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying_text(text: &str) -> Self {
        Self::replying(BackendResponse::from_parts(vec![ResponsePart::Text(
            text.to_string(),
        )]))
    }

    pub fn replying_image(mime_type: &str, data: &str, caption: &str) -> Self {
        Self::replying(BackendResponse::from_parts(vec![
            ResponsePart::InlineData(InlineImage::new(mime_type, data)),
            ResponsePart::Text(caption.to_string()),
        ]))
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Reply::Fail(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn last_request(&self) -> Result<BackendRequest> {
        self.requests()
            .pop()
            .ok_or_else(|| anyhow!("no request recorded"))
    }
}

impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn generate(&self, request: &BackendRequest) -> Result<BackendResponse> {
        self.requests
            .lock()
            .map_err(|_| anyhow!("request log poisoned"))?
            .push(request.clone());
        match &self.reply {
            Reply::Respond(response) => Ok(response.clone()),
            Reply::Fail(message) => Err(anyhow!("{message}")),
        }
    }
}
