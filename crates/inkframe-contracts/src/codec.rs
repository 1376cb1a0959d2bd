use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

pub const FALLBACK_MEDIA_TYPE: &str = "image/png";

const DATA_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// Self-describing image value: `data:<media-type>;base64,<payload>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedImage(String);

impl EncodedImage {
    /// Wraps a collaborator-supplied string as-is. Malformed values are not
    /// rejected; [`decode`] degrades them to the fallback media type.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn decode(&self) -> InlineImage {
        decode(self)
    }
}

impl fmt::Display for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EncodedImage {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Media type plus base64 payload, as carried in a backend inline-data part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        Ok(BASE64.decode(self.data.trim().as_bytes())?)
    }

    pub fn encode(&self) -> EncodedImage {
        encode(&self.mime_type, &self.data)
    }

    /// Payload size in bytes before base64 decoding.
    pub fn payload_len(&self) -> usize {
        self.data.len()
    }
}

pub fn decode(image: &EncodedImage) -> InlineImage {
    let raw = image.as_str();
    let mime_type = parse_media_type(raw).unwrap_or(FALLBACK_MEDIA_TYPE);
    let data = match raw.split_once(',') {
        Some((_, payload)) => payload,
        None => raw,
    };
    InlineImage::new(mime_type, data)
}

pub fn encode(mime_type: &str, data: &str) -> EncodedImage {
    EncodedImage(format!("{DATA_PREFIX}{mime_type}{BASE64_MARKER}{data}"))
}

pub fn encode_bytes(mime_type: &str, bytes: &[u8]) -> EncodedImage {
    encode(mime_type, &BASE64.encode(bytes))
}

// The media type token must sit between `data:` and `;base64,`, be non-empty,
// and look like `type/subtype` with no whitespace or parameter separators.
fn parse_media_type(raw: &str) -> Option<&str> {
    let rest = raw.trim_start().strip_prefix(DATA_PREFIX)?;
    let end = rest.find(BASE64_MARKER)?;
    let token = &rest[..end];
    let (kind, subtype) = token.split_once('/')?;
    let well_formed = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|ch| !ch.is_whitespace() && !matches!(ch, ';' | ',' | '/'))
    };
    if well_formed(kind) && well_formed(subtype) {
        Some(token)
    } else {
        None
    }
}
