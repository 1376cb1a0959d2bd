use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectRatioProfile {
    pub width: u32,
    pub height: u32,
    pub ratio: &'static str,
}

/// Page size presets offered for layout proposals. Keys are matched exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "A4")]
    A4,
    #[serde(rename = "Portrait (3:4)")]
    Portrait,
    #[serde(rename = "Square (1:1)")]
    Square,
    #[serde(rename = "Widescreen (16:9)")]
    Widescreen,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 4] = [
        AspectRatio::A4,
        AspectRatio::Portrait,
        AspectRatio::Square,
        AspectRatio::Widescreen,
    ];

    pub fn key(self) -> &'static str {
        match self {
            AspectRatio::A4 => "A4",
            AspectRatio::Portrait => "Portrait (3:4)",
            AspectRatio::Square => "Square (1:1)",
            AspectRatio::Widescreen => "Widescreen (16:9)",
        }
    }

    pub fn profile(self) -> AspectRatioProfile {
        let (width, height, ratio) = match self {
            AspectRatio::A4 => (595, 842, "210:297"),
            AspectRatio::Portrait => (768, 1024, "3:4"),
            AspectRatio::Square => (1024, 1024, "1:1"),
            AspectRatio::Widescreen => (1280, 720, "16:9"),
        };
        AspectRatioProfile {
            width,
            height,
            ratio,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|preset| preset.key() == key)
    }

    /// Unknown keys resolve to A4.
    pub fn from_key_or_default(key: &str) -> Self {
        Self::from_key(key).unwrap_or_default()
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

pub fn lookup_profile(key: &str) -> AspectRatioProfile {
    AspectRatio::from_key_or_default(key).profile()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_falls_back_to_a4() {
        let profile = lookup_profile("Letter");
        assert_eq!(profile.width, 595);
        assert_eq!(profile.height, 842);
        assert_eq!(profile.ratio, "210:297");
    }

    #[test]
    fn keys_are_exact_strings() {
        assert_eq!(AspectRatio::from_key("Square (1:1)"), Some(AspectRatio::Square));
        assert_eq!(AspectRatio::from_key("square (1:1)"), None);
        assert_eq!(lookup_profile("Widescreen (16:9)").ratio, "16:9");
        for preset in AspectRatio::ALL {
            assert_eq!(AspectRatio::from_key(preset.key()), Some(preset));
        }
    }

    #[test]
    fn serde_uses_preset_keys() -> anyhow::Result<()> {
        let parsed: AspectRatio = serde_json::from_str("\"Portrait (3:4)\"")?;
        assert_eq!(parsed, AspectRatio::Portrait);
        assert_eq!(serde_json::to_string(&AspectRatio::A4)?, "\"A4\"");
        Ok(())
    }
}
