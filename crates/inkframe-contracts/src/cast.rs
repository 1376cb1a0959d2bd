use serde::{Deserialize, Serialize};

use crate::codec::EncodedImage;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_image: Option<EncodedImage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_images: Vec<EncodedImage>,
}

impl Character {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_sheet(mut self, sheet: EncodedImage) -> Self {
        self.sheet_image = Some(sheet);
        self
    }

    pub fn with_references(mut self, references: Vec<EncodedImage>) -> Self {
        self.reference_images = references;
        self
    }

    /// Description with surrounding whitespace removed, or `None` when blank.
    pub fn description_text(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn cast_member(&self) -> Option<CastMember<'_>> {
        let sheet = self.sheet_image.as_ref()?;
        Some(CastMember {
            name: &self.name,
            description: self.description_text(),
            sheet,
            references: &self.reference_images,
        })
    }
}

/// A character whose sheet image is known to be present.
#[derive(Debug, Clone, Copy)]
pub struct CastMember<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub sheet: &'a EncodedImage,
    pub references: &'a [EncodedImage],
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default)]
    pub script: String,
    #[serde(default, alias = "generatedImage", skip_serializing_if = "Option::is_none")]
    pub image: Option<EncodedImage>,
}

impl Page {
    pub fn new(script: impl Into<String>, image: Option<EncodedImage>) -> Self {
        Self {
            script: script.into(),
            image,
        }
    }

    /// Script and image, when both are present and the script is not blank.
    pub fn complete(&self) -> Option<(&str, &EncodedImage)> {
        let script = self.script.trim();
        if script.is_empty() {
            return None;
        }
        self.image.as_ref().map(|image| (script, image))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Monochrome,
    Color,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cast_member_requires_sheet() {
        let bare = Character::new("Aiko").with_description("  ");
        assert!(bare.cast_member().is_none());

        let sheeted = Character::new("Aiko")
            .with_description(" tall swordswoman ")
            .with_sheet(EncodedImage::new("data:image/png;base64,AAAA"));
        let member = sheeted.cast_member().unwrap_or_else(|| panic!("missing member"));
        assert_eq!(member.name, "Aiko");
        assert_eq!(member.description, Some("tall swordswoman"));
    }

    #[test]
    fn character_json_uses_camel_case() -> anyhow::Result<()> {
        let raw = r#"{"name":"Ren","sheetImage":"data:image/png;base64,AAAA","referenceImages":["data:image/jpeg;base64,BBBB"]}"#;
        let character: Character = serde_json::from_str(raw)?;
        assert_eq!(character.name, "Ren");
        assert!(character.description.is_none());
        assert_eq!(character.reference_images.len(), 1);
        Ok(())
    }

    #[test]
    fn page_is_complete_only_with_script_and_image() {
        let image = EncodedImage::new("data:image/png;base64,AAAA");
        assert!(Page::new("A duel at dawn.", Some(image.clone())).complete().is_some());
        assert!(Page::new("   ", Some(image)).complete().is_none());
        assert!(Page::new("A duel at dawn.", None).complete().is_none());
    }
}
