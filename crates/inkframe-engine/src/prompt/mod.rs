mod character;
mod page;
mod story;

use inkframe_contracts::{Character, ColorMode, EncodedImage, InlineImage};

pub use character::{character_from_reference, character_sheet, edit_character_sheet};
pub use page::{
    colorize_manga_page, edit_manga_page, layout_proposal, manga_page, ColorizeRequest,
    LayoutRequest, PageEditRequest, PageRequest,
};
pub use story::{analysis, story_suggestion, worldview, AnalysisRequest, StoryRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledAttachment {
    pub label: String,
    pub image: InlineImage,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PromptPlan {
    pub text: String,
    pub attachments: Vec<LabeledAttachment>,
}

impl PromptPlan {
    pub fn labels(&self) -> Vec<&str> {
        self.attachments
            .iter()
            .map(|attachment| attachment.label.as_str())
            .collect()
    }

    pub fn images(&self) -> impl Iterator<Item = &InlineImage> {
        self.attachments.iter().map(|attachment| &attachment.image)
    }
}

/// Ordered attachment list under construction.
#[derive(Debug, Default)]
struct Attachments(Vec<LabeledAttachment>);

impl Attachments {
    /// Decodes `image` and appends it; returns the label for use in the text.
    fn attach(&mut self, label: impl Into<String>, image: &EncodedImage) -> String {
        let label = label.into();
        self.0.push(LabeledAttachment {
            label: label.clone(),
            image: image.decode(),
        });
        label
    }

    fn into_plan(self, sections: Vec<String>) -> PromptPlan {
        PromptPlan {
            text: sections
                .into_iter()
                .filter(|section| !section.trim().is_empty())
                .collect::<Vec<_>>()
                .join("\n\n"),
            attachments: self.0,
        }
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn roster_lines(characters: &[Character]) -> String {
    characters
        .iter()
        .filter(|character| !character.name.trim().is_empty())
        .map(|character| match character.description_text() {
            Some(description) => format!("- {}: {description}", character.name.trim()),
            None => format!("- {}", character.name.trim()),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn numbered_rules(rules: &[String]) -> String {
    let lines = rules
        .iter()
        .enumerate()
        .map(|(idx, rule)| format!("{}. {rule}", idx + 1))
        .collect::<Vec<_>>()
        .join("\n");
    format!("RULES:\n{lines}")
}

fn color_rule(mode: ColorMode) -> String {
    match mode {
        ColorMode::Monochrome => "Render in black and white manga style: clean ink line art with screentone shading. Use no color at all.".to_string(),
        ColorMode::Color => "Render in full color: clean line art with cel shading and a consistent palette.".to_string(),
    }
}

fn joined_labels(labels: &[String]) -> String {
    match labels {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{} and {last}", head.join(", ")),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_skips_blank_names_and_descriptions() {
        let characters = vec![
            Character::new("Aiko").with_description("a courier"),
            Character::new("  "),
            Character::new("Ren").with_description("   "),
        ];
        assert_eq!(roster_lines(&characters), "- Aiko: a courier\n- Ren");
    }

    #[test]
    fn joined_labels_reads_naturally() {
        let labels = |items: &[&str]| items.iter().map(|item| item.to_string()).collect::<Vec<_>>();
        assert_eq!(joined_labels(&labels(&[])), "");
        assert_eq!(joined_labels(&labels(&["A"])), "A");
        assert_eq!(joined_labels(&labels(&["A", "B", "C"])), "A, B and C");
    }

    #[test]
    fn empty_sections_are_dropped() {
        let plan = Attachments::default().into_plan(vec![
            "first".to_string(),
            String::new(),
            "second".to_string(),
        ]);
        assert_eq!(plan.text, "first\n\nsecond");
        assert!(plan.attachments.is_empty());
    }
}
