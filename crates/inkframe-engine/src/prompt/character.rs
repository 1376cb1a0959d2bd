use inkframe_contracts::{ColorMode, EncodedImage};

use super::{color_rule, joined_labels, non_blank, numbered_rules, Attachments, PromptPlan};

fn sheet_rules(color_mode: ColorMode) -> Vec<String> {
    vec![
        "Draw exactly six full-body poses of the same character, no more and no fewer.".to_string(),
        "Arrange them in two rows of three. Top row: front view, three-quarter view, side view. Bottom row: back view, an action pose, an expressive pose.".to_string(),
        "Use a plain white background with even spacing. Poses must not overlap.".to_string(),
        "Keep the design identical across all six poses: face, hairstyle, outfit, accessories and proportions.".to_string(),
        "Do not add any text, names, labels, arrows or annotations.".to_string(),
        color_rule(color_mode),
    ]
}

pub fn character_sheet(references: &[EncodedImage], name: &str, color_mode: ColorMode) -> PromptPlan {
    let mut attachments = Attachments::default();
    let labels = references
        .iter()
        .enumerate()
        .map(|(idx, image)| attachments.attach(format!("Reference Image {}", idx + 1), image))
        .collect::<Vec<_>>();
    let name = non_blank(name).unwrap_or("the character");

    let likeness = if labels.is_empty() {
        format!("No reference image was supplied. Design {name} from the name alone.")
    } else {
        format!(
            "{} show {name}. Match the face, hairstyle, outfit and proportions exactly.",
            joined_labels(&labels)
        )
    };

    attachments.into_plan(vec![
        format!("You are a character designer producing a model sheet for a manga character named {name}."),
        likeness,
        numbered_rules(&sheet_rules(color_mode)),
    ])
}

pub fn character_from_reference(
    references: &[EncodedImage],
    name: &str,
    concept: &str,
    color_mode: ColorMode,
) -> PromptPlan {
    let mut attachments = Attachments::default();
    let labels = references
        .iter()
        .enumerate()
        .map(|(idx, image)| attachments.attach(format!("Style Reference {}", idx + 1), image))
        .collect::<Vec<_>>();
    let name = non_blank(name).unwrap_or("the character");

    let mut sections = vec![format!(
        "You are a character designer creating a brand-new, original manga character named {name}."
    )];
    if let Some(concept) = non_blank(concept) {
        sections.push(format!("CHARACTER CONCEPT:\n{concept}"));
    }
    if !labels.is_empty() {
        sections.push(format!(
            "{} define the art style only: line weight, shading, proportions and rendering. Do not copy the characters, faces, hairstyles, outfits or designs shown in them. {name} must be a new design that follows the concept.",
            joined_labels(&labels)
        ));
    }
    sections.push(numbered_rules(&sheet_rules(color_mode)));

    attachments.into_plan(sections)
}

pub fn edit_character_sheet(sheet: &EncodedImage, name: &str, instruction: &str) -> PromptPlan {
    let mut attachments = Attachments::default();
    let label = attachments.attach("Current Character Sheet", sheet);
    let name = non_blank(name).unwrap_or("the character");

    attachments.into_plan(vec![
        format!("You are a character designer revising the model sheet of {name}, attached as {label}."),
        format!("EDIT REQUEST:\n{}", instruction.trim()),
        numbered_rules(&[
            "Apply the edit to every pose on the sheet so the design stays consistent.".to_string(),
            "Keep the six poses, their two-row arrangement and everything the edit does not mention unchanged.".to_string(),
            "Keep the existing art style and color treatment.".to_string(),
            "Do not add any text or labels.".to_string(),
        ]),
    ])
}
