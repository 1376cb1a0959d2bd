use inkframe_contracts::{Character, EncodedImage, Page};

use super::{non_blank, numbered_rules, roster_lines, Attachments, PromptPlan};

pub fn worldview(characters: &[Character]) -> PromptPlan {
    let roster = roster_lines(characters);
    let cast = if roster.is_empty() {
        "No characters have been defined yet. Invent a setting that could host an original cast.".to_string()
    } else {
        format!(
            "MAIN CHARACTERS:\n{roster}\n\nBuild a world in which these characters naturally belong. Let their descriptions shape its cultures, conflicts and places."
        )
    };
    let rules = numbered_rules(&[
        "Write three to five short paragraphs of plain prose.".to_string(),
        "Cover the era and technology level, the key locations, the social order, and the central tension that drives stories in this world.".to_string(),
        "Do not write dialogue, panel breakdowns or a plot outline.".to_string(),
        "Do not use markdown headings or bullet lists.".to_string(),
    ]);

    Attachments::default().into_plan(vec![
        "You are a worldbuilder for a new manga series. Describe the world the story takes place in.".to_string(),
        cast,
        rules,
    ])
}

#[derive(Debug, Clone, Copy)]
pub struct StoryRequest<'a> {
    pub worldview: &'a str,
    pub characters: &'a [Character],
    /// Direction for the next page; blank means the model picks the beat.
    pub premise: &'a str,
    pub previous_pages: &'a [Page],
}

pub fn story_suggestion(request: &StoryRequest<'_>) -> PromptPlan {
    let mut attachments = Attachments::default();
    let mut sections = vec![
        "You are a manga scriptwriter planning the next page of an ongoing story.".to_string(),
    ];

    if let Some(worldview) = non_blank(request.worldview) {
        sections.push(format!("WORLD SETTING:\n{worldview}"));
    }

    let roster = roster_lines(request.characters);
    if roster.is_empty() {
        sections.push(
            "CHARACTERS:\nNone defined yet. Keep the cast to unnamed side characters.".to_string(),
        );
    } else {
        sections.push(format!("CHARACTERS:\n{roster}"));
    }

    // Only pages with both an image and a script give usable context.
    let history = request
        .previous_pages
        .iter()
        .filter_map(Page::complete)
        .enumerate()
        .map(|(idx, (script, image))| {
            let number = idx + 1;
            let label = attachments.attach(format!("Previous Page {number} Image"), image);
            format!("Page {number} ({label}):\n{script}")
        })
        .collect::<Vec<_>>();
    let has_history = !history.is_empty();
    if has_history {
        sections.push(format!(
            "PREVIOUS PAGES (oldest first; each script is paired with the attached image named next to it):\n\n{}",
            history.join("\n\n")
        ));
    }

    match non_blank(request.premise) {
        Some(premise) => sections.push(format!(
            "PREMISE FOR THIS PAGE:\n{premise}\n\nBuild the page around this premise."
        )),
        None if has_history => sections.push(
            "No premise was supplied. Propose the next story beat yourself so that it continues naturally from the previous pages.".to_string(),
        ),
        None => sections.push(
            "No premise was supplied and there are no previous pages. Propose an opening beat yourself that introduces the world and the characters.".to_string(),
        ),
    }

    sections.push(numbered_rules(&[
        "Split the page into four to six panels, numbered from 1 in reading order.".to_string(),
        "Each panel description states the shot (close-up, medium or wide), who is present, what they do and where.".to_string(),
        "dialogue holds the spoken lines or narration of the panel. Use an empty string for silent panels.".to_string(),
        "Keep every character consistent with their description and with the previous pages.".to_string(),
        "Answer with JSON only: an object with summary and panels, each panel having panel, description and dialogue.".to_string(),
    ]));

    attachments.into_plan(sections)
}

#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    /// Layout sketch with the intended panel borders and poses.
    pub layout: &'a EncodedImage,
    pub generated: &'a EncodedImage,
    pub script: &'a str,
    pub characters: &'a [Character],
}

pub fn analysis(request: &AnalysisRequest<'_>) -> PromptPlan {
    let mut attachments = Attachments::default();
    let layout = attachments.attach("Layout Reference", request.layout);
    let generated = attachments.attach("Generated Page", request.generated);

    let mut sections = vec![
        "You are a QA reviewer in a manga production pipeline.".to_string(),
        format!(
            "Compare {generated} against {layout} and the script below. Check the panel count and borders, each character's pose and position, which characters appear in which panel, and whether the action matches the script."
        ),
    ];
    let roster = roster_lines(request.characters);
    if !roster.is_empty() {
        sections.push(format!("CHARACTERS:\n{roster}"));
    }
    if let Some(script) = non_blank(request.script) {
        sections.push(format!("SCRIPT:\n{script}"));
    }
    sections.push(numbered_rules(&[
        "Report only concrete, visible discrepancies. Ignore differences in rendering quality, shading or style.".to_string(),
        "Set has_discrepancies to true only when at least one discrepancy matters for the story or the layout.".to_string(),
        format!("When has_discrepancies is true, write correction_prompt as one edit instruction that an image editor can apply to {generated} to fix every discrepancy."),
        "When has_discrepancies is false, correction_prompt must be an empty string.".to_string(),
        "Answer with JSON only: analysis, has_discrepancies and correction_prompt.".to_string(),
    ]));

    attachments.into_plan(sections)
}

#[cfg(test)]
mod tests {
    use inkframe_contracts::Page;

    use super::*;
    use crate::prompt::fixtures::{image, sheeted};

    #[test]
    fn worldview_with_empty_roster_is_still_a_prompt() {
        let plan = worldview(&[]);
        assert!(plan.text.contains("worldbuilder"));
        assert!(plan.text.contains("No characters have been defined yet"));
        assert!(plan.attachments.is_empty());
    }

    #[test]
    fn worldview_lists_characters() {
        let plan = worldview(&[sheeted("Aiko"), Character::new("Ren")]);
        assert!(plan.text.contains("- Aiko: Aiko description\n- Ren"));
        assert!(plan.attachments.is_empty());
    }

    #[test]
    fn story_without_premise_asks_model_for_next_beat() {
        let pages = vec![Page::new("Aiko leaves town.", Some(image("p1")))];
        let plan = story_suggestion(&StoryRequest {
            worldview: "A drowned city.",
            characters: &[sheeted("Aiko")],
            premise: "   ",
            previous_pages: &pages,
        });
        assert!(plan.text.contains("WORLD SETTING:\nA drowned city."));
        assert!(plan.text.contains("Propose the next story beat yourself"));
        assert!(!plan.text.contains("PREMISE FOR THIS PAGE"));
    }

    #[test]
    fn story_with_premise_and_no_history() {
        let plan = story_suggestion(&StoryRequest {
            worldview: "",
            characters: &[],
            premise: "A storm hits the harbour.",
            previous_pages: &[],
        });
        assert!(plan.text.contains("PREMISE FOR THIS PAGE:\nA storm hits the harbour."));
        assert!(!plan.text.contains("WORLD SETTING"));
        assert!(!plan.text.contains("PREVIOUS PAGES"));
        assert!(plan.text.contains("None defined yet"));
        assert!(plan.attachments.is_empty());
    }

    #[test]
    fn incomplete_previous_pages_are_skipped_without_shifting_order() {
        let pages = vec![
            Page::new("One.", Some(image("p1"))),
            Page::new("Two has no image.", None),
            Page::new("", Some(image("p3"))),
            Page::new("Four.", Some(image("p4"))),
        ];
        let plan = story_suggestion(&StoryRequest {
            worldview: "",
            characters: &[],
            premise: "",
            previous_pages: &pages,
        });

        assert_eq!(
            plan.labels(),
            vec!["Previous Page 1 Image", "Previous Page 2 Image"]
        );
        let payloads: Vec<&str> = plan.images().map(|inline| inline.data.as_str()).collect();
        assert_eq!(payloads, vec!["p1", "p4"]);
        assert!(plan.text.contains("Page 1 (Previous Page 1 Image):\nOne."));
        assert!(plan.text.contains("Page 2 (Previous Page 2 Image):\nFour."));
        assert!(!plan.text.contains("Two has no image."));
        assert!(!plan.text.contains("Page 3"));
    }

    #[test]
    fn analysis_attaches_layout_then_generated_page() {
        let plan = analysis(&AnalysisRequest {
            layout: &image("layout"),
            generated: &image("generated"),
            script: "Aiko draws her sword.",
            characters: &[sheeted("Aiko")],
        });
        assert_eq!(plan.labels(), vec!["Layout Reference", "Generated Page"]);
        assert!(plan.text.contains("correction_prompt must be an empty string"));
        assert!(plan.text.contains("SCRIPT:\nAiko draws her sword."));
    }
}
