use inkframe_contracts::{lookup_profile, CastMember, Character, ColorMode, EncodedImage, Page};

use super::{color_rule, joined_labels, non_blank, numbered_rules, Attachments, PromptPlan};

#[derive(Debug, Clone, Copy)]
pub struct LayoutRequest<'a> {
    pub story: &'a str,
    /// Aspect-ratio preset key; unknown keys use A4.
    pub aspect_ratio: &'a str,
    pub characters: &'a [Character],
    pub previous_page: Option<&'a Page>,
    pub canvas: Option<&'a EncodedImage>,
}

pub fn layout_proposal(request: &LayoutRequest<'_>) -> PromptPlan {
    let profile = lookup_profile(request.aspect_ratio);
    let mut attachments = Attachments::default();
    let mut sections = vec![
        "You are a storyboard artist drawing the rough panel layout of one manga page.".to_string(),
        format!(
            "PAGE FORMAT: {}x{} pixels, aspect ratio {}. The whole image is the page.",
            profile.width, profile.height, profile.ratio
        ),
    ];

    if let Some(block) = request.previous_page.and_then(|page| {
        previous_page_block(
            &mut attachments,
            page,
            "shows the layout of the previous page. Vary the panel rhythm so the two pages read naturally one after the other.",
        )
    }) {
        sections.push(block);
    }

    let references = request
        .characters
        .iter()
        .filter_map(Character::cast_member)
        .enumerate()
        .map(|(idx, member)| {
            let label = attachments.attach(
                format!("Character Reference {}", idx + 1),
                member.sheet,
            );
            format!("- {label}: {}", member.name)
        })
        .collect::<Vec<_>>();
    if !references.is_empty() {
        sections.push(format!(
            "CHARACTERS (use the references only for proportions and silhouettes):\n{}",
            references.join("\n")
        ));
    }

    match request.canvas {
        Some(canvas) => {
            let label = attachments.attach("Current Canvas", canvas);
            sections.push(format!(
                "{label} is the page as it stands. Keep any panel borders or sketches already on it and complete the layout around them. If it is blank, start from an empty page."
            ));
        }
        None => sections.push("Start from an empty page.".to_string()),
    }

    if let Some(story) = non_blank(request.story) {
        sections.push(format!("STORY FOR THIS PAGE:\n{story}"));
    }

    sections.push(numbered_rules(&[
        "Draw panel borders as clean black rectangles on a white background.".to_string(),
        "Inside each panel, sketch the characters as simple pose figures and indicate the camera framing. No shading and no color.".to_string(),
        "Panel size implies narrative importance: give the key moment of the page the largest panel and use small panels for quick beats.".to_string(),
        "Do not write any text, numbers, labels, captions or speech bubbles.".to_string(),
        "Keep a clear manga reading order, right to left and top to bottom.".to_string(),
    ]));

    attachments.into_plan(sections)
}

#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    pub characters: &'a [Character],
    pub layout: &'a EncodedImage,
    pub script: &'a str,
    pub color_mode: ColorMode,
    /// Draw speech bubbles but leave them blank for manual lettering.
    pub empty_bubbles: bool,
    pub previous_page: Option<&'a Page>,
}

/// `cast` is `request.characters` with sheets resolved, in roster order.
pub fn manga_page(request: &PageRequest<'_>, cast: &[CastMember<'_>]) -> PromptPlan {
    let mut attachments = Attachments::default();
    let mut sections =
        vec!["You are a manga artist finishing one page from a rough layout.".to_string()];

    if let Some(block) = request.previous_page.and_then(|page| {
        previous_page_block(
            &mut attachments,
            page,
            "is the page before this one. Keep characters, outfits, lighting and setting continuous with it.",
        )
    }) {
        sections.push(block);
    }

    if !cast.is_empty() {
        let lines = cast
            .iter()
            .enumerate()
            .map(|(idx, member)| {
                let label =
                    attachments.attach(format!("Character Reference {}", idx + 1), member.sheet);
                match member.description {
                    Some(description) => format!("- {label}: {} ({description})", member.name),
                    None => format!("- {label}: {}", member.name),
                }
            })
            .collect::<Vec<_>>();
        sections.push(format!(
            "CHARACTERS (match each design exactly as shown on its sheet):\n{}",
            lines.join("\n")
        ));
    }

    let layout = attachments.attach("Panel Layout", request.layout);
    sections.push(format!(
        "{layout} is the rough layout of this page. Follow its panel borders, camera framing and character poses exactly. Do not add, remove or merge panels."
    ));

    if let Some(script) = non_blank(request.script) {
        sections.push(format!("SCRIPT:\n{script}"));
    }

    let bubbles = if request.empty_bubbles {
        "Draw speech bubbles where characters speak, but leave every bubble completely empty. Do not write any text, letters or sound effects anywhere.".to_string()
    } else {
        "Draw speech bubbles containing the dialogue from the script, lettered clearly and placed in reading order.".to_string()
    };
    sections.push(numbered_rules(&[
        bubbles,
        color_rule(request.color_mode),
        "Keep every character on model in every panel.".to_string(),
        "After the image, reply with one short sentence describing the finished page.".to_string(),
    ]));

    attachments.into_plan(sections)
}

// The script is kept even when the previous page has no image yet.
fn previous_page_block(attachments: &mut Attachments, page: &Page, role: &str) -> Option<String> {
    let mut lines = Vec::new();
    if let Some(image) = page.image.as_ref() {
        let label = attachments.attach("Previous Page Image", image);
        lines.push(format!("{label} {role}"));
    }
    if let Some(script) = non_blank(&page.script) {
        lines.push(format!("Previous page script:\n{script}"));
    }
    (!lines.is_empty()).then(|| lines.join("\n"))
}

#[derive(Debug, Clone, Copy)]
pub struct ColorizeRequest<'a> {
    pub page: &'a EncodedImage,
    pub characters: &'a [Character],
}

pub fn colorize_manga_page(request: &ColorizeRequest<'_>, cast: &[CastMember<'_>]) -> PromptPlan {
    let mut attachments = Attachments::default();
    let mut sections = vec!["You are a colorist for a manga.".to_string()];

    if !cast.is_empty() {
        let lines = cast
            .iter()
            .enumerate()
            .map(|(idx, member)| {
                let number = idx + 1;
                let mut labels = vec![attachments.attach(
                    format!("Character {number} Sheet ({})", member.name),
                    member.sheet,
                )];
                for (ref_idx, reference) in member.references.iter().enumerate() {
                    labels.push(attachments.attach(
                        format!("Character {number} Reference {} ({})", ref_idx + 1, member.name),
                        reference,
                    ));
                }
                format!("- {}: colors from {}", member.name, joined_labels(&labels))
            })
            .collect::<Vec<_>>();
        sections.push(format!("CHARACTER COLOR REFERENCES:\n{}", lines.join("\n")));
    }

    let page = attachments.attach("Monochrome Page", request.page);
    sections.push(numbered_rules(&[
        format!("Color {page} using the character colors shown in the attached references."),
        "Preserve the original line art exactly. Do not redraw, move, add or remove any line, panel, speech bubble or text.".to_string(),
        "Keep each character's hair, eye, skin and outfit colors consistent with their references in every panel.".to_string(),
        "Choose background colors and lighting that fit the mood of each scene.".to_string(),
    ]));

    attachments.into_plan(sections)
}

#[derive(Debug, Clone, Copy)]
pub struct PageEditRequest<'a> {
    pub original: &'a EncodedImage,
    pub instruction: &'a str,
    /// White marks the region to replace, black the region to keep.
    pub mask: Option<&'a EncodedImage>,
    pub references: &'a [EncodedImage],
}

pub fn edit_manga_page(request: &PageEditRequest<'_>) -> PromptPlan {
    let mut attachments = Attachments::default();
    let original = attachments.attach("Original Page", request.original);
    let mut sections = vec![format!(
        "You are a manga retouch artist editing an existing page, attached as {original}."
    )];

    match request.mask {
        Some(mask) => {
            let mask = attachments.attach("Edit Mask", mask);
            sections.push(format!(
                "{mask} has the same size as {original}. White areas mark the region to change. Black areas must be preserved exactly. Apply the edit only inside the white region and blend its edges seamlessly."
            ));
        }
        None => sections.push(format!(
            "No mask was supplied. Apply the edit to the whole of {original} wherever it is relevant, leaving unrelated parts unchanged."
        )),
    }

    let references = request
        .references
        .iter()
        .enumerate()
        .map(|(idx, image)| attachments.attach(format!("Reference {}", idx + 1), image))
        .collect::<Vec<_>>();
    if !references.is_empty() {
        sections.push(format!(
            "Use {} as visual guides for the edit.",
            joined_labels(&references)
        ));
    }

    sections.push(format!("EDIT INSTRUCTION:\n{}", request.instruction.trim()));
    sections.push(format!(
        "Keep the art style, line weight and color treatment of {original}."
    ));

    attachments.into_plan(sections)
}
