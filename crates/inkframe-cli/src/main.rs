use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use inkframe_contracts::{
    codec, lookup_profile, Character, ColorMode, EncodedImage, GeneratedContent, Operation, Page,
};
use inkframe_engine::{
    AnalysisRequest, ColorizeRequest, LayoutRequest, PageEditRequest, PageRequest, StoryRequest,
    Studio, StudioConfig,
};
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "inkframe", version, about = "Manga studio generation CLI")]
struct Cli {
    /// Use the offline backend instead of Gemini.
    #[arg(long, global = true)]
    dryrun: bool,
    #[arg(long, global = true)]
    text_model: Option<String>,
    #[arg(long, global = true)]
    image_model: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Worldview(WorldviewArgs),
    Story(StoryArgs),
    Layout(LayoutArgs),
    Sheet(SheetArgs),
    DeriveCharacter(DeriveCharacterArgs),
    EditSheet(EditSheetArgs),
    Page(PageArgs),
    Colorize(ColorizeArgs),
    EditPage(EditPageArgs),
    Analyze(AnalyzeArgs),
}

#[derive(Debug, Args)]
struct RosterArg {
    /// JSON list of characters; image fields are paths relative to the file.
    #[arg(long)]
    characters: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct OutArg {
    /// Output image path. Defaults to a timestamped file in the current directory.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct WorldviewArgs {
    #[command(flatten)]
    roster: RosterArg,
}

#[derive(Debug, Parser)]
struct StoryArgs {
    #[arg(long, default_value = "")]
    worldview: String,
    #[arg(long, default_value = "")]
    premise: String,
    /// JSON list of previous pages (`script`, `image`).
    #[arg(long)]
    pages: Option<PathBuf>,
    #[command(flatten)]
    roster: RosterArg,
}

#[derive(Debug, Parser)]
struct LayoutArgs {
    #[arg(long)]
    story: String,
    #[arg(long, default_value = "A4")]
    aspect_ratio: String,
    /// JSON previous page (`script`, `image`).
    #[arg(long)]
    previous_page: Option<PathBuf>,
    #[arg(long)]
    canvas: Option<PathBuf>,
    #[command(flatten)]
    roster: RosterArg,
    #[command(flatten)]
    out: OutArg,
}

#[derive(Debug, Parser)]
struct SheetArgs {
    #[arg(long = "reference", required = true)]
    references: Vec<PathBuf>,
    #[arg(long)]
    name: String,
    #[arg(long)]
    color: bool,
    #[command(flatten)]
    out: OutArg,
}

#[derive(Debug, Parser)]
struct DeriveCharacterArgs {
    #[arg(long = "reference", required = true)]
    references: Vec<PathBuf>,
    #[arg(long)]
    name: String,
    #[arg(long)]
    concept: String,
    #[arg(long)]
    color: bool,
    #[command(flatten)]
    out: OutArg,
}

#[derive(Debug, Parser)]
struct EditSheetArgs {
    #[arg(long)]
    sheet: PathBuf,
    #[arg(long)]
    name: String,
    #[arg(long)]
    instruction: String,
    #[command(flatten)]
    out: OutArg,
}

#[derive(Debug, Parser)]
struct PageArgs {
    #[arg(long)]
    layout: PathBuf,
    #[arg(long)]
    script: String,
    #[arg(long)]
    color: bool,
    /// Draw speech bubbles but leave them empty.
    #[arg(long)]
    empty_bubbles: bool,
    #[arg(long)]
    previous_page: Option<PathBuf>,
    #[command(flatten)]
    roster: RosterArg,
    #[command(flatten)]
    out: OutArg,
}

#[derive(Debug, Parser)]
struct ColorizeArgs {
    #[arg(long)]
    page: PathBuf,
    #[command(flatten)]
    roster: RosterArg,
    #[command(flatten)]
    out: OutArg,
}

#[derive(Debug, Parser)]
struct EditPageArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    instruction: String,
    /// White marks the region to change, black the region to keep.
    #[arg(long)]
    mask: Option<PathBuf>,
    #[arg(long = "reference")]
    references: Vec<PathBuf>,
    #[command(flatten)]
    out: OutArg,
}

#[derive(Debug, Parser)]
struct AnalyzeArgs {
    #[arg(long)]
    layout: PathBuf,
    #[arg(long)]
    generated: PathBuf,
    #[arg(long)]
    script: String,
    #[command(flatten)]
    roster: RosterArg,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RosterEntry {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    sheet_image: Option<PathBuf>,
    #[serde(default)]
    reference_images: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct PageEntry {
    #[serde(default)]
    script: String,
    #[serde(default)]
    image: Option<PathBuf>,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("inkframe error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = StudioConfig::from_env()
        .with_text_model(cli.text_model)
        .with_image_model(cli.image_model)
        .with_dryrun(cli.dryrun);
    let studio = Studio::from_config(&config)?;

    match cli.command {
        Command::Worldview(args) => {
            let characters = load_roster(args.roster.characters.as_deref())?;
            println!("{}", studio.generate_worldview(&characters)?);
        }
        Command::Story(args) => {
            let characters = load_roster(args.roster.characters.as_deref())?;
            let pages = match args.pages.as_deref() {
                Some(path) => load_pages(path)?,
                None => Vec::new(),
            };
            let story = studio.generate_detailed_story_suggestion(&StoryRequest {
                worldview: &args.worldview,
                characters: &characters,
                premise: &args.premise,
                previous_pages: &pages,
            })?;
            print_json(&story)?;
        }
        Command::Layout(args) => {
            let characters = load_roster(args.roster.characters.as_deref())?;
            let previous = load_optional_page(args.previous_page.as_deref())?;
            let canvas = match args.canvas.as_deref() {
                Some(path) => read_image(path)?,
                None => blank_canvas(&args.aspect_ratio)?,
            };
            let content = studio.generate_layout_proposal(&LayoutRequest {
                story: &args.story,
                aspect_ratio: &args.aspect_ratio,
                characters: &characters,
                previous_page: previous.as_ref(),
                canvas: Some(&canvas),
            })?;
            report(
                Operation::GenerateLayoutProposal,
                &content,
                args.out.out.as_deref(),
            )?;
        }
        Command::Sheet(args) => {
            let references = read_images(&args.references)?;
            let content =
                studio.generate_character_sheet(&references, &args.name, color_mode(args.color))?;
            report(
                Operation::GenerateCharacterSheet,
                &content,
                args.out.out.as_deref(),
            )?;
        }
        Command::DeriveCharacter(args) => {
            let references = read_images(&args.references)?;
            let content = studio.generate_character_from_reference(
                &references,
                &args.name,
                &args.concept,
                color_mode(args.color),
            )?;
            report(
                Operation::GenerateCharacterFromReference,
                &content,
                args.out.out.as_deref(),
            )?;
        }
        Command::EditSheet(args) => {
            let sheet = read_image(&args.sheet)?;
            let content = studio.edit_character_sheet(&sheet, &args.name, &args.instruction)?;
            report(Operation::EditCharacterSheet, &content, args.out.out.as_deref())?;
        }
        Command::Page(args) => {
            let characters = load_roster(args.roster.characters.as_deref())?;
            let layout = read_image(&args.layout)?;
            let previous = load_optional_page(args.previous_page.as_deref())?;
            let content = studio.generate_manga_page(&PageRequest {
                characters: &characters,
                layout: &layout,
                script: &args.script,
                color_mode: color_mode(args.color),
                empty_bubbles: args.empty_bubbles,
                previous_page: previous.as_ref(),
            })?;
            report(Operation::GenerateMangaPage, &content, args.out.out.as_deref())?;
        }
        Command::Colorize(args) => {
            let characters = load_roster(args.roster.characters.as_deref())?;
            let page = read_image(&args.page)?;
            let content = studio.colorize_manga_page(&ColorizeRequest {
                page: &page,
                characters: &characters,
            })?;
            report(Operation::ColorizeMangaPage, &content, args.out.out.as_deref())?;
        }
        Command::EditPage(args) => {
            let original = read_image(&args.image)?;
            let mask = args.mask.as_deref().map(read_image).transpose()?;
            let references = read_images(&args.references)?;
            let content = studio.edit_manga_page(&PageEditRequest {
                original: &original,
                instruction: &args.instruction,
                mask: mask.as_ref(),
                references: &references,
            })?;
            report(Operation::EditMangaPage, &content, args.out.out.as_deref())?;
        }
        Command::Analyze(args) => {
            let characters = load_roster(args.roster.characters.as_deref())?;
            let layout = read_image(&args.layout)?;
            let generated = read_image(&args.generated)?;
            let result = studio.analyze_and_suggest_corrections(&AnalysisRequest {
                layout: &layout,
                generated: &generated,
                script: &args.script,
                characters: &characters,
            })?;
            print_json(&result)?;
        }
    }
    Ok(())
}

fn color_mode(color: bool) -> ColorMode {
    if color {
        ColorMode::Color
    } else {
        ColorMode::Monochrome
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(operation: Operation, content: &GeneratedContent, out: Option<&Path>) -> Result<()> {
    let path = match out {
        Some(path) => path.to_path_buf(),
        None => default_output_path(operation, &content.image),
    };
    write_image(content, &path)?;
    println!("{}", path.display());
    if let Some(text) = content.text.as_deref() {
        println!("{text}");
    }
    Ok(())
}

fn write_image(content: &GeneratedContent, path: &Path) -> Result<()> {
    let bytes = content
        .image
        .decode()
        .to_bytes()
        .context("generated image payload is not valid base64")?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "image written");
    Ok(())
}

fn default_output_path(operation: Operation, image: &EncodedImage) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let ext = extension_for_media_type(&image.decode().mime_type);
    PathBuf::from(format!("inkframe-{operation}-{stamp}.{ext}"))
}

fn extension_for_media_type(media_type: &str) -> &'static str {
    match media_type.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/heic" | "image/heif" => "heic",
        "image/gif" => "gif",
        _ => "png",
    }
}

fn guess_image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "heic" | "heif" => "image/heic",
        "gif" => "image/gif",
        _ => "image/png",
    }
}

fn read_image(path: &Path) -> Result<EncodedImage> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read image {}", path.display()))?;
    Ok(codec::encode_bytes(guess_image_mime(path), &bytes))
}

fn read_images(paths: &[PathBuf]) -> Result<Vec<EncodedImage>> {
    paths.iter().map(|path| read_image(path)).collect()
}

/// White page of the preset's pixel size, encoded as PNG.
fn blank_canvas(aspect_ratio: &str) -> Result<EncodedImage> {
    let profile = lookup_profile(aspect_ratio);
    let image = RgbImage::from_pixel(profile.width, profile.height, Rgb([255, 255, 255]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .context("blank canvas encode failed")?;
    Ok(codec::encode_bytes("image/png", &bytes))
}

fn load_roster(path: Option<&Path>) -> Result<Vec<Character>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let entries: Vec<RosterEntry> = read_json(path)?;
    let base = base_dir(path);
    entries
        .into_iter()
        .map(|entry| {
            if entry.name.trim().is_empty() {
                bail!("character entry in {} has an empty name", path.display());
            }
            let mut character = Character::new(entry.name);
            if let Some(description) = entry.description {
                character = character.with_description(description);
            }
            if let Some(sheet) = entry.sheet_image {
                character = character.with_sheet(read_image(&base.join(sheet))?);
            }
            let references = entry
                .reference_images
                .iter()
                .map(|reference| read_image(&base.join(reference)))
                .collect::<Result<Vec<_>>>()?;
            Ok(character.with_references(references))
        })
        .collect()
}

fn load_pages(path: &Path) -> Result<Vec<Page>> {
    let entries: Vec<PageEntry> = read_json(path)?;
    let base = base_dir(path);
    entries
        .into_iter()
        .map(|entry| page_from_entry(entry, &base))
        .collect()
}

fn load_optional_page(path: Option<&Path>) -> Result<Option<Page>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let entry: PageEntry = read_json(path)?;
    page_from_entry(entry, &base_dir(path)).map(Some)
}

fn page_from_entry(entry: PageEntry, base: &Path) -> Result<Page> {
    let image = entry
        .image
        .map(|image| read_image(&base.join(image)))
        .transpose()?;
    Ok(Page::new(entry.script, image))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn base_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}
