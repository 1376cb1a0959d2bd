use std::io::Cursor;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use inkframe_contracts::{FieldType, InlineImage, ObjectSchema, ResponseMode};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::{Backend, BackendRequest, BackendResponse, ResponsePart};

const DRYRUN_LONG_EDGE: u32 = 256;

/// Offline backend. Answers image requests with a solid-colour PNG derived
/// from the instruction text and structured requests with placeholder JSON
/// shaped by the declared schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryrunBackend;

impl Backend for DryrunBackend {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate(&self, request: &BackendRequest) -> Result<BackendResponse> {
        let id = short_id(request);
        let parts = match request.mode {
            ResponseMode::MultiModal => {
                let (width, height) = dims_for_ratio(request.aspect_ratio.as_deref());
                let png = solid_png(width, height, color_from_prompt(request.instruction()))?;
                vec![
                    ResponsePart::InlineData(InlineImage::new("image/png", BASE64.encode(png))),
                    ResponsePart::Text(format!("dryrun {} {id}", request.operation)),
                ]
            }
            ResponseMode::StructuredText => {
                let text = match request.schema.as_ref() {
                    Some(schema) => serde_json::to_string(&placeholder_object(schema, &id))?,
                    None => format!("Dryrun {} output {id}.", request.operation),
                };
                vec![ResponsePart::Text(text)]
            }
        };
        Ok(BackendResponse::from_parts(parts))
    }
}

fn placeholder_object(schema: &ObjectSchema, id: &str) -> Value {
    let mut out = Map::new();
    for (name, spec) in schema.fields() {
        out.insert(name.to_string(), placeholder_value(&spec.kind, id));
    }
    Value::Object(out)
}

fn placeholder_value(kind: &FieldType, id: &str) -> Value {
    match kind {
        FieldType::String => Value::String(format!("dryrun {id}")),
        FieldType::Integer => Value::Number(1.into()),
        FieldType::Boolean => Value::Bool(false),
        FieldType::Array(items) => Value::Array(vec![placeholder_value(items, id)]),
        FieldType::Object(schema) => placeholder_object(schema, id),
    }
}

fn dims_for_ratio(ratio: Option<&str>) -> (u32, u32) {
    let parsed = ratio
        .and_then(|value| value.split_once(':'))
        .and_then(|(left, right)| {
            Some((left.trim().parse::<f64>().ok()?, right.trim().parse::<f64>().ok()?))
        })
        .filter(|(left, right)| *left > 0.0 && *right > 0.0);
    let Some((left, right)) = parsed else {
        return (DRYRUN_LONG_EDGE, DRYRUN_LONG_EDGE);
    };
    let long = f64::from(DRYRUN_LONG_EDGE);
    if left >= right {
        (DRYRUN_LONG_EDGE, ((long * right / left).round() as u32).max(1))
    } else {
        (((long * left / right).round() as u32).max(1), DRYRUN_LONG_EDGE)
    }
}

fn solid_png(width: u32, height: u32, (r, g, b): (u8, u8, u8)) -> Result<Vec<u8>> {
    let mut image = RgbImage::new(width, height);
    for pixel in image.pixels_mut() {
        *pixel = Rgb([r, g, b]);
    }
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .context("dryrun png encode failed")?;
    Ok(bytes)
}

fn color_from_prompt(prompt: &str) -> (u8, u8, u8) {
    let digest = Sha256::digest(prompt.as_bytes());
    (digest[0], digest[1], digest[2])
}

fn short_id(request: &BackendRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.operation.name().as_bytes());
    hasher.update(request.instruction().as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..4])
}
