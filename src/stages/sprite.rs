// src/stages/sprite.rs

use std::io::Cursor;

use anyhow::{Context, Result};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, ImageEncoder, Rgba, RgbaImage};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::options::{SpriteAlgorithm, SpriteOptions};
use crate::files::PatternSet;
use crate::stages::{template, Stage, StageContext, StageReport};

const DEFAULT_TEMPLATE: &str = include_str!("templates/sprite.sass.jinja");

/// Placement of one image in the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpriteFrame {
    pub name: String,
    pub x: u32,
    pub y: u32,
    pub offset_x: i64,
    pub offset_y: i64,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct SheetInfo {
    width: u32,
    height: u32,
    image: String,
}

impl Stage for SpriteOptions {
    fn validate(&self) -> Result<()> {
        PatternSet::compile(&[&self.src])?;
        Ok(())
    }

    /// Pack the matched PNGs into `dest` and render the stylesheet partial.
    fn run(&self, ctx: &StageContext<'_>) -> Result<StageReport> {
        let inputs = PatternSet::compile(&[&self.src])?.expand(ctx.fs, ctx.root())?;
        let dest = ctx.path(&self.dest);
        let dest_css = ctx.path(&self.dest_css);
        let mut report = StageReport::new();

        // The sheet itself may live next to its inputs.
        let inputs: Vec<_> = inputs.into_iter().filter(|p| *p != dest).collect();
        if inputs.is_empty() {
            warn!(src = %self.src, "no images matched; sprite not generated");
            return Ok(report);
        }

        if !ctx.is_stale(&inputs, &[dest.clone(), dest_css.clone()]) {
            info!(sprite = ?dest, "sprite up to date");
            report.skipped = inputs.len();
            return Ok(report);
        }

        let mut images = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let bytes = ctx.fs.read(input)?;
            let img = image::load_from_memory(&bytes)
                .with_context(|| format!("decoding {:?}", input))?
                .to_rgba8();
            let name = sprite_name(input);
            debug!(image = %name, width = img.width(), height = img.height(), "sprite input");
            images.push((name, img));
        }

        let frames = layout(
            images.iter().map(|(name, img)| (name.as_str(), img.width(), img.height())),
            self.padding,
            self.algorithm,
        );
        let (sheet_width, sheet_height) = sheet_size(&frames);

        let mut sheet = RgbaImage::from_pixel(sheet_width, sheet_height, Rgba([0, 0, 0, 0]));
        for (frame, (_, img)) in frames.iter().zip(images.iter()) {
            copy_into(&mut sheet, img, frame.x, frame.y);
        }

        let png = encode_png(&sheet)?;
        ctx.fs.write(&dest, &png)?;
        report.wrote(dest.clone());

        let image_url = self.image_url.clone().unwrap_or_else(|| {
            dest.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        let css = self.stylesheet(ctx, &frames, sheet_width, sheet_height, image_url)?;
        ctx.fs.write(&dest_css, css.as_bytes())?;
        report.wrote(dest_css);

        report.processed = frames.len();
        info!(
            sprite = ?dest,
            images = frames.len(),
            width = sheet_width,
            height = sheet_height,
            "sprite generated"
        );
        Ok(report)
    }
}

impl SpriteOptions {
    fn stylesheet(
        &self,
        ctx: &StageContext<'_>,
        frames: &[SpriteFrame],
        width: u32,
        height: u32,
        image: String,
    ) -> Result<String> {
        let (name, source) = match &self.css_template {
            Some(path) => {
                let path = ctx.path(path);
                (path.display().to_string(), ctx.fs.read_to_string(&path)?)
            }
            None => ("sprite.sass".to_string(), DEFAULT_TEMPLATE.to_string()),
        };

        template::render(
            &name,
            &source,
            minijinja::context! {
                sprites => frames,
                spritesheet => SheetInfo { width, height, image },
            },
        )
    }
}

/// Place frames one after another, separated by `padding`.
pub fn layout<'a>(
    sizes: impl IntoIterator<Item = (&'a str, u32, u32)>,
    padding: u32,
    algorithm: SpriteAlgorithm,
) -> Vec<SpriteFrame> {
    let mut cursor = 0u32;
    let mut frames = Vec::new();

    for (name, width, height) in sizes {
        let (x, y) = match algorithm {
            SpriteAlgorithm::TopDown => (0, cursor),
            SpriteAlgorithm::LeftRight => (cursor, 0),
        };
        cursor += padding
            + match algorithm {
                SpriteAlgorithm::TopDown => height,
                SpriteAlgorithm::LeftRight => width,
            };

        frames.push(SpriteFrame {
            name: name.to_string(),
            x,
            y,
            offset_x: -i64::from(x),
            offset_y: -i64::from(y),
            width,
            height,
        });
    }

    frames
}

fn sheet_size(frames: &[SpriteFrame]) -> (u32, u32) {
    let width = frames.iter().map(|f| f.x + f.width).max().unwrap_or(0);
    let height = frames.iter().map(|f| f.y + f.height).max().unwrap_or(0);
    (width.max(1), height.max(1))
}

fn copy_into(sheet: &mut RgbaImage, img: &RgbaImage, x: u32, y: u32) {
    for (px, py, pixel) in img.enumerate_pixels() {
        let (dx, dy) = (x + px, y + py);
        if dx < sheet.width() && dy < sheet.height() {
            sheet.put_pixel(dx, dy, *pixel);
        }
    }
}

fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive)
        .write_image(img.as_raw(), img.width(), img.height(), ColorType::Rgba8)
        .context("encoding sprite sheet")?;
    Ok(buf.into_inner())
}

fn sprite_name(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}
