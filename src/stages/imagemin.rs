// src/stages/imagemin.rs

use std::io::Cursor;

use anyhow::{bail, Context, Result};
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{AnimationDecoder, Frame, ImageEncoder, ImageFormat};
use tracing::{debug, info, warn};

use crate::config::options::ImageminOptions;
use crate::files::PatternSet;
use crate::stages::{Stage, StageContext, StageReport};

impl Stage for ImageminOptions {
    fn validate(&self) -> Result<()> {
        PatternSet::compile(&self.src)?;
        if self.optimization_level > 7 {
            bail!(
                "`optimization_level` must be between 0 and 7 (got {})",
                self.optimization_level
            );
        }
        Ok(())
    }

    /// Copy matched images from `cwd` to `dest`, losslessly recompressing
    /// PNGs and GIFs. JPEGs are checked and copied. An output is never larger
    /// than its input.
    fn run(&self, ctx: &StageContext<'_>) -> Result<StageReport> {
        let patterns = PatternSet::compile(&self.src)?;
        let cwd = ctx.path(&self.cwd);
        let dest = ctx.path(&self.dest);
        let mut report = StageReport::new();
        let mut saved = 0usize;
        let mut warned_progressive = false;

        for rel in patterns.expand_relative(ctx.fs, &cwd)? {
            let input = cwd.join(&rel);
            let output = dest.join(&rel);

            if !ctx.is_stale(&[input.clone()], &[output.clone()]) {
                debug!(image = %rel, "up to date");
                report.skipped += 1;
                continue;
            }

            if self.progressive && is_jpeg(&rel) && !warned_progressive {
                warn!("progressive JPEG encoding is not available; JPEGs are copied unchanged");
                warned_progressive = true;
            }

            let original = ctx.fs.read(&input)?;
            let optimized = optimize(&original, &rel, self.optimization_level)
                .with_context(|| format!("optimizing {:?}", input))?;

            let bytes = match optimized {
                Some(smaller) => {
                    saved += original.len() - smaller.len();
                    debug!(image = %rel, before = original.len(), after = smaller.len(), "recompressed");
                    smaller
                }
                None => {
                    debug!(image = %rel, "copied unchanged");
                    original
                }
            };

            ctx.fs.write(&output, &bytes)?;
            report.processed += 1;
            report.wrote(output);
        }

        info!(
            images = report.processed,
            skipped = report.skipped,
            saved_bytes = saved,
            "imagemin finished"
        );
        Ok(report)
    }
}

fn is_jpeg(rel: &str) -> bool {
    ImageFormat::from_path(rel).ok() == Some(ImageFormat::Jpeg)
}

/// Returns a smaller encoding of `bytes`, or `None` when the input should be
/// copied as is.
fn optimize(bytes: &[u8], rel: &str, level: u8) -> Result<Option<Vec<u8>>> {
    let format = ImageFormat::from_path(rel).ok();
    match format {
        Some(ImageFormat::Png) => recompress_png(bytes, level),
        Some(ImageFormat::Gif) => recompress_gif(bytes),
        Some(ImageFormat::Jpeg) => {
            // Re-encoding a JPEG is lossy; verify and copy.
            let detected = image::guess_format(bytes).context("unrecognised image data")?;
            if Some(detected) != format {
                bail!("content is {:?}, not {:?}", detected, format);
            }
            Ok(None)
        }
        _ => Ok(None),
    }
}

fn recompress_png(bytes: &[u8], level: u8) -> Result<Option<Vec<u8>>> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .context("decoding png")?;

    let compression = match level {
        0 => CompressionType::Fast,
        1 | 2 => CompressionType::Default,
        _ => CompressionType::Best,
    };

    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, compression, FilterType::Adaptive)
        .write_image(img.as_bytes(), img.width(), img.height(), img.color())
        .context("encoding png")?;

    Ok((out.len() < bytes.len()).then_some(out))
}

/// Re-encode every frame. Frames that need more than 256 colours come back
/// quantised, so the result is kept only if it decodes to the same frames.
fn recompress_gif(bytes: &[u8]) -> Result<Option<Vec<u8>>> {
    let frames = decode_gif(bytes).context("decoding gif")?;

    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut out);
        if let Some(repeat) = gif_repeat(bytes) {
            encoder.set_repeat(repeat).context("encoding gif")?;
        }
        encoder
            .encode_frames(frames.iter().cloned())
            .context("encoding gif")?;
    }

    if out.len() >= bytes.len() {
        return Ok(None);
    }
    let reencoded = decode_gif(&out).context("decoding re-encoded gif")?;
    let identical = reencoded.len() == frames.len()
        && reencoded.iter().zip(&frames).all(|(a, b)| {
            a.buffer() == b.buffer()
                && a.delay() == b.delay()
                && a.left() == b.left()
                && a.top() == b.top()
        });
    if !identical {
        debug!("gif re-encode is lossy; copying instead");
    }
    Ok(identical.then_some(out))
}

fn decode_gif(bytes: &[u8]) -> Result<Vec<Frame>> {
    let frames = GifDecoder::new(Cursor::new(bytes))?
        .into_frames()
        .collect_frames()?;
    Ok(frames)
}

/// Loop count from the NETSCAPE2.0 application extension, if present.
fn gif_repeat(bytes: &[u8]) -> Option<Repeat> {
    const NETSCAPE: &[u8] = b"NETSCAPE2.0";
    let at = bytes.windows(NETSCAPE.len()).position(|w| w == NETSCAPE)? + NETSCAPE.len();
    match bytes.get(at..at + 4)? {
        [3, 1, lo, hi] => Some(match u16::from_le_bytes([*lo, *hi]) {
            0 => Repeat::Infinite,
            n => Repeat::Finite(n),
        }),
        _ => None,
    }
}
