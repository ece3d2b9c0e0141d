// src/stages/webfont.rs

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::options::{
    WebfontOptions, FROZEN_ASCENT, FROZEN_DESCENT, FROZEN_FONT_HEIGHT,
};
use crate::exec::command::run_shell;
use crate::files::PatternSet;
use crate::stages::svgpath::{self, GlyphTransform};
use crate::stages::{template, Stage, StageContext, StageReport};

const DEFAULT_TEMPLATE: &str = include_str!("templates/icon-font.scss.jinja");

static VIEW_BOX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<svg\b[^>]*?\bviewBox\s*=\s*["']([^"']+)["']"#).expect("static regex")
});
static SVG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<svg\b[^>]*>").expect("static regex"));
static SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(path|rect|circle|ellipse|polygon|polyline)\b([^>]*)>").expect("static regex")
});
static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([\w:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("static regex")
});

/// One glyph of the generated font.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Glyph {
    pub name: String,
    /// Lowercase hex without prefix, as used in CSS escapes (`b1`).
    pub codepoint: String,
    #[serde(skip)]
    pub code: u32,
    #[serde(skip)]
    pub advance: u32,
    #[serde(skip)]
    pub path: String,
}

#[derive(Debug, Serialize)]
struct FontSource {
    url: String,
    format: &'static str,
}

#[derive(Debug, Serialize)]
struct FontMetadata<'a> {
    font: &'a str,
    start_codepoint: u32,
    glyphs: Vec<GlyphMetadata<'a>>,
}

#[derive(Debug, Serialize)]
struct GlyphMetadata<'a> {
    name: &'a str,
    codepoint: u32,
    unicode: String,
}

impl Stage for WebfontOptions {
    fn validate(&self) -> Result<()> {
        PatternSet::compile(&[&self.src])?;

        let frozen = (FROZEN_FONT_HEIGHT, FROZEN_ASCENT, FROZEN_DESCENT);
        if (self.font_height, self.ascent, self.descent) != frozen && !self.unlock_metrics {
            bail!(
                "font metrics are frozen at font_height={}, ascent={}, descent={} (got {}, {}, {}); \
                 changing them shifts every glyph, set `unlock_metrics = true` to override",
                frozen.0,
                frozen.1,
                frozen.2,
                self.font_height,
                self.ascent,
                self.descent
            );
        }
        if self.font_height == 0 {
            bail!("`font_height` must be positive");
        }
        if char::from_u32(self.start_codepoint).is_none() {
            bail!("`start_codepoint` {:#x} is not a valid code point", self.start_codepoint);
        }
        for format in &self.formats {
            font_format(format)?;
        }
        if self.font.is_empty() || self.font.contains(['/', '\\']) {
            bail!("`font` must be a plain file name (got '{}')", self.font);
        }
        Ok(())
    }

    /// Build `<font>.svg`, `<font>.json` and the stylesheet partial from the
    /// matched icons, then hand the SVG font to `converter` for every other
    /// format.
    fn run(&self, ctx: &StageContext<'_>) -> Result<StageReport> {
        let icons = PatternSet::compile(&[&self.src])?.expand(ctx.fs, ctx.root())?;
        let mut report = StageReport::new();

        if icons.is_empty() {
            warn!(src = %self.src, "no icons matched; font not generated");
            return Ok(report);
        }

        let dest = ctx.path(&self.dest);
        let svg_path = dest.join(format!("{}.svg", self.font));
        let json_path = dest.join(format!("{}.json", self.font));
        let partial_path = ctx.path(&self.dest_css).join(self.partial_file_name());

        let outputs = [svg_path.clone(), json_path.clone(), partial_path.clone()];
        if !ctx.is_stale(&icons, &outputs) {
            info!(font = %self.font, "icon font up to date");
            report.skipped = icons.len();
            return Ok(report);
        }

        let glyphs = self.build_glyphs(ctx, &icons)?;

        ctx.fs.write(&svg_path, self.svg_font(&glyphs).as_bytes())?;
        report.wrote(svg_path.clone());
        ctx.fs.write(&json_path, self.metadata(&glyphs)?.as_bytes())?;
        report.wrote(json_path);

        let mut produced = vec!["svg"];
        for format in self.formats.iter().filter(|f| f.as_str() != "svg") {
            match &self.converter {
                Some(converter) => {
                    let target = dest.join(format!("{}.{}", self.font, format));
                    let command = converter
                        .replace("{svg}", &svg_path.display().to_string())
                        .replace("{dest}", &dest.display().to_string())
                        .replace("{font}", &self.font)
                        .replace("{format}", format);
                    run_shell(&command, ctx.root())
                        .with_context(|| format!("converting {} to {format}", self.font))?;
                    if !ctx.fs.exists(&target) {
                        bail!("converter did not produce {:?}", target);
                    }
                    report.wrote(target);
                    produced.push(format.as_str());
                }
                None => warn!(format = %format, "no converter configured; format skipped"),
            }
        }

        let partial = self.stylesheet(ctx, &glyphs, &produced)?;
        ctx.fs.write(&partial_path, partial.as_bytes())?;
        report.wrote(partial_path);

        report.processed = glyphs.len();
        info!(font = %self.font, glyphs = glyphs.len(), formats = ?produced, "icon font generated");
        Ok(report)
    }
}

impl WebfontOptions {
    fn partial_file_name(&self) -> String {
        if self.partial_prefix {
            format!("_{}.{}", self.font, self.stylesheet)
        } else {
            format!("{}.{}", self.font, self.stylesheet)
        }
    }

    /// Icons are ordered by file name; codepoints are assigned in that order.
    pub fn build_glyphs(&self, ctx: &StageContext<'_>, icons: &[PathBuf]) -> Result<Vec<Glyph>> {
        let mut ordered: Vec<(String, &PathBuf)> = icons
            .iter()
            .map(|path| Ok((glyph_name(path)?, path)))
            .collect::<Result<_>>()?;
        ordered.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

        let mut seen = HashSet::new();
        let mut glyphs = Vec::with_capacity(ordered.len());

        for (index, (name, path)) in ordered.into_iter().enumerate() {
            if !seen.insert(name.clone()) {
                bail!("two icons map to the glyph name '{name}'");
            }
            let code = self.start_codepoint + index as u32;
            if char::from_u32(code).is_none() {
                bail!("code point {code:#x} for '{name}' is not a valid character");
            }

            let source = ctx.fs.read_to_string(path)?;
            let (advance, glyph_path) = self
                .glyph_outline(&source)
                .with_context(|| format!("reading icon {:?}", path))?;
            debug!(glyph = %name, codepoint = code, "glyph");

            glyphs.push(Glyph {
                name,
                codepoint: format!("{code:x}"),
                code,
                advance,
                path: glyph_path,
            });
        }

        Ok(glyphs)
    }

    fn glyph_outline(&self, svg: &str) -> Result<(u32, String)> {
        let (min_x, min_y, width, height) = view_box(svg)?;
        let scale = if self.normalize {
            f64::from(self.font_height) / height
        } else {
            1.0
        };
        let transform = GlyphTransform {
            scale,
            min_x,
            min_y,
            baseline: f64::from(self.ascent),
        };

        let mut parts = Vec::new();
        for d in shape_paths(svg)? {
            parts.push(svgpath::transform_path(&d, &transform)?);
        }
        if parts.is_empty() {
            bail!("icon contains no drawable shapes");
        }

        Ok(((width * scale).round() as u32, parts.join(" ")))
    }

    fn svg_font(&self, glyphs: &[Glyph]) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" standalone=\"no\"?>\n");
        out.push_str("<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n");
        out.push_str("<svg xmlns=\"http://www.w3.org/2000/svg\">\n<defs>\n");
        let _ = writeln!(
            out,
            "<font id=\"{}\" horiz-adv-x=\"{}\">",
            self.font, self.font_height
        );
        let _ = writeln!(
            out,
            "<font-face font-family=\"{}\" units-per-em=\"{}\" ascent=\"{}\" descent=\"{}\"/>",
            self.font,
            self.font_height,
            self.ascent,
            -i64::from(self.descent)
        );
        out.push_str("<missing-glyph horiz-adv-x=\"0\"/>\n");
        for glyph in glyphs {
            let _ = writeln!(
                out,
                "<glyph glyph-name=\"{}\" unicode=\"&#x{};\" horiz-adv-x=\"{}\" d=\"{}\"/>",
                glyph.name, glyph.codepoint, glyph.advance, glyph.path
            );
        }
        out.push_str("</font>\n</defs>\n</svg>\n");
        out
    }

    fn metadata(&self, glyphs: &[Glyph]) -> Result<String> {
        let metadata = FontMetadata {
            font: &self.font,
            start_codepoint: self.start_codepoint,
            glyphs: glyphs
                .iter()
                .map(|g| GlyphMetadata {
                    name: &g.name,
                    codepoint: g.code,
                    unicode: format!("\\{}", g.codepoint),
                })
                .collect(),
        };
        let mut json = serde_json::to_string_pretty(&metadata)?;
        json.push('\n');
        Ok(json)
    }

    fn stylesheet(&self, ctx: &StageContext<'_>, glyphs: &[Glyph], produced: &[&str]) -> Result<String> {
        let (name, source) = match &self.template {
            Some(path) => {
                let path = ctx.path(path);
                (path.display().to_string(), ctx.fs.read_to_string(&path)?)
            }
            None => ("icon-font.scss".to_string(), DEFAULT_TEMPLATE.to_string()),
        };

        let url = |ext: &str| format!("{}{}.{}", self.relative_font_path, self.font, ext);
        let mut eot = None;
        let mut sources = Vec::new();
        for format in self.formats.iter().filter(|f| produced.contains(&f.as_str())) {
            let css_format = font_format(format)?;
            let href = match format.as_str() {
                "eot" => {
                    eot = Some(url("eot"));
                    format!("{}?#iefix", url("eot"))
                }
                "svg" => format!("{}#{}", url("svg"), self.font),
                other => url(other),
            };
            sources.push(FontSource {
                url: href,
                format: css_format,
            });
        }

        template::render(
            &name,
            &source,
            minijinja::context! {
                font => &self.font,
                prefix => &self.class_prefix,
                glyphs => glyphs,
                sources => sources,
                eot => eot,
            },
        )
    }
}

fn font_format(format: &str) -> Result<&'static str> {
    Ok(match format {
        "eot" => "embedded-opentype",
        "svg" => "svg",
        "woff" => "woff",
        "woff2" => "woff2",
        "ttf" => "truetype",
        other => bail!("unknown font format '{other}'"),
    })
}

fn glyph_name(path: &Path) -> Result<String> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("icon path {:?} has no usable file name", path))?;
    Ok(stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect())
}

/// `(min_x, min_y, width, height)` from `viewBox`, or from `width`/`height`.
fn view_box(svg: &str) -> Result<(f64, f64, f64, f64)> {
    if let Some(caps) = VIEW_BOX.captures(svg) {
        let values: Vec<f64> = caps[1]
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(str::parse::<f64>)
            .collect::<std::result::Result<_, _>>()
            .context("malformed viewBox")?;
        if let &[x, y, w, h] = values.as_slice() {
            if w > 0.0 && h > 0.0 {
                return Ok((x, y, w, h));
            }
        }
        bail!("malformed viewBox '{}'", &caps[1]);
    }

    let tag = SVG_TAG
        .find(svg)
        .context("no <svg> element found")?
        .as_str();
    let width = attr(tag, "width").and_then(|v| parse_length(&v));
    let height = attr(tag, "height").and_then(|v| parse_length(&v));
    match (width, height) {
        (Some(w), Some(h)) if w > 0.0 && h > 0.0 => Ok((0.0, 0.0, w, h)),
        _ => bail!("icon has neither a viewBox nor a width and height"),
    }
}

fn parse_length(value: &str) -> Option<f64> {
    value.trim().trim_end_matches("px").parse().ok()
}

fn attr(tag: &str, name: &str) -> Option<String> {
    ATTR.captures_iter(tag)
        .find(|caps| &caps[1] == name)
        .map(|caps| caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str()).to_string())
}

fn num(tag: &str, name: &str) -> f64 {
    attr(tag, name).and_then(|v| parse_length(&v)).unwrap_or(0.0)
}

/// Path data of every supported shape, in document order.
fn shape_paths(svg: &str) -> Result<Vec<String>> {
    let mut paths = Vec::new();
    for caps in SHAPE.captures_iter(svg) {
        let attrs = &caps[2];
        if attr(attrs, "transform").is_some() {
            warn!(element = &caps[1], "transform attributes are ignored");
        }
        let d = match &caps[1] {
            "path" => attr(attrs, "d").unwrap_or_default(),
            "rect" => {
                let (x, y) = (num(attrs, "x"), num(attrs, "y"));
                let (w, h) = (num(attrs, "width"), num(attrs, "height"));
                format!("M{x} {y}H{}V{}H{x}Z", x + w, y + h)
            }
            "circle" | "ellipse" => {
                let (cx, cy) = (num(attrs, "cx"), num(attrs, "cy"));
                let (rx, ry) = if &caps[1] == "circle" {
                    let r = num(attrs, "r");
                    (r, r)
                } else {
                    (num(attrs, "rx"), num(attrs, "ry"))
                };
                format!(
                    "M{} {cy}A{rx} {ry} 0 1 0 {} {cy}A{rx} {ry} 0 1 0 {} {cy}Z",
                    cx - rx,
                    cx + rx,
                    cx - rx
                )
            }
            shape => {
                let points = attr(attrs, "points").unwrap_or_default();
                let close = if shape == "polygon" { "Z" } else { "" };
                format!("M{points}{close}")
            }
        };
        if !d.trim().is_empty() {
            paths.push(d);
        }
    }
    Ok(paths)
}
