// src/stages/svgpath.rs

//! SVG path data rewriting for font glyphs.
//!
//! Icon paths are drawn y-down in viewBox units; font glyphs are y-up in
//! font units. [`transform_path`] scales and flips every coordinate.

use anyhow::{bail, Result};

/// `x' = (x - min_x) * scale`, `y' = baseline - (y - min_y) * scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphTransform {
    pub scale: f64,
    pub min_x: f64,
    pub min_y: f64,
    pub baseline: f64,
}

impl GlyphTransform {
    fn x(&self, x: f64) -> f64 {
        (x - self.min_x) * self.scale
    }

    fn y(&self, y: f64) -> f64 {
        self.baseline - (y - self.min_y) * self.scale
    }

    fn dx(&self, dx: f64) -> f64 {
        dx * self.scale
    }

    fn dy(&self, dy: f64) -> f64 {
        -dy * self.scale
    }
}

/// Rewrite path data `d` into glyph coordinates.
pub fn transform_path(d: &str, t: &GlyphTransform) -> Result<String> {
    let mut cursor = Cursor::new(d);
    let mut out: Vec<String> = Vec::new();
    let mut command: Option<u8> = None;
    let mut first = true;

    loop {
        cursor.skip_separators();
        if cursor.at_end() {
            break;
        }

        if let Some(c) = cursor.command() {
            command = Some(c);
            if c == b'Z' || c == b'z' {
                out.push((c as char).to_string());
                continue;
            }
        }

        let Some(mut c) = command else {
            bail!("path data must start with a command: {d:?}");
        };
        if c == b'Z' || c == b'z' {
            bail!("unexpected number after close-path in {d:?}");
        }

        let original = c;
        // A leading relative moveto is absolute.
        if first && c == b'm' {
            c = b'M';
        }
        first = false;

        let segment = match c {
            b'M' | b'L' | b'T' => {
                let (x, y) = (cursor.number()?, cursor.number()?);
                format!("{} {} {}", c as char, fmt(t.x(x)), fmt(t.y(y)))
            }
            b'm' | b'l' | b't' => {
                let (x, y) = (cursor.number()?, cursor.number()?);
                format!("{} {} {}", c as char, fmt(t.dx(x)), fmt(t.dy(y)))
            }
            b'H' => format!("H {}", fmt(t.x(cursor.number()?))),
            b'h' => format!("h {}", fmt(t.dx(cursor.number()?))),
            b'V' => format!("V {}", fmt(t.y(cursor.number()?))),
            b'v' => format!("v {}", fmt(t.dy(cursor.number()?))),
            b'C' | b'S' | b'Q' | b'c' | b's' | b'q' => {
                let pairs = if c.eq_ignore_ascii_case(&b'C') { 3 } else { 2 };
                let mut parts = vec![(c as char).to_string()];
                for _ in 0..pairs {
                    let (x, y) = (cursor.number()?, cursor.number()?);
                    if c.is_ascii_uppercase() {
                        parts.push(fmt(t.x(x)));
                        parts.push(fmt(t.y(y)));
                    } else {
                        parts.push(fmt(t.dx(x)));
                        parts.push(fmt(t.dy(y)));
                    }
                }
                parts.join(" ")
            }
            b'A' | b'a' => {
                let rx = cursor.number()?;
                let ry = cursor.number()?;
                let rotation = cursor.number()?;
                let large_arc = cursor.flag()?;
                let sweep = cursor.flag()?;
                let (x, y) = (cursor.number()?, cursor.number()?);
                // Flipping the y axis reverses the sweep direction.
                let (ex, ey) = if c == b'A' {
                    (t.x(x), t.y(y))
                } else {
                    (t.dx(x), t.dy(y))
                };
                format!(
                    "{} {} {} {} {} {} {} {}",
                    c as char,
                    fmt(rx * t.scale),
                    fmt(ry * t.scale),
                    fmt(-rotation),
                    large_arc,
                    1 - sweep,
                    fmt(ex),
                    fmt(ey)
                )
            }
            other => bail!("unsupported path command '{}'", other as char),
        };
        out.push(segment);

        // Extra coordinate pairs after a moveto are linetos.
        command = Some(match original {
            b'M' => b'L',
            b'm' => b'l',
            other => other,
        });
    }

    Ok(out.join(" "))
}

/// Round to two decimals and drop trailing zeros.
pub fn fmt(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let s = format!("{rounded:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(d: &'a str) -> Self {
        Self {
            bytes: d.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn skip_separators(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            if b.is_ascii_whitespace() || b == b',' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn command(&mut self) -> Option<u8> {
        let b = *self.bytes.get(self.pos)?;
        if b.is_ascii_alphabetic() && b != b'e' && b != b'E' {
            self.pos += 1;
            Some(b)
        } else {
            None
        }
    }

    fn flag(&mut self) -> Result<u8> {
        self.skip_separators();
        match self.bytes.get(self.pos) {
            Some(b'0') => {
                self.pos += 1;
                Ok(0)
            }
            Some(b'1') => {
                self.pos += 1;
                Ok(1)
            }
            _ => bail!("expected arc flag at offset {}", self.pos),
        }
    }

    fn number(&mut self) -> Result<f64> {
        self.skip_separators();
        let start = self.pos;
        let bytes = self.bytes;

        if matches!(bytes.get(self.pos), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let mut seen_dot = false;
        let mut seen_digit = false;
        while let Some(&b) = bytes.get(self.pos) {
            if b.is_ascii_digit() {
                seen_digit = true;
            } else if b == b'.' && !seen_dot {
                seen_dot = true;
            } else {
                break;
            }
            self.pos += 1;
        }
        if seen_digit && matches!(bytes.get(self.pos), Some(b'e' | b'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(bytes.get(self.pos), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            let exp_start = self.pos;
            while bytes.get(self.pos).is_some_and(u8::is_ascii_digit) {
                self.pos += 1;
            }
            if self.pos == exp_start {
                self.pos = mark;
            }
        }

        if !seen_digit {
            bail!("expected number at offset {start}");
        }
        let text = std::str::from_utf8(&bytes[start..self.pos])?;
        Ok(text.parse()?)
    }
}
