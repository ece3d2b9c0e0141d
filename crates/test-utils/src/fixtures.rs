#![allow(dead_code)]

use std::io::Cursor;

use image::codecs::gif::GifEncoder;
use image::{Frame, ImageOutputFormat, Rgba, RgbaImage};

/// A solid-colour PNG.
pub fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    encode(&RgbaImage::from_pixel(width, height, Rgba(rgba)))
}

/// A PNG with a two-colour diagonal split, so every pixel row differs.
pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        if x >= y {
            Rgba([200, 40, 40, 255])
        } else {
            Rgba([40, 40, 200, 255])
        }
    });
    encode(&img)
}

fn encode(img: &RgbaImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageOutputFormat::Png)
        .expect("encoding fixture png");
    buf.into_inner()
}

/// A two-frame animated GIF.
pub fn gif(width: u32, height: u32) -> Vec<u8> {
    let first = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]));
    let second = RgbaImage::from_fn(width, height, |x, _| {
        if x % 2 == 0 {
            Rgba([40, 40, 200, 255])
        } else {
            Rgba([40, 200, 40, 255])
        }
    });
    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buf);
        encoder
            .encode_frames([Frame::new(first), Frame::new(second)])
            .expect("encoding fixture gif");
    }
    buf
}

/// `gif` with a comment extension of `padding` bytes in front of the
/// trailer. Decoders skip it; a re-encode drops it.
pub fn padded_gif(width: u32, height: u32, padding: usize) -> Vec<u8> {
    let mut bytes = gif(width, height);
    let trailer = bytes.pop().expect("gif trailer");
    assert_eq!(trailer, 0x3B);
    bytes.extend_from_slice(&[0x21, 0xFE]);
    let mut left = padding;
    while left > 0 {
        let chunk = left.min(255);
        bytes.push(chunk as u8);
        bytes.extend(std::iter::repeat(b'x').take(chunk));
        left -= chunk;
    }
    bytes.push(0x00);
    bytes.push(trailer);
    bytes
}

/// A square icon with a single filled square path, in a `size` x `size`
/// viewBox.
pub fn square_icon(size: u32) -> String {
    let inset = size / 4;
    let edge = size / 2;
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {size} {size}"><path d="M{inset} {inset}h{edge}v{edge}h-{edge}z"/></svg>"#
    )
}

pub fn circle_icon(size: u32) -> String {
    let c = size / 2;
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}"><circle cx="{c}" cy="{c}" r="{c}"/></svg>"#
    )
}
