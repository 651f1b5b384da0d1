// Copyright © 2024 TinySite. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Renders a short text (typically a postal or mail address) into a PNG so
//! it does not appear as plain text in the published markup.

use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::{point, Font, FontVec, GlyphId, PxScale, ScaleFont};
use image::{ImageFormat, Rgb, RgbImage};
use log::info;

use crate::core::config::AddressImageSpec;
use crate::core::error::{Result, SiteError};
use crate::process::create_dir_all;

/// Offset of the first line from the top-left corner, in pixels.
const MARGIN: f32 = 1.0;

/// Parses `#rgb` or `#rrggbb`.
pub fn parse_hex_color(text: &str) -> Option<Rgb<u8>> {
    let hex = text.strip_prefix('#')?;
    let channel = |range: &str| u8::from_str_radix(range, 16).ok();
    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let value = c.to_digit(16)? as u8;
                rgb[i] = value * 17;
            }
            Some(Rgb(rgb))
        }
        6 => Some(Rgb([
            channel(hex.get(0..2)?)?,
            channel(hex.get(2..4)?)?,
            channel(hex.get(4..6)?)?,
        ])),
        _ => None,
    }
}

fn color(text: &str, path: &Path) -> Result<Rgb<u8>> {
    parse_hex_color(text).ok_or_else(|| {
        SiteError::config_error(
            format!("Invalid color `{}` in address_image", text),
            Some(path.to_path_buf()),
        )
    })
}

/// Draws `spec.text` with `font` onto a new image.
pub fn render_text(spec: &AddressImageSpec, font: &FontVec, output: &Path) -> Result<RgbImage> {
    let background = color(&spec.background_color, output)?;
    let foreground = color(&spec.text_color, output)?;
    let (width, height) = (spec.image_size.width, spec.image_size.height);
    let mut image = RgbImage::from_pixel(width, height, background);

    let scale = PxScale::from(spec.font_size);
    let scaled = font.as_scaled(scale);
    let mut baseline = MARGIN + scaled.ascent();

    for line in spec.text.lines() {
        let mut x = MARGIN;
        let mut previous: Option<GlyphId> = None;
        for c in line.chars() {
            let id = scaled.glyph_id(c);
            if let Some(previous) = previous {
                x += scaled.kern(previous, id);
            }
            previous = Some(id);
            let glyph = id.with_scale_and_position(scale, point(x, baseline));
            x += scaled.h_advance(id);

            let Some(outline) = font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outline.px_bounds();
            outline.draw(|gx, gy, coverage| {
                let px = bounds.min.x as i64 + i64::from(gx);
                let py = bounds.min.y as i64 + i64::from(gy);
                if px < 0 || py < 0 || px >= i64::from(width) || py >= i64::from(height) {
                    return;
                }
                let pixel = image.get_pixel_mut(px as u32, py as u32);
                *pixel = blend(*pixel, foreground, coverage.clamp(0.0, 1.0));
            });
        }
        baseline += scaled.height() + scaled.line_gap();
    }
    Ok(image)
}

fn blend(background: Rgb<u8>, foreground: Rgb<u8>, alpha: f32) -> Rgb<u8> {
    let mix = |b: u8, f: u8| (f32::from(b) * (1.0 - alpha) + f32::from(f) * alpha).round() as u8;
    Rgb([
        mix(background[0], foreground[0]),
        mix(background[1], foreground[1]),
        mix(background[2], foreground[2]),
    ])
}

/// Loads the font relative to `root`, renders the text and saves it as
/// `assets_dir/images/<filename>`.
pub fn generate_address_image(spec: &AddressImageSpec, root: &Path, assets_dir: &Path) -> Result<PathBuf> {
    let font_path = root.join(&spec.font);
    let bytes = fs::read(&font_path).map_err(|e| SiteError::io_error(font_path.clone(), e))?;
    let font = FontVec::try_from_vec(bytes).map_err(|e| {
        SiteError::asset_error("Invalid font file", font_path.clone(), Some(Box::new(e)))
    })?;

    let output = assets_dir.join("images").join(&spec.filename);
    let image = render_text(spec, &font, &output)?;
    if let Some(parent) = output.parent() {
        create_dir_all(parent)?;
    }
    image
        .save_with_format(&output, ImageFormat::Png)
        .map_err(|e| {
            SiteError::asset_error("Failed to write address image", output.clone(), Some(Box::new(e)))
        })?;
    info!("created address image: {}", output.display());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ImageSize;
    use tempfile::TempDir;

    fn spec() -> AddressImageSpec {
        serde_json::from_value(serde_json::json!({"text": "Main Street 1"})).unwrap()
    }

    #[test]
    fn test_spec_defaults() {
        let spec = spec();
        assert_eq!(spec.image_size, ImageSize::new(100, 200));
        assert_eq!(spec.text_color, "#000000");
        assert_eq!(spec.background_color, "#ffffff");
        assert_eq!(spec.font, PathBuf::from("Ubuntu-R.ttf"));
        assert_eq!(spec.font_size, 15.0);
        assert_eq!(spec.filename, "a_image.png");
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ffffff"), Some(Rgb([255, 255, 255])));
        assert_eq!(parse_hex_color("#0a0B0c"), Some(Rgb([10, 11, 12])));
        assert_eq!(parse_hex_color("#f00"), Some(Rgb([255, 0, 0])));
        assert_eq!(parse_hex_color("ffffff"), None);
        assert_eq!(parse_hex_color("#ggg"), None);
        assert_eq!(parse_hex_color("#12345"), None);
    }

    #[test]
    fn test_blend() {
        let white = Rgb([255, 255, 255]);
        let black = Rgb([0, 0, 0]);
        assert_eq!(blend(white, black, 0.0), white);
        assert_eq!(blend(white, black, 1.0), black);
        assert_eq!(blend(white, black, 0.5), Rgb([128, 128, 128]));
    }

    #[test]
    fn test_missing_font_fails() {
        let dir = TempDir::new().unwrap();
        let err = generate_address_image(&spec(), dir.path(), dir.path()).unwrap_err();
        assert!(matches!(err, SiteError::IOError { .. }));
    }

    #[test]
    fn test_invalid_font_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Ubuntu-R.ttf"), "not a font").unwrap();
        let err = generate_address_image(&spec(), dir.path(), dir.path()).unwrap_err();
        assert!(matches!(err, SiteError::AssetError { .. }));
    }
}
