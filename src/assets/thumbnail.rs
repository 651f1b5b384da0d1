// Copyright © 2024 TinySite. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Thumbnail generation.
//!
//! A thumbnail is the source image scaled down to fit the requested size
//! (never up) and centered on a transparent canvas of exactly that size.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{ImageFormat, ImageReader, Rgba, RgbaImage};
use log::info;

use crate::context::ThumbnailRequest;
use crate::core::config::ImageSize;
use crate::core::error::{Result, SiteError};
use crate::process::create_dir_all;

/// Directory below the asset root that receives thumbnails.
pub const THUMBNAIL_DIR: &str = "thumbnails";

/// `<stem>_thumbnail_<w>x<h>.png`.
pub fn thumbnail_file_name(filename: &str, size: ImageSize) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(filename);
    format!("{}_thumbnail_{}.png", stem, size)
}

/// Where the thumbnail for `request` is written below `assets_dir`.
pub fn thumbnail_path(assets_dir: &Path, request: &ThumbnailRequest) -> PathBuf {
    let filename = request
        .path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let mut path = assets_dir.join(THUMBNAIL_DIR);
    if let Some(parent) = request.path.parent() {
        path.push(parent);
    }
    path.join(thumbnail_file_name(filename, request.size))
}

/// Creates one thumbnail and returns its path.
pub fn create_thumbnail(assets_dir: &Path, request: &ThumbnailRequest) -> Result<PathBuf> {
    let source = assets_dir.join(&request.path);
    let image = ImageReader::open(&source)
        .map_err(|e| SiteError::io_error(source.clone(), e))?
        .with_guessed_format()
        .map_err(|e| SiteError::io_error(source.clone(), e))?
        .decode()
        .map_err(|e| {
            SiteError::asset_error("Failed to decode image", source.clone(), Some(Box::new(e)))
        })?;

    let ImageSize { width, height } = request.size;
    let scaled = if image.width() > width || image.height() > height {
        image.resize(width, height, FilterType::Lanczos3)
    } else {
        image
    };

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 0]));
    let x = width.saturating_sub(scaled.width()) / 2;
    let y = height.saturating_sub(scaled.height()) / 2;
    imageops::replace(&mut canvas, &scaled.to_rgba8(), i64::from(x), i64::from(y));

    let output = thumbnail_path(assets_dir, request);
    if let Some(parent) = output.parent() {
        create_dir_all(parent)?;
    }
    canvas
        .save_with_format(&output, ImageFormat::Png)
        .map_err(|e| {
            SiteError::asset_error("Failed to write thumbnail", output.clone(), Some(Box::new(e)))
        })?;
    info!("created thumbnail: {}", output.display());
    Ok(output)
}

/// Creates every requested thumbnail.
pub fn create_thumbnails(assets_dir: &Path, requests: &[ThumbnailRequest]) -> Result<Vec<PathBuf>> {
    requests
        .iter()
        .map(|request| create_thumbnail(assets_dir, request))
        .collect()
}
