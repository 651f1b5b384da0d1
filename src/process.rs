// Copyright © 2024 TinySite. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Small filesystem helpers shared by the resolver, the renderer and the
//! asset pipeline. Every failure carries the path it happened at.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::core::error::{Result, SiteError};

/// Number of hex characters kept from a content hash.
pub const VERSION_LENGTH: usize = 10;

/// Reads a file to a string.
pub fn read_content<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path)
        .map_err(|e| SiteError::io_error(path.to_path_buf(), e))
}

/// Reads and deserializes a JSON file.
pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let content = read_content(path)?;
    serde_json::from_str(&content)
        .map_err(|e| SiteError::json_error(path.to_path_buf(), e))
}

/// Writes content to a file, creating missing parent directories.
pub fn write_content<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    fs::write(path, content)
        .map_err(|e| SiteError::io_error(path.to_path_buf(), e))
}

/// `fs::create_dir_all` with the path attached to the error.
pub fn create_dir_all<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    fs::create_dir_all(path)
        .map_err(|e| SiteError::io_error(path.to_path_buf(), e))
}

/// Copies a single file, creating the target's parent directories.
pub fn copy_file(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        create_dir_all(parent)?;
    }
    _ = fs::copy(source, target)
        .map_err(|e| SiteError::io_error(source.to_path_buf(), e))?;
    Ok(())
}

/// Recursively copies `source` into `target`, merging with existing
/// content. Entries whose path equals one of `skip` are left out together
/// with everything below them.
pub fn copy_dir_all(source: &Path, target: &Path, skip: &[PathBuf]) -> Result<()> {
    create_dir_all(target)?;
    let walker = WalkDir::new(source)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let skipped = skip.iter().any(|s| s == entry.path());
            if skipped {
                debug!("ignore {}", entry.path().display());
            }
            !skipped
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            SiteError::io_error(path, e.into())
        })?;
        let relative = entry.path().strip_prefix(source).map_err(|e| {
            SiteError::internal_error(format!(
                "Failed to determine relative path: {}",
                e
            ))
        })?;
        let destination = target.join(relative);
        if entry.file_type().is_dir() {
            create_dir_all(&destination)?;
        } else {
            copy_file(entry.path(), &destination)?;
        }
    }
    Ok(())
}

/// Hex SHA-256 of a byte slice, shortened to [`VERSION_LENGTH`].
pub fn content_version(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = format!("{:x}", digest);
    hex.truncate(VERSION_LENGTH);
    hex
}

/// [`content_version`] of a file's bytes.
pub fn file_version<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let bytes =
        fs::read(path).map_err(|e| SiteError::io_error(path.to_path_buf(), e))?;
    Ok(content_version(&bytes))
}
