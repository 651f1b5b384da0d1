// Copyright © 2024 TinySite. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Extraction of zip archives shipped inside the asset tree.

use std::fs::{self, File};
use std::path::Path;

use log::info;
use zip::ZipArchive;

use crate::core::error::{Result, SiteError};

/// Extracts `archive` next to itself and removes it.
pub fn unzip_in_place(archive: &Path) -> Result<()> {
    let target = archive.parent().unwrap_or_else(|| Path::new("."));
    let file = File::open(archive).map_err(|e| SiteError::io_error(archive.to_path_buf(), e))?;
    let mut zip = ZipArchive::new(file).map_err(|e| {
        SiteError::asset_error("Failed to open archive", archive.to_path_buf(), Some(Box::new(e)))
    })?;
    zip.extract(target).map_err(|e| {
        SiteError::asset_error("Failed to extract archive", archive.to_path_buf(), Some(Box::new(e)))
    })?;
    fs::remove_file(archive).map_err(|e| SiteError::io_error(archive.to_path_buf(), e))?;
    info!("unzipped {}", archive.display());
    Ok(())
}

/// Extracts every archive in `archives`, given relative to `assets_dir`.
pub fn unzip_assets<S: AsRef<str>>(assets_dir: &Path, archives: &[S]) -> Result<()> {
    for archive in archives {
        unzip_in_place(&assets_dir.join(archive.as_ref()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_zip(path: &Path) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        zip.start_file("fonts/a.woff", options).unwrap();
        zip.write_all(b"font").unwrap();
        zip.start_file("readme.txt", options).unwrap();
        zip.write_all(b"hello").unwrap();
        _ = zip.finish().unwrap();
    }

    #[test]
    fn test_unzip_assets_extracts_and_removes() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("vendor")).unwrap();
        write_zip(&dir.path().join("vendor/pack.zip"));

        unzip_assets(dir.path(), &["vendor/pack.zip"]).unwrap();

        assert!(!dir.path().join("vendor/pack.zip").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("vendor/fonts/a.woff")).unwrap(),
            "font"
        );
        assert!(dir.path().join("vendor/readme.txt").is_file());
    }

    #[test]
    fn test_missing_archive_fails() {
        let dir = TempDir::new().unwrap();
        let err = unzip_assets(dir.path(), &["nope.zip"]).unwrap_err();
        assert!(matches!(err, SiteError::IOError { .. }));
    }

    #[test]
    fn test_invalid_archive_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.zip"), "not a zip").unwrap();
        let err = unzip_assets(dir.path(), &["bad.zip"]).unwrap_err();
        assert!(matches!(err, SiteError::AssetError { .. }));
        assert!(dir.path().join("bad.zip").exists());
    }
}
