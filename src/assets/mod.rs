// Copyright © 2024 TinySite. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Asset Pipeline
//!
//! Every step that produces or publishes files other than rendered pages:
//!
//! - server meta files picked by branch (`.htaccess`, `.htpasswd`, `form.php`);
//! - Sass compilation and the address image, written into the source tree;
//! - thumbnails requested while rendering, also written into the source tree;
//! - the copy of `source/assets` and of per-page upload directories;
//! - extraction of bundled zip archives.

/// Text rendered to an image.
pub mod address_image;
/// Zip extraction.
pub mod archive;
/// CSS and JS minifiers.
pub mod minify;
/// Calls to the external Sass compiler.
pub mod sass;
/// Thumbnail generation.
pub mod thumbnail;

use std::path::PathBuf;

use log::{info, warn};

use crate::content::ContentMap;
use crate::context::BuildContext;
use crate::core::error::Result;
use crate::process::{copy_dir_all, copy_file, create_dir_all};

/// Subdirectory of the output asset directory receiving page uploads.
pub const UPLOADS_DIR: &str = "uploads";

/// Runs the asset steps of a build against one [`BuildContext`].
#[derive(Debug, Clone, Copy)]
pub struct AssetPipeline<'a> {
    context: &'a BuildContext,
}

impl<'a> AssetPipeline<'a> {
    /// Creates a pipeline for the given run.
    pub fn new(context: &'a BuildContext) -> Self {
        Self { context }
    }

    /// Copies the branch's `.htaccess`/`.htpasswd` and `form.php` from
    /// `source/meta` to the output root. Missing files are skipped.
    pub fn copy_meta_files(&self) -> Result<Vec<PathBuf>> {
        let paths = &self.context.paths;
        let meta_dir = paths.meta_dir();
        let mut pairs = Vec::new();
        if let Some(branch) = &self.context.metadata.settings.branch {
            pairs.push((format!(".htaccess_{}", branch), ".htaccess"));
            pairs.push((format!(".htpasswd_{}", branch), ".htpasswd"));
        }
        pairs.push(("form.php".to_string(), "form.php"));

        let mut copied = Vec::new();
        for (source, target) in pairs {
            let source = meta_dir.join(source);
            if !source.is_file() {
                continue;
            }
            let target = paths.output_dir.join(target);
            info!("copy meta file from {} to {}", source.display(), target.display());
            copy_file(&source, &target)?;
            copied.push(target);
        }
        Ok(copied)
    }

    /// Compiles the configured Sass entry file.
    pub fn compile_sass(&self) -> Result<()> {
        let settings = &self.context.metadata.settings;
        let Some(sass_file) = &settings.sass_file else {
            warn!("sass requested but meta.json has no sass_file");
            return Ok(());
        };
        let paths = &self.context.paths;
        let (input, output) =
            sass::sass_paths(&paths.root, &paths.source_dir, sass_file, &settings.sass_output);
        sass::compile_sass(&input, &output)
    }

    /// Renders the configured address image into the source assets.
    pub fn generate_address_image(&self) -> Result<Option<PathBuf>> {
        let Some(spec) = &self.context.metadata.settings.address_image else {
            warn!("address_image requested but meta.json has no address_image section");
            return Ok(None);
        };
        let paths = &self.context.paths;
        address_image::generate_address_image(spec, &paths.root, &paths.source_assets_dir())
            .map(Some)
    }

    /// Creates every thumbnail registered while rendering.
    pub fn create_thumbnails(&self) -> Result<Vec<PathBuf>> {
        let requests = self.context.state.thumbnails();
        thumbnail::create_thumbnails(&self.context.paths.source_assets_dir(), &requests)
    }

    /// Copies `source/assets` to the output, leaving out `skip_assets`
    /// when the run asked for it.
    pub fn copy_assets(&self) -> Result<()> {
        let paths = &self.context.paths;
        let source = paths.source_assets_dir();
        let target = paths.output_assets_dir();
        create_dir_all(&target)?;
        if !source.is_dir() {
            warn!("no asset directory at {}", source.display());
            return Ok(());
        }

        let skip: Vec<PathBuf> = if self.context.options.skip_copy {
            self.context
                .metadata
                .settings
                .skip_assets
                .iter()
                .map(|dir| source.join(dir))
                .collect()
        } else {
            Vec::new()
        };
        copy_dir_all(&source, &target, &skip)
    }

    /// Copies `content/<origin>/assets` to `assets/uploads/<origin>` for
    /// every entry with `assets: true`.
    pub fn copy_uploads(&self, content: &ContentMap) -> Result<()> {
        let paths = &self.context.paths;
        let uploads = paths.output_assets_dir().join(UPLOADS_DIR);
        for (_, entry) in content.iter().filter(|(_, entry)| entry.assets) {
            let source = paths.content_dir().join(&entry.route_origin).join("assets");
            let target = uploads.join(&entry.route_origin);
            copy_dir_all(&source, &target, &[])?;
        }
        Ok(())
    }

    /// Extracts `unzip_assets` inside the output asset directory.
    pub fn unzip_assets(&self) -> Result<()> {
        archive::unzip_assets(
            &self.context.paths.output_assets_dir(),
            &self.context.metadata.settings.unzip_assets,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Resolver;
    use crate::core::config::{BuildOptions, Metadata, SitePaths};
    use serde_json::{json, Map, Value as JsonValue};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn context(root: &Path, options: BuildOptions, extra: JsonValue) -> BuildContext {
        let mut values: Map<String, JsonValue> =
            serde_json::from_value(json!({"baseurl": "/", "title": "Site"})).unwrap();
        if let JsonValue::Object(extra) = extra {
            values.extend(extra);
        }
        let metadata = Metadata::from_values(values).unwrap();
        BuildContext::new(options, SitePaths::new(root), metadata)
    }

    fn touch(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_copy_meta_files_by_branch() {
        let dir = TempDir::new().unwrap();
        let meta = dir.path().join("source/meta");
        touch(&meta.join(".htaccess_live"), "live");
        touch(&meta.join(".htaccess_dev"), "dev");
        touch(&meta.join("form.php"), "<?php");

        let ctx = context(dir.path(), BuildOptions::default(), json!({"branch": "live"}));
        let copied = AssetPipeline::new(&ctx).copy_meta_files().unwrap();

        assert_eq!(copied.len(), 2);
        let out = dir.path().join("compiled");
        assert_eq!(fs::read_to_string(out.join(".htaccess")).unwrap(), "live");
        assert!(out.join("form.php").is_file());
        assert!(!out.join(".htpasswd").exists());
    }

    #[test]
    fn test_copy_assets_honours_skip_copy() {
        let dir = TempDir::new().unwrap();
        let assets = dir.path().join("source/assets");
        touch(&assets.join("css/site.css"), "a{}");
        touch(&assets.join("js/app.js"), "x");
        touch(&assets.join("images/logo.png"), "png");

        let ctx = context(dir.path(), BuildOptions::default(), json!({}));
        AssetPipeline::new(&ctx).copy_assets().unwrap();
        let out = dir.path().join("compiled/assets");
        assert!(out.join("css/site.css").is_file());

        let skip_dir = TempDir::new().unwrap();
        let assets = skip_dir.path().join("source/assets");
        touch(&assets.join("css/site.css"), "a{}");
        touch(&assets.join("js/app.js"), "x");
        touch(&assets.join("images/logo.png"), "png");
        let options = BuildOptions::from_tokens(["skip_copy"]);
        let ctx = context(skip_dir.path(), options, json!({}));
        AssetPipeline::new(&ctx).copy_assets().unwrap();
        let out = skip_dir.path().join("compiled/assets");
        assert!(!out.join("css").exists());
        assert!(!out.join("js").exists());
        assert!(out.join("images/logo.png").is_file());
    }

    #[test]
    fn test_missing_asset_dir_is_skipped() {
        let dir = TempDir::new().unwrap();
        let ctx = context(dir.path(), BuildOptions::default(), json!({}));
        AssetPipeline::new(&ctx).copy_assets().unwrap();
        assert!(dir.path().join("compiled/assets").is_dir());
    }

    #[test]
    fn test_copy_uploads() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("source/content/menu/assets/menu.pdf"), "pdf");

        let mut resolver = Resolver::new(dir.path().join("source/content"));
        let page = serde_json::from_value(
            json!({"title": "Menu", "template": "m.html", "assets": true}),
        )
        .unwrap();
        _ = resolver.resolve_root(page, "menu").unwrap();
        let content = resolver.finish();

        let ctx = context(dir.path(), BuildOptions::default(), json!({}));
        AssetPipeline::new(&ctx).copy_uploads(&content).unwrap();
        assert!(dir
            .path()
            .join("compiled/assets/uploads/menu/menu.pdf")
            .is_file());
    }

    #[test]
    fn test_optional_steps_without_settings_are_noops() {
        let dir = TempDir::new().unwrap();
        let ctx = context(dir.path(), BuildOptions::default(), json!({}));
        let pipeline = AssetPipeline::new(&ctx);
        pipeline.compile_sass().unwrap();
        assert!(pipeline.generate_address_image().unwrap().is_none());
        assert!(pipeline.create_thumbnails().unwrap().is_empty());
        pipeline.unzip_assets().unwrap();
    }
}
