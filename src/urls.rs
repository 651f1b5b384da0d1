// Copyright © 2024 TinySite. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # URL and Asset Helpers
//!
//! The functions templates call to link pages and assets. They are plain
//! methods on [`SiteUrls`]; the template module wraps each one in a
//! Handlebars helper.
//!
//! Two helpers have side effects on the run state:
//!
//! - [`SiteUrls::image_url_for`] registers pending thumbnails;
//! - [`SiteUrls::js_css_url_for`] writes packed bundles into the output
//!   asset directory the first time a file list is requested.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};

use crate::assets::minify::{minify_css, minify_js};
use crate::assets::thumbnail::thumbnail_file_name;
use crate::content::{ContentMap, EntryId};
use crate::context::{BuildContext, BundleKind, ThumbnailRequest};
use crate::core::config::ImageSize;
use crate::core::error::{Result, SiteError};
use crate::process::{
    content_version, copy_dir_all, create_dir_all, file_version, read_content,
    write_content,
};

/// Default `filename` of [`SiteUrls::url_for`].
pub const INDEX_FILE: &str = "index.html";

/// Image extensions accepted by [`SiteUrls::image_url_for`].
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpeg", "jpg"];

/// Prefix rewritten by [`SiteUrls::parse_url`].
const ASSETS_SCHEME: &str = "assets:";

/// Thumbnail selection for [`SiteUrls::image_url_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Thumbnail {
    /// Link the original image.
    Off,
    /// Link a thumbnail of the configured default size.
    Default,
    /// Link a thumbnail of the given size.
    Size(ImageSize),
}

/// URL builder bound to one run.
#[derive(Debug, Clone)]
pub struct SiteUrls {
    context: Arc<BuildContext>,
    content: Arc<ContentMap>,
    pulled: Arc<HashSet<String>>,
}

impl SiteUrls {
    /// Binds the helpers to a run and its resolved content.
    pub fn new(context: Arc<BuildContext>, content: Arc<ContentMap>) -> Self {
        let pulled = content
            .iter()
            .filter_map(|(_, entry)| entry.pulled.clone())
            .collect();
        Self {
            context,
            content,
            pulled: Arc::new(pulled),
        }
    }

    /// The run this builder belongs to.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// URL of a page.
    ///
    /// Links to a `no_render` entry follow its `forward` chain; without a
    /// forward the route must be some entry's `pulled` alias.
    pub fn url_for(&self, route: &str, filename: Option<&str>) -> Result<String> {
        let target = self.link_target(route)?;
        let filename = filename.unwrap_or(INDEX_FILE);
        let base = self.context.base_url();
        if filename == INDEX_FILE && !self.context.metadata.settings.add_index_html {
            Ok(join_url(base, [target]))
        } else {
            Ok(join_url(base, [target, filename]))
        }
    }

    fn link_target<'a>(&'a self, route: &'a str) -> Result<&'a str> {
        let mut current = route;
        let mut visited = HashSet::new();
        loop {
            let entry = self.content.get(current).ok_or_else(|| {
                SiteError::validation("route not found in content", Some(current))
            })?;
            if !entry.no_render {
                return Ok(current);
            }
            match entry.forward.as_deref() {
                Some(forward) => {
                    if !visited.insert(current) {
                        return Err(SiteError::validation(
                            "forward chain loops",
                            Some(route),
                        ));
                    }
                    current = forward;
                }
                None if self.pulled.contains(current) => return Ok(current),
                None => {
                    return Err(SiteError::validation(
                        "route flagged as no_render",
                        Some(current),
                    ))
                }
            }
        }
    }

    /// URL of a file or directory below the asset directory, optionally
    /// with a `?v=<hash>` query computed from the source file.
    pub fn assets_url_for(
        &self,
        segments: &[String],
        filename: Option<&str>,
        md5: bool,
    ) -> Result<String> {
        let assets_url = self.context.assets_url();
        let Some(filename) = filename else {
            if md5 {
                return Err(SiteError::validation(
                    "assets_url_for needs a filename to compute a version",
                    None,
                ));
            }
            return Ok(join_url(&assets_url, segments));
        };

        let mut url = join_url(
            &assets_url,
            segments.iter().map(String::as_str).chain([filename]),
        );
        if md5 {
            let source = join_path(&self.context.paths.source_assets_dir(), segments)
                .join(filename);
            url.push_str("?v=");
            url.push_str(&file_version(source)?);
        }
        Ok(url)
    }

    /// URL of an image or of a thumbnail of it.
    ///
    /// Requesting a thumbnail registers it for generation after rendering.
    pub fn image_url_for(
        &self,
        segments: &[String],
        filename: &str,
        thumbnail: Thumbnail,
    ) -> Result<String> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        if !IMAGE_EXTENSIONS.contains(&extension) {
            return Err(SiteError::validation(
                format!("`{}` is not a png or jpeg image", filename),
                None,
            ));
        }

        let assets_url = self.context.assets_url();
        let size = match thumbnail {
            Thumbnail::Off => {
                return Ok(join_url(
                    &assets_url,
                    segments.iter().map(String::as_str).chain([filename]),
                ))
            }
            Thumbnail::Default => self.context.metadata.settings.thumbnail_size,
            Thumbnail::Size(size) => size,
        };
        if size.is_empty() {
            return Err(SiteError::validation(
                format!("thumbnail size {} of `{}` has a zero side", size, filename),
                None,
            ));
        }

        self.context.state.request_thumbnail(ThumbnailRequest {
            path: join_path(Path::new(""), segments).join(filename),
            size,
        });
        let name = thumbnail_file_name(filename, size);
        Ok(join_url(
            &assets_url,
            ["thumbnails"]
                .into_iter()
                .chain(segments.iter().map(String::as_str))
                .chain([name.as_str()]),
        ))
    }

    /// Cache-busted URL of the packed bundle of `files`.
    ///
    /// Files are read from `assets/<kind>/` in the source tree. Directories
    /// are copied to the output as they are; files are minified unless
    /// their name ends in `.min.<ext>`, then joined with newlines.
    pub fn js_css_url_for(&self, files: &[String], kind: BundleKind) -> Result<String> {
        self.context
            .state
            .bundle_url(kind, files, |ordinal| self.write_bundle(files, kind, ordinal))
    }

    fn write_bundle(&self, files: &[String], kind: BundleKind, ordinal: usize) -> Result<String> {
        let paths = &self.context.paths;
        let source_dir = paths.source_assets_dir().join(kind.as_str());
        let output_dir = paths.output_assets_dir().join(kind.as_str());
        create_dir_all(&output_dir)?;

        let mut parts = Vec::with_capacity(files.len());
        for file in files {
            let source = source_dir.join(file);
            if source.is_dir() {
                copy_dir_all(&source, &output_dir.join(file), &[])?;
                continue;
            }
            let text = read_content(&source)?;
            if is_pre_minified(file) {
                parts.push(text);
                continue;
            }
            let minified = match kind {
                BundleKind::Css => minify_css(&text),
                BundleKind::Js => minify_js(&text),
            };
            match minified {
                Some(minified) => parts.push(minified),
                None => {
                    warn!("could not minify {}, using it as is", source.display());
                    parts.push(text);
                }
            }
        }

        let name = bundle_file_name(kind, ordinal);
        let output = output_dir.join(&name);
        let bundle = parts.join("\n");
        write_content(&output, bundle.as_bytes())?;
        info!("{}", output.display());

        let mut url = join_url(&self.context.assets_url(), [kind.as_str(), name.as_str()]);
        url.push_str("?v=");
        url.push_str(&content_version(bundle.as_bytes()));
        Ok(url)
    }

    /// Page title followed by its ancestors' titles and the site title.
    pub fn build_title(&self, id: EntryId) -> String {
        let settings = &self.context.metadata.settings;
        let chain = self.content.title_chain(id);
        format!(
            "{} | {}",
            chain.join(&settings.title_separator),
            settings.title
        )
    }

    /// [`SiteUrls::build_title`] of the entry at `route`.
    pub fn build_title_for_route(&self, route: &str) -> Result<String> {
        let id = self.content.id_of(route).ok_or_else(|| {
            SiteError::validation("route not found in content", Some(route))
        })?;
        Ok(self.build_title(id))
    }

    /// Rewrites `assets:<path>` to a URL below the asset directory.
    pub fn parse_url(&self, text: &str) -> String {
        match text.strip_prefix(ASSETS_SCHEME) {
            Some(rest) => join_url(&self.context.assets_url(), [rest]),
            None => text.to_string(),
        }
    }
}

/// `true` when `candidate` is the active route or one of its prefixes.
pub fn is_active_route(active: &str, candidate: &str) -> bool {
    active.starts_with(candidate)
}

/// Host part of a URL without a leading `www.`.
pub fn base_domain(text: &str) -> Result<String> {
    let parsed = url::Url::parse(text).map_err(|e| {
        SiteError::validation(format!("invalid URL `{}`: {}", text, e), None)
    })?;
    let host = parsed.host_str().unwrap_or_default();
    Ok(host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// Joins URL parts with single slashes, skipping empty parts.
pub fn join_url<I, S>(base: &str, parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut url = base.to_string();
    for part in parts {
        let part = part.as_ref().trim_matches('/');
        if part.is_empty() {
            continue;
        }
        if !url.is_empty() && !url.ends_with('/') {
            url.push('/');
        }
        url.push_str(part);
    }
    url
}

fn join_path(base: &Path, segments: &[String]) -> PathBuf {
    segments
        .iter()
        .filter(|segment| !segment.is_empty())
        .fold(base.to_path_buf(), |path, segment| path.join(segment))
}

fn is_pre_minified(filename: &str) -> bool {
    let parts: Vec<&str> = filename.split('.').collect();
    parts.len() >= 2 && parts[parts.len() - 2] == "min"
}

fn bundle_file_name(kind: BundleKind, ordinal: usize) -> String {
    if ordinal <= 1 {
        format!("packed.min.{}", kind)
    } else {
        format!("packed.{}.min.{}", ordinal, kind)
    }
}
