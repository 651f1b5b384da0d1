// Copyright © 2024 TinySite. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Run-scoped state.
//!
//! One [`BuildContext`] is created per generation run and shared between
//! the template helpers (which register thumbnails and build bundles while
//! pages render) and the asset pipeline (which consumes the registrations
//! afterwards). Nothing outlives the run.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::core::config::{BuildOptions, ImageSize, Metadata, SitePaths};

/// A thumbnail requested by a template.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThumbnailRequest {
    /// Image path relative to the source asset directory.
    pub path: PathBuf,
    /// Target canvas size.
    pub size: ImageSize,
}

/// The two kinds of packed bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BundleKind {
    /// Stylesheets.
    Css,
    /// Scripts.
    Js,
}

impl BundleKind {
    /// Directory name and file extension of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            BundleKind::Css => "css",
            BundleKind::Js => "js",
        }
    }
}

impl fmt::Display for BundleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable state collected while pages render.
#[derive(Debug, Default)]
pub struct RunState {
    thumbnails: Mutex<BTreeSet<ThumbnailRequest>>,
    bundles: Mutex<BundleCache>,
}

#[derive(Debug, Default)]
struct BundleCache {
    urls: HashMap<(BundleKind, Vec<String>), String>,
    written: HashMap<BundleKind, usize>,
}

impl RunState {
    /// Records a thumbnail; repeated requests collapse into one.
    pub fn request_thumbnail(&self, request: ThumbnailRequest) {
        _ = self.thumbnails.lock().insert(request);
    }

    /// All thumbnails requested so far, in path order.
    pub fn thumbnails(&self) -> Vec<ThumbnailRequest> {
        self.thumbnails.lock().iter().cloned().collect()
    }

    /// Returns the cached URL for a bundle, or builds it with `build`.
    ///
    /// `build` receives the bundle's ordinal within its kind (1 for the
    /// first distinct file list, 2 for the next, ...). The cache lock is
    /// held while building, so each bundle is written once.
    pub fn bundle_url<F, E>(
        &self,
        kind: BundleKind,
        files: &[String],
        build: F,
    ) -> Result<String, E>
    where
        F: FnOnce(usize) -> Result<String, E>,
    {
        let mut cache = self.bundles.lock();
        let key = (kind, files.to_vec());
        if let Some(url) = cache.urls.get(&key) {
            return Ok(url.clone());
        }
        let ordinal = cache.written.get(&kind).copied().unwrap_or(0) + 1;
        let url = build(ordinal)?;
        _ = cache.written.insert(kind, ordinal);
        _ = cache.urls.insert(key, url.clone());
        Ok(url)
    }
}

/// Everything a generation run needs to know, shared by reference.
#[derive(Debug)]
pub struct BuildContext {
    /// Command-line switches.
    pub options: BuildOptions,
    /// Directory layout.
    pub paths: SitePaths,
    /// Site metadata after environment overrides.
    pub metadata: Metadata,
    /// State filled in while rendering.
    pub state: RunState,
}

impl BuildContext {
    /// Creates a context with empty run state.
    pub fn new(options: BuildOptions, paths: SitePaths, metadata: Metadata) -> Self {
        Self {
            options,
            paths,
            metadata,
            state: RunState::default(),
        }
    }

    /// Base URL of the site.
    pub fn base_url(&self) -> &str {
        &self.metadata.settings.baseurl
    }

    /// Base URL of the published asset directory.
    pub fn assets_url(&self) -> String {
        crate::urls::join_url(self.base_url(), ["assets"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_requests_are_deduplicated() {
        let state = RunState::default();
        let request = ThumbnailRequest {
            path: PathBuf::from("images/a.png"),
            size: ImageSize::new(10, 10),
        };
        state.request_thumbnail(request.clone());
        state.request_thumbnail(request.clone());
        state.request_thumbnail(ThumbnailRequest {
            size: ImageSize::new(20, 20),
            ..request
        });
        assert_eq!(state.thumbnails().len(), 2);
    }

    #[test]
    fn test_bundle_url_is_cached_per_file_list() {
        let state = RunState::default();
        let files = vec!["a.css".to_string()];
        let mut calls = 0;

        let first: Result<String, ()> = state.bundle_url(BundleKind::Css, &files, |n| {
            calls += 1;
            Ok(format!("bundle-{}", n))
        });
        let again: Result<String, ()> =
            state.bundle_url(BundleKind::Css, &files, |_| unreachable!());
        let other: Result<String, ()> =
            state.bundle_url(BundleKind::Css, &["b.css".to_string()], |n| {
                Ok(format!("bundle-{}", n))
            });
        let js: Result<String, ()> =
            state.bundle_url(BundleKind::Js, &files, |n| Ok(format!("js-{}", n)));

        assert_eq!(first.unwrap(), "bundle-1");
        assert_eq!(again.unwrap(), "bundle-1");
        assert_eq!(other.unwrap(), "bundle-2");
        assert_eq!(js.unwrap(), "js-1");
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_failed_bundle_is_not_cached() {
        let state = RunState::default();
        let files = vec!["a.js".to_string()];
        let failed: Result<String, &str> =
            state.bundle_url(BundleKind::Js, &files, |_| Err("broken"));
        assert!(failed.is_err());
        let retried: Result<String, &str> =
            state.bundle_url(BundleKind::Js, &files, |n| Ok(n.to_string()));
        assert_eq!(retried.unwrap(), "1");
    }
}
