// Copyright © 2024 TinySite. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # TinySite Library
//!
//! TinySite builds a static website from a tree of JSON page descriptors.
//! A run resolves `source/content` into a flat route map, renders every
//! route through Handlebars templates, and publishes the asset tree with
//! packed bundles, thumbnails and extracted archives.

#![doc = include_str!("../README.md")]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;
use serde_json::{json, Value as JsonValue};

use crate::assets::AssetPipeline;
use crate::content::{ContentMap, EntryId};
use crate::context::BuildContext;
use crate::core::config::{BuildOptions, MetadataBuilder, SitePaths, ENV_PREFIX};
use crate::core::error::{Result, SiteError};
use crate::core::traits::{Generator, IntoContext};
use crate::generators::html::HtmlGenerator;
use crate::template::HandlebarsRenderer;
use crate::urls::SiteUrls;

/// Configuration, error handling and the shared traits.
pub mod core;

/// Provides command-line interface utilities.
pub mod cli;

/// Resolution of the content tree into routes.
pub mod content;

/// Run-scoped state shared by helpers and the asset pipeline.
pub mod context;

/// Asset publishing steps.
pub mod assets;

/// Provides output generation utilities.
pub mod generators;

/// Filesystem helpers.
pub mod process;

/// Provides template rendering utilities.
pub mod template;

/// URL helpers exposed to templates.
pub mod urls;

/// Trait for template rendering implementations.
///
/// This trait defines methods for rendering and validating templates.
pub trait TemplateRenderer: Send + Sync + std::fmt::Debug {
    /// Renders a template with the specified context.
    ///
    /// # Arguments
    /// * `template` - The template name or identifier.
    /// * `context` - The context data for rendering the template.
    ///
    /// # Returns
    /// * `Result<String>` - The rendered output, or an error if rendering fails.
    fn render(&self, template: &str, context: &JsonValue) -> Result<String>;

    /// Validates the template against the context.
    fn validate(&self, template: &str, context: &JsonValue) -> Result<()>;
}

/// Renders resolved content to the output directory.
#[derive(Debug)]
pub struct Site {
    context: Arc<BuildContext>,
    content: Arc<ContentMap>,
    renderer: Box<dyn TemplateRenderer>,
    generator: Box<dyn Generator>,
}

impl Site {
    /// Creates a site from its run context, content and collaborators.
    pub fn new(
        context: Arc<BuildContext>,
        content: Arc<ContentMap>,
        renderer: Box<dyn TemplateRenderer>,
        generator: Box<dyn Generator>,
    ) -> Self {
        Self {
            context,
            content,
            renderer,
            generator,
        }
    }

    /// Renders every renderable entry and returns the written files.
    pub fn render_all(&self) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (id, _) in self.content.renderable() {
            written.extend(self.render_entry(id)?);
        }
        Ok(written)
    }

    /// Renders one entry to its route, and also to the site root when it
    /// is the start page and to its `pulled` alias when it has one.
    pub fn render_entry(&self, id: EntryId) -> Result<Vec<PathBuf>> {
        let entry = self.content.entry(id);
        let template = entry.template.as_deref().ok_or_else(|| {
            SiteError::validation("page has no template", Some(&entry.route))
        })?;

        let metadata = &self.context.metadata;
        let context = json!({
            "meta": metadata.render_context(&entry.route, &self.context.assets_url()),
            "page": self.content.page_view(id).into_context(),
        });
        let html = self.renderer.render(template, &context)?;

        let output_dir = &self.context.paths.output_dir;
        let mut targets = Vec::new();
        if metadata.settings.start_page.as_deref() == Some(entry.route.as_str()) {
            targets.push(output_dir.join(INDEX_FILE));
        }
        targets.push(route_dir(output_dir, &entry.route).join(INDEX_FILE));
        if let Some(pulled) = &entry.pulled {
            targets.push(route_dir(output_dir, pulled).join(INDEX_FILE));
        }

        for target in &targets {
            self.generator.generate(&html, target)?;
            info!("{}", target.display());
        }
        Ok(targets)
    }
}

const INDEX_FILE: &str = "index.html";

/// Directory of a route below `output_dir`.
pub fn route_dir(output_dir: &Path, route: &str) -> PathBuf {
    route
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(output_dir.to_path_buf(), |dir, segment| dir.join(segment))
}

/// Runs a complete generation.
///
/// Steps, in order: load metadata, prepare the output directory, copy
/// meta files, compile Sass and render the address image (when asked),
/// resolve content, render all pages, create thumbnails (when asked),
/// copy assets and uploads, extract archives.
pub fn run(paths: &SitePaths, options: BuildOptions) -> Result<()> {
    let metadata = MetadataBuilder::new()
        .with_file(paths.meta_file())
        .with_env_prefix(ENV_PREFIX)
        .build()?;
    info!("baseurl {}", metadata.settings.baseurl);
    paths.validate()?;

    let context = Arc::new(BuildContext::new(options, paths.clone(), metadata));
    let pipeline = AssetPipeline::new(&context);
    _ = pipeline.copy_meta_files()?;
    if options.sass {
        pipeline.compile_sass()?;
    }
    if options.address_image {
        _ = pipeline.generate_address_image()?;
    }

    let content = Arc::new(content::resolve(paths.content_dir())?);
    info!("resolved {} routes", content.len());

    let urls = SiteUrls::new(Arc::clone(&context), Arc::clone(&content));
    let renderer = HandlebarsRenderer::new(&paths.templates_dir())?.with_site_helpers(&urls);
    let generator = HtmlGenerator::new(context.metadata.settings.html_output);
    let site = Site::new(
        Arc::clone(&context),
        Arc::clone(&content),
        Box::new(renderer),
        Box::new(generator),
    );
    let pages = site.render_all()?;
    info!("rendered {} pages", pages.len());

    if options.thumbnails {
        _ = pipeline.create_thumbnails()?;
    }
    pipeline.copy_assets()?;
    pipeline.copy_uploads(&content)?;
    pipeline.unzip_assets()?;
    Ok(())
}
