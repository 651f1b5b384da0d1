// Copyright © 2024 TinySite. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Template Rendering Module
//!
//! Handlebars rendering for site pages. Every file below the templates
//! directory is registered under its relative path (`page.html`,
//! `parts/nav.html`), so descriptors name templates by file and templates
//! include each other as partials with `{{> parts/nav.html}}`.
//!
//! ## Helpers
//!
//! The URL helpers of [`SiteUrls`] are exposed as Handlebars helpers.
//! Positional parameters map to path segments; keyword options are passed
//! as hash arguments:
//!
//! ```text
//! {{url_for "shop/1"}}
//! {{assets_url_for "css" filename="site.css" md5=true}}
//! {{image_url_for "images" filename="a.jpg" thumbnail=true}}
//! {{image_url_for "images" filename="a.jpg" thumbnail=(array 120 80)}}
//! {{css_url_for "reset.css" "site.css"}}
//! {{js_url_for "vendor" "app.js"}}
//! {{build_title page}}
//! {{#if (is_active_route meta.active_route "shop")}}active{{/if}}
//! {{base_domain meta.baseurl}}
//! {{parse_url page.link}}
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use handlebars::{
    Context, Handlebars, Helper, HelperDef, RenderContext, RenderError,
    RenderErrorReason, ScopedJson,
};
use log::debug;
use parking_lot::RwLock;
use serde_json::{Map, Value as JsonValue};
use walkdir::WalkDir;

use crate::context::BundleKind;
use crate::core::error::{Result, SiteError};
use crate::process::read_content;
use crate::urls::SiteUrls;
use crate::TemplateRenderer;

/// A custom template helper with its registration name.
pub trait TemplateHelper: Send + Sync {
    /// Executes the helper.
    ///
    /// `params` are the positional arguments, `hash` the `key=value`
    /// arguments and `context` the data the template is rendered with.
    fn execute(
        &self,
        params: &[JsonValue],
        hash: &Map<String, JsonValue>,
        context: &JsonValue,
    ) -> Result<JsonValue>;

    /// Returns the name of the helper for registration.
    fn name(&self) -> &str;
}

/// Bridges a [`TemplateHelper`] into Handlebars. Returning a value (rather
/// than writing output) makes helpers usable as subexpressions.
struct HelperAdapter<H> {
    helper: H,
}

impl<H: TemplateHelper> HelperDef for HelperAdapter<H> {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> std::result::Result<ScopedJson<'rc>, RenderError> {
        let params: Vec<JsonValue> =
            h.params().iter().map(|p| p.value().clone()).collect();
        let hash: Map<String, JsonValue> = h
            .hash()
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.value().clone()))
            .collect();

        let result = self
            .helper
            .execute(&params, &hash, ctx.data())
            .map_err(|e| RenderError::from(RenderErrorReason::Other(e.to_string())))?;
        Ok(ScopedJson::Derived(result))
    }
}

/// Renderer for Handlebars templates loaded from a directory.
#[derive(Clone)]
pub struct HandlebarsRenderer {
    engine: Arc<RwLock<Handlebars<'static>>>,
    template_dir: PathBuf,
    templates: Arc<RwLock<BTreeSet<String>>>,
}

impl std::fmt::Debug for HandlebarsRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlebarsRenderer")
            .field("template_dir", &self.template_dir)
            .field("templates", &self.templates.read().len())
            .finish()
    }
}

impl HandlebarsRenderer {
    /// Creates a renderer with every template below `template_dir` and the
    /// stateless helpers registered.
    pub fn new(template_dir: &Path) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::html_escape);

        let renderer = Self {
            engine: Arc::new(RwLock::new(handlebars)),
            template_dir: template_dir.to_path_buf(),
            templates: Arc::new(RwLock::new(BTreeSet::new())),
        };
        renderer.load_templates()?;
        Ok(renderer
            .with_helper(helpers::IsActiveRouteHelper)
            .with_helper(helpers::BaseDomainHelper)
            .with_helper(helpers::ArrayHelper))
    }

    /// Registers the URL helpers bound to one run.
    pub fn with_site_helpers(self, urls: &SiteUrls) -> Self {
        self.with_helper(helpers::UrlForHelper(urls.clone()))
            .with_helper(helpers::AssetsUrlForHelper(urls.clone()))
            .with_helper(helpers::ImageUrlForHelper(urls.clone()))
            .with_helper(helpers::BundleUrlHelper::new(urls.clone(), BundleKind::Css))
            .with_helper(helpers::BundleUrlHelper::new(urls.clone(), BundleKind::Js))
            .with_helper(helpers::BuildTitleHelper(urls.clone()))
            .with_helper(helpers::ParseUrlHelper(urls.clone()))
    }

    /// Registers a custom helper under its own name.
    pub fn with_helper<H>(self, helper: H) -> Self
    where
        H: TemplateHelper + 'static,
    {
        let name = helper.name().to_string();
        self.engine
            .write()
            .register_helper(&name, Box::new(HelperAdapter { helper }));
        self
    }

    /// Registers a template from a string.
    pub fn with_template(self, name: &str, template: &str) -> Result<Self> {
        self.register(name, template)?;
        Ok(self)
    }

    /// Names of all registered templates.
    pub fn template_names(&self) -> Vec<String> {
        self.templates.read().iter().cloned().collect()
    }

    fn register(&self, name: &str, template: &str) -> Result<()> {
        self.engine
            .write()
            .register_template_string(name, template)
            .map_err(|e| {
                SiteError::template_rendering_error(
                    format!("Failed to register template: {}", e),
                    name.to_string(),
                    Some(Box::new(e)),
                )
            })?;
        _ = self.templates.write().insert(name.to_string());
        Ok(())
    }

    /// Loads every file below the template directory.
    fn load_templates(&self) -> Result<()> {
        for entry in WalkDir::new(&self.template_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                SiteError::template_rendering_error(
                    format!("Failed to read template directory: {}", e),
                    String::new(),
                    Some(Box::new(e)),
                )
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let name = template_name(&self.template_dir, path).ok_or_else(|| {
                SiteError::template_rendering_error(
                    "Invalid template filename",
                    path.display().to_string(),
                    None,
                )
            })?;
            let content = read_content(path)?;
            debug!("register template {}", name);
            self.register(&name, &content)?;
        }
        Ok(())
    }
}

/// Relative path of `path` below `dir`, joined with `/`.
fn template_name(dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(dir).ok()?;
    let parts: Option<Vec<&str>> = relative
        .components()
        .map(|component| component.as_os_str().to_str())
        .collect();
    Some(parts?.join("/"))
}

impl TemplateRenderer for HandlebarsRenderer {
    fn render(&self, template: &str, context: &JsonValue) -> Result<String> {
        self.validate(template, context)?;
        self.engine.read().render(template, context).map_err(|e| {
            SiteError::template_rendering_error(
                format!("Template rendering failed: {}", e),
                template.to_string(),
                Some(Box::new(e)),
            )
        })
    }

    fn validate(&self, template: &str, _context: &JsonValue) -> Result<()> {
        if !self.templates.read().contains(template) {
            return Err(SiteError::template_rendering_error(
                format!("Template '{}' not found", template),
                template.to_string(),
                None,
            ));
        }
        Ok(())
    }
}

/// Built-in helpers.
pub mod helpers {
    use super::*;
    use crate::core::config::ImageSize;
    use crate::urls::{base_domain, is_active_route, Thumbnail};

    fn invalid(helper: &str, message: &str) -> SiteError {
        SiteError::validation(format!("{}: {}", helper, message), None)
    }

    fn string_param<'a>(params: &'a [JsonValue], index: usize, helper: &str) -> Result<&'a str> {
        params
            .get(index)
            .and_then(JsonValue::as_str)
            .ok_or_else(|| invalid(helper, &format!("parameter {} must be a string", index + 1)))
    }

    fn segments(params: &[JsonValue], helper: &str) -> Result<Vec<String>> {
        params
            .iter()
            .map(|param| match param {
                JsonValue::String(s) => Ok(s.clone()),
                JsonValue::Number(n) => Ok(n.to_string()),
                _ => Err(invalid(helper, "path segments must be strings")),
            })
            .collect()
    }

    fn optional_string<'a>(
        hash: &'a Map<String, JsonValue>,
        key: &str,
        helper: &str,
    ) -> Result<Option<&'a str>> {
        match hash.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::String(s)) => Ok(Some(s)),
            Some(_) => Err(invalid(helper, &format!("`{}` must be a string", key))),
        }
    }

    fn flag(hash: &Map<String, JsonValue>, key: &str) -> bool {
        hash.get(key).and_then(JsonValue::as_bool).unwrap_or(false)
    }

    /// `{{url_for route [filename=...]}}`
    #[derive(Debug, Clone)]
    pub struct UrlForHelper(pub SiteUrls);

    impl TemplateHelper for UrlForHelper {
        fn execute(
            &self,
            params: &[JsonValue],
            hash: &Map<String, JsonValue>,
            _context: &JsonValue,
        ) -> Result<JsonValue> {
            let route = string_param(params, 0, self.name())?;
            let filename = optional_string(hash, "filename", self.name())?;
            Ok(JsonValue::String(self.0.url_for(route, filename)?))
        }

        fn name(&self) -> &str {
            "url_for"
        }
    }

    /// `{{assets_url_for segment... [filename=...] [md5=true]}}`
    #[derive(Debug, Clone)]
    pub struct AssetsUrlForHelper(pub SiteUrls);

    impl TemplateHelper for AssetsUrlForHelper {
        fn execute(
            &self,
            params: &[JsonValue],
            hash: &Map<String, JsonValue>,
            _context: &JsonValue,
        ) -> Result<JsonValue> {
            let segments = segments(params, self.name())?;
            let filename = optional_string(hash, "filename", self.name())?;
            let url = self.0.assets_url_for(&segments, filename, flag(hash, "md5"))?;
            Ok(JsonValue::String(url))
        }

        fn name(&self) -> &str {
            "assets_url_for"
        }
    }

    /// `{{image_url_for segment... filename=... [thumbnail=true|(array w h)]}}`
    #[derive(Debug, Clone)]
    pub struct ImageUrlForHelper(pub SiteUrls);

    impl ImageUrlForHelper {
        fn thumbnail(&self, value: Option<&JsonValue>) -> Result<Thumbnail> {
            match value {
                None | Some(JsonValue::Null) | Some(JsonValue::Bool(false)) => Ok(Thumbnail::Off),
                Some(JsonValue::Bool(true)) => Ok(Thumbnail::Default),
                Some(value) => {
                    let size = serde_json::from_value::<ImageSize>(value.clone()).map_err(|_| {
                        invalid(self.name(), "`thumbnail` must be a boolean or [width, height]")
                    })?;
                    if size.is_empty() {
                        return Err(invalid(self.name(), "`thumbnail` sides must be at least 1"));
                    }
                    Ok(Thumbnail::Size(size))
                }
            }
        }
    }

    impl TemplateHelper for ImageUrlForHelper {
        fn execute(
            &self,
            params: &[JsonValue],
            hash: &Map<String, JsonValue>,
            _context: &JsonValue,
        ) -> Result<JsonValue> {
            let segments = segments(params, self.name())?;
            let filename = optional_string(hash, "filename", self.name())?
                .ok_or_else(|| invalid(self.name(), "`filename` is required"))?;
            let thumbnail = self.thumbnail(hash.get("thumbnail"))?;
            let url = self.0.image_url_for(&segments, filename, thumbnail)?;
            Ok(JsonValue::String(url))
        }

        fn name(&self) -> &str {
            "image_url_for"
        }
    }

    /// `{{css_url_for file...}}` and `{{js_url_for file...}}`
    #[derive(Debug, Clone)]
    pub struct BundleUrlHelper {
        urls: SiteUrls,
        kind: BundleKind,
        name: String,
    }

    impl BundleUrlHelper {
        /// Creates the helper for one bundle kind.
        pub fn new(urls: SiteUrls, kind: BundleKind) -> Self {
            Self {
                urls,
                kind,
                name: format!("{}_url_for", kind),
            }
        }
    }

    impl TemplateHelper for BundleUrlHelper {
        fn execute(
            &self,
            params: &[JsonValue],
            _hash: &Map<String, JsonValue>,
            _context: &JsonValue,
        ) -> Result<JsonValue> {
            let files = segments(params, &self.name)?;
            if files.is_empty() {
                return Err(invalid(&self.name, "at least one file is required"));
            }
            Ok(JsonValue::String(self.urls.js_css_url_for(&files, self.kind)?))
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    /// `{{build_title [page]}}`, defaulting to the page being rendered.
    #[derive(Debug, Clone)]
    pub struct BuildTitleHelper(pub SiteUrls);

    impl TemplateHelper for BuildTitleHelper {
        fn execute(
            &self,
            params: &[JsonValue],
            _hash: &Map<String, JsonValue>,
            context: &JsonValue,
        ) -> Result<JsonValue> {
            let page = params.first().unwrap_or(&context["page"]);
            let route = match page {
                JsonValue::String(route) => route.as_str(),
                page => page["route"]
                    .as_str()
                    .ok_or_else(|| invalid(self.name(), "expected a page or a route"))?,
            };
            Ok(JsonValue::String(self.0.build_title_for_route(route)?))
        }

        fn name(&self) -> &str {
            "build_title"
        }
    }

    /// `{{parse_url text}}`
    #[derive(Debug, Clone)]
    pub struct ParseUrlHelper(pub SiteUrls);

    impl TemplateHelper for ParseUrlHelper {
        fn execute(
            &self,
            params: &[JsonValue],
            _hash: &Map<String, JsonValue>,
            _context: &JsonValue,
        ) -> Result<JsonValue> {
            let text = string_param(params, 0, self.name())?;
            Ok(JsonValue::String(self.0.parse_url(text)))
        }

        fn name(&self) -> &str {
            "parse_url"
        }
    }

    /// `{{is_active_route active candidate}}`
    #[derive(Debug, Clone, Copy)]
    pub struct IsActiveRouteHelper;

    impl TemplateHelper for IsActiveRouteHelper {
        fn execute(
            &self,
            params: &[JsonValue],
            _hash: &Map<String, JsonValue>,
            _context: &JsonValue,
        ) -> Result<JsonValue> {
            let active = string_param(params, 0, self.name())?;
            let candidate = string_param(params, 1, self.name())?;
            Ok(JsonValue::Bool(is_active_route(active, candidate)))
        }

        fn name(&self) -> &str {
            "is_active_route"
        }
    }

    /// `{{base_domain url}}`
    #[derive(Debug, Clone, Copy)]
    pub struct BaseDomainHelper;

    impl TemplateHelper for BaseDomainHelper {
        fn execute(
            &self,
            params: &[JsonValue],
            _hash: &Map<String, JsonValue>,
            _context: &JsonValue,
        ) -> Result<JsonValue> {
            let url = string_param(params, 0, self.name())?;
            Ok(JsonValue::String(base_domain(url)?))
        }

        fn name(&self) -> &str {
            "base_domain"
        }
    }

    /// `(array a b ...)`, used for `thumbnail=(array 120 80)`.
    #[derive(Debug, Clone, Copy)]
    pub struct ArrayHelper;

    impl TemplateHelper for ArrayHelper {
        fn execute(
            &self,
            params: &[JsonValue],
            _hash: &Map<String, JsonValue>,
            _context: &JsonValue,
        ) -> Result<JsonValue> {
            Ok(JsonValue::Array(params.to_vec()))
        }

        fn name(&self) -> &str {
            "array"
        }
    }
}
