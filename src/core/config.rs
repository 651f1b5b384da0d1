// Copyright © 2024 TinySite. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Configuration Module
//!
//! Site configuration comes from three places:
//!
//! - the project layout ([`SitePaths`]): `source/` in, `compiled/` out;
//! - the per-run switches given on the command line ([`BuildOptions`]);
//! - the site metadata file `source/meta.json` ([`Metadata`]), which may be
//!   overridden by `RP_<KEY>` and `RP_DATA_<KEY>` environment variables.
//!
//! The metadata keeps every key of `meta.json` so templates can read
//! free-form values, and additionally deserializes the keys the generator
//! itself understands into [`SiteSettings`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use tinysite::core::config::MetadataBuilder;
//!
//! let metadata = MetadataBuilder::new()
//!     .with_file("source/meta.json")
//!     .with_env_prefix("RP_")
//!     .build()
//!     .unwrap();
//! println!("{}", metadata.settings.baseurl);
//! ```

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::core::error::{Result, SiteError};

/// Default prefix for metadata environment overrides.
pub const ENV_PREFIX: &str = "RP_";

/// Top-level keys that may be overridden even when `meta.json` omits them.
const ALWAYS_OVERRIDABLE: &[&str] = &["baseurl", "add_index_html", "branch"];

/// Locations of the source tree and the generated output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    /// Project root, used to resolve `sass_file` and fonts.
    pub root: PathBuf,
    /// The `source` directory holding meta, content, templates and assets.
    pub source_dir: PathBuf,
    /// The `compiled` directory receiving the generated site.
    pub output_dir: PathBuf,
}

impl SitePaths {
    /// Uses the conventional `source/` and `compiled/` directories under
    /// `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            source_dir: root.join("source"),
            output_dir: root.join("compiled"),
            root,
        }
    }

    /// Checks that the directories a run reads from exist and creates the
    /// output directory.
    pub fn validate(&self) -> Result<()> {
        for dir in [self.content_dir(), self.templates_dir()] {
            if !dir.is_dir() {
                return Err(SiteError::config_error(
                    "Invalid directory",
                    Some(dir),
                ));
            }
        }
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            SiteError::config_error(
                format!("Failed to create output directory: {}", e),
                Some(self.output_dir.clone()),
            )
        })
    }

    /// `source/meta.json`.
    pub fn meta_file(&self) -> PathBuf {
        self.source_dir.join("meta.json")
    }

    /// `source/meta`, home of branch-specific server files.
    pub fn meta_dir(&self) -> PathBuf {
        self.source_dir.join("meta")
    }

    /// `source/content`.
    pub fn content_dir(&self) -> PathBuf {
        self.source_dir.join("content")
    }

    /// `source/templates`.
    pub fn templates_dir(&self) -> PathBuf {
        self.source_dir.join("templates")
    }

    /// `source/assets`.
    pub fn source_assets_dir(&self) -> PathBuf {
        self.source_dir.join("assets")
    }

    /// `compiled/assets`.
    pub fn output_assets_dir(&self) -> PathBuf {
        self.output_dir.join("assets")
    }
}

/// Switches for a single generation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Log the content tree walk.
    pub debug: bool,
    /// Compile Sass before rendering.
    pub sass: bool,
    /// Generate thumbnails after rendering.
    pub thumbnails: bool,
    /// Render the address image asset.
    pub address_image: bool,
    /// Apply `skip_assets` while copying assets.
    pub skip_copy: bool,
}

impl BuildOptions {
    /// Builds options from bare command-line tokens.
    ///
    /// `all` turns on `sass`, `thumb` and `address_image`. Unknown tokens
    /// are ignored here; the CLI parser rejects them earlier.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::default();
        for token in tokens {
            match token.as_ref() {
                "debug" => options.debug = true,
                "sass" => options.sass = true,
                "thumb" => options.thumbnails = true,
                "address_image" => options.address_image = true,
                "skip_copy" => options.skip_copy = true,
                "all" => {
                    options.sass = true;
                    options.thumbnails = true;
                    options.address_image = true;
                }
                _ => {}
            }
        }
        options
    }
}

/// How rendered HTML is post-processed before it is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HtmlOutput {
    /// Re-indent the markup, one element per line.
    #[default]
    Prettify,
    /// Minify with `minify-html`.
    Minify,
    /// Write the template output untouched.
    Raw,
}

/// Width and height of a generated image, in pixels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct ImageSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageSize {
    /// Creates a size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `true` when either side is zero.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<[u32; 2]> for ImageSize {
    fn from([width, height]: [u32; 2]) -> Self {
        Self { width, height }
    }
}

impl From<ImageSize> for [u32; 2] {
    fn from(size: ImageSize) -> Self {
        [size.width, size.height]
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Settings for the text-rendered address image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressImageSpec {
    /// Text to draw; `\n` starts a new line.
    pub text: String,
    /// Canvas size.
    #[serde(default = "default_address_image_size")]
    pub image_size: ImageSize,
    /// Text color as `#rgb` or `#rrggbb`.
    #[serde(default = "default_text_color")]
    pub text_color: String,
    /// Background color as `#rgb` or `#rrggbb`.
    #[serde(default = "default_background_color")]
    pub background_color: String,
    /// TrueType font file, relative to the project root.
    #[serde(default = "default_font")]
    pub font: PathBuf,
    /// Font size in pixels.
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    /// File name under `assets/images`.
    #[serde(default = "default_address_image_filename")]
    pub filename: String,
}

/// The `meta.json` keys the generator itself interprets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSettings {
    /// Base URL every page and asset URL starts with.
    pub baseurl: String,
    /// Site title appended to every page title.
    pub title: String,
    /// Separator placed between page titles of the ancestor chain.
    #[serde(default = "default_title_separator")]
    pub title_separator: String,
    /// Route additionally rendered at the site root.
    #[serde(default)]
    pub start_page: Option<String>,
    /// Keep the trailing `index.html` in page URLs.
    #[serde(default = "default_true")]
    pub add_index_html: bool,
    /// Deployment branch selecting `.htaccess_<branch>` and friends.
    #[serde(default)]
    pub branch: Option<String>,
    /// Free-form values for templates.
    #[serde(default)]
    pub data: Map<String, JsonValue>,
    /// Asset subdirectories left out when `skip_copy` is requested.
    #[serde(default = "default_skip_assets")]
    pub skip_assets: Vec<String>,
    /// Archives under the output asset directory to extract.
    #[serde(default)]
    pub unzip_assets: Vec<String>,
    /// Size used by `image_url_for` when `thumbnail=true`.
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: ImageSize,
    /// Sass entry file, relative to the project root.
    #[serde(default)]
    pub sass_file: Option<PathBuf>,
    /// Compiled stylesheet, relative to the source directory.
    #[serde(default = "default_sass_output")]
    pub sass_output: PathBuf,
    /// Optional address image settings.
    #[serde(default)]
    pub address_image: Option<AddressImageSpec>,
    /// HTML post-processing mode.
    #[serde(default)]
    pub html_output: HtmlOutput,
}

/// Site metadata: the raw `meta.json` object and its typed view.
#[derive(Debug, Clone)]
pub struct Metadata {
    /// Typed settings deserialized from `values`.
    pub settings: SiteSettings,
    values: Map<String, JsonValue>,
}

impl Metadata {
    /// Builds metadata from a JSON object.
    pub fn from_values(values: Map<String, JsonValue>) -> Result<Self> {
        let settings: SiteSettings =
            serde_json::from_value(JsonValue::Object(values.clone()))
                .map_err(|e| {
                    SiteError::config_error(
                        format!("Invalid site metadata: {}", e),
                        None,
                    )
                })?;
        Ok(Self { settings, values })
    }

    /// All metadata keys, including the ones the generator ignores.
    pub fn values(&self) -> &Map<String, JsonValue> {
        &self.values
    }

    /// The `meta` object handed to templates for one page.
    pub fn render_context(
        &self,
        active_route: &str,
        assets_url: &str,
    ) -> JsonValue {
        let mut meta = self.values.clone();
        _ = meta.insert(
            "active_route".to_string(),
            JsonValue::String(active_route.to_string()),
        );
        _ = meta.insert(
            "assets_url".to_string(),
            JsonValue::String(assets_url.to_string()),
        );
        JsonValue::Object(meta)
    }
}

/// Builds [`Metadata`] from a file, environment overrides and explicit
/// overrides, applied in that order.
#[derive(Debug, Default)]
pub struct MetadataBuilder {
    file: Option<PathBuf>,
    env_prefix: Option<String>,
    env_vars: Option<HashMap<String, String>>,
    overrides: Map<String, JsonValue>,
}

impl MetadataBuilder {
    /// Initialises an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the metadata object from a JSON file.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Applies `<prefix><KEY>` and `<prefix>DATA_<KEY>` environment
    /// overrides.
    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Reads overrides from the given variables instead of the process
    /// environment.
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(
            vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        );
        self
    }

    /// Sets a top-level key after every other source has been applied.
    pub fn with_override<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<JsonValue>,
    {
        _ = self.overrides.insert(key.into(), value.into());
        self
    }

    /// Loads, overrides and validates the metadata.
    pub fn build(self) -> Result<Metadata> {
        let mut values = match &self.file {
            Some(path) => load_from_file(path)?,
            None => Map::new(),
        };

        if let Some(prefix) = &self.env_prefix {
            let vars = match self.env_vars {
                Some(vars) => vars,
                None => env::vars().collect(),
            };
            apply_env_overrides(&mut values, prefix, &vars);
        }

        for (key, value) in self.overrides {
            _ = values.insert(key, value);
        }

        Metadata::from_values(values).map_err(|e| match (e, self.file) {
            (SiteError::ConfigError { message, .. }, Some(path)) => {
                SiteError::config_error(message, Some(path))
            }
            (e, _) => e,
        })
    }
}

fn load_from_file(path: &Path) -> Result<Map<String, JsonValue>> {
    let content = fs::read_to_string(path).map_err(|e| {
        SiteError::config_error(
            format!("Failed to read metadata file: {}", e),
            Some(path.to_path_buf()),
        )
    })?;
    match serde_json::from_str(&content) {
        Ok(JsonValue::Object(values)) => Ok(values),
        Ok(_) => Err(SiteError::config_error(
            "Metadata file must contain a JSON object",
            Some(path.to_path_buf()),
        )),
        Err(e) => Err(SiteError::json_error(path.to_path_buf(), e)),
    }
}

fn apply_env_overrides(
    values: &mut Map<String, JsonValue>,
    prefix: &str,
    vars: &HashMap<String, String>,
) {
    let mut keys: Vec<String> = values
        .keys()
        .filter(|key| key.as_str() != "data")
        .cloned()
        .collect();
    for key in ALWAYS_OVERRIDABLE {
        if !keys.iter().any(|k| k == key) {
            keys.push((*key).to_string());
        }
    }

    for key in keys {
        let env_key = format!("{}{}", prefix, key.to_uppercase());
        if let Some(raw) = vars.get(&env_key) {
            debug!("metadata override {}={}", env_key, raw);
            _ = values.insert(key, coerce_env_value(raw));
        }
    }

    if let Some(JsonValue::Object(data)) = values.get_mut("data") {
        let keys: Vec<String> = data.keys().cloned().collect();
        for key in keys {
            let env_key =
                format!("{}DATA_{}", prefix, key.to_uppercase());
            if let Some(raw) = vars.get(&env_key) {
                debug!("metadata data override {}={}", env_key, raw);
                _ = data.insert(key, coerce_env_value(raw));
            }
        }
    }
}

/// `"true"`/`"false"` (any case) become booleans, anything else a string.
pub fn coerce_env_value(raw: &str) -> JsonValue {
    if raw.eq_ignore_ascii_case("true") {
        JsonValue::Bool(true)
    } else if raw.eq_ignore_ascii_case("false") {
        JsonValue::Bool(false)
    } else {
        JsonValue::String(raw.to_string())
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_title_separator() -> String {
    " - ".to_string()
}

fn default_skip_assets() -> Vec<String> {
    vec!["js".to_string(), "css".to_string()]
}

fn default_thumbnail_size() -> ImageSize {
    ImageSize::new(300, 300)
}

fn default_sass_output() -> PathBuf {
    PathBuf::from("assets/css/styles.css")
}

fn default_address_image_size() -> ImageSize {
    ImageSize::new(100, 200)
}

fn default_text_color() -> String {
    "#000000".to_string()
}

fn default_background_color() -> String {
    "#ffffff".to_string()
}

fn default_font() -> PathBuf {
    PathBuf::from("Ubuntu-R.ttf")
}

fn default_font_size() -> f32 {
    15.0
}

fn default_address_image_filename() -> String {
    "a_image.png".to_string()
}
