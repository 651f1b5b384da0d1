// Copyright © 2024 TinySite. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Error Handling for TinySite
//!
//! This module defines the error type shared by every stage of a
//! generation run. The `thiserror` crate is used to keep the variants
//! declarative. Every error is fatal: a run either produces the whole
//! site or stops at the first problem.

use std::path::PathBuf;
use thiserror::Error;

/// A unified result type for the TinySite library.
pub type Result<T> = std::result::Result<T, SiteError>;

/// Boxed source error carried by several variants.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// The main error type for TinySite.
#[derive(Error, Debug)]
pub enum SiteError {
    /// A structural problem in the content tree or a bad helper call.
    ///
    /// Raised for missing titles, missing templates, unknown routes,
    /// duplicate routes and malformed format patterns.
    #[error("Validation error: {message}{}", route_suffix(.route))]
    Validation {
        /// Description of the violated rule.
        message: String,
        /// Route being resolved or looked up, if known.
        route: Option<String>,
    },

    /// Error related to site metadata or directory layout.
    #[error("Configuration error: {message}.")]
    ConfigError {
        /// Detailed description of the configuration error.
        message: String,
        /// Optional path of the file or directory that caused the error.
        path: Option<PathBuf>,
    },

    /// A JSON file could not be parsed.
    #[error("Invalid JSON in `{path:?}`: {source}")]
    Json {
        /// File that failed to parse.
        path: PathBuf,
        /// The underlying parser error.
        #[source]
        source: serde_json::Error,
    },

    /// Error related to template loading or rendering.
    #[error(
        "Template rendering error: {message} in template `{template}`."
    )]
    TemplateRenderingError {
        /// Description of the template rendering error.
        message: String,
        /// The template identifier associated with the error.
        template: String,
        /// Optional source error providing additional context.
        #[source]
        source: Option<BoxedSource>,
    },

    /// Error in HTML output generation.
    #[error("Output generation error: {message} at {path:?}.")]
    OutputGenerationError {
        /// Description of the output generation error.
        message: String,
        /// Path associated with the error.
        path: PathBuf,
        /// Optional source error providing additional context.
        #[source]
        source: Option<BoxedSource>,
    },

    /// Error while transforming an asset (image, archive, stylesheet).
    #[error("Asset error: {message} at {path:?}.")]
    AssetError {
        /// Description of the asset error.
        message: String,
        /// Asset path associated with the error.
        path: PathBuf,
        /// Optional source error providing additional context.
        #[source]
        source: Option<BoxedSource>,
    },

    /// IO error encountered during file operations.
    #[error("File IO error at `{path:?}`: {source}")]
    IOError {
        /// Path associated with the IO error.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// General internal error.
    #[error("Internal error: {0}")]
    InternalError(String),
}

fn route_suffix(route: &Option<String>) -> String {
    match route {
        Some(route) => format!(" (route `{}`)", route),
        None => String::new(),
    }
}

impl From<std::io::Error> for SiteError {
    /// Converts a standard IO error into a `SiteError::IOError` with an
    /// empty path.
    fn from(source: std::io::Error) -> Self {
        SiteError::IOError {
            path: PathBuf::new(),
            source,
        }
    }
}

impl SiteError {
    /// Creates a `Validation` error, optionally naming the offending route.
    pub fn validation<S: Into<String>>(
        message: S,
        route: Option<&str>,
    ) -> Self {
        SiteError::Validation {
            message: message.into(),
            route: route.map(str::to_string),
        }
    }

    /// Creates a `ConfigError` with a specific message.
    pub fn config_error<S: Into<String>>(
        message: S,
        path: Option<PathBuf>,
    ) -> Self {
        SiteError::ConfigError {
            message: message.into(),
            path,
        }
    }

    /// Wraps a JSON parse error for the given file.
    pub fn json_error(path: PathBuf, source: serde_json::Error) -> Self {
        SiteError::Json { path, source }
    }

    /// Creates a `TemplateRenderingError` with a message, template name,
    /// and optional source.
    pub fn template_rendering_error<S: Into<String>>(
        message: S,
        template: String,
        source: Option<BoxedSource>,
    ) -> Self {
        SiteError::TemplateRenderingError {
            message: message.into(),
            template,
            source,
        }
    }

    /// Creates an `OutputGenerationError` with a message, path and
    /// optional source.
    pub fn output_generation_error<S: Into<String>>(
        message: S,
        path: PathBuf,
        source: Option<BoxedSource>,
    ) -> Self {
        SiteError::OutputGenerationError {
            message: message.into(),
            path,
            source,
        }
    }

    /// Creates an `AssetError` with a message, path and optional source.
    pub fn asset_error<S: Into<String>>(
        message: S,
        path: PathBuf,
        source: Option<BoxedSource>,
    ) -> Self {
        SiteError::AssetError {
            message: message.into(),
            path,
            source,
        }
    }

    /// Wraps an IO error as an `IOError` variant with the specified path.
    pub fn io_error(path: PathBuf, source: std::io::Error) -> Self {
        SiteError::IOError { path, source }
    }

    /// Creates a general internal error with a custom message.
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        SiteError::InternalError(message.into())
    }

    /// Returns `true` for structural content or lookup errors.
    pub fn is_validation(&self) -> bool {
        matches!(self, SiteError::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_route() {
        let err = SiteError::validation("missing template", Some("shop/1"));
        assert_eq!(
            err.to_string(),
            "Validation error: missing template (route `shop/1`)"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn test_validation_without_route() {
        let err = SiteError::validation("bad pattern", None);
        assert_eq!(err.to_string(), "Validation error: bad pattern");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SiteError = io.into();
        assert!(matches!(err, SiteError::IOError { .. }));
        assert!(!err.is_validation());
    }
}
