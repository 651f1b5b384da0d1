// Copyright © 2024 TinySite. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Core Traits Module
//!
//! The seams between the generator and its external collaborators.
//!
//! - [`Generator`]: post-processes rendered markup and writes it to disk
//! - [`IntoContext`]: converts a value into the JSON handed to templates

use std::path::Path;

use crate::core::error::Result;
use serde_json::Value as JsonValue;

/// Trait for implementing output generation.
///
/// A generator receives the text produced by the template engine and is
/// responsible for any post-processing (minification, re-indentation)
/// and for writing the final file.
pub trait Generator: Send + Sync + std::fmt::Debug {
    /// Generates output from the given content at `path`, creating parent
    /// directories as needed.
    fn generate(&self, content: &str, path: &Path) -> Result<()>;

    /// Validates the target path without writing anything.
    fn validate(&self, path: &Path) -> Result<()>;
}

/// Trait for types that can be converted into a template context.
pub trait IntoContext {
    /// Converts the value into a JSON context object.
    fn into_context(self) -> JsonValue;
}

impl IntoContext for JsonValue {
    fn into_context(self) -> JsonValue {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_generator_implementation() {
        #[derive(Debug)]
        struct PlainGenerator;

        impl Generator for PlainGenerator {
            fn generate(&self, content: &str, path: &Path) -> Result<()> {
                self.validate(path)?;
                fs::write(path, content)?;
                Ok(())
            }

            fn validate(&self, path: &Path) -> Result<()> {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                Ok(())
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("nested/index.html");

        PlainGenerator.generate("<p>hi</p>", &output_path).unwrap();
        assert_eq!(fs::read_to_string(output_path).unwrap(), "<p>hi</p>");
    }

    #[test]
    fn test_json_into_context() {
        let value = json!({"key": "value"});
        assert_eq!(value.clone().into_context(), value);
    }
}
