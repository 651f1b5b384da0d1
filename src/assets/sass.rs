// Copyright © 2024 TinySite. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sass compilation through the external `sass` executable.

use std::path::{Path, PathBuf};
use std::process::Command;

use log::info;

use crate::core::error::{Result, SiteError};
use crate::process::create_dir_all;

/// Name of the compiler looked up on `PATH`.
pub const SASS_COMMAND: &str = "sass";

/// Compiles `input` into `output` with the `sass` found on `PATH`.
pub fn compile_sass(input: &Path, output: &Path) -> Result<()> {
    let sass = which::which(SASS_COMMAND).map_err(|e| {
        SiteError::asset_error(
            format!("`{}` not found, install Dart Sass", SASS_COMMAND),
            input.to_path_buf(),
            Some(Box::new(e)),
        )
    })?;
    compile_with(&sass, input, output)
}

/// Compiles `input` into `output` with the given compiler executable.
pub fn compile_with(sass: &Path, input: &Path, output: &Path) -> Result<()> {
    if !input.is_file() {
        return Err(SiteError::config_error(
            "Sass file not found",
            Some(input.to_path_buf()),
        ));
    }
    if let Some(parent) = output.parent() {
        create_dir_all(parent)?;
    }

    info!("compile sass {}", input.display());
    let result = Command::new(sass)
        .arg(input)
        .arg(output)
        .arg("--no-source-map")
        .output()
        .map_err(|e| SiteError::io_error(sass.to_path_buf(), e))?;

    if !result.status.success() {
        return Err(SiteError::asset_error(
            format!(
                "sass exited with {}: {}",
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            ),
            input.to_path_buf(),
            None,
        ));
    }
    Ok(())
}

/// Resolves the configured input and output paths of a run.
pub fn sass_paths(root: &Path, source_dir: &Path, sass_file: &Path, sass_output: &Path) -> (PathBuf, PathBuf) {
    (root.join(sass_file), source_dir.join(sass_output))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn fake_compiler(dir: &Path, script: &str) -> PathBuf {
        let path = dir.join("fake-sass");
        fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_compile_with_runs_compiler() {
        let dir = TempDir::new().unwrap();
        let compiler = fake_compiler(dir.path(), "cp \"$1\" \"$2\"");
        let input = dir.path().join("style.scss");
        fs::write(&input, "a{color:red}").unwrap();
        let output = dir.path().join("out/css/styles.css");

        compile_with(&compiler, &input, &output).unwrap();
        assert_eq!(fs::read_to_string(output).unwrap(), "a{color:red}");
    }

    #[test]
    fn test_failing_compiler_is_an_error() {
        let dir = TempDir::new().unwrap();
        let compiler = fake_compiler(dir.path(), "echo broken >&2; exit 3");
        let input = dir.path().join("style.scss");
        fs::write(&input, "a{").unwrap();

        let err = compile_with(&compiler, &input, &dir.path().join("o.css")).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let dir = TempDir::new().unwrap();
        let compiler = fake_compiler(dir.path(), "exit 0");
        let err = compile_with(&compiler, &dir.path().join("none.scss"), &dir.path().join("o.css"))
            .unwrap_err();
        assert!(matches!(err, SiteError::ConfigError { .. }));
    }
}
