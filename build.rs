// Copyright © 2024 TinySite. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Build script checking the minimum supported Rust version.

use std::process;

/// Minimum compiler version, kept in sync with `rust-version`.
const MIN_VERSION: &str = "1.85.0";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    match version_check::is_min_version(MIN_VERSION) {
        Some(true) => {}
        Some(false) => {
            eprintln!(
                "TinySite requires Rust {} or later, found {}",
                MIN_VERSION,
                version_check::Version::read()
                    .map_or_else(|| "an unknown version".to_string(), |v| v.to_string())
            );
            process::exit(1);
        }
        None => {
            println!("cargo:warning=Unable to determine the rustc version");
        }
    }
}
