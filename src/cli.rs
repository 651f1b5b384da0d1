// Copyright © 2024 TinySite. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Command-Line Interface
//!
//! A generation is started with zero or more task tokens:
//!
//! - `debug`: verbose logging;
//! - `sass`: compile the configured Sass entry point;
//! - `thumb`: create the thumbnails requested by templates;
//! - `address_image`: render the configured address image;
//! - `skip_copy`: honour `skip_assets` when copying the asset tree;
//! - `all`: shorthand for `sass thumb address_image`.
//!
//! ```sh
//! tinysite all debug
//! ```
//!
//! # Examples
//!
//! ```rust
//! use tinysite::cli;
//!
//! let matches = cli::build().get_matches_from(["tinysite", "sass", "thumb"]);
//! let options = cli::options_from_matches(&matches);
//! assert!(options.sass && options.thumbnails);
//! ```

use clap::{Arg, ArgAction, ArgMatches, Command};
use log::debug;

use crate::core::config::BuildOptions;

/// Version of the command-line tool.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Task tokens accepted on the command line.
pub const TASKS: [&str; 6] =
    ["debug", "sass", "thumb", "address_image", "skip_copy", "all"];

/// Builds the command-line interface.
pub fn build() -> Command {
    debug!("Building CLI command structure");

    Command::new("tinysite")
        .author("TinySite Contributors")
        .about("Builds a static website from JSON page descriptors")
        .version(VERSION)
        .arg(
            Arg::new("tasks")
                .help("Optional tasks to run with the build")
                .value_name("TASK")
                .num_args(0..)
                .value_parser(TASKS)
                .action(ArgAction::Append),
        )
        .after_help(
            "\x1b[1;4mLayout:\x1b[0m\n\n  \
             meta.json, source/content, source/templates, source/assets, compiled\n\n\
             \x1b[1;4mLicense:\x1b[0m\n  The project is licensed under the terms of \
             both the MIT license and the Apache License (Version 2.0).",
        )
}

/// Turns parsed arguments into build options.
pub fn options_from_matches(matches: &ArgMatches) -> BuildOptions {
    let tasks = matches
        .get_many::<String>("tasks")
        .map(|values| values.map(String::as_str).collect::<Vec<_>>())
        .unwrap_or_default();
    BuildOptions::from_tokens(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(args: &[&str]) -> BuildOptions {
        let matches = build().get_matches_from(
            std::iter::once("tinysite").chain(args.iter().copied()),
        );
        options_from_matches(&matches)
    }

    #[test]
    fn test_no_tasks() {
        assert_eq!(options(&[]), BuildOptions::default());
    }

    #[test]
    fn test_individual_tasks() {
        let parsed = options(&["thumb", "skip_copy"]);
        assert!(parsed.thumbnails);
        assert!(parsed.skip_copy);
        assert!(!parsed.sass);
        assert!(!parsed.address_image);
        assert!(!parsed.debug);
    }

    #[test]
    fn test_all_with_debug() {
        let parsed = options(&["all", "debug"]);
        assert!(parsed.sass && parsed.thumbnails && parsed.address_image);
        assert!(parsed.debug);
        assert!(!parsed.skip_copy);
    }

    #[test]
    fn test_unknown_task_is_rejected() {
        let result = build().try_get_matches_from(["tinysite", "deploy"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_command_is_consistent() {
        build().debug_assert();
    }
}
