// Copyright © 2024 TinySite. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # TinySite CLI
//!
//! Entry point of the `tinysite` binary. Parses the task tokens,
//! initializes the logger and builds the site in the current directory.

use anyhow::Context;
use env_logger::Env;
use log::info;
use tinysite::cli;
use tinysite::core::config::SitePaths;

/// Runs a generation and reports the outcome.
fn run() -> Result<(), anyhow::Error> {
    let matches = cli::build().get_matches();
    let options = cli::options_from_matches(&matches);

    let level = if options.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .init();
    info!("Starting TinySite v{}", cli::VERSION);

    tinysite::run(&SitePaths::new("."), options)
        .context("Failed to build site")?;

    info!("Site generated successfully");
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
