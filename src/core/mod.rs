/// The `config` module provides site paths, run options and metadata
pub mod config;

/// The `error` module provides error handling
pub mod error;

/// The `traits` module provides the output and context seams
pub mod traits;
