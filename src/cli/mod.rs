//! Command Line Interface for selfsigned-ca
// (c) 2024 Ross Younger
mod args;
mod cli_main;
mod commands;
pub(crate) mod styles;
pub use cli_main::cli;

/// Version string, with git hash for non-release builds
pub(crate) const VERSION: &str = env!("SELFSIGNED_CA_VERSION_STRING");
