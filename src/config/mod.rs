// (c) 2024 Ross Younger
//! # Configuration management
//!
//! selfsigned-ca obtains run-time configuration from the following sources, in order:
//! 1. Command-line options
//! 2. A file named with `--config`
//! 3. The user's configuration file (typically `~/.selfsigned-ca.toml`)
//! 4. The system-wide configuration file (typically `/etc/selfsigned-ca.toml`)
//! 5. Hard-wired defaults
//!
//! Each option may appear in multiple places, but only the first match is used.
//!
//! **Note** Configuration file locations are platform-dependent.
//! To see what applies on the current platform, run `selfsigned-ca --config-files`.
//!
//! ## File format
//!
//! Configuration files are [TOML](https://toml.io/). Keys are the field names of [Configuration].
//!
//! ### Example
//!
//! ```toml
//! cert_dir = "/srv/dev-certs"
//! days = 9999
//! key_size = 2048
//!
//! # Debian-style trust store, but we need sudo
//! refresh_command = "sudo update-ca-certificates"
//! ```
//!
//! ## Configurable options
//!
//! The full list of supported fields is defined by [Configuration].
//!
//! On the command line:
//! * `selfsigned-ca --show-config` outputs a list of supported fields, their current values, and where each value came from.
//! * For an explanation of each field, refer to `selfsigned-ca --help` .
//! * `selfsigned-ca --config-files` outputs the list of configuration files for the current user and platform.

mod structure;
pub use structure::Configuration;
pub(crate) use structure::Configuration_Optional;

mod manager;
pub use manager::Manager;

pub(crate) const BASE_CONFIG_FILENAME: &str = "selfsigned-ca.toml";
