//! Configuration structure
// (c) 2024 Ross Younger

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};
use struct_field_names_as_array::FieldNamesAsSlice;

use crate::{
    cert::{CertOptions, SignatureDigest},
    os::TrustStoreConfig,
    util::derive_deftly_template_Optionalify,
};

use derive_deftly::Deftly;

/// The set of configurable options supported by selfsigned-ca.
///
/// **Note:** The implementation of `default()` for this struct returns the hard-wired configuration defaults.
///
/// This structure uses the [Optionalify](derive_deftly_template_Optionalify) deftly macro to automatically
/// define the `Configuration_Optional` struct, which is the same but has all members of type `Option<whatever>`.
/// The CLI uses the `_Optional` version, with everything defaulting to `None`,
/// so wherever the user does not provide a value, values from configuration files and defaults obtain.
///
// Maintainer note: None of the members of this struct should be Option<anything>. That leads to sunspots in the CLI and strange warts (Some(Some(foo))).
#[derive(Deftly)]
#[derive_deftly(Optionalify)]
#[deftly(visibility = "pub(crate)")]
#[derive(Debug, Clone, PartialEq, Eq, Parser, Deserialize, Serialize, FieldNamesAsSlice)]
pub struct Configuration {
    // CERTIFICATES ====================================================================================
    /// Directory that named certificates and keys live in [default: ./cert]
    #[arg(short = 'd', long, value_name("DIR"), help_heading("Certificates"))]
    pub cert_dir: PathBuf,

    /// Validity period of new certificates, in days [default: 365]
    #[arg(long, value_name("days"), help_heading("Certificates"))]
    pub days: u32,

    /// RSA key size for new certificates, in bits [default: 1024]
    ///
    /// 2048 or more is advisable for anything other than local testing.
    #[arg(short = 'k', long, value_name("bits"), help_heading("Certificates"))]
    pub key_size: usize,

    /// Signing digest for new certificates: sha256, sha384 or sha512 [default: sha256]
    ///
    /// Anything else falls back to sha256, with a warning.
    #[arg(short = 'a', long, value_name("digest"), help_heading("Certificates"))]
    pub algorithm: String,

    // TRUST STORE =====================================================================================
    /// (Linux) Directory for extra trusted CA certificates
    /// [default: /usr/share/ca-certificates/extra]
    #[arg(long, value_name("DIR"), help_heading("Trust store"))]
    pub trusted_extra_dir: PathBuf,

    /// (Linux) Command that rebuilds the system certificate bundle
    /// [default: update-ca-certificates]
    ///
    /// This is split on whitespace, so it may carry arguments, e.g. `sudo update-ca-certificates`.
    #[arg(long, value_name("COMMAND"), help_heading("Trust store"))]
    pub refresh_command: String,

    /// (Windows) The certutil executable [default: certutil]
    #[arg(long, value_name("PROGRAM"), help_heading("Trust store"))]
    pub certutil: String,
}

impl Configuration {
    /// Certificate options for new certificates, before any subject or extensions are added
    #[must_use]
    pub fn cert_options(&self) -> CertOptions {
        CertOptions::default()
            .with_days(self.days)
            .with_key_size(self.key_size)
            .with_algorithm(SignatureDigest::from_name(&self.algorithm))
    }

    /// Settings for the OS trust store
    #[must_use]
    pub fn trust_store_config(&self) -> TrustStoreConfig {
        TrustStoreConfig {
            trusted_extra_dir: self.trusted_extra_dir.clone(),
            refresh_command: self.refresh_command.clone(),
            certutil: self.certutil.clone(),
        }
    }
}

impl Default for Configuration {
    /// **(Unusual!)**
    /// Returns the hard-wired configuration defaults.
    fn default() -> Self {
        let store = TrustStoreConfig::default();
        Self {
            cert_dir: crate::cert::DEFAULT_CERT_DIR.into(),
            days: 365,
            key_size: 1024,
            algorithm: SignatureDigest::default().to_string(),
            trusted_extra_dir: store.trusted_extra_dir,
            refresh_command: store.refresh_command,
            certutil: store.certutil,
        }
    }
}
