//! OS trust store abstraction layer
// (c) 2024 Ross Younger

use std::ffi::OsStr;
use std::fmt::Debug;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Error, Result};

mod linux;
mod unsupported;
mod windows;

pub use linux::LinuxStore;
pub use unsupported::UnsupportedStore;
pub use windows::WindowsStore;

/// What a trust store needs to know about a certificate.
///
/// This is a snapshot taken from a [`CertDescriptor`](crate::CertDescriptor)
/// (see [`CertDescriptor::trust_entry`](crate::CertDescriptor::trust_entry)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustEntry {
    /// The certificate's name; Linux stores it as `{name}.crt`
    pub name: String,
    /// Where the certificate lives on disk, if it has been saved
    pub cert_path: Option<PathBuf>,
    /// Certificate PEM
    pub cert_pem: String,
    /// Serial number, lowercase hex
    pub serial_number: String,
    /// SHA-1 thumbprint, lowercase hex
    pub thumbprint: String,
}

/// Platform-specific trust store operations.
///
/// Implementations exist for Windows (`certutil`, current user's root store),
/// Linux (a CA extras directory plus a refresh command) and everything else
/// (which refuses to install).
///
/// Usage:
/// ```no_run
/// # async fn f() -> selfsigned_ca::Result<()> {
/// use selfsigned_ca::os::{Platform, TrustStoreConfig};
/// let store = Platform::current().trust_store(&TrustStoreConfig::default());
/// let mut ca = selfsigned_ca::CertDescriptor::named("my-root-ca");
/// ca.create_root_ca("My Root CA")?;
/// ca.install(store.as_ref()).await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait TrustStore: Send + Sync + Debug {
    /// The platform this store belongs to
    fn platform(&self) -> Platform;

    /// Adds the certificate to the store as a trusted root.
    /// Installing the same certificate twice is harmless.
    async fn install(&self, entry: &TrustEntry) -> Result<()>;

    /// Reports whether the store holds this exact certificate.
    ///
    /// Failures to query the store are logged and reported as `false`.
    async fn is_installed(&self, entry: &TrustEntry) -> bool;

    /// Removes the certificate from the store.
    /// Returns whether anything was removed.
    async fn delete(&self, entry: &TrustEntry) -> Result<bool>;
}

/// The trust store flavours we know about
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::VariantNames,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Platform {
    /// Windows: per-user root store via `certutil`
    Windows,
    /// Linux: `update-ca-certificates` style extras directory
    Linux,
    /// Anything else; trust store operations are refused
    Unsupported,
}

impl Platform {
    /// Detects the platform we are running on
    #[must_use]
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Unsupported
        }
    }

    /// Constructs the trust store for this platform
    #[must_use]
    pub fn trust_store(self, config: &TrustStoreConfig) -> Box<dyn TrustStore> {
        debug!("using {self} trust store");
        match self {
            Platform::Windows => Box::new(WindowsStore::new(&config.certutil)),
            Platform::Linux => Box::new(LinuxStore::new(
                &config.trusted_extra_dir,
                &config.refresh_command,
            )),
            Platform::Unsupported => Box::new(UnsupportedStore::new(std::env::consts::OS)),
        }
    }
}

/// Trust store tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustStoreConfig {
    /// Linux: directory for extra trusted CA certificates
    pub trusted_extra_dir: PathBuf,
    /// Linux: command that rebuilds the system bundle (split on whitespace)
    pub refresh_command: String,
    /// Windows: the certutil executable
    pub certutil: String,
}

impl Default for TrustStoreConfig {
    fn default() -> Self {
        Self {
            trusted_extra_dir: PathBuf::from("/usr/share/ca-certificates/extra"),
            refresh_command: "update-ca-certificates".into(),
            certutil: "certutil".into(),
        }
    }
}

/// Runs an external tool to completion, returning its stdout.
///
/// Fails with [`Error::ExternalCommandFailed`] if the tool cannot be started,
/// exits unsuccessfully, or writes anything to stderr.
pub(crate) async fn run<S: AsRef<OsStr>>(program: &str, args: &[S]) -> Result<String> {
    let command = std::iter::once(program.to_string())
        .chain(args.iter().map(|a| a.as_ref().to_string_lossy().into_owned()))
        .collect::<Vec<_>>()
        .join(" ");
    trace!("running {command}");

    let output = tokio::process::Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| Error::ExternalCommandFailed {
            command: command.clone(),
            detail: e.to_string(),
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if !output.status.success() {
        return Err(Error::ExternalCommandFailed {
            command,
            detail: if stderr.is_empty() {
                output.status.to_string()
            } else {
                format!("{}: {stderr}", output.status)
            },
        });
    }
    if !stderr.is_empty() {
        return Err(Error::ExternalCommandFailed {
            command,
            detail: stderr.to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Splits a configured command line into program and arguments
pub(crate) fn split_command(line: &str) -> Option<(&str, Vec<&str>)> {
    let mut words = line.split_whitespace();
    let program = words.next()?;
    Some((program, words.collect()))
}

#[cfg(test)]
mod test {
    use super::{run, split_command, Platform};
    use crate::error::Error;

    #[test]
    fn platform_detection() {
        let p = Platform::current();
        #[cfg(target_os = "linux")]
        assert_eq!(p, Platform::Linux);
        #[cfg(windows)]
        assert_eq!(p, Platform::Windows);
        assert_eq!("LINUX".parse::<Platform>().unwrap(), Platform::Linux);
    }

    #[test]
    fn command_splitting() {
        assert_eq!(
            split_command("sudo  update-ca-certificates --fresh"),
            Some(("sudo", vec!["update-ca-certificates", "--fresh"]))
        );
        assert_eq!(split_command("   "), None);
    }

    #[tokio::test]
    async fn missing_program_is_command_failure() {
        let r = run::<&str>("this-program-does-not-exist-4b1d", &[]).await;
        assert!(matches!(r, Err(Error::ExternalCommandFailed { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdout_is_returned() {
        assert_eq!(run("echo", &["hello"]).await.unwrap(), "hello\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failure_and_stderr_are_errors() {
        assert!(matches!(
            run::<&str>("false", &[]).await,
            Err(Error::ExternalCommandFailed { .. })
        ));
        let r = run("sh", &["-c", "echo oops >&2"]).await;
        match r {
            Err(Error::ExternalCommandFailed { detail, .. }) => assert_eq!(detail, "oops"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
