// OS trust store - Windows implementation
// (c) 2024 Ross Younger

use std::ffi::OsStr;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{run, Platform, TrustEntry, TrustStore};
use crate::error::Result;

/// The current user's trusted root store, driven through `certutil`
#[derive(Debug, Clone)]
pub struct WindowsStore {
    certutil: String,
}

impl WindowsStore {
    /// Constructor; `certutil` is the executable to run
    #[must_use]
    pub fn new(certutil: &str) -> Self {
        Self {
            certutil: certutil.to_string(),
        }
    }

    async fn verify(&self, serial: &str) -> Result<String> {
        run(&self.certutil, &["-verifystore", "-user", "root", serial]).await
    }
}

/// Does `certutil -verifystore` output mention this thumbprint?
///
/// certutil prints the hash in groups separated by spaces, in either case.
fn output_has_thumbprint(output: &str, thumbprint: &str) -> bool {
    let flat = output
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    !thumbprint.is_empty() && flat.contains(&thumbprint.to_ascii_lowercase())
}

#[async_trait]
impl TrustStore for WindowsStore {
    fn platform(&self) -> Platform {
        Platform::Windows
    }

    async fn install(&self, entry: &TrustEntry) -> Result<()> {
        // certutil wants a file; use the saved one if there is one.
        // A temporary file is removed when `_temp` drops.
        let (path, _temp) = match entry.cert_path.as_ref().filter(|p| p.is_file()) {
            Some(p) => (p.clone(), None),
            None => {
                let temp = tempfile::Builder::new()
                    .prefix("temp-")
                    .suffix(".crt")
                    .tempfile()?;
                tokio::fs::write(temp.path(), &entry.cert_pem).await?;
                (temp.path().to_path_buf(), Some(temp))
            }
        };
        let _ = run(
            &self.certutil,
            &[
                OsStr::new("-addstore"),
                OsStr::new("-user"),
                OsStr::new("-f"),
                OsStr::new("root"),
                path.as_os_str(),
            ],
        )
        .await?;
        info!("installed `{}` into the user root store", entry.name);
        Ok(())
    }

    async fn is_installed(&self, entry: &TrustEntry) -> bool {
        match self.verify(&entry.serial_number).await {
            Ok(out) => output_has_thumbprint(&out, &entry.thumbprint),
            Err(e) => {
                debug!("`{}` not found in user root store: {e}", entry.name);
                false
            }
        }
    }

    async fn delete(&self, entry: &TrustEntry) -> Result<bool> {
        if !self.is_installed(entry).await {
            warn!("`{}` is not in the user root store", entry.name);
            return Ok(false);
        }
        let _ = run(
            &self.certutil,
            &["-delstore", "-user", "root", entry.serial_number.as_str()],
        )
        .await?;
        info!("removed `{}` from the user root store", entry.name);
        Ok(true)
    }
}

#[cfg(test)]
mod test {
    use super::{output_has_thumbprint, WindowsStore};
    use crate::os::{Platform, TrustEntry, TrustStore as _};

    const THUMB: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";

    #[test]
    fn thumbprint_matching() {
        let out = "root \"Trusted Root Certification Authorities\"\r\n\
            ================ Certificate 0 ================\r\n\
            Serial Number: 0a1b2c\r\n\
            Cert Hash(sha1): a9 99 3e 36 47 06 81 6a ba 3e 25 71 78 50 c2 6c 9c d0 d8 9d\r\n\
            CertUtil: -verifystore command completed successfully.\r\n";
        assert!(output_has_thumbprint(out, THUMB));
        assert!(output_has_thumbprint(&out.to_uppercase(), THUMB));
        assert!(!output_has_thumbprint(out, "0000"));
        assert!(!output_has_thumbprint(out, ""));
    }

    #[tokio::test]
    async fn missing_tool_means_not_installed() {
        let store = WindowsStore::new("certutil-that-is-not-there");
        assert_eq!(store.platform(), Platform::Windows);
        let entry = TrustEntry {
            name: "x".into(),
            cert_path: None,
            cert_pem: String::new(),
            serial_number: "01".into(),
            thumbprint: THUMB.into(),
        };
        assert!(!store.is_installed(&entry).await);
        assert!(!store.delete(&entry).await.unwrap());
        assert!(store.install(&entry).await.is_err());
    }

    /// Writes a stand-in for certutil that records its arguments
    /// and copies the certificate file it was given.
    #[cfg(unix)]
    fn fake_certutil(dir: &std::path::Path) -> WindowsStore {
        use std::os::unix::fs::PermissionsExt as _;
        let script = dir.join("certutil.sh");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\necho \"$@\" > '{}'\ncp \"$5\" '{}'\n",
                dir.join("args").display(),
                dir.join("seen.crt").display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        WindowsStore::new(&script.to_string_lossy())
    }

    #[cfg(unix)]
    fn recorded_args(dir: &std::path::Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("args"))
            .unwrap()
            .split_whitespace()
            .map(String::from)
            .collect()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn install_from_memory_uses_a_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = fake_certutil(dir.path());
        let entry = TrustEntry {
            name: "in-memory".into(),
            cert_path: None,
            cert_pem: "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n".into(),
            serial_number: "01".into(),
            thumbprint: THUMB.into(),
        };
        store.install(&entry).await.unwrap();

        let args = recorded_args(dir.path());
        assert_eq!(args[..4], ["-addstore", "-user", "-f", "root"]);
        assert_eq!(args.len(), 5);
        let temp = std::path::Path::new(&args[4]);
        let file_name = temp.file_name().unwrap().to_string_lossy();
        assert!(file_name.starts_with("temp-"));
        assert!(file_name.ends_with(".crt"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("seen.crt")).unwrap(),
            entry.cert_pem
        );
        // cleaned up afterwards
        assert!(!temp.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn install_prefers_the_saved_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = fake_certutil(dir.path());
        let saved = dir.path().join("saved.crt");
        std::fs::write(&saved, "saved pem").unwrap();
        let entry = TrustEntry {
            name: "saved".into(),
            cert_path: Some(saved.clone()),
            cert_pem: "other pem".into(),
            serial_number: "01".into(),
            thumbprint: THUMB.into(),
        };
        store.install(&entry).await.unwrap();

        let args = recorded_args(dir.path());
        assert_eq!(args[4], saved.to_string_lossy());
        assert!(saved.exists());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("seen.crt")).unwrap(),
            "saved pem"
        );
    }
}
