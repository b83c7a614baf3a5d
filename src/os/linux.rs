// OS trust store - Linux implementation
// (c) 2024 Ross Younger

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, trace, warn};

use super::{run, split_command, Platform, TrustEntry, TrustStore};
use crate::cert::Certificate;
use crate::error::{Error, Result};
use crate::persist;

/// A directory of extra trusted CAs, folded into the system bundle by a refresh command
/// (`update-ca-certificates` on Debian and friends).
#[derive(Debug, Clone)]
pub struct LinuxStore {
    extra_dir: PathBuf,
    refresh_command: String,
}

impl LinuxStore {
    /// Constructor
    #[must_use]
    pub fn new<P: AsRef<Path>>(extra_dir: P, refresh_command: &str) -> Self {
        Self {
            extra_dir: extra_dir.as_ref().to_path_buf(),
            refresh_command: refresh_command.to_string(),
        }
    }

    /// The file a certificate is installed as: `{name}.crt`, or `{serial}.crt` if it has no name
    #[must_use]
    pub fn path_for(&self, entry: &TrustEntry) -> PathBuf {
        let stem = if entry.name.is_empty() {
            &entry.serial_number
        } else {
            &entry.name
        };
        self.extra_dir.join(format!("{stem}.crt"))
    }

    async fn refresh(&self) -> Result<()> {
        let Some((program, args)) = split_command(&self.refresh_command) else {
            debug!("no refresh command configured");
            return Ok(());
        };
        let out = run(program, &args[..]).await?;
        trace!("{program}: {}", out.trim());
        Ok(())
    }

    /// Looks through the extras directory for a certificate with this serial number.
    /// Files that are not certificates are skipped. A missing directory holds nothing.
    async fn find_by_serial(&self, serial: &str) -> Result<Option<PathBuf>> {
        let mut dir = match tokio::fs::read_dir(&self.extra_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!("{} does not exist", self.extra_dir.display());
                return Ok(None);
            }
            Err(e) => return Err(Error::from_io(&self.extra_dir, e)),
        };
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if !item.file_type().await?.is_file() {
                continue;
            }
            let Ok(pem) = tokio::fs::read_to_string(&path).await else {
                continue;
            };
            match Certificate::from_pem(&pem) {
                Ok(cert) if cert.serial_number() == serial => return Ok(Some(path)),
                Ok(_) => (),
                Err(e) => trace!("skipping {}: {e}", path.display()),
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl TrustStore for LinuxStore {
    fn platform(&self) -> Platform {
        Platform::Linux
    }

    async fn install(&self, entry: &TrustEntry) -> Result<()> {
        persist::ensure_directory(&self.extra_dir).await?;
        let path = self.path_for(entry);
        tokio::fs::write(&path, &entry.cert_pem)
            .await
            .map_err(|e| Error::from_io(&path, e))?;
        self.refresh().await?;
        info!("installed `{}` as {}", entry.name, path.display());
        Ok(())
    }

    async fn is_installed(&self, entry: &TrustEntry) -> bool {
        match self.find_by_serial(&entry.serial_number).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                debug!("could not search {}: {e}", self.extra_dir.display());
                false
            }
        }
    }

    async fn delete(&self, entry: &TrustEntry) -> Result<bool> {
        let Some(path) = self.find_by_serial(&entry.serial_number).await? else {
            warn!("`{}` is not in {}", entry.name, self.extra_dir.display());
            return Ok(false);
        };
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| Error::from_io(&path, e))?;
        self.refresh().await?;
        info!("removed {}", path.display());
        Ok(true)
    }
}

#[cfg(all(test, unix))]
mod test {
    use super::LinuxStore;
    use crate::cert::{create_root_ca, CertDescriptor};
    use crate::error::Error;
    use crate::os::{Platform, TrustStore as _};

    fn entry(name: &str) -> crate::os::TrustEntry {
        let mut d = CertDescriptor::named(name);
        let _ = d.create_root_ca(name).unwrap();
        d.trust_entry().unwrap()
    }

    #[tokio::test]
    async fn install_find_delete() {
        let dir = tempfile::tempdir().unwrap();
        let extra = dir.path().join("extra");
        let store = LinuxStore::new(&extra, "true");
        assert_eq!(store.platform(), Platform::Linux);
        let e = entry("test-ca");

        // directory doesn't exist yet
        assert!(!store.is_installed(&e).await);

        store.install(&e).await.unwrap();
        let path = extra.join("test-ca.crt");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), e.cert_pem);
        assert!(store.is_installed(&e).await);

        // reinstall is harmless
        store.install(&e).await.unwrap();

        assert!(store.delete(&e).await.unwrap());
        assert!(!path.exists());
        assert!(!store.is_installed(&e).await);
        assert!(!store.delete(&e).await.unwrap());
    }

    #[tokio::test]
    async fn junk_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("junk.crt"), "not a cert").unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();
        let store = LinuxStore::new(dir.path(), "true");
        let e = entry("wanted");
        assert!(!store.is_installed(&e).await);
        store.install(&e).await.unwrap();
        assert!(store.is_installed(&e).await);
        assert!(!store.is_installed(&entry("other")).await);
    }

    #[tokio::test]
    async fn delete_without_directory_is_false() {
        let dir = tempfile::tempdir().unwrap();
        let extra = dir.path().join("never-created");
        let store = LinuxStore::new(&extra, "true");
        let e = entry("absent");
        assert!(!store.delete(&e).await.unwrap());
        assert!(!store.is_installed(&e).await);
        assert!(!extra.exists());
    }

    #[tokio::test]
    async fn unnamed_certificates_are_filed_by_serial() {
        let dir = tempfile::tempdir().unwrap();
        let store = LinuxStore::new(dir.path(), "true");
        let mut first = create_root_ca("first").unwrap();
        let mut second = create_root_ca("second").unwrap();
        first.install(&store).await.unwrap();
        second.install(&store).await.unwrap();

        for d in [&mut first, &mut second] {
            let e = d.trust_entry().unwrap();
            assert_eq!(e.name, "");
            let path = store.path_for(&e);
            assert_eq!(path, dir.path().join(format!("{}.crt", e.serial_number)));
            assert_eq!(std::fs::read_to_string(&path).unwrap(), e.cert_pem);
            assert!(store.is_installed(&e).await);
        }
        assert!(!dir.path().join(".crt").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn failing_refresh_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = LinuxStore::new(dir.path(), "false");
        let r = store.install(&entry("x")).await;
        assert!(matches!(r, Err(Error::ExternalCommandFailed { .. })));
    }
}
