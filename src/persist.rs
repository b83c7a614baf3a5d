//! Saving and loading certificate/key file pairs
// (c) 2024 Ross Younger

use std::io::ErrorKind;
use std::path::Path;

use tokio::io::AsyncWriteExt as _;
use tracing::trace;

use crate::error::{Error, Result};

/// Creates a directory and any missing parents.
///
/// Safe to call repeatedly and concurrently; a directory that already exists is not an error.
pub async fn ensure_directory(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    match tokio::fs::create_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(Error::from_io(dir, e)),
    }
}

/// Writes one file, creating its parent directory first.
/// Private keys are created owner-readable only, where the platform supports it.
async fn write_file(path: &Path, contents: &str, private: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent).await?;
    }
    let mut options = tokio::fs::OpenOptions::new();
    let _ = options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    if private {
        let _ = options.mode(0o600);
    }
    #[cfg(not(unix))]
    let _ = private;

    let mut file = options
        .open(path)
        .await
        .map_err(|e| Error::from_io(path, e))?;
    file.write_all(contents.as_bytes()).await?;
    file.flush().await?;
    trace!("wrote {}", path.display());
    Ok(())
}

/// Writes a certificate and its private key, concurrently.
///
/// There is no rollback: if one write fails, the other file may have been written.
pub async fn save(cert_path: &Path, cert_pem: &str, key_path: &Path, key_pem: &str) -> Result<()> {
    let _ = tokio::try_join!(
        write_file(cert_path, cert_pem, false),
        write_file(key_path, key_pem, true),
    )?;
    Ok(())
}

/// Reads a certificate and its private key, concurrently.
///
/// Returns `(cert_pem, key_pem)`. A missing file is [`Error::NotFound`].
pub async fn load(cert_path: &Path, key_path: &Path) -> Result<(String, String)> {
    let read = |path: &Path| {
        let path = path.to_path_buf();
        async move {
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::from_io(&path, e))
        }
    };
    tokio::try_join!(read(cert_path), read(key_path))
}
