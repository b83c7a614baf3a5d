//! Error type for the certificate engine and trust store adapters
// (c) 2024 Ross Younger

use std::path::PathBuf;

/// Errors reported by this crate.
///
/// `is_installed` checks never produce these; they report `false` instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A file needed by `load()` does not exist
    #[error("{} not found", path.display())]
    NotFound {
        /// The missing file
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Certificate options could not be used (key size, serial number, alt names...)
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// Signing was requested with an issuer that has no private key material
    #[error("issuer `{0}` has no private key loaded")]
    SigningKeyMissing(String),

    /// A trust store tool could not be run, exited with an error, or wrote to stderr
    #[error("`{command}` failed: {detail}")]
    ExternalCommandFailed {
        /// The command line that was run
        command: String,
        /// Exit status and/or error output
        detail: String,
    },

    /// No trust store implementation exists for this platform
    #[error("trust store operations are not supported on {0}")]
    UnsupportedPlatform(String),

    /// The descriptor has not been created or loaded yet
    #[error("certificate `{0}` has not been created or loaded")]
    Empty(String),

    /// PEM, DER or key material could not be parsed
    #[error("malformed certificate data: {0}")]
    Malformed(String),

    /// Underlying IO error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// X.509 assembly or signing failed
    #[error("certificate generation failed: {0}")]
    Certificate(#[from] rcgen::Error),
}

impl Error {
    /// Maps an IO error on `path`, turning `ErrorKind::NotFound` into [`Error::NotFound`]
    pub(crate) fn from_io(path: &std::path::Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound {
                path: path.to_path_buf(),
                source,
            },
            _ => Error::Io(source),
        }
    }
}

/// Result type for this crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use super::Error;
    use std::io::{Error as IoError, ErrorKind};
    use std::path::Path;

    #[test]
    fn missing_file_maps_to_not_found() {
        let e = Error::from_io(Path::new("cert/x.crt"), IoError::from(ErrorKind::NotFound));
        assert!(matches!(e, Error::NotFound { .. }));
        assert_eq!(e.to_string(), "cert/x.crt not found");
    }

    #[test]
    fn other_io_errors_pass_through() {
        let e = Error::from_io(
            Path::new("cert/x.crt"),
            IoError::from(ErrorKind::PermissionDenied),
        );
        assert!(matches!(e, Error::Io(_)));
    }
}
