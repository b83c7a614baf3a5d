//! Named certificate/key pairs, their files, and their trust store status
// (c) 2024 Ross Younger

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use rustls_pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tracing::{debug, info};

use super::builder::{self, Issued, Signer};
use super::{CertOptions, Certificate, KeyPair};
use crate::error::{Error, Result};
use crate::os::{TrustEntry, TrustStore};
use crate::persist;

/// Where [`CertDescriptor::named`] puts files when given a bare name
pub const DEFAULT_CERT_DIR: &str = "./cert";

const CERT_EXTENSIONS: [&str; 3] = ["crt", "cer", "cert"];

/// Lifecycle of a [`CertDescriptor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum State {
    /// Nothing created or loaded
    Empty,
    /// Freshly created, in memory only
    Signed,
    /// Written to its files
    Persisted,
    /// Read from its files
    Loaded,
    /// Installed into a trust store by this descriptor
    Trusted,
}

/// A certificate with its private key, the files they live in, and a name.
///
/// Raw PEM is the source of truth. The parsed certificate, key pair and thumbprint
/// are derived from it on demand and cached; anything that replaces the PEM
/// (creating, loading, [`set_pems`](Self::set_pems)) drops the caches.
///
/// ```
/// use selfsigned_ca::{CertDescriptor, CertOptions, Extension, AltName};
///
/// let mut ca = CertDescriptor::new();
/// ca.create_root_ca("Example CA")?;
///
/// let mut leaf = CertDescriptor::new();
/// leaf.create(
///     CertOptions::from("localhost").with_extension(Extension::alt_names([
///         AltName::Dns("localhost".into()),
///     ])),
///     Some(&ca),
/// )?;
/// assert!(leaf.is_signed_by(&ca)?);
/// # Ok::<(), selfsigned_ca::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct CertDescriptor {
    name: String,
    cert_path: Option<PathBuf>,
    key_path: Option<PathBuf>,
    state: State,

    cert_pem: Option<String>,
    key_pem: Option<String>,

    certificate: Option<Certificate>,
    key_pair: Option<KeyPair>,
    public_pem: Option<String>,
    thumbprint: Option<String>,
}

impl Default for CertDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

impl CertDescriptor {
    /// An empty, unnamed descriptor with no files.
    /// It can create certificates but cannot be saved or loaded.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: String::new(),
            cert_path: None,
            key_path: None,
            state: State::Empty,
            cert_pem: None,
            key_pem: None,
            certificate: None,
            key_pair: None,
            public_pem: None,
            thumbprint: None,
        }
    }

    /// A descriptor for a name or certificate path.
    ///
    /// * A `.crt`, `.cer` or `.cert` extension is taken as the certificate file;
    ///   anything else is a name, and `.crt` is appended.
    /// * The key goes alongside, as `{name}.key`.
    /// * A bare name with no directory lives in [`DEFAULT_CERT_DIR`].
    ///
    /// For example `my-ca` becomes `./cert/my-ca.crt` and `./cert/my-ca.key`,
    /// while `/tmp/leaf.cer` becomes `/tmp/leaf.cer` and `/tmp/leaf.key`.
    #[must_use]
    pub fn named<P: AsRef<Path>>(name_or_path: P) -> Self {
        let p = name_or_path.as_ref();
        match p.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                let file = p.file_name().map(PathBuf::from).unwrap_or_default();
                Self::in_dir(dir, file)
            }
            _ => Self::in_dir(DEFAULT_CERT_DIR, p),
        }
    }

    /// Like [`named`](Self::named), but relative to `dir`
    #[must_use]
    pub fn in_dir<D: AsRef<Path>, P: AsRef<Path>>(dir: D, name_or_file: P) -> Self {
        let dir = dir.as_ref();
        let file = name_or_file.as_ref();
        let is_cert_file = file
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| CERT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));

        let (name, cert_file) = if is_cert_file {
            let stem = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            (stem, file.to_path_buf())
        } else {
            let name = file.to_string_lossy().into_owned();
            let cert_file = PathBuf::from(format!("{name}.crt"));
            (name, cert_file)
        };
        let key_path = dir.join(format!("{name}.key"));
        Self {
            name,
            cert_path: Some(dir.join(cert_file)),
            key_path: Some(key_path),
            ..Self::new()
        }
    }

    /// A descriptor with explicit file paths. The name is the certificate file's stem.
    #[must_use]
    pub fn with_paths<C: AsRef<Path>, K: AsRef<Path>>(cert_path: C, key_path: K) -> Self {
        let cert_path = cert_path.as_ref().to_path_buf();
        let name = cert_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            cert_path: Some(cert_path),
            key_path: Some(key_path.as_ref().to_path_buf()),
            ..Self::new()
        }
    }

    /// The descriptor's name (empty if unnamed)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Certificate file
    #[must_use]
    pub fn cert_path(&self) -> Option<&Path> {
        self.cert_path.as_deref()
    }

    /// Private key file
    #[must_use]
    pub fn key_path(&self) -> Option<&Path> {
        self.key_path.as_deref()
    }

    /// Where this descriptor is in its lifecycle
    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// Creates a new self-signed root CA, replacing whatever this descriptor held.
    ///
    /// `options` may be a [`CertOptions`] or just a common name.
    pub fn create_root_ca<O: Into<CertOptions>>(&mut self, options: O) -> Result<&mut Self> {
        let options = options.into();
        let issued = builder::create_root_ca(&options)?;
        self.adopt(issued)?;
        info!("created root CA {}", self.display_name());
        Ok(self)
    }

    /// Creates a new certificate, replacing whatever this descriptor held.
    ///
    /// It is signed by `issuer` (which must have its private key) or, if `None`, self-signed.
    /// `options` may be a [`CertOptions`] or just a common name.
    pub fn create<O: Into<CertOptions>>(
        &mut self,
        options: O,
        issuer: Option<&CertDescriptor>,
    ) -> Result<&mut Self> {
        let options = options.into();
        let signer = issuer.map(CertDescriptor::signer).transpose()?;
        let issued = builder::create(&options, signer.as_ref())?;
        self.adopt(issued)?;
        match issuer {
            Some(i) => info!(
                "created {} signed by {}",
                self.display_name(),
                i.display_name()
            ),
            None => info!("created self-signed {}", self.display_name()),
        }
        Ok(self)
    }

    fn adopt(&mut self, issued: Issued) -> Result<()> {
        let Issued {
            certificate,
            cert_pem,
            key_pair,
        } = issued;
        self.cert_pem = Some(cert_pem);
        self.key_pem = Some(key_pair.private_pem()?);
        self.public_pem = Some(key_pair.public_pem()?);
        self.thumbprint = None;
        self.certificate = Some(certificate);
        self.key_pair = Some(key_pair);
        self.state = State::Signed;
        Ok(())
    }

    /// Replaces the raw PEM, dropping every cached value derived from it.
    /// Parsing is deferred until something needs it.
    pub fn set_pems(&mut self, cert_pem: String, key_pem: Option<String>) {
        self.cert_pem = Some(cert_pem);
        self.key_pem = key_pem;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.certificate = None;
        self.key_pair = None;
        self.public_pem = None;
        self.thumbprint = None;
    }

    /// Parses the raw PEM into the cached certificate and key pair, if not done already.
    pub fn ensure_parsed(&mut self) -> Result<()> {
        let Some(cert_pem) = &self.cert_pem else {
            return Err(Error::Empty(self.display_name()));
        };
        if self.certificate.is_none() {
            self.certificate = Some(Certificate::from_pem(cert_pem)?);
        }
        if self.key_pair.is_none() {
            if let Some(key_pem) = &self.key_pem {
                let kp = KeyPair::from_pem(key_pem)?;
                self.public_pem = Some(kp.public_pem()?);
                self.key_pair = Some(kp);
            }
        }
        Ok(())
    }

    /// The parsed certificate, if it has been parsed
    #[must_use]
    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    /// The parsed key pair, if there is one and it has been parsed
    #[must_use]
    pub fn key_pair(&self) -> Option<&KeyPair> {
        self.key_pair.as_ref()
    }

    /// Certificate PEM
    #[must_use]
    pub fn cert_pem(&self) -> Option<&str> {
        self.cert_pem.as_deref()
    }

    /// Private key PEM (PKCS#8 for keys we generated)
    #[must_use]
    pub fn key_pem(&self) -> Option<&str> {
        self.key_pem.as_deref()
    }

    /// Same as [`key_pem`](Self::key_pem)
    #[must_use]
    pub fn private_pem(&self) -> Option<&str> {
        self.key_pem()
    }

    /// Public key PEM, derived from the private key
    pub fn public_pem(&mut self) -> Result<Option<&str>> {
        self.ensure_parsed()?;
        Ok(self.public_pem.as_deref())
    }

    /// Serial number, lowercase hex
    pub fn serial_number(&mut self) -> Result<&str> {
        Ok(self.parsed()?.serial_number())
    }

    /// SHA-1 thumbprint of the certificate, lowercase hex. Computed once, then cached.
    pub fn thumbprint(&mut self) -> Result<&str> {
        if self.thumbprint.is_none() {
            let t = self.parsed()?.thumbprint();
            self.thumbprint = Some(t);
        }
        Ok(self.thumbprint.as_deref().unwrap_or_default())
    }

    /// Same as [`thumbprint`](Self::thumbprint)
    pub fn hash(&mut self) -> Result<&str> {
        self.thumbprint()
    }

    fn parsed(&mut self) -> Result<&Certificate> {
        self.ensure_parsed()?;
        self.certificate
            .as_ref()
            .ok_or_else(|| Error::Empty(self.display_name()))
    }

    /// Checks that this certificate was signed by `issuer`'s key
    pub fn is_signed_by(&mut self, issuer: &CertDescriptor) -> Result<bool> {
        let issuer_cert = issuer.parsed_certificate()?;
        let ours = self.parsed()?;
        ours.is_signed_by(&issuer_cert)
    }

    /// Certificate chain and private key, ready for a TLS stack
    pub fn tls_credentials(
        &mut self,
    ) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
        self.ensure_parsed()?;
        let (Some(cert), Some(kp)) = (&self.certificate, &self.key_pair) else {
            return Err(Error::SigningKeyMissing(self.display_name()));
        };
        Ok((
            vec![cert.to_certificate_der()],
            PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(kp.private_der()?)),
        ))
    }

    /// The parsed certificate, borrowed if already cached
    fn parsed_certificate(&self) -> Result<Cow<'_, Certificate>> {
        match (&self.certificate, &self.cert_pem) {
            (Some(c), _) => Ok(Cow::Borrowed(c)),
            (None, Some(pem)) => Ok(Cow::Owned(Certificate::from_pem(pem)?)),
            (None, None) => Err(Error::Empty(self.display_name())),
        }
    }

    /// Signing material for issuing certificates under this one
    fn signer(&self) -> Result<Signer<'_>> {
        let Some(cert_pem) = self.cert_pem.as_deref() else {
            return Err(Error::Empty(self.display_name()));
        };
        let key = match (&self.key_pair, &self.key_pem) {
            (Some(k), _) => Cow::Borrowed(k),
            (None, Some(pem)) => Cow::Owned(KeyPair::from_pem(pem)?),
            (None, None) => return Err(Error::SigningKeyMissing(self.display_name())),
        };
        Ok(Signer {
            name: &self.name,
            cert_pem,
            certificate: self.parsed_certificate()?,
            key,
        })
    }

    fn paths(&self) -> Result<(&Path, &Path)> {
        match (&self.cert_path, &self.key_path) {
            (Some(c), Some(k)) => Ok((c, k)),
            _ => Err(Error::InvalidOptions(format!(
                "certificate {} has no file paths",
                self.display_name()
            ))),
        }
    }

    /// Writes the certificate and key PEM to their files, creating directories as needed
    pub async fn save(&mut self) -> Result<()> {
        let (cert_path, key_path) = self.paths()?;
        let (Some(cert_pem), Some(key_pem)) = (&self.cert_pem, &self.key_pem) else {
            return Err(Error::Empty(self.display_name()));
        };
        persist::save(cert_path, cert_pem, key_path, key_pem).await?;
        debug!("saved {} to {}", self.display_name(), cert_path.display());
        if self.state == State::Signed {
            self.state = State::Persisted;
        }
        Ok(())
    }

    /// Reads the certificate and key PEM from their files.
    ///
    /// The PEM is parsed lazily; a damaged file is reported by whatever first needs it.
    pub async fn load(&mut self) -> Result<()> {
        let (cert_path, key_path) = self.paths()?;
        let (cert_pem, key_pem) = persist::load(cert_path, key_path).await?;
        debug!("loaded {} from {}", self.display_name(), cert_path.display());
        self.set_pems(cert_pem, Some(key_pem));
        self.state = State::Loaded;
        Ok(())
    }

    /// Snapshot of what a trust store needs
    pub fn trust_entry(&mut self) -> Result<TrustEntry> {
        let thumbprint = self.thumbprint()?.to_string();
        let serial_number = self.serial_number()?.to_string();
        Ok(TrustEntry {
            name: self.name.clone(),
            cert_path: self.cert_path.clone(),
            cert_pem: self.cert_pem.clone().unwrap_or_default(),
            serial_number,
            thumbprint,
        })
    }

    /// Saves the certificate (if it has paths), then adds it to `store` as a trusted root
    pub async fn install(&mut self, store: &dyn TrustStore) -> Result<()> {
        if self.cert_path.is_some() {
            self.save().await?;
        }
        let entry = self.trust_entry()?;
        store.install(&entry).await?;
        self.state = State::Trusted;
        Ok(())
    }

    /// Is this certificate in `store`?
    ///
    /// Loads from file first if nothing is held. Any failure along the way means `false`.
    pub async fn is_installed(&mut self, store: &dyn TrustStore) -> bool {
        if self.cert_pem.is_none() {
            if let Err(e) = self.load().await {
                debug!("{}: {e}", self.display_name());
                return false;
            }
        }
        match self.trust_entry() {
            Ok(entry) => store.is_installed(&entry).await,
            Err(e) => {
                debug!("{}: {e}", self.display_name());
                false
            }
        }
    }

    /// Removes this certificate from `store`. Returns whether anything was removed.
    /// The certificate files are left alone.
    pub async fn uninstall(&mut self, store: &dyn TrustStore) -> Result<bool> {
        if self.cert_pem.is_none() {
            self.load().await?;
        }
        let entry = self.trust_entry()?;
        let removed = store.delete(&entry).await?;
        if removed && self.state == State::Trusted {
            self.state = State::Loaded;
        }
        Ok(removed)
    }

    fn display_name(&self) -> String {
        if self.name.is_empty() {
            "(unnamed)".into()
        } else {
            format!("`{}`", self.name)
        }
    }
}

/// Creates a root CA in a new, unnamed descriptor
pub fn create_root_ca<O: Into<CertOptions>>(options: O) -> Result<CertDescriptor> {
    let mut d = CertDescriptor::new();
    let _ = d.create_root_ca(options)?;
    Ok(d)
}

/// Creates a certificate in a new, unnamed descriptor, signed by `issuer` or self-signed
pub fn create<O: Into<CertOptions>>(
    options: O,
    issuer: Option<&CertDescriptor>,
) -> Result<CertDescriptor> {
    let mut d = CertDescriptor::new();
    let _ = d.create(options, issuer)?;
    Ok(d)
}
