//! Certificate creation options
// (c) 2024 Ross Younger

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantNames};
use tracing::warn;

use super::{Extension, Subject};

/// Signing digest for a certificate's RSA signature.
///
/// Parsing is lenient by policy: an unrecognised name (including digests we
/// deliberately do not sign with, such as `sha1` and `md5`) selects the default,
/// `sha256`, and logs a warning.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, VariantNames, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(from = "String", into = "String")]
pub enum SignatureDigest {
    /// SHA-256 (the default)
    #[default]
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl SignatureDigest {
    /// Looks up a digest by name, falling back to the default for anything unrecognised
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            let fallback = Self::default();
            warn!("unrecognised signing algorithm {name:?}, using {fallback}");
            fallback
        })
    }

    pub(crate) fn rcgen_algorithm(self) -> &'static rcgen::SignatureAlgorithm {
        match self {
            SignatureDigest::Sha256 => &rcgen::PKCS_RSA_SHA256,
            SignatureDigest::Sha384 => &rcgen::PKCS_RSA_SHA384,
            SignatureDigest::Sha512 => &rcgen::PKCS_RSA_SHA512,
        }
    }
}

impl From<String> for SignatureDigest {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<SignatureDigest> for String {
    fn from(d: SignatureDigest) -> Self {
        d.to_string()
    }
}

/// Options for creating a certificate.
///
/// This is an immutable value; every field has a typed default (see [`CertOptions::default`]).
/// Deserializing from a partial record fills the missing fields with their defaults.
///
/// A bare string converts to options carrying only that common name:
/// `CertOptions::from("localhost")` is the same as
/// `CertOptions::default().with_subject(Subject::common_name("localhost"))`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct CertOptions {
    /// Validity period in days [default: 365]
    pub days: u32,
    /// RSA key size in bits [default: 1024]. 2048 or more is advisable in practice.
    pub key_size: usize,
    /// Signing digest [default: sha256]
    pub algorithm: SignatureDigest,
    /// Serial number as hex; a random one is generated when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Subject name; the default identity is used when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,
    /// Issuer name; only used when creating a root CA. Defaults to the subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<Subject>,
    /// Extensions, appended to the fixed CA set for root CAs, or used verbatim for other certificates
    pub extensions: Vec<Extension>,
}

impl Default for CertOptions {
    fn default() -> Self {
        Self {
            days: 365,
            key_size: 1024,
            algorithm: SignatureDigest::Sha256,
            serial_number: None,
            subject: None,
            issuer: None,
            extensions: Vec::new(),
        }
    }
}

impl CertOptions {
    /// Sets the validity period
    #[must_use]
    pub fn with_days(self, days: u32) -> Self {
        Self { days, ..self }
    }

    /// Sets the RSA key size
    #[must_use]
    pub fn with_key_size(self, key_size: usize) -> Self {
        Self { key_size, ..self }
    }

    /// Sets the signing digest
    #[must_use]
    pub fn with_algorithm(self, algorithm: SignatureDigest) -> Self {
        Self { algorithm, ..self }
    }

    /// Sets a fixed serial number (hex)
    #[must_use]
    pub fn with_serial_number<S: Into<String>>(self, serial: S) -> Self {
        Self {
            serial_number: Some(serial.into()),
            ..self
        }
    }

    /// Sets the subject
    #[must_use]
    pub fn with_subject(self, subject: Subject) -> Self {
        Self {
            subject: Some(subject),
            ..self
        }
    }

    /// Sets the issuer (root CAs only)
    #[must_use]
    pub fn with_issuer(self, issuer: Subject) -> Self {
        Self {
            issuer: Some(issuer),
            ..self
        }
    }

    /// Adds an extension
    #[must_use]
    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extensions.push(extension);
        self
    }

    /// The subject to use: the given one, or the default identity
    #[must_use]
    pub fn effective_subject(&self) -> Subject {
        self.subject.clone().unwrap_or_default()
    }
}

impl From<&str> for CertOptions {
    fn from(common_name: &str) -> Self {
        CertOptions::default().with_subject(Subject::common_name(common_name))
    }
}

impl From<String> for CertOptions {
    fn from(common_name: String) -> Self {
        CertOptions::default().with_subject(Subject::common_name(common_name))
    }
}

impl From<&CertOptions> for CertOptions {
    fn from(o: &CertOptions) -> Self {
        o.clone()
    }
}

#[cfg(test)]
mod test {
    use super::{CertOptions, SignatureDigest};
    use crate::cert::{AltName, Extension, Subject};

    #[test]
    fn defaults() {
        let o = CertOptions::default();
        assert_eq!(o.days, 365);
        assert_eq!(o.key_size, 1024);
        assert_eq!(o.algorithm, SignatureDigest::Sha256);
        assert!(o.serial_number.is_none());
        assert_eq!(o.effective_subject(), Subject::default());
        assert!(o.extensions.is_empty());
    }

    #[test]
    fn string_shorthand() {
        let o = CertOptions::from("localhost");
        assert_eq!(o.subject, Some(Subject::common_name("localhost")));
        assert_eq!(o.days, 365);
    }

    #[test]
    fn unknown_algorithm_falls_back() {
        assert_eq!(SignatureDigest::from_name("md5"), SignatureDigest::Sha256);
        assert_eq!(SignatureDigest::from_name("sha1"), SignatureDigest::Sha256);
        assert_eq!(SignatureDigest::from_name("SHA512"), SignatureDigest::Sha512);
    }

    #[test]
    fn partial_record_merges_with_defaults() {
        let o: CertOptions = serde_json::from_str(
            r#"{
                "days": 9999,
                "algorithm": "whirlpool",
                "subject": {"commonName": "192.168.1.2"},
                "extensions": [{"name": "subjectAltName", "altNames": [
                    {"type": 2, "value": "localhost"},
                    {"type": 7, "ip": "127.0.0.1"}
                ]}]
            }"#,
        )
        .unwrap();
        assert_eq!(o.days, 9999);
        assert_eq!(o.key_size, 1024);
        assert_eq!(o.algorithm, SignatureDigest::Sha256);
        assert_eq!(o.subject, Some(Subject::common_name("192.168.1.2")));
        assert_eq!(
            o.extensions,
            vec![Extension::alt_names([
                AltName::Dns("localhost".into()),
                AltName::Ip("127.0.0.1".parse().unwrap()),
            ])]
        );
    }

    #[test]
    fn unknown_option_is_rejected() {
        assert!(serde_json::from_str::<CertOptions>(r#"{"dayz": 1}"#).is_err());
    }
}
