//! Certificate extension records
// (c) 2024 Ross Younger

use std::net::IpAddr;

use rcgen::{
    BasicConstraints, CertificateParams, ExtendedKeyUsagePurpose, Ia5String, IsCa,
    KeyUsagePurpose, SanType,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An X.509 extension to place in a certificate.
///
/// The serialized form is tagged by `name`, e.g.
/// `{name = "basicConstraints", cA = true}` or
/// `{name = "subjectAltName", altNames = [{type = 2, value = "localhost"}]}`.
///
/// Extensions are applied in order; where two records set the same
/// extension, the later one wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "camelCase")]
pub enum Extension {
    /// Whether the subject is a CA
    #[serde(rename_all = "camelCase")]
    BasicConstraints {
        /// Is a CA?
        #[serde(rename = "cA", default)]
        ca: bool,
        /// Maximum number of intermediate CAs below this one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path_len_constraint: Option<u8>,
    },
    /// Permitted key usages
    KeyUsage(KeyUsage),
    /// Permitted extended key usages
    ExtKeyUsage(ExtKeyUsage),
    /// Alternative names for the subject
    #[serde(rename_all = "camelCase")]
    SubjectAltName {
        /// The names
        alt_names: Vec<AltName>,
    },
}

/// Key usage flags (RFC 5280 4.2.1.3)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(clippy::struct_excessive_bools)]
pub struct KeyUsage {
    /// digitalSignature
    pub digital_signature: bool,
    /// nonRepudiation (a.k.a. contentCommitment)
    pub non_repudiation: bool,
    /// keyEncipherment
    pub key_encipherment: bool,
    /// dataEncipherment
    pub data_encipherment: bool,
    /// keyAgreement
    pub key_agreement: bool,
    /// keyCertSign
    pub key_cert_sign: bool,
    /// cRLSign
    #[serde(rename = "cRLSign")]
    pub crl_sign: bool,
    /// encipherOnly
    pub encipher_only: bool,
    /// decipherOnly
    pub decipher_only: bool,
}

/// Extended key usage flags (RFC 5280 4.2.1.12)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ExtKeyUsage {
    /// TLS server
    pub server_auth: bool,
    /// TLS client
    pub client_auth: bool,
    /// Code signing
    pub code_signing: bool,
    /// S/MIME
    pub email_protection: bool,
    /// Timestamping
    pub time_stamping: bool,
}

/// A subject alternative name.
///
/// Serialized with the `GeneralName` tag numbers: `{type: 1, value}` email,
/// `{type: 2, value}` DNS, `{type: 6, value}` URI, `{type: 7, ip}` IP address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAltName", into = "RawAltName")]
pub enum AltName {
    /// rfc822Name
    Email(String),
    /// dNSName
    Dns(String),
    /// uniformResourceIdentifier
    Uri(String),
    /// iPAddress
    Ip(IpAddr),
}

/// Wire shape of [`AltName`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAltName {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ip: Option<String>,
}

impl TryFrom<RawAltName> for AltName {
    type Error = String;

    fn try_from(raw: RawAltName) -> std::result::Result<Self, Self::Error> {
        let value = |v: Option<String>| v.ok_or(format!("alt name type {} needs a value", raw.kind));
        Ok(match raw.kind {
            1 => AltName::Email(value(raw.value)?),
            2 => AltName::Dns(value(raw.value)?),
            6 => AltName::Uri(value(raw.value)?),
            7 => {
                let ip = raw
                    .ip
                    .or(raw.value)
                    .ok_or("alt name type 7 needs an ip".to_string())?;
                AltName::Ip(ip.parse().map_err(|e| format!("invalid ip {ip:?}: {e}"))?)
            }
            k => return Err(format!("unsupported alt name type {k}")),
        })
    }
}

impl From<AltName> for RawAltName {
    fn from(name: AltName) -> Self {
        let (kind, value, ip) = match name {
            AltName::Email(v) => (1, Some(v), None),
            AltName::Dns(v) => (2, Some(v), None),
            AltName::Uri(v) => (6, Some(v), None),
            AltName::Ip(ip) => (7, None, Some(ip.to_string())),
        };
        RawAltName { kind, value, ip }
    }
}

impl std::fmt::Display for AltName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AltName::Email(s) => write!(f, "email:{s}"),
            AltName::Dns(s) => write!(f, "DNS:{s}"),
            AltName::Uri(s) => write!(f, "URI:{s}"),
            AltName::Ip(ip) => write!(f, "IP:{ip}"),
        }
    }
}

impl AltName {
    fn to_san(&self) -> Result<SanType> {
        let ia5 = |s: &String| {
            Ia5String::try_from(s.clone())
                .map_err(|_| Error::InvalidOptions(format!("alt name {s:?} is not plain ASCII")))
        };
        Ok(match self {
            AltName::Email(s) => SanType::Rfc822Name(ia5(s)?),
            AltName::Dns(s) => SanType::DnsName(ia5(s)?),
            AltName::Uri(s) => SanType::URI(ia5(s)?),
            AltName::Ip(ip) => SanType::IpAddress(*ip),
        })
    }
}

impl Extension {
    /// `basicConstraints` with `cA` set
    #[must_use]
    pub fn ca() -> Self {
        Extension::BasicConstraints {
            ca: true,
            path_len_constraint: None,
        }
    }

    /// `subjectAltName` with the given names
    pub fn alt_names<I: IntoIterator<Item = AltName>>(names: I) -> Self {
        Extension::SubjectAltName {
            alt_names: names.into_iter().collect(),
        }
    }

    /// The extensions every root CA carries, ahead of any caller-supplied ones
    #[must_use]
    pub fn root_ca_set() -> Vec<Extension> {
        vec![
            Extension::ca(),
            Extension::KeyUsage(KeyUsage {
                key_cert_sign: true,
                digital_signature: true,
                non_repudiation: true,
                key_encipherment: true,
                data_encipherment: true,
                ..KeyUsage::default()
            }),
        ]
    }

    /// Writes this extension into certificate parameters
    pub(crate) fn apply(&self, params: &mut CertificateParams) -> Result<()> {
        match self {
            Extension::BasicConstraints {
                ca,
                path_len_constraint,
            } => {
                params.is_ca = match (ca, path_len_constraint) {
                    (false, _) => IsCa::ExplicitNoCa,
                    (true, None) => IsCa::Ca(BasicConstraints::Unconstrained),
                    (true, Some(n)) => IsCa::Ca(BasicConstraints::Constrained(*n)),
                };
            }
            Extension::KeyUsage(ku) => params.key_usages = ku.purposes(),
            Extension::ExtKeyUsage(eku) => params.extended_key_usages = eku.purposes(),
            Extension::SubjectAltName { alt_names } => {
                params.subject_alt_names = alt_names
                    .iter()
                    .map(AltName::to_san)
                    .collect::<Result<Vec<_>>>()?;
            }
        }
        Ok(())
    }
}

impl KeyUsage {
    fn purposes(&self) -> Vec<KeyUsagePurpose> {
        [
            (self.digital_signature, KeyUsagePurpose::DigitalSignature),
            (self.non_repudiation, KeyUsagePurpose::ContentCommitment),
            (self.key_encipherment, KeyUsagePurpose::KeyEncipherment),
            (self.data_encipherment, KeyUsagePurpose::DataEncipherment),
            (self.key_agreement, KeyUsagePurpose::KeyAgreement),
            (self.key_cert_sign, KeyUsagePurpose::KeyCertSign),
            (self.crl_sign, KeyUsagePurpose::CrlSign),
            (self.encipher_only, KeyUsagePurpose::EncipherOnly),
            (self.decipher_only, KeyUsagePurpose::DecipherOnly),
        ]
        .into_iter()
        .filter_map(|(set, purpose)| set.then_some(purpose))
        .collect()
    }
}

impl ExtKeyUsage {
    fn purposes(&self) -> Vec<ExtendedKeyUsagePurpose> {
        [
            (self.server_auth, ExtendedKeyUsagePurpose::ServerAuth),
            (self.client_auth, ExtendedKeyUsagePurpose::ClientAuth),
            (self.code_signing, ExtendedKeyUsagePurpose::CodeSigning),
            (self.email_protection, ExtendedKeyUsagePurpose::EmailProtection),
            (self.time_stamping, ExtendedKeyUsagePurpose::TimeStamping),
        ]
        .into_iter()
        .filter_map(|(set, purpose)| set.then_some(purpose))
        .collect()
    }
}
