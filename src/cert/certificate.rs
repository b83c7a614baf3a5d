//! Parsed certificate view
// (c) 2024 Ross Younger

use rustls_pki_types::CertificateDer;
use time::OffsetDateTime;
use x509_parser::{
    certificate::X509Certificate,
    extensions::GeneralName,
    oid_registry::{OID_PKCS1_SHA256WITHRSA, OID_PKCS1_SHA384WITHRSA, OID_PKCS1_SHA512WITHRSA},
    prelude::FromDer as _,
    x509::X509Name,
};

use super::{fingerprint, keys, subject::attribute_name_for_oid, AltName, NameAttribute, SignatureDigest};
use crate::error::{Error, Result};

/// An X.509 certificate, held as DER together with the fields we care about.
///
/// Construct with [`Certificate::from_der`] or [`Certificate::from_pem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
    serial: String,
    subject: Vec<NameAttribute>,
    issuer: Vec<NameAttribute>,
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
    is_ca: bool,
    alt_names: Vec<AltName>,
    public_key_der: Vec<u8>,
    tbs_der: Vec<u8>,
    signature: Vec<u8>,
    signature_digest: Option<SignatureDigest>,
}

impl Certificate {
    /// Parses a DER-encoded certificate
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, x509) = X509Certificate::from_der(der)
            .map_err(|e| Error::Malformed(format!("certificate: {e}")))?;

        let sig_oid = &x509.signature_algorithm.algorithm;
        let signature_digest = if *sig_oid == OID_PKCS1_SHA256WITHRSA {
            Some(SignatureDigest::Sha256)
        } else if *sig_oid == OID_PKCS1_SHA384WITHRSA {
            Some(SignatureDigest::Sha384)
        } else if *sig_oid == OID_PKCS1_SHA512WITHRSA {
            Some(SignatureDigest::Sha512)
        } else {
            None
        };

        let is_ca = x509
            .basic_constraints()
            .ok()
            .flatten()
            .is_some_and(|bc| bc.value.ca);

        let alt_names = x509
            .subject_alternative_name()
            .ok()
            .flatten()
            .map(|san| {
                san.value
                    .general_names
                    .iter()
                    .filter_map(alt_name_from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            der: der.to_vec(),
            serial: hex::encode(x509.raw_serial()),
            subject: attributes_of(x509.subject()),
            issuer: attributes_of(x509.issuer()),
            not_before: x509.validity().not_before.to_datetime(),
            not_after: x509.validity().not_after.to_datetime(),
            is_ca,
            alt_names,
            public_key_der: x509.public_key().raw.to_vec(),
            tbs_der: x509.tbs_certificate.as_ref().to_vec(),
            signature: x509.signature_value.data.to_vec(),
            signature_digest,
        })
    }

    /// Parses the first `CERTIFICATE` block of a PEM document
    pub fn from_pem(pem: &str) -> Result<Self> {
        let (_, block) = x509_parser::pem::parse_x509_pem(pem.as_bytes())
            .map_err(|e| Error::Malformed(format!("certificate PEM: {e}")))?;
        if block.label != "CERTIFICATE" {
            return Err(Error::Malformed(format!(
                "expected a CERTIFICATE PEM block, found {}",
                block.label
            )));
        }
        Self::from_der(&block.contents)
    }

    /// Canonical DER encoding
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// DER, wrapped for TLS stacks
    #[must_use]
    pub fn to_certificate_der(&self) -> CertificateDer<'static> {
        CertificateDer::from(self.der.clone())
    }

    /// Serial number: lowercase hex of the DER INTEGER content octets
    #[must_use]
    pub fn serial_number(&self) -> &str {
        &self.serial
    }

    /// Subject name attributes, in certificate order
    #[must_use]
    pub fn subject(&self) -> &[NameAttribute] {
        &self.subject
    }

    /// Issuer name attributes, in certificate order
    #[must_use]
    pub fn issuer(&self) -> &[NameAttribute] {
        &self.issuer
    }

    /// The subject's common name, if it has one
    #[must_use]
    pub fn common_name(&self) -> Option<&str> {
        find_cn(&self.subject)
    }

    /// The issuer's common name, if it has one
    #[must_use]
    pub fn issuer_common_name(&self) -> Option<&str> {
        find_cn(&self.issuer)
    }

    /// Start of the validity window
    #[must_use]
    pub fn not_before(&self) -> OffsetDateTime {
        self.not_before
    }

    /// End of the validity window
    #[must_use]
    pub fn not_after(&self) -> OffsetDateTime {
        self.not_after
    }

    /// Whether basicConstraints marks this as a CA
    #[must_use]
    pub fn is_ca(&self) -> bool {
        self.is_ca
    }

    /// Subject alternative names we understand (email, DNS, URI, IP)
    #[must_use]
    pub fn alt_names(&self) -> &[AltName] {
        &self.alt_names
    }

    /// Subject public key, as DER `SubjectPublicKeyInfo`
    #[must_use]
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// The digest this certificate was signed with, if it is an RSA signature we support
    #[must_use]
    pub fn signature_digest(&self) -> Option<SignatureDigest> {
        self.signature_digest
    }

    /// SHA-1 thumbprint, lowercase hex.
    ///
    /// This recomputes every time; [`CertDescriptor::thumbprint`](crate::CertDescriptor::thumbprint) memoizes it.
    #[must_use]
    pub fn thumbprint(&self) -> String {
        fingerprint::thumbprint(&self.der)
    }

    /// Checks this certificate's signature against `issuer`'s public key.
    ///
    /// Returns `false` (rather than an error) for signatures that don't verify
    /// or that use an algorithm we don't support.
    pub fn is_signed_by(&self, issuer: &Certificate) -> Result<bool> {
        let Some(digest) = self.signature_digest else {
            return Ok(false);
        };
        keys::verify_signature(&issuer.public_key_der, digest, &self.tbs_der, &self.signature)
    }
}

fn find_cn(attrs: &[NameAttribute]) -> Option<&str> {
    attrs
        .iter()
        .find(|a| a.name == "commonName")
        .map(|a| a.value.as_str())
}

fn attributes_of(name: &X509Name<'_>) -> Vec<NameAttribute> {
    name.iter_attributes()
        .map(|attr| {
            let oid = attr.attr_type().to_id_string();
            NameAttribute {
                name: attribute_name_for_oid(&oid).map_or(oid.clone(), str::to_string),
                value: attr.as_str().unwrap_or_default().to_string(),
            }
        })
        .collect()
}

fn alt_name_from(name: &GeneralName<'_>) -> Option<AltName> {
    Some(match name {
        GeneralName::RFC822Name(s) => AltName::Email((*s).to_string()),
        GeneralName::DNSName(s) => AltName::Dns((*s).to_string()),
        GeneralName::URI(s) => AltName::Uri((*s).to_string()),
        GeneralName::IPAddress(bytes) => match bytes.len() {
            4 => AltName::Ip(<[u8; 4]>::try_from(*bytes).ok()?.into()),
            16 => AltName::Ip(<[u8; 16]>::try_from(*bytes).ok()?.into()),
            _ => return None,
        },
        _ => return None,
    })
}
