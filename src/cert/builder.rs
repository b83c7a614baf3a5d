//! Certificate assembly and signing
// (c) 2024 Ross Younger

use std::borrow::Cow;

use rcgen::{CertificateParams, DistinguishedName};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::{serial, Certificate, CertOptions, Extension, KeyPair};
use crate::error::{Error, Result};

/// The output of a successful build: a signed certificate and the new key pair it certifies
#[derive(Debug)]
pub(crate) struct Issued {
    pub(crate) certificate: Certificate,
    pub(crate) cert_pem: String,
    pub(crate) key_pair: KeyPair,
}

/// Signing material borrowed from an issuing CA
#[derive(Debug)]
pub(crate) struct Signer<'a> {
    /// For error messages
    pub(crate) name: &'a str,
    pub(crate) cert_pem: &'a str,
    pub(crate) certificate: Cow<'a, Certificate>,
    pub(crate) key: Cow<'a, KeyPair>,
}

/// Creates a self-signed root CA certificate.
///
/// The fixed CA extensions come first, then any from `options`.
/// The issuer name is `options.issuer`, falling back to the subject.
pub(crate) fn create_root_ca(options: &CertOptions) -> Result<Issued> {
    let subject = options.effective_subject();
    let issuer = options.issuer.clone().unwrap_or_else(|| subject.clone());
    let extensions = Extension::root_ca_set()
        .into_iter()
        .chain(options.extensions.iter().cloned())
        .collect::<Vec<_>>();

    let key_pair = KeyPair::generate(options.key_size)?;
    let params = base_params(options, subject.to_distinguished_name()?, &extensions)?;
    let key = key_pair.to_rcgen(options.algorithm)?;

    let cert = if issuer == subject {
        params.self_signed(&key)?
    } else {
        // Self-signed, but under a different issuer name
        let mut issuer_params = CertificateParams::default();
        issuer_params.distinguished_name = issuer.to_distinguished_name()?;
        let issuer_cert = issuer_params.self_signed(&key)?;
        params.signed_by(&key, &issuer_cert, &key)?
    };
    let issued = finish(&cert, key_pair)?;
    debug!(
        "created root CA with serial {}",
        issued.certificate.serial_number()
    );
    Ok(issued)
}

/// Creates a certificate signed by `issuer`, or self-signed if there is none.
///
/// Only the extensions in `options` are applied.
pub(crate) fn create(options: &CertOptions, issuer: Option<&Signer<'_>>) -> Result<Issued> {
    let subject = options.effective_subject();
    let key_pair = KeyPair::generate(options.key_size)?;
    let params = base_params(options, subject.to_distinguished_name()?, &options.extensions)?;
    let key = key_pair.to_rcgen(options.algorithm)?;

    let cert = match issuer {
        None => params.self_signed(&key)?,
        Some(signer) => {
            if signer.key.public_pem()? != public_pem_of(&signer.certificate)? {
                return Err(Error::InvalidOptions(format!(
                    "private key of `{}` does not match its certificate",
                    signer.name
                )));
            }
            let issuer_key = signer.key.to_rcgen(options.algorithm)?;
            let issuer_cert =
                CertificateParams::from_ca_cert_pem(signer.cert_pem)?.self_signed(&issuer_key)?;
            debug!("signing with issuer `{}`", signer.name);
            params.signed_by(&key, &issuer_cert, &issuer_key)?
        }
    };
    finish(&cert, key_pair)
}

/// Parameters shared by every certificate: subject, serial number, validity and extensions
fn base_params(
    options: &CertOptions,
    subject: DistinguishedName,
    extensions: &[Extension],
) -> Result<CertificateParams> {
    let mut params = CertificateParams::default();
    params.distinguished_name = subject;

    let serial = match &options.serial_number {
        Some(s) => s.clone(),
        None => serial::random_hex(),
    };
    params.serial_number = Some(serial::parse_hex(&serial)?);

    let (not_before, not_after) = validity(options.days)?;
    params.not_before = not_before;
    params.not_after = not_after;

    for ext in extensions {
        ext.apply(&mut params)?;
    }
    Ok(params)
}

/// Validity window starting now (to the second) and lasting `days` days
fn validity(days: u32) -> Result<(OffsetDateTime, OffsetDateTime)> {
    let now = OffsetDateTime::now_utc();
    let now = now.replace_nanosecond(0).unwrap_or(now);
    let end = now
        .checked_add(Duration::days(i64::from(days)))
        .ok_or_else(|| Error::InvalidOptions(format!("validity of {days} days is too long")))?;
    Ok((now, end))
}

fn public_pem_of(certificate: &Certificate) -> Result<String> {
    use rsa::pkcs8::{DecodePublicKey as _, EncodePublicKey as _, LineEnding};
    rsa::RsaPublicKey::from_public_key_der(certificate.public_key_der())
        .and_then(|k| k.to_public_key_pem(LineEnding::LF))
        .map_err(|e| Error::Malformed(format!("issuer public key: {e}")))
}

fn finish(cert: &rcgen::Certificate, key_pair: KeyPair) -> Result<Issued> {
    Ok(Issued {
        certificate: Certificate::from_der(cert.der())?,
        cert_pem: cert.pem(),
        key_pair,
    })
}

#[cfg(test)]
mod test {
    use std::borrow::Cow;

    use super::{create, create_root_ca, validity, Signer};
    use crate::cert::{CertOptions, KeyPair, NameAttribute, Subject};
    use crate::error::Error;

    #[test]
    fn validity_is_whole_days() {
        let (a, b) = validity(365).unwrap();
        assert_eq!((b - a).whole_days(), 365);
        assert_eq!((b - a).whole_seconds(), 365 * 86_400);
        assert_eq!(a.nanosecond(), 0);
        assert!(validity(u32::MAX).is_err());
    }

    #[test]
    fn root_ca_defaults() {
        let out = create_root_ca(&CertOptions::default()).unwrap();
        let c = &out.certificate;
        assert!(c.is_ca());
        assert_eq!(c.subject(), Subject::default().attributes());
        assert_eq!(c.issuer(), c.subject());
        assert_eq!((c.not_after() - c.not_before()).whole_days(), 365);
        assert_eq!(out.key_pair.bits(), 1024);
        assert!(out.cert_pem.starts_with("-----BEGIN CERTIFICATE-----"));
    }

    #[test]
    fn root_ca_with_distinct_issuer_name() {
        let opts = CertOptions::default()
            .with_subject(Subject::common_name("subject"))
            .with_issuer(Subject::common_name("issuer"));
        let c = create_root_ca(&opts).unwrap().certificate;
        assert_eq!(c.common_name(), Some("subject"));
        assert_eq!(c.issuer_common_name(), Some("issuer"));
    }

    #[test]
    fn fixed_serial_is_used() {
        let c = create(&CertOptions::from("x").with_serial_number("0a1b2c"), None)
            .unwrap()
            .certificate;
        assert_eq!(c.serial_number(), "0a1b2c");
    }

    #[test]
    fn bad_serial_is_invalid_options() {
        let r = create(&CertOptions::from("x").with_serial_number("zz"), None);
        assert!(matches!(r, Err(Error::InvalidOptions(_))));
    }

    #[test]
    fn bad_key_size_is_invalid_options() {
        let r = create(&CertOptions::from("x").with_key_size(8), None);
        assert!(matches!(r, Err(Error::InvalidOptions(_))));
    }

    #[test]
    fn self_signed_leaf_issuer_equals_subject() {
        let c = create(&CertOptions::from("x"), None).unwrap().certificate;
        assert_eq!(c.issuer(), c.subject());
        assert_eq!(c.subject(), &[NameAttribute::new("commonName", "x")]);
        assert!(!c.is_ca());
    }

    #[test]
    fn mismatched_issuer_key_is_refused() {
        let ca = create_root_ca(&CertOptions::from("CA")).unwrap();
        let stranger = KeyPair::generate(1024).unwrap();
        let signer = Signer {
            name: "CA",
            cert_pem: &ca.cert_pem,
            certificate: Cow::Borrowed(&ca.certificate),
            key: Cow::Owned(stranger),
        };
        let r = create(&CertOptions::from("leaf"), Some(&signer));
        assert!(matches!(r, Err(Error::InvalidOptions(_))));
    }
}
