// (c) 2024 Ross Younger
//! End-to-end exercise of the public API: CA, leaf, files and a Linux-style trust store

use std::net::IpAddr;

use assertables::{assert_contains, assert_starts_with};
use selfsigned_ca::{
    os::{LinuxStore, TrustStore as _},
    AltName, CertDescriptor, CertOptions, Error, Extension, SignatureDigest, Subject,
};

fn ca_options() -> CertOptions {
    CertOptions::default()
        .with_days(9999)
        .with_key_size(2048)
        .with_subject(Subject::common_name("Lifecycle Test CA").with_organization("Tests"))
}

fn leaf_options(ip: IpAddr) -> CertOptions {
    CertOptions::default()
        .with_key_size(2048)
        .with_algorithm(SignatureDigest::Sha512)
        .with_subject(Subject::common_name(ip.to_string()))
        .with_extension(Extension::alt_names([
            AltName::Dns("localhost".into()),
            AltName::Ip(IpAddr::from([127, 0, 0, 1])),
            AltName::Ip(ip),
        ]))
}

#[tokio::test]
async fn create_sign_save_load() {
    let dir = tempfile::tempdir().unwrap();
    let cert_dir = dir.path().join("cert");
    let ip = IpAddr::from([192, 168, 1, 2]);

    let mut ca = CertDescriptor::in_dir(&cert_dir, "lifecycle.root-ca");
    let _ = ca.create_root_ca(ca_options()).unwrap();
    ca.save().await.unwrap();

    let mut leaf = CertDescriptor::in_dir(&cert_dir, format!("lifecycle.localhost.{ip}"));
    let _ = leaf.create(leaf_options(ip), Some(&ca)).unwrap();
    leaf.save().await.unwrap();
    assert!(cert_dir.join("lifecycle.localhost.192.168.1.2.crt").is_file());
    assert!(cert_dir.join("lifecycle.localhost.192.168.1.2.key").is_file());

    // Reload both from disk
    let mut ca2 = CertDescriptor::in_dir(&cert_dir, "lifecycle.root-ca");
    ca2.load().await.unwrap();
    let mut leaf2 = CertDescriptor::in_dir(&cert_dir, "lifecycle.localhost.192.168.1.2");
    leaf2.load().await.unwrap();

    assert_eq!(ca2.thumbprint().unwrap(), ca.thumbprint().unwrap());
    assert_eq!(leaf2.serial_number().unwrap(), leaf.serial_number().unwrap());
    assert!(leaf2.is_signed_by(&ca2).unwrap());

    let cert = leaf2.certificate().unwrap();
    assert_eq!(cert.common_name(), Some("192.168.1.2"));
    assert_eq!(cert.issuer_common_name(), Some("Lifecycle Test CA"));
    assert_eq!(cert.signature_digest(), Some(SignatureDigest::Sha512));
    assert!(!cert.is_ca());
    assert_contains!(cert.alt_names(), &AltName::Ip(ip));
    assert_eq!(leaf2.key_pair().unwrap().bits(), 2048);

    let ca_cert = ca2.certificate().unwrap();
    assert!(ca_cert.is_ca());
    assert_eq!((ca_cert.not_after() - ca_cert.not_before()).whole_days(), 9999);

    // A reloaded CA can sign too
    let mut other = selfsigned_ca::create("other", Some(&ca2)).unwrap();
    assert!(other.is_signed_by(&ca).unwrap());
}

#[cfg(unix)]
#[tokio::test]
async fn trust_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = LinuxStore::new(dir.path().join("extra"), "true");

    let mut ca = CertDescriptor::in_dir(dir.path().join("cert"), "store-test");
    assert!(!ca.is_installed(&store).await);

    let _ = ca.create_root_ca("Store Test CA").unwrap();
    assert!(!ca.is_installed(&store).await);
    ca.install(&store).await.unwrap();
    assert!(ca.is_installed(&store).await);

    let installed = std::fs::read_to_string(dir.path().join("extra/store-test.crt")).unwrap();
    assert_starts_with!(installed.as_str(), "-----BEGIN CERTIFICATE-----");
    assert_eq!(Some(installed.as_str()), ca.cert_pem());

    // a fresh descriptor loads from file before asking the store
    let mut fresh = CertDescriptor::in_dir(dir.path().join("cert"), "store-test");
    assert!(fresh.is_installed(&store).await);

    assert!(fresh.uninstall(&store).await.unwrap());
    assert!(!ca.is_installed(&store).await);
    assert!(!fresh.uninstall(&store).await.unwrap());

    let entry = ca.trust_entry().unwrap();
    assert!(!store.is_installed(&entry).await);
}

#[test]
fn signing_needs_a_private_key() {
    let ca = selfsigned_ca::create_root_ca("CA").unwrap();
    let mut public_only = CertDescriptor::new();
    public_only.set_pems(ca.cert_pem().unwrap().to_string(), None);
    let r = selfsigned_ca::create("leaf", Some(&public_only));
    assert!(matches!(r, Err(Error::SigningKeyMissing(_))));
}

#[test]
fn options_from_json() {
    let o: CertOptions = serde_json::from_str(
        r#"{
            "days": 30,
            "subject": {"commonName": "json", "organizationName": "Org"},
            "extensions": [
                {"name": "basicConstraints", "cA": false},
                {"name": "extKeyUsage", "serverAuth": true},
                {"name": "subjectAltName", "altNames": [{"type": 6, "value": "https://json.test/"}]}
            ]
        }"#,
    )
    .unwrap();
    let mut d = selfsigned_ca::create(o, None).unwrap();
    let c = d.certificate().unwrap().clone();
    assert_eq!(c.common_name(), Some("json"));
    assert_eq!(
        c.alt_names(),
        &[AltName::Uri("https://json.test/".into())]
    );
    assert_eq!((c.not_after() - c.not_before()).whole_days(), 30);
    assert_eq!(d.thumbprint().unwrap(), c.thumbprint());
}
