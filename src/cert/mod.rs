//! X509 certificate generation
// (c) 2024 Ross Younger
//!
//! The main entry point is [`CertDescriptor`], which ties a certificate and its key
//! to a pair of files on disk and to the OS trust store.
//! The free functions [`create_root_ca`] and [`create`] are shorthands for
//! making a fresh, unnamed descriptor.

mod builder;
mod certificate;
mod descriptor;
mod extension;
mod fingerprint;
mod keys;
mod options;
pub mod serial;
mod subject;

pub use certificate::Certificate;
pub use descriptor::{create, create_root_ca, CertDescriptor, State, DEFAULT_CERT_DIR};
pub use extension::{AltName, ExtKeyUsage, Extension, KeyUsage};
pub use fingerprint::thumbprint;
pub use keys::{KeyPair, MAX_KEY_SIZE, MIN_KEY_SIZE};
pub use options::{CertOptions, SignatureDigest};
pub use subject::{NameAttribute, Subject};
