// (c) 2024 Ross Younger

//! Self-signed certificate authority helper.
//!
//! This crate creates RSA root CA certificates and certificates signed by them
//! (or self-signed), keeps each one as a named `.crt`/`.key` pair on disk,
//! and adds root CAs to the operating system's trust store.
//!
//! It is intended for local development: provision a CA once, trust it,
//! and every certificate it signs is then accepted by the browsers and tools on that machine.
//!
//! ## Library
//!
//! The main type is [`CertDescriptor`]:
//!
//! ```no_run
//! use selfsigned_ca::{os::Platform, os::TrustStoreConfig, CertDescriptor, CertOptions, Subject};
//!
//! # async fn f() -> selfsigned_ca::Result<()> {
//! let store = Platform::current().trust_store(&TrustStoreConfig::default());
//!
//! let mut ca = CertDescriptor::named("dev.root-ca");
//! ca.create_root_ca(CertOptions::default().with_subject(Subject::common_name("Dev CA")))?;
//! ca.install(store.as_ref()).await?; // also saves ./cert/dev.root-ca.{crt,key}
//!
//! let mut leaf = CertDescriptor::named("dev.localhost");
//! leaf.create("localhost", Some(&ca))?;
//! leaf.save().await?;
//! let (chain, key) = leaf.tls_credentials()?;
//! # Ok(())
//! # }
//! ```
//!
//! [`provision::load_or_create`] wraps the usual "reuse what's there, create what isn't" sequence.
//!
//! ## Command line
//!
//! The `selfsigned-ca` binary exposes the same operations; see `selfsigned-ca --help`.
//! Its settings can be given on the command line or in configuration files; see [`config`].
//!
//! ## Logging
//!
//! The library logs through [`tracing`](https://docs.rs/tracing); the binary
//! sends it to stderr, filtered by `RUST_LOG` if set.

pub mod cert;
mod cli;
pub use cli::cli;
pub mod config;
mod error;
pub use error::{Error, Result};
/// OS trust store abstraction layer
pub mod os;
pub mod persist;
pub mod provision;
/// Utilities
pub mod util;

// Exported deftly templates expand to `$crate::derive_deftly`
#[doc(hidden)]
pub use derive_deftly;

pub use cert::{
    create, create_root_ca, AltName, CertDescriptor, CertOptions, Certificate, Extension,
    KeyPair, SignatureDigest, Subject,
};
