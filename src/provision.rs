//! Load-or-create workflow for a development root CA and a leaf certificate signed by it
// (c) 2024 Ross Younger

use std::net::IpAddr;
use std::path::Path;

use tracing::{debug, info};

use crate::cert::{AltName, CertDescriptor, CertOptions, Extension, Subject};
use crate::error::{Error, Result};
use crate::os::TrustStore;

/// The two certificates to provision, and how to create them if they don't exist
#[derive(Debug, Clone)]
pub struct Plan {
    /// The root CA
    pub ca: CertDescriptor,
    /// Used if the CA has to be created
    pub ca_options: CertOptions,
    /// The leaf certificate
    pub leaf: CertDescriptor,
    /// Used if the leaf has to be created
    pub leaf_options: CertOptions,
}

/// What [`load_or_create`] had to do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    /// A new leaf certificate was created
    pub leaf_created: bool,
    /// A new root CA was created
    pub ca_created: bool,
    /// The root CA was installed into the trust store
    pub ca_installed: bool,
}

impl Plan {
    /// A plan for a local development server.
    ///
    /// The CA is `{prefix}.root-ca`, with common name `{prefix} Root CA`.
    /// The leaf is `{prefix}.localhost.{lan_ip}`, with common name `lan_ip` and
    /// alternative names `localhost`, `127.0.0.1` and `lan_ip`.
    /// Both live in `dir` and take their remaining settings from `base`.
    #[must_use]
    pub fn dev_server(base: &CertOptions, dir: &Path, prefix: &str, lan_ip: IpAddr) -> Self {
        let ca_options = base
            .clone()
            .with_subject(Subject::common_name(format!("{prefix} Root CA")).with_organization(prefix));
        let leaf_options = base
            .clone()
            .with_subject(Subject::common_name(lan_ip.to_string()))
            .with_extension(Extension::alt_names([
                AltName::Dns("localhost".into()),
                AltName::Ip(IpAddr::from([127, 0, 0, 1])),
                AltName::Ip(lan_ip),
            ]));
        Self {
            ca: CertDescriptor::in_dir(dir, format!("{prefix}.root-ca")),
            ca_options,
            leaf: CertDescriptor::in_dir(dir, format!("{prefix}.localhost.{lan_ip}")),
            leaf_options,
        }
    }
}

/// Makes sure a usable leaf certificate exists.
///
/// 1. If the leaf can be loaded, that's it.
/// 2. Otherwise, load the CA, installing it if the store doesn't have it yet.
/// 3. If the CA can't be loaded, create it, save it and install it.
/// 4. Create the leaf, signed by the CA, and save it.
///
/// Trust store failures are not hidden: a CA that loads but will not install is an error,
/// not a reason to replace it.
pub async fn load_or_create(plan: &mut Plan, store: &dyn TrustStore) -> Result<Outcome> {
    let mut outcome = Outcome::default();

    match plan.leaf.load().await {
        Ok(()) => {
            info!("loaded existing certificate `{}`", plan.leaf.name());
            return Ok(outcome);
        }
        Err(e) => debug!("could not load `{}`: {e}", plan.leaf.name()),
    }

    match plan.ca.load().await {
        Ok(()) => {
            info!("loaded root CA `{}`", plan.ca.name());
            if !plan.ca.is_installed(store).await {
                plan.ca.install(store).await?;
                outcome.ca_installed = true;
            }
        }
        Err(e) => {
            debug!("could not load `{}`: {e}", plan.ca.name());
            let _ = plan.ca.create_root_ca(&plan.ca_options)?;
            outcome.ca_created = true;
            // install saves first
            plan.ca.install(store).await?;
            outcome.ca_installed = true;
        }
    }

    let _ = plan.leaf.create(&plan.leaf_options, Some(&plan.ca))?;
    plan.leaf.save().await?;
    outcome.leaf_created = true;
    Ok(outcome)
}

/// Works out this machine's LAN address by resolving its own host name.
/// IPv4 non-loopback addresses are preferred.
pub fn lan_address() -> Result<IpAddr> {
    let hostname = gethostname::gethostname().to_string_lossy().into_owned();
    let candidates = dns_lookup::lookup_host(&hostname)?;
    debug!("{hostname} resolves to {candidates:?}");
    candidates
        .iter()
        .find(|a| a.is_ipv4() && !a.is_loopback())
        .or_else(|| candidates.iter().find(|a| !a.is_loopback()))
        .or_else(|| candidates.first())
        .copied()
        .ok_or_else(|| Error::InvalidOptions(format!("host name {hostname} has no addresses")))
}
