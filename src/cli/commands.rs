// Subcommand implementations
// (c) 2024 Ross Younger

use std::path::Path;

use anstream::println;
use anyhow::Context as _;
use figment::{
    providers::{Format as _, Serialized, Toml},
    Figment,
};
use tabled::{builder::Builder, settings::Style};
use tracing::info;

use super::args::{CertArgs, Command};
use super::styles::{INFO, WARNING};
use crate::cert::{CertDescriptor, CertOptions, Extension, Subject};
use crate::config::Configuration;
use crate::os::{Platform, TrustStore};
use crate::provision::{self, Plan};

/// Runs a subcommand. Returns whether it succeeded.
pub(super) async fn dispatch(command: Command, config: &Configuration) -> anyhow::Result<bool> {
    let store = Platform::current().trust_store(&config.trust_store_config());
    let store = store.as_ref();
    match command {
        Command::Ca {
            name,
            cert,
            install,
        } => {
            let mut ca = descriptor(config, &name);
            let options = cert_options(config, &cert, ca.name())?;
            let _ = ca.create_root_ca(options)?;
            ca.save().await?;
            if install {
                ca.install(store).await?;
            }
            report(&mut ca)?;
            Ok(true)
        }
        Command::Create {
            name,
            ca,
            cert,
            alt_names,
        } => {
            let mut leaf = descriptor(config, &name);
            let mut options = cert_options(config, &cert, leaf.name())?;
            if !alt_names.is_empty() {
                options = options.with_extension(Extension::alt_names(alt_names));
            }
            let issuer = match ca {
                Some(ca_name) => {
                    let mut issuer = descriptor(config, &ca_name);
                    issuer
                        .load()
                        .await
                        .with_context(|| format!("loading issuer {ca_name}"))?;
                    Some(issuer)
                }
                None => None,
            };
            let _ = leaf.create(options, issuer.as_ref())?;
            leaf.save().await?;
            report(&mut leaf)?;
            Ok(true)
        }
        Command::Install { name } => {
            let mut d = loaded(config, &name).await?;
            d.install(store).await?;
            Ok(true)
        }
        Command::Status { name } => {
            let mut d = loaded(config, &name).await?;
            report(&mut d)?;
            let installed = d.is_installed(store).await;
            status_line(store, installed);
            Ok(true)
        }
        Command::Remove { name } => {
            let mut d = loaded(config, &name).await?;
            let removed = d.uninstall(store).await?;
            if !removed {
                println!("{WARNING}{}{WARNING:#} was not installed", d.name());
            }
            Ok(removed)
        }
        Command::Provision { prefix, ip } => {
            let ip = match ip {
                Some(ip) => ip,
                None => provision::lan_address().context("could not determine LAN address")?,
            };
            let mut plan = Plan::dev_server(&config.cert_options(), &config.cert_dir, &prefix, ip);
            let outcome = provision::load_or_create(&mut plan, store).await?;
            info!("{outcome:?}");
            report(&mut plan.ca)?;
            report(&mut plan.leaf)?;
            Ok(true)
        }
        Command::Thumbprint { name } => {
            let mut d = loaded(config, &name).await?;
            println!("{}", d.thumbprint()?);
            Ok(true)
        }
    }
}

fn descriptor(config: &Configuration, name: &str) -> CertDescriptor {
    let p = Path::new(name);
    if p.parent().is_some_and(|d| !d.as_os_str().is_empty()) {
        CertDescriptor::named(p)
    } else {
        CertDescriptor::in_dir(&config.cert_dir, p)
    }
}

async fn loaded(config: &Configuration, name: &str) -> anyhow::Result<CertDescriptor> {
    let mut d = descriptor(config, name);
    d.load().await?;
    d.ensure_parsed()?;
    Ok(d)
}

/// Builds certificate options: configuration, then the options file, then the command line
fn cert_options(config: &Configuration, args: &CertArgs, name: &str) -> anyhow::Result<CertOptions> {
    let mut options = config.cert_options();
    if let Some(file) = &args.options {
        options = Figment::new()
            .merge(Serialized::defaults(options))
            .merge(Toml::file_exact(file))
            .extract()
            .with_context(|| format!("reading certificate options from {}", file.display()))?;
    }
    if args.common_name.is_some() || args.organization.is_some() || options.subject.is_none() {
        let mut subject = options
            .subject
            .take()
            .unwrap_or_else(|| Subject::common_name(name));
        if let Some(cn) = &args.common_name {
            subject.common_name = Some(cn.clone());
        }
        if let Some(org) = &args.organization {
            subject.organization_name = Some(org.clone());
        }
        options.subject = Some(subject);
    }
    if let Some(serial) = &args.serial {
        options.serial_number = Some(serial.clone());
    }
    Ok(options)
}

fn report(d: &mut CertDescriptor) -> anyhow::Result<()> {
    let thumbprint = d.thumbprint()?.to_string();
    let serial = d.serial_number()?.to_string();
    let mut b = Builder::default();
    b.push_record(["name", d.name()]);
    if let Some(p) = d.cert_path() {
        b.push_record(["certificate".into(), p.display().to_string()]);
    }
    if let Some(p) = d.key_path() {
        b.push_record(["key".into(), p.display().to_string()]);
    }
    if let Some(c) = d.certificate() {
        b.push_record(["subject", c.common_name().unwrap_or_default()]);
        b.push_record(["issuer", c.issuer_common_name().unwrap_or_default()]);
        b.push_record(["CA".into(), c.is_ca().to_string()]);
        b.push_record(["expires".into(), c.not_after().to_string()]);
        let sans = c
            .alt_names()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        if !sans.is_empty() {
            b.push_record(["alt names".into(), sans]);
        }
    }
    b.push_record(["serial".into(), serial]);
    b.push_record(["thumbprint".into(), thumbprint]);
    println!("{}", b.build().with(Style::sharp()));
    Ok(())
}

fn status_line(store: &dyn TrustStore, installed: bool) {
    let platform = store.platform();
    if installed {
        println!("{INFO}trusted{INFO:#} by the {platform} trust store");
    } else {
        println!("{WARNING}not trusted{WARNING:#} by the {platform} trust store");
    }
}
