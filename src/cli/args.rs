// selfsigned-ca top-level command-line arguments
// (c) 2024 Ross Younger

use std::convert::Infallible;
use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cert::AltName;
use crate::config::Configuration_Optional;

#[derive(Debug, Parser, Clone)]
#[command(
    author,
    version(super::VERSION),
    about,
    before_help = "e.g.   selfsigned-ca provision",
    infer_long_args(true),
    arg_required_else_help(true)
)]
#[command(help_template(
    "\
{name} version {version}
{about-with-newline}
{usage-heading} {usage}
{before-help}
{all-args}{after-help}
"
))]
#[command(styles=super::styles::CLAP_STYLES)]
pub(crate) struct CliArgs {
    // MODE SELECTION ======================================================================
    /// Outputs the configuration, then exits.
    ///
    /// If a subcommand is given, this is the configuration that would apply to it.
    #[arg(long, help_heading("Configuration"), display_order(0))]
    pub show_config: bool,

    /// Outputs the paths to configuration file(s), then exits
    #[arg(long, help_heading("Configuration"), display_order(0))]
    pub config_files: bool,

    /// Reads an additional configuration file, which takes precedence over the user and system files
    #[arg(long = "config", value_name("FILE"), help_heading("Configuration"))]
    pub config_file: Option<PathBuf>,

    // OUTPUT ==============================================================================
    /// Quiet mode; reports only errors
    #[arg(short, long, action, conflicts_with("debug"), global(true))]
    pub quiet: bool,

    /// Enable detailed debug output
    ///
    /// This has the same effect as setting `RUST_LOG=selfsigned_ca=trace` in the environment.
    /// If present, `RUST_LOG` overrides this option.
    #[arg(long, action, help_heading("Debug"), global(true))]
    pub debug: bool,

    /// Log to a file
    ///
    /// By default the log receives everything printed to stderr.
    /// To override this behaviour, set the environment variable `RUST_LOG_FILE_DETAIL` (same semantics as `RUST_LOG`).
    #[arg(short('l'), long, action, help_heading("Debug"), value_name("FILE"))]
    pub log_file: Option<String>,

    // CONFIGURABLE OPTIONS ================================================================
    #[command(flatten)]
    pub config: Configuration_Optional,

    // SUBCOMMAND ==========================================================================
    // Required unless a mode option is given
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Certificate operations. `NAME` is resolved against `--cert-dir` unless it contains a directory.
#[derive(Debug, Subcommand, Clone)]
pub(crate) enum Command {
    /// Creates a self-signed root CA certificate and its key
    Ca {
        /// Certificate name or path
        name: String,
        #[command(flatten)]
        cert: CertArgs,
        /// Also installs the new CA into the OS trust store
        #[arg(long)]
        install: bool,
    },

    /// Creates a certificate and its key, signed by a CA or self-signed
    Create {
        /// Certificate name or path
        name: String,
        /// The issuing CA's name or path. If not given, the certificate is self-signed.
        #[arg(long, value_name("NAME"))]
        ca: Option<String>,
        #[command(flatten)]
        cert: CertArgs,
        /// Adds a subject alternative name: an IP address, a URI (containing `://`),
        /// an email address (containing `@`) or otherwise a DNS name.
        /// May be repeated.
        #[arg(long = "san", value_name("NAME"), value_parser = parse_alt_name)]
        alt_names: Vec<AltName>,
    },

    /// Adds a saved certificate to the OS trust store
    Install {
        /// Certificate name or path
        name: String,
    },

    /// Describes a saved certificate, and whether the OS trusts it
    Status {
        /// Certificate name or path
        name: String,
    },

    /// Removes a certificate from the OS trust store. Its files are left alone.
    Remove {
        /// Certificate name or path
        name: String,
    },

    /// Makes sure a development root CA and a server certificate for this machine exist.
    ///
    /// Existing certificates are reused. If the server certificate is missing it is created,
    /// signed by the CA; if the CA is missing it is created and installed.
    Provision {
        /// Prefix for the certificate names
        #[arg(long, default_value = "selfsigned-ca")]
        prefix: String,
        /// The LAN address to certify [default: the address of this machine's host name]
        #[arg(long, value_name("ADDRESS"))]
        ip: Option<IpAddr>,
    },

    /// Outputs the SHA-1 thumbprint of a saved certificate
    Thumbprint {
        /// Certificate name or path
        name: String,
    },
}

/// Options for a new certificate
#[derive(Debug, clap::Args, Clone)]
pub(crate) struct CertArgs {
    /// Subject common name [default: the certificate name]
    #[arg(long, value_name("CN"))]
    pub common_name: Option<String>,

    /// Subject organization name
    #[arg(long, value_name("ORG"))]
    pub organization: Option<String>,

    /// Fixed serial number, in hex [default: random]
    #[arg(long, value_name("HEX"))]
    pub serial: Option<String>,

    /// Reads further certificate options (subject, issuer, extensions...) from a TOML file.
    ///
    /// Keys are in camelCase, e.g. `keySize`, `serialNumber`, `subject.commonName`.
    /// Command-line options take precedence.
    #[arg(long, value_name("FILE"))]
    pub options: Option<PathBuf>,
}

fn parse_alt_name(arg: &str) -> Result<AltName, Infallible> {
    Ok(if let Ok(ip) = arg.parse::<IpAddr>() {
        AltName::Ip(ip)
    } else if arg.contains("://") {
        AltName::Uri(arg.into())
    } else if arg.contains('@') {
        AltName::Email(arg.into())
    } else {
        AltName::Dns(arg.into())
    })
}

#[cfg(test)]
mod test {
    use clap::Parser as _;

    use super::{parse_alt_name, CliArgs, Command};
    use crate::cert::AltName;

    #[test]
    fn alt_name_guessing() {
        assert_eq!(
            parse_alt_name("10.0.0.1").unwrap(),
            AltName::Ip("10.0.0.1".parse().unwrap())
        );
        assert_eq!(
            parse_alt_name("::1").unwrap(),
            AltName::Ip("::1".parse().unwrap())
        );
        assert_eq!(
            parse_alt_name("https://example.com/").unwrap(),
            AltName::Uri("https://example.com/".into())
        );
        assert_eq!(
            parse_alt_name("me@example.com").unwrap(),
            AltName::Email("me@example.com".into())
        );
        assert_eq!(
            parse_alt_name("localhost").unwrap(),
            AltName::Dns("localhost".into())
        );
    }

    #[test]
    fn create_with_sans() {
        let args = CliArgs::try_parse_from([
            "selfsigned-ca",
            "--key-size",
            "2048",
            "create",
            "leaf",
            "--ca",
            "root",
            "--san",
            "localhost",
            "--san",
            "127.0.0.1",
        ])
        .unwrap();
        assert_eq!(args.config.key_size, Some(2048));
        let Some(Command::Create {
            name, ca, alt_names, ..
        }) = args.command
        else {
            panic!("wrong subcommand");
        };
        assert_eq!(name, "leaf");
        assert_eq!(ca.as_deref(), Some("root"));
        assert_eq!(alt_names.len(), 2);
    }

    #[test]
    fn mode_options_need_no_subcommand() {
        let args = CliArgs::try_parse_from(["selfsigned-ca", "--show-config"]).unwrap();
        assert!(args.show_config);
        assert!(args.command.is_none());
        assert!(CliArgs::try_parse_from(["selfsigned-ca"]).is_err());
    }

    #[test]
    fn debug_conflicts_with_quiet() {
        assert!(CliArgs::try_parse_from(["selfsigned-ca", "--debug", "-q", "status", "x"]).is_err());
    }
}
