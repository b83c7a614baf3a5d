//! Layered configuration sources
// (c) 2024 Ross Younger

use std::path::{Path, PathBuf};

use figment::{
    providers::{Format as _, Serialized, Toml},
    value::{Dict, Map, Value},
    Figment, Metadata, Profile, Provider,
};
use struct_field_names_as_array::FieldNamesAsSlice as _;
use tabled::{settings::Style, Table, Tabled};
use tracing::{debug, trace};

use super::{Configuration, Configuration_Optional, BASE_CONFIG_FILENAME};
use crate::util::CLI_SOURCE;

fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(format!(".{BASE_CONFIG_FILENAME}")))
}

fn system_config_path() -> Option<PathBuf> {
    cfg!(unix).then(|| Path::new("/etc").join(BASE_CONFIG_FILENAME))
}

/// The hard-wired defaults, reported as source `default`
struct Defaults;

impl Provider for Defaults {
    fn metadata(&self) -> Metadata {
        Metadata::named("default")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        Serialized::defaults(Configuration::default()).data()
    }
}

/// One row of `--show-config`
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct Setting {
    /// Field name, as used in configuration files
    pub field: String,
    /// Current value
    pub value: String,
    /// Where the value came from: a file, a command-line option or `default`
    pub source: String,
}

/// Merges the configuration sources. Later layers win:
/// defaults, the system file, the user file, an explicit `--config` file, the command line.
#[derive(Debug, Default)]
pub struct Manager {
    data: Figment,
}

impl Manager {
    /// Defaults plus whichever of the system and user files exist
    #[must_use]
    pub fn new() -> Self {
        let mut data = Self::defaults_only().data;
        for path in Self::config_files() {
            if path.is_file() {
                debug!("reading {}", path.display());
                data = data.merge(Toml::file(path));
            } else {
                trace!("{} not present", path.display());
            }
        }
        Self { data }
    }

    /// The hard-wired defaults, without reading any files
    #[must_use]
    pub fn defaults_only() -> Self {
        Self {
            data: Figment::from(Defaults),
        }
    }

    /// The system and user configuration files for this platform, whether or not they exist
    #[must_use]
    pub fn config_files() -> Vec<PathBuf> {
        [system_config_path(), user_config_path()]
            .into_iter()
            .flatten()
            .collect()
    }

    /// Layers on a TOML file, which must exist
    #[must_use]
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Self {
        Self {
            data: self.data.merge(Toml::file_exact(path.as_ref())),
        }
    }

    /// Layers on the options given on the command line
    #[must_use]
    pub(crate) fn with_cli(self, cli: Configuration_Optional) -> Self {
        trace!("command-line overrides: {:?}", cli.given());
        Self {
            data: self.data.merge(cli),
        }
    }

    /// The merged configuration
    pub fn get(&self) -> Result<Configuration, figment::Error> {
        self.data.extract()
    }

    /// Every configuration field with its current value and source
    #[must_use]
    pub fn settings(&self) -> Vec<Setting> {
        Configuration::FIELD_NAMES_AS_SLICE
            .iter()
            .map(|&field| Setting {
                field: field.into(),
                value: self
                    .data
                    .find_value(field)
                    .map_or_else(|e| format!("<{e}>"), |v| render(&v)),
                source: self
                    .data
                    .find_metadata(field)
                    .map(|meta| source_of(meta, field))
                    .unwrap_or_default(),
            })
            .collect()
    }

    /// Keys in the configuration sources that are not configuration fields,
    /// each with the source it came from
    #[must_use]
    pub fn unrecognised(&self) -> Vec<(String, String)> {
        let Ok(data) = self.data.data() else {
            // get() reports the problem
            return Vec::new();
        };
        data.values()
            .flat_map(Dict::keys)
            .filter(|k| !Configuration::FIELD_NAMES_AS_SLICE.contains(&k.as_str()))
            .map(|k| {
                let source = self
                    .data
                    .find_metadata(k)
                    .map(|meta| source_of(meta, k))
                    .unwrap_or_default();
                (k.clone(), source)
            })
            .collect()
    }

    /// [`settings`](Self::settings) as a table
    #[must_use]
    pub fn table(&self) -> String {
        Table::new(self.settings()).with(Style::sharp()).to_string()
    }
}

fn render(value: &Value) -> String {
    if let Some(s) = value.as_str() {
        s.into()
    } else if let Some(n) = value.to_u128() {
        n.to_string()
    } else {
        format!("{value:?}")
    }
}

fn source_of(meta: &Metadata, field: &str) -> String {
    match &meta.source {
        Some(source) => source.to_string(),
        None if meta.name == CLI_SOURCE => meta.interpolate(&Profile::Global, &[field]),
        None => meta.name.to_string(),
    }
}
