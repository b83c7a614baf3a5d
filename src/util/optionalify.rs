//! Command-line overlay for the configuration structure
// (c) 2024 Ross Younger

#![allow(meta_variable_misuse)] // false positives in these macro definitions

use derive_deftly::define_derive_deftly;

define_derive_deftly! {
    /// Generates `{Name}_Optional`, a copy of a configuration struct in which every field
    /// is an `Option`, so a command line need only carry what the user actually typed.
    ///
    /// The copy keeps the original's attributes (put them *after* `#[derive_deftly(Optionalify)]`)
    /// and gains `Default`. Visibility comes from `#[deftly(visibility = "...")]` if given.
    ///
    /// It is also a [`figment::Provider`] named `command-line`: only the fields that are `Some`
    /// are provided, and a value's source is reported as its `--long-option`.
    export Optionalify for struct, expect items:
    ${define OVERLAY ${paste $tdeftype _Optional}}

    /// Values given on the command line; `None` means "not given".
    #[allow(non_camel_case_types)]
    ${tattrs}
    #[derive(Default)]
    ${if tmeta(visibility) {
        ${tmeta(visibility) as token_stream}
    } else {
        ${tvis}
    }}
    struct $OVERLAY {
        $(
            ${fattrs}
            ${fvis} $fname: Option<$ftype>,
        )
    }

    impl $OVERLAY {
        /// Names of the fields that were given
        #[allow(dead_code)]
        pub(crate) fn given(&self) -> Vec<&'static str> {
            let mut names = Vec::new();
            $(
                if self.$fname.is_some() {
                    names.push(stringify!($fname));
                }
            )
            names
        }
    }

    impl figment::Provider for $OVERLAY {
        fn metadata(&self) -> figment::Metadata {
            figment::Metadata::named($crate::util::CLI_SOURCE).interpolater(|_, path| {
                $crate::util::option_for_key(path)
            })
        }

        fn data(&self) -> Result<figment::value::Map<figment::Profile, figment::value::Dict>, figment::Error> {
            let mut dict = figment::value::Dict::new();
            $(
                if let Some(v) = &self.$fname {
                    let _ = dict.insert(stringify!($fname).into(), figment::value::Value::serialize(v)?);
                }
            )
            Ok(figment::Profile::Global.collect(dict))
        }
    }
}

#[allow(clippy::module_name_repetitions)]
pub use derive_deftly_template_Optionalify;

/// Source name reported for values that came from the command line
pub const CLI_SOURCE: &str = "command-line";

/// `["trusted_extra_dir"]` becomes `--trusted-extra-dir`
#[must_use]
pub fn option_for_key(path: &[&str]) -> String {
    use heck::ToKebabCase as _;
    path.last()
        .map_or_else(|| "<unknown>".into(), |k| format!("--{}", k.to_kebab_case()))
}
