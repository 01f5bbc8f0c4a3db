use serde::de::DeserializeOwned;

use crate::environment::Environment;

/// Directory containing configuration files relative to the working directory.
const CONFIGURATION_DIR: &str = "configuration";

/// Base configuration file loaded for all environments.
const BASE_CONFIG_FILE: &str = "base.yaml";

/// Prefix for environment variable configuration overrides.
const ENV_PREFIX: &str = "APP";

const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested configuration keys in environment variables.
///
/// Example: `APP_CLUSTERS__SAMPLES=20` sets the `clusters.samples` field.
const ENV_SEPARATOR: &str = "__";

const LIST_SEPARATOR: &str = ",";

/// Trait defining the keys that should be parsed as lists in a given [`Config`] implementation.
pub trait Config {
    /// Keys whose environment variable values are split on `,`.
    const LIST_PARSE_KEYS: &'static [&'static str];
}

/// Loads hierarchical configuration from YAML files and environment variables.
///
/// Sources are layered in this order, later ones winning:
/// 1. `configuration/base.yaml`
/// 2. `configuration/{environment}.yaml`
/// 3. environment variables prefixed with `APP`
///
/// The environment-specific file is optional so a single `base.yaml` is enough to run the
/// generator locally.
pub fn load_config<T>() -> Result<T, rust_cli_config::ConfigError>
where
    T: Config + DeserializeOwned,
{
    let base_path = std::env::current_dir().map_err(|err| {
        rust_cli_config::ConfigError::Message(format!(
            "failed to determine the current directory: {err}"
        ))
    })?;
    let configuration_directory = base_path.join(CONFIGURATION_DIR);

    let environment = Environment::load().map_err(|err| {
        rust_cli_config::ConfigError::Message(format!("failed to parse APP_ENVIRONMENT: {err}"))
    })?;
    let environment_filename = format!("{environment}.yaml");

    let mut environment_source = rust_cli_config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true);

    if !<T as Config>::LIST_PARSE_KEYS.is_empty() {
        environment_source = environment_source.list_separator(LIST_SEPARATOR);

        for key in <T as Config>::LIST_PARSE_KEYS {
            environment_source = environment_source.with_list_parse_key(key);
        }
    }

    let settings = rust_cli_config::Config::builder()
        .add_source(rust_cli_config::File::from(
            configuration_directory.join(BASE_CONFIG_FILE),
        ))
        .add_source(
            rust_cli_config::File::from(configuration_directory.join(environment_filename))
                .required(false),
        )
        // E.g. `APP_CLUSTERS__CONCURRENCY=4` sets `GenerateOptions { clusters: { concurrency } }`.
        .add_source(environment_source)
        .build()?;

    settings.try_deserialize::<T>()
}
