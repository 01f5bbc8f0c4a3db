use config::load_config;
use config::shared::GenerateOptions;

/// Loads the [`GenerateOptions`] and validates them.
pub fn load_generate_options() -> anyhow::Result<GenerateOptions> {
    let options = load_config::<GenerateOptions>()?;
    options.validate()?;

    Ok(options)
}
