use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides.
///
/// Nested keys are separated by a double underscore, so
/// `SCOUT_DISCOVERY__MAX_RETRIES=5` overrides `discovery.max_retries`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let mut config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("SCOUT_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    resolve_env_references(&mut config)?;
    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    let mut config: Config =
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    resolve_env_references(&mut config)?;
    Ok(config)
}

/// Replace `${VAR_NAME}` API keys with the value of the environment variable.
fn resolve_env_references(config: &mut Config) -> Result<(), ConfigError> {
    for (name, llm) in config.llm.iter_mut() {
        let Some(key) = llm.api_key.as_deref() else {
            continue;
        };
        if let Some(var) = key.strip_prefix("${").and_then(|k| k.strip_suffix('}')) {
            let value = std::env::var(var).map_err(|_| {
                ConfigError::ValidationError(format!(
                    "llm.{}.api_key references unset environment variable {}",
                    name, var
                ))
            })?;
            llm.api_key = Some(value);
        }
    }
    Ok(())
}
