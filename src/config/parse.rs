use super::types::Config;
use crate::config::expand_tilde;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    use std::io::Read;

    let mut file = File::open(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open config file '{}': {}", path.display(), e),
        ))
    })?;

    let mut yaml_string = String::new();
    file.read_to_string(&mut yaml_string).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    let mut config: Config = serde_yaml::from_str(&yaml_string)?;

    config.source.path = expand_tilde(&config.source.path);

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.source.path.as_os_str().is_empty() {
        errors.push("source.path must not be empty".to_string());
    }

    if config.source.timestamp.format.is_empty() {
        errors.push(
            "source.timestamp.format must be 'epoch' or a strptime format string".to_string(),
        );
    }

    if config.cache.capacity == 0 {
        errors.push("cache.capacity must be at least 1".to_string());
    }

    if config.refresh.interval.is_zero() {
        errors.push("refresh.interval must be greater than zero".to_string());
    }

    if config.query.compute_budget.is_zero() {
        errors.push("query.compute_budget must be greater than zero".to_string());
    }

    if config.web.listen.parse::<std::net::SocketAddr>().is_err() {
        errors.push(format!(
            "web.listen is not a valid socket address: '{}'",
            config.web.listen
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}
