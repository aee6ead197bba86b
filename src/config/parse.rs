use super::types::*;
use crate::config::{expand_env_vars, expand_tilde};
use regex::Regex;
use std::fs;
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

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml = fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml)
}

/// Parse and validate a config document.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml)?;

    let mut config: Config = serde_yaml::from_str(&yaml)?;
    config.tailer.scrape_path = expand_tilde(&config.tailer.scrape_path);

    validate_config(&config)?;
    Ok(config)
}

fn check_unexpanded_vars(yaml: &str) -> Result<(), ConfigError> {
    let re = Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| ConfigError::Validation(e.to_string()))?;

    let mut unset: Vec<&str> = re
        .captures_iter(yaml)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
        .collect();

    if unset.is_empty() {
        return Ok(());
    }

    unset.sort_unstable();
    unset.dedup();

    Err(ConfigError::Validation(format!(
        "environment variables are not set: {}",
        unset.join(", ")
    )))
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    validate_tailer(&config.tailer, &mut errors);
    validate_client(&config.client, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

fn validate_tailer(tailer: &TailerConfig, errors: &mut Vec<String>) {
    if tailer.scrape_path.as_os_str().is_empty() {
        errors.push("tailer.scrape_path must not be empty".to_string());
    }

    if let Err(e) = Regex::new(&tailer.file_pattern) {
        errors.push(format!(
            "tailer.file_pattern: invalid regex '{}': {}",
            tailer.file_pattern, e
        ));
    }
}

fn validate_client(client: &ClientConfig, errors: &mut Vec<String>) {
    match reqwest::Url::parse(&client.push_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(format!(
            "client.push_url: unsupported scheme '{}'",
            url.scheme()
        )),
        Err(e) => errors.push(format!(
            "client.push_url: invalid url '{}': {}",
            client.push_url, e
        )),
    }

    if client.labels.is_empty() {
        errors.push("client.labels must contain at least one label".to_string());
    }
    for name in client.labels.keys() {
        if !is_label_name(name) {
            errors.push(format!("client.labels: invalid label name '{}'", name));
        }
    }

    if client.retry == 0 {
        errors.push("client.retry must be at least 1".to_string());
    }
    if client.backoff.is_zero() {
        errors.push("client.backoff must be positive".to_string());
    }
    if client.max_backoff < client.backoff {
        errors.push("client.max_backoff must not be smaller than client.backoff".to_string());
    }
    if client.batch_max_size == 0 {
        errors.push("client.batch_max_size must be positive".to_string());
    }
    if client.batch_max_wait.is_zero() {
        errors.push("client.batch_max_wait must be positive".to_string());
    }
    if client.queue_capacity == 0 {
        errors.push("client.queue_capacity must be positive".to_string());
    }
    if client.timeout.is_zero() {
        errors.push("client.timeout must be positive".to_string());
    }
}

/// Label names follow `[a-zA-Z_][a-zA-Z0-9_]*`.
fn is_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
