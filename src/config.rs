use crate::error::Result;
use crate::types::{Config, SubscoutError};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub fn load_config(config_path_str: &str) -> Result<Config> {
    let mut config = Config::default();

    if Path::new(config_path_str).exists() {
        let contents = fs::read_to_string(config_path_str)
            .map_err(|e| SubscoutError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let toml_config: toml::Value = toml::from_str(&contents)
            .map_err(|e| SubscoutError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        if let Some(table) = toml_config.as_table() {
            if let Some(timeout) = table.get("timeout").and_then(|v| v.as_integer()) {
                config.timeout = Duration::from_secs(timeout.max(0) as u64);
            }
            if let Some(max_pages) = table.get("max_pages").and_then(|v| v.as_integer()) {
                config.max_pages = max_pages.max(0) as usize;
            }
            if let Some(verify_tls) = table.get("verify_tls").and_then(|v| v.as_bool()) {
                config.verify_tls = verify_tls;
            }
            if let Some(api_keys) = table.get("api_keys").and_then(|v| v.as_table()) {
                for (source, value) in api_keys {
                    if let Some(value_array) = value.as_array() {
                        let keys: Vec<String> = value_array
                            .iter()
                            .filter_map(|v| v.as_str().map(|s| s.to_string()))
                            .collect();
                        config.api_keys.insert(source.clone(), keys);
                    }
                }
            }
        }
    }

    apply_env_overrides(&mut config);
    validate_config(&config)?;

    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(keys) = env::var("ALIENVAULT_API_KEYS") {
        config.api_keys.insert(
            "alienvault".to_string(),
            keys.split(',').map(|s| s.trim().to_string()).collect(),
        );
    }
}

fn validate_config(config: &Config) -> Result<()> {
    if config.timeout.as_secs() == 0 {
        return Err(SubscoutError::ConfigError(
            "timeout must be greater than 0".to_string(),
        ));
    }
    Ok(())
}
