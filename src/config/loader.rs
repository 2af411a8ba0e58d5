// src/config/loader.rs
//! Parameter file loader with layered merging and environment overrides

use crate::config::constants::paths;
use crate::config::filter_params::{validate_filter_params, FilterParams};
use crate::config::schema_validator::{SchemaValidator, ValidationError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Top-level tables of a parameter file; an environment key is split after one of these
const PARAMETER_TABLES: [&str; 6] = [
    "butterworth",
    "notch",
    "spatial",
    "reference",
    "envelope",
    "threshold",
];

/// Parameter loader merging defaults, files and environment
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    schema_validator: SchemaValidator,
    current_params: FilterParams,
}

/// Parameter loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Parameter file not found: {0}")]
    FileNotFound(String),

    #[error("Parameter parse error: {0}")]
    Parse(String),

    #[error("Parameter validation errors: {}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|error| error.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl ConfigLoader {
    /// Create loader over the standard search paths
    pub fn new() -> Self {
        Self::with_paths(Self::discover_config_paths())
    }

    /// Create loader with custom paths, later paths take precedence
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            schema_validator: SchemaValidator::new(),
            current_params: FilterParams::default(),
        }
    }

    /// Paths searched by this loader
    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load and validate the merged parameter record
    pub fn load_filter_params(&mut self) -> Result<FilterParams, ConfigError> {
        let params = self.load_and_merge_configs()?;
        self.current_params = params.clone();
        Ok(params)
    }

    /// Last successfully loaded parameters
    pub fn current_params(&self) -> &FilterParams {
        &self.current_params
    }

    /// Validate a parameter file without loading it
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let toml_value: toml::Value = toml::from_str(&content)?;

        self.schema_validator
            .validate_config(&toml_value)
            .map_err(ConfigError::Validation)?;

        self.schema_validator
            .validate_dependencies(&toml_value)
            .map_err(ConfigError::Validation)?;

        Ok(())
    }

    /// Export current parameters to file
    pub fn export_config<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let toml_content = toml::to_string_pretty(&self.current_params)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        std::fs::write(path, toml_content)?;
        Ok(())
    }

    fn load_and_merge_configs(&self) -> Result<FilterParams, ConfigError> {
        let mut merged_config = toml::Value::Table(toml::value::Table::new());

        let default_config = toml::Value::try_from(&FilterParams::default())
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        self.merge_toml_values(&mut merged_config, default_config);

        for config_path in &self.config_paths {
            match self.load_config_file(config_path) {
                Ok(file_config) => {
                    debug!(path = %config_path.display(), "Merging parameter file");
                    self.merge_toml_values(&mut merged_config, file_config);
                }
                Err(ConfigError::FileNotFound(_)) => continue, // Optional layer
                Err(e) => return Err(e),
            }
        }

        self.apply_environment_overrides(&mut merged_config);

        self.schema_validator
            .validate_config(&merged_config)
            .map_err(ConfigError::Validation)?;

        self.schema_validator
            .validate_dependencies(&merged_config)
            .map_err(ConfigError::Validation)?;

        let params: FilterParams = merged_config
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(format!("Failed to deserialize parameters: {}", e)))?;

        validate_filter_params(&params).map_err(|message| {
            ConfigError::Validation(vec![ValidationError {
                field: "parameters".to_string(),
                message,
                value: String::new(),
            }])
        })?;

        info!(paths = self.config_paths.len(), "Filter parameters loaded");
        Ok(params)
    }

    fn load_config_file<P: AsRef<Path>>(&self, path: P) -> Result<toml::Value, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: toml::Value = toml::from_str(&content)?;

        Ok(config)
    }

    fn merge_toml_values(&self, base: &mut toml::Value, overlay: toml::Value) {
        match (base, overlay) {
            (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
                for (key, value) in overlay_table {
                    if let Some(base_value) = base_table.get_mut(&key) {
                        self.merge_toml_values(base_value, value);
                    } else {
                        base_table.insert(key, value);
                    }
                }
            }
            (base_value, overlay_value) => {
                *base_value = overlay_value;
            }
        }
    }

    fn apply_environment_overrides(&self, config: &mut toml::Value) {
        for (key, value) in std::env::vars() {
            if let Some(stripped) = key.strip_prefix(paths::ENV_PREFIX) {
                let config_key = Self::env_key_to_path(stripped);
                debug!(key = %key, path = %config_key, "Environment override");
                self.set_nested_value(config, &config_key, self.parse_env_value(&value));
            }
        }
    }

    /// `BUTTERWORTH_LOWPASS_HZ` becomes `butterworth.lowpass_hz`
    fn env_key_to_path(key: &str) -> String {
        let lower = key.to_lowercase();
        for table in PARAMETER_TABLES {
            if let Some(field) = lower.strip_prefix(table).and_then(|rest| rest.strip_prefix('_')) {
                return format!("{}.{}", table, field);
            }
        }
        lower
    }

    fn parse_env_value(&self, value: &str) -> toml::Value {
        // Anything TOML accepts as a value (numbers, booleans, arrays), else a bare string
        toml::from_str::<toml::Value>(&format!("value = {}", value))
            .ok()
            .and_then(|parsed| parsed.get("value").cloned())
            .unwrap_or_else(|| toml::Value::String(value.to_string()))
    }

    fn set_nested_value(&self, config: &mut toml::Value, path: &str, value: toml::Value) {
        let parts: Vec<&str> = path.split('.').collect();
        let mut current = config;

        for (i, part) in parts.iter().enumerate() {
            let toml::Value::Table(table) = current else {
                return;
            };

            if i == parts.len() - 1 {
                table.insert(part.to_string(), value);
                return;
            }

            current = table
                .entry(part.to_string())
                .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
        }
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(paths::USER_CONFIG_DIR).join(paths::DEFAULT_CONFIG_FILE));
        }

        paths.push(PathBuf::from(paths::DEFAULT_CONFIG_FILE));
        paths.push(PathBuf::from(paths::LOCAL_CONFIG_FILE));

        paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// Cross-platform directory discovery
mod dirs {
    use std::path::PathBuf;

    pub fn home_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var_os("USERPROFILE").map(PathBuf::from)
        }
        #[cfg(not(target_os = "windows"))]
        {
            std::env::var_os("HOME").map(PathBuf::from)
        }
    }
}
