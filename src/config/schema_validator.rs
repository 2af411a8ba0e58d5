// src/config/schema_validator.rs
//! Parameter file schema validation

use crate::config::constants::{butterworth, envelope, frequency, notch};
use std::collections::HashMap;

/// Parameter validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub value: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation error for '{}': {} (value: {})", self.field, self.message, self.value)
    }
}

impl std::error::Error for ValidationError {}

/// Schema validator for filter parameter files
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    constraints: HashMap<String, FieldConstraint>,
}

/// Field validation constraints
#[derive(Debug, Clone)]
pub enum FieldConstraint {
    Range { min: f64, max: f64 },
    IntRange { min: i64, max: i64 },
    OneOf(Vec<String>),
    MaxItems(usize),
}

impl SchemaValidator {
    /// Create new schema validator with default constraints
    pub fn new() -> Self {
        let mut constraints = HashMap::new();

        constraints.insert("frequency_floor_hz".to_string(),
                           FieldConstraint::Range {
                               min: frequency::ABSOLUTE_MIN_FREQUENCY_HZ,
                               max: 1000.0,
                           });

        constraints.insert("causality".to_string(),
                           FieldConstraint::OneOf(vec![
                               "causal".to_string(),
                               "non_causal".to_string(),
                           ]));

        constraints.insert("rectification".to_string(),
                           FieldConstraint::OneOf(vec![
                               "none".to_string(),
                               "absolute".to_string(),
                               "power".to_string(),
                           ]));

        // Butterworth constraints; 0 disables a side, upper bound is checked against Nyquist later
        for key in ["butterworth.highpass_hz", "butterworth.lowpass_hz"] {
            constraints.insert(key.to_string(), FieldConstraint::Range { min: 0.0, max: f64::MAX });
        }

        for key in ["butterworth.highpass_order", "butterworth.lowpass_order"] {
            constraints.insert(key.to_string(),
                               FieldConstraint::IntRange {
                                   min: butterworth::MIN_ORDER as i64,
                                   max: butterworth::MAX_ORDER as i64,
                               });
        }

        constraints.insert("notch.frequencies_hz".to_string(),
                           FieldConstraint::MaxItems(notch::MAX_NOTCHES));

        constraints.insert("envelope.width_ms".to_string(),
                           FieldConstraint::Range {
                               min: envelope::MIN_WIDTH_MS,
                               max: 60_000.0,
                           });

        constraints.insert("spatial.kind".to_string(),
                           FieldConstraint::OneOf(vec![
                               "mean".to_string(),
                               "median".to_string(),
                               "interseptile_weighted_mean".to_string(),
                           ]));

        constraints.insert("reference.mode".to_string(),
                           FieldConstraint::OneOf(vec![
                               "as_recorded".to_string(),
                               "average".to_string(),
                               "channels".to_string(),
                           ]));

        Self { constraints }
    }

    /// Validate a single value against the schema
    pub fn validate_field(&self, field_path: &str, value: &toml::Value) -> Result<(), ValidationError> {
        if let Some(constraint) = self.constraints.get(field_path) {
            self.check_constraint(field_path, value, constraint)
        } else {
            Ok(()) // Unknown fields are allowed for extensibility
        }
    }

    /// Validate entire parameter file
    pub fn validate_config(&self, config: &toml::Value) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        self.validate_recursive("", config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Check cross-field dependencies
    pub fn validate_dependencies(&self, config: &toml::Value) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let spatial_enabled = self.get_nested_value(config, "spatial.enabled")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if spatial_enabled && self.get_nested_value(config, "spatial.coordinates_file").is_none() {
            errors.push(ValidationError {
                field: "spatial.coordinates_file".to_string(),
                message: "Spatial filter requires a coordinates file".to_string(),
                value: "missing".to_string(),
            });
        }

        let reference_mode = self.get_nested_value(config, "reference.mode").and_then(|v| v.as_str());
        if reference_mode == Some("channels") {
            let has_channels = self.get_nested_value(config, "reference.channels")
                .and_then(|v| v.as_array())
                .map_or(false, |channels| !channels.is_empty());
            if !has_channels {
                errors.push(ValidationError {
                    field: "reference.channels".to_string(),
                    message: "Channel reference requires at least one channel".to_string(),
                    value: "empty".to_string(),
                });
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    fn validate_recursive(&self, prefix: &str, value: &toml::Value, errors: &mut Vec<ValidationError>) {
        match value {
            toml::Value::Table(table) => {
                for (key, val) in table {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };

                    self.validate_recursive(&path, val, errors);
                }
            }
            _ => {
                if let Err(err) = self.validate_field(prefix, value) {
                    errors.push(err);
                }
            }
        }
    }

    fn check_constraint(&self, field: &str, value: &toml::Value, constraint: &FieldConstraint) -> Result<(), ValidationError> {
        match constraint {
            FieldConstraint::Range { min, max } => {
                let number = value.as_float().or_else(|| value.as_integer().map(|v| v as f64));
                if let Some(val) = number {
                    if val < *min || val > *max {
                        return Err(ValidationError {
                            field: field.to_string(),
                            message: format!("Value must be between {} and {}", min, max),
                            value: val.to_string(),
                        });
                    }
                }
            }
            FieldConstraint::IntRange { min, max } => {
                if let Some(val) = value.as_integer() {
                    if val < *min || val > *max {
                        return Err(ValidationError {
                            field: field.to_string(),
                            message: format!("Value must be between {} and {}", min, max),
                            value: val.to_string(),
                        });
                    }
                }
            }
            FieldConstraint::OneOf(options) => {
                if let Some(val) = value.as_str() {
                    if !options.iter().any(|opt| opt.eq_ignore_ascii_case(val)) {
                        return Err(ValidationError {
                            field: field.to_string(),
                            message: format!("Value must be one of: {}", options.join(", ")),
                            value: val.to_string(),
                        });
                    }
                }
            }
            FieldConstraint::MaxItems(max_items) => {
                if let Some(items) = value.as_array() {
                    if items.len() > *max_items {
                        return Err(ValidationError {
                            field: field.to_string(),
                            message: format!("At most {} items are allowed", max_items),
                            value: items.len().to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn get_nested_value<'a>(&self, config: &'a toml::Value, path: &str) -> Option<&'a toml::Value> {
        let mut current = config;

        for part in path.split('.') {
            current = current.as_table()?.get(part)?;
        }

        Some(current)
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_validator_creation() {
        let validator = SchemaValidator::new();
        assert!(!validator.constraints.is_empty());
    }

    #[test]
    fn test_order_range() {
        let validator = SchemaValidator::new();
        assert!(validator.validate_field("butterworth.lowpass_order", &toml::Value::Integer(4)).is_ok());
        assert!(validator.validate_field("butterworth.lowpass_order", &toml::Value::Integer(0)).is_err());
        assert!(validator.validate_field("butterworth.lowpass_order", &toml::Value::Integer(64)).is_err());
    }

    #[test]
    fn test_integer_accepted_for_float_range() {
        let validator = SchemaValidator::new();
        assert!(validator.validate_field("butterworth.lowpass_hz", &toml::Value::Integer(40)).is_ok());
        assert!(validator.validate_field("butterworth.lowpass_hz", &toml::Value::Float(-1.0)).is_err());
    }

    #[test]
    fn test_enum_validation() {
        let validator = SchemaValidator::new();
        let valid_value = toml::Value::String("Average".to_string());
        assert!(validator.validate_field("reference.mode", &valid_value).is_ok());

        let invalid_value = toml::Value::String("bipolar".to_string());
        assert!(validator.validate_field("reference.mode", &invalid_value).is_err());
    }

    #[test]
    fn test_too_many_notches() {
        let validator = SchemaValidator::new();
        let notches: Vec<toml::Value> = (1..=notch::MAX_NOTCHES + 1)
            .map(|i| toml::Value::Float(50.0 * i as f64))
            .collect();

        let config: toml::Value = toml::Value::Table({
            let mut notch_table = toml::value::Table::new();
            notch_table.insert("frequencies_hz".to_string(), toml::Value::Array(notches));
            let mut root = toml::value::Table::new();
            root.insert("notch".to_string(), toml::Value::Table(notch_table));
            root
        });

        let errors = validator.validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "notch.frequencies_hz");
    }

    #[test]
    fn test_spatial_dependency() {
        let validator = SchemaValidator::new();
        let config: toml::Value = toml::from_str("[spatial]\nenabled = true\n").unwrap();
        assert!(validator.validate_dependencies(&config).is_err());

        let config: toml::Value =
            toml::from_str("[spatial]\nenabled = true\ncoordinates_file = \"cap.xyz\"\n").unwrap();
        assert!(validator.validate_dependencies(&config).is_ok());
    }
}
