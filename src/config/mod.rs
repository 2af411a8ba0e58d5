// src/config/mod.rs
//! Filter parameter management
//!
//! Parameters come from layered TOML files and `EEGF_` environment overrides,
//! are checked against a schema and end up as a [`FilterParams`] record that
//! the resolver turns into an executable pipeline.

pub mod constants;
pub mod filter_params;
pub mod loader;
pub mod schema_validator;

pub use constants::*;
pub use filter_params::*;
pub use loader::{ConfigError, ConfigLoader};
pub use schema_validator::{SchemaValidator, ValidationError};
