// src/config/mod.rs

//! Configuration loading and validation for launcher.
//!
//! Responsibilities:
//! - Define the property-set and settings data model (`model.rs`).
//! - Load `.properties` files and `launcher.toml` from disk (`loader.rs`).
//! - Validate invariants like reserved and colliding names (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    load_command_configuration, load_command_reference, load_properties, load_settings,
    parse_properties,
};
pub use model::{ConfigurationSet, LauncherSettings, RawLauncherSettings};
pub use validate::{ENV_PREFIX, RESERVED_KEYS, ensure_disjoint, ensure_no_reserved, is_reserved};
