// src/config/mod.rs

//! Configuration loading and validation.
//!
//! The raw TOML shape ([`RawConfigFile`]) is deserialized with `serde` and
//! then validated into a [`ConfigFile`] holding one resolved
//! [`TaskDescriptor`] per task. The supervision core only ever sees
//! descriptors.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, RawConfigFile, TaskConfig, TaskDescriptor, parse_duration};
