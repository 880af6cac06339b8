//! Configuration module for the geektime-downloader.
//!
//! This module handles:
//! - Loading settings from TOML files
//! - CLI argument merging
//! - Configuration validation
//! - The login credential cache

pub mod credentials;
pub mod loader;
pub mod quality;
pub mod validation;

pub use credentials::CredentialStore;
pub use loader::{
    default_concurrency, default_config_path, AccountConfig, Config, Credentials, OptionsConfig,
};
pub use quality::VideoQuality;
pub use validation::{parse_product_id, validate_config, validate_proxy};
