//! Configuration management for the team-forge service
//!
//! This module handles configuration loading from environment variables
//! or a TOML file, validation, and default values.

pub mod app;

// Re-export commonly used types
pub use app::{validate_config, AmqpSettings, AppConfig, MatchmakingSettings, ServiceSettings};
