//! Zhiri Core - shared types for the marketplace backend
//!
//! This crate defines the pieces every other crate leans on:
//! - Configuration management and its errors
//! - Pagination primitives

pub mod config;
pub mod pagination;

pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig,
    MAX_TOKEN_TTL_MS,
};
pub use pagination::{Page, PageRequest};
