//! Shared types, error model, and configuration for SeoPress.
//!
//! This crate is the foundation depended on by all other SeoPress crates.
//! It provides:
//! - [`SeoPressError`]: the unified error type
//! - Domain types ([`KeywordRecord`], [`GeneratedDocument`], [`StructuredData`])
//! - Configuration ([`AppConfig`] and its sections, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, LlmConfig, MirrorConfig, PublishConfig, RevalidateConfig, ServerConfig,
    StoreConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    read_secret, validate_api_key,
};
pub use error::{Result, SeoPressError};
pub use types::{
    GeneratedDocument, Intent, KeywordRecord, KeywordStatus, Priority, SchemaEntity, Section,
    Stage, StructuredData,
};
