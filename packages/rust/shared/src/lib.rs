//! Shared types, error model, and configuration for SiteSync.
//!
//! This crate is the foundation depended on by all other SiteSync crates.
//! It provides:
//! - [`SiteSyncError`]: the unified error type
//! - Domain types ([`Document`], [`Project`], [`UploadReport`], [`PageStatus`])
//! - Configuration ([`AppConfig`], [`IndexingPolicy`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApifyConfig, AppConfig, CustomGptConfig, DefaultsConfig, FailedPagePolicy, IndexingConfig,
    IndexingPolicy, config_dir, config_file_path, init_config, load_config, load_config_from,
    read_secret,
};
pub use error::{Result, SiteSyncError};
pub use types::{
    ConversationTurn, Document, IndexStatus, IndexingReport, PageStatus, Project, ProjectId,
    UploadReport, UploadResult, UploadStatus,
};
