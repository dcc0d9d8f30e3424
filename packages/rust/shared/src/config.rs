//! Application configuration for SiteSync.
//!
//! User config lives at `~/.sitesync/sitesync.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiteSyncError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sitesync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sitesync";

// ---------------------------------------------------------------------------
// Config structs (matching sitesync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Apify crawl settings.
    #[serde(default)]
    pub apify: ApifyConfig,

    /// CustomGPT settings.
    #[serde(default)]
    pub customgpt: CustomGptConfig,

    /// Indexing wait policy.
    #[serde(default)]
    pub indexing: IndexingConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Maximum crawl depth passed to the crawler actor.
    #[serde(default = "default_crawl_depth")]
    pub crawl_depth: u32,

    /// Descriptions longer than this many characters are cut and suffixed with `...`.
    #[serde(default = "default_description_max_chars")]
    pub description_max_chars: usize,

    /// Extension of the file names sources are uploaded under.
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    /// Maximum uploads in flight at once.
    #[serde(default = "default_upload_concurrency")]
    pub upload_concurrency: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            crawl_depth: default_crawl_depth(),
            description_max_chars: default_description_max_chars(),
            file_extension: default_file_extension(),
            upload_concurrency: default_upload_concurrency(),
        }
    }
}

fn default_crawl_depth() -> u32 {
    20
}
fn default_description_max_chars() -> usize {
    197
}
fn default_file_extension() -> String {
    "txt".into()
}
fn default_upload_concurrency() -> usize {
    1
}

/// `[apify]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApifyConfig {
    /// Name of the env var holding the API token (never store the token itself).
    #[serde(default = "default_apify_token_env")]
    pub token_env: String,

    /// Actor used to crawl the site.
    #[serde(default = "default_actor_id")]
    pub actor_id: String,

    /// REST API root.
    #[serde(default = "default_apify_base_url")]
    pub base_url: String,
}

impl Default for ApifyConfig {
    fn default() -> Self {
        Self {
            token_env: default_apify_token_env(),
            actor_id: default_actor_id(),
            base_url: default_apify_base_url(),
        }
    }
}

fn default_apify_token_env() -> String {
    "APIFY_API_TOKEN".into()
}
fn default_actor_id() -> String {
    "apify~website-content-crawler".into()
}
fn default_apify_base_url() -> String {
    "https://api.apify.com/v2".into()
}

/// `[customgpt]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomGptConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_customgpt_key_env")]
    pub api_key_env: String,

    /// REST API root.
    #[serde(default = "default_customgpt_base_url")]
    pub base_url: String,

    /// Name given to the smoke-test conversation.
    #[serde(default = "default_conversation_name")]
    pub conversation_name: String,
}

impl Default for CustomGptConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_customgpt_key_env(),
            base_url: default_customgpt_base_url(),
            conversation_name: default_conversation_name(),
        }
    }
}

fn default_customgpt_key_env() -> String {
    "CUSTOMGPT_API_KEY".into()
}
fn default_customgpt_base_url() -> String {
    "https://app.customgpt.ai/api/v1".into()
}
fn default_conversation_name() -> String {
    "SiteSync smoke test".into()
}

/// What to do when a page settles in the `failed` index state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedPagePolicy {
    /// Count it as done and keep going.
    #[default]
    Accept,
    /// Stop waiting and report the failed pages.
    Abort,
}

/// `[indexing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Delay between re-fetches of a listing page that still has queued entries.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Entries requested per listing page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Give up after this many sleeps.
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,

    /// Optional wall-clock bound on the whole wait.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_secs: Option<u64>,

    #[serde(default)]
    pub failed_page_policy: FailedPagePolicy,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            page_size: default_page_size(),
            max_polls: default_max_polls(),
            max_duration_secs: None,
            failed_page_policy: FailedPagePolicy::default(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    5
}
fn default_page_size() -> u32 {
    100
}
fn default_max_polls() -> u32 {
    720
}

// ---------------------------------------------------------------------------
// Runtime indexing policy (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime wait policy for the indexing monitor.
#[derive(Debug, Clone)]
pub struct IndexingPolicy {
    pub poll_interval: Duration,
    pub page_size: u32,
    pub max_polls: u32,
    pub max_duration: Option<Duration>,
    pub failed_pages: FailedPagePolicy,
}

impl Default for IndexingPolicy {
    fn default() -> Self {
        Self::from(&IndexingConfig::default())
    }
}

impl From<&IndexingConfig> for IndexingPolicy {
    fn from(config: &IndexingConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            page_size: config.page_size.max(1),
            max_polls: config.max_polls,
            max_duration: config.max_duration_secs.map(Duration::from_secs),
            failed_pages: config.failed_page_policy,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sitesync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SiteSyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.sitesync/sitesync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SiteSyncError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SiteSyncError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SiteSyncError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SiteSyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SiteSyncError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a non-empty secret from the env var named by `var_name`.
pub fn read_secret(var_name: &str, service: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(SiteSyncError::config(format!(
            "{service} credentials not found. Set the {var_name} environment variable."
        ))),
    }
}
