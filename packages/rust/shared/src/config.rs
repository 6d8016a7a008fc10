//! Application configuration for SeoPress.
//!
//! User config lives at `~/.seopress/seopress.toml` unless `--config` points
//! elsewhere. CLI flags override config file values, which override defaults.
//! Secrets are never stored in the file: each section names the environment
//! variable that holds its credential.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeoPressError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "seopress.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".seopress";

// ---------------------------------------------------------------------------
// Config structs (matching seopress.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub publish: PublishConfig,

    #[serde(default)]
    pub mirror: MirrorConfig,

    #[serde(default)]
    pub revalidate: RevalidateConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the keyword CSV table.
    #[serde(default = "default_keywords_path")]
    pub keywords_path: String,

    /// Minutes after which a record stuck in `generating` is marked failed.
    /// `0` disables reconciliation.
    #[serde(default = "default_stale_after")]
    pub stale_after_minutes: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            keywords_path: default_keywords_path(),
            stale_after_minutes: default_stale_after(),
        }
    }
}

fn default_keywords_path() -> String {
    "data/keywords.csv".into()
}
fn default_stale_after() -> u64 {
    30
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API (no trailing `/chat/completions`).
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_llm_timeout() -> u64 {
    90
}

/// `[publish]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Directory receiving one `<slug>.md` file per article.
    #[serde(default = "default_content_dir")]
    pub content_dir: String,

    /// Public path prefix; an article's URL is `<url_prefix>/<slug>`.
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,

    /// Cover image convention: `<cover_image_prefix>/<slug>.jpg`.
    #[serde(default = "default_cover_image_prefix")]
    pub cover_image_prefix: String,

    /// Absolute site origin used in structured data.
    #[serde(default = "default_site_url")]
    pub site_url: String,

    #[serde(default = "default_author")]
    pub author: String,

    #[serde(default = "default_publisher")]
    pub publisher: String,

    /// Call-to-action block appended to every article.
    #[serde(default = "default_cta")]
    pub cta: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            content_dir: default_content_dir(),
            url_prefix: default_url_prefix(),
            cover_image_prefix: default_cover_image_prefix(),
            site_url: default_site_url(),
            author: default_author(),
            publisher: default_publisher(),
            cta: default_cta(),
        }
    }
}

fn default_content_dir() -> String {
    "content/blog".into()
}
fn default_url_prefix() -> String {
    "/blog".into()
}
fn default_cover_image_prefix() -> String {
    "/images/blog".into()
}
fn default_site_url() -> String {
    "https://example.com".into()
}
fn default_author() -> String {
    "Editorial Team".into()
}
fn default_publisher() -> String {
    "Example Studio".into()
}
fn default_cta() -> String {
    "## Ready to Start Your Project?\n\n\
     Our team turns ideas like these into finished spaces. \
     [Get in touch](/contact) for a free consultation and a tailored proposal."
        .into()
}

/// `[mirror]` section: optional copy of each article in a remote repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_mirror_api_base")]
    pub api_base: String,

    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub repo: String,

    #[serde(default = "default_branch")]
    pub branch: String,

    /// Directory inside the repository receiving `<slug>.md`.
    #[serde(default = "default_content_dir")]
    pub path_prefix: String,

    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Total attempts per push, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_mirror_timeout")]
    pub timeout_secs: u64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base: default_mirror_api_base(),
            owner: String::new(),
            repo: String::new(),
            branch: default_branch(),
            path_prefix: default_content_dir(),
            token_env: default_token_env(),
            max_attempts: default_max_attempts(),
            timeout_secs: default_mirror_timeout(),
        }
    }
}

fn default_mirror_api_base() -> String {
    "https://api.github.com".into()
}
fn default_branch() -> String {
    "main".into()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}
fn default_max_attempts() -> u32 {
    3
}
fn default_mirror_timeout() -> u64 {
    30
}

/// `[revalidate]` section: cache invalidation after a publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevalidateConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Full URL of the revalidation endpoint.
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_revalidate_secret_env")]
    pub secret_env: String,

    #[serde(default = "default_revalidate_timeout")]
    pub timeout_secs: u64,
}

impl Default for RevalidateConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            secret_env: default_revalidate_secret_env(),
            timeout_secs: default_revalidate_timeout(),
        }
    }
}

fn default_revalidate_secret_env() -> String {
    "REVALIDATE_SECRET".into()
}
fn default_revalidate_timeout() -> u64 {
    10
}

/// `[server]` section for the HTTP trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Env var holding the shared bearer secret.
    #[serde(default = "default_server_secret_env")]
    pub secret_env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            secret_env: default_server_secret_env(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".into()
}
fn default_server_secret_env() -> String {
    "CRON_SECRET".into()
}

impl AppConfig {
    /// Reject combinations that would only fail later, mid-run.
    pub fn validate(&self) -> Result<()> {
        if self.store.keywords_path.trim().is_empty() {
            return Err(SeoPressError::config("store.keywords_path must not be empty"));
        }
        if self.publish.content_dir.trim().is_empty() {
            return Err(SeoPressError::config("publish.content_dir must not be empty"));
        }
        url::Url::parse(&self.llm.base_url).map_err(|e| {
            SeoPressError::config(format!("llm.base_url '{}' is invalid: {e}", self.llm.base_url))
        })?;

        if self.mirror.enabled {
            if self.mirror.owner.is_empty() || self.mirror.repo.is_empty() {
                return Err(SeoPressError::config(
                    "mirror is enabled but mirror.owner or mirror.repo is empty",
                ));
            }
            if self.mirror.max_attempts == 0 {
                return Err(SeoPressError::config("mirror.max_attempts must be at least 1"));
            }
        }

        if self.revalidate.enabled {
            url::Url::parse(&self.revalidate.url).map_err(|e| {
                SeoPressError::config(format!(
                    "revalidate.url '{}' is invalid: {e}",
                    self.revalidate.url
                ))
            })?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.seopress/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| SeoPressError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.seopress/seopress.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| SeoPressError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SeoPressError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SeoPressError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SeoPressError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SeoPressError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a non-empty secret from the named environment variable.
pub fn read_secret(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Some(val.trim().to_string()),
        _ => None,
    }
}

/// Check that the LLM API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.llm.api_key_env;
    read_secret(var_name).ok_or_else(|| {
        SeoPressError::config(format!(
            "LLM API key not found. Set the {var_name} environment variable."
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("keywords_path"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
        assert!(toml_str.contains("CRON_SECRET"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.store.stale_after_minutes, 30);
        assert_eq!(parsed.publish.url_prefix, "/blog");
        assert_eq!(parsed.mirror.max_attempts, 3);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[publish]
content_dir = "/srv/site/posts"

[mirror]
enabled = true
owner = "acme"
repo = "site"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.publish.content_dir, "/srv/site/posts");
        assert_eq!(config.publish.url_prefix, "/blog");
        assert_eq!(config.mirror.branch, "main");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_incomplete_mirror() {
        let mut config = AppConfig::default();
        config.mirror.enabled = true;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mirror.owner"));
    }

    #[test]
    fn validate_rejects_bad_revalidate_url() {
        let mut config = AppConfig::default();
        config.revalidate.enabled = true;
        config.revalidate.url = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.llm.api_key_env = "SEOPRESS_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
