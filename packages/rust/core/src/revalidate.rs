//! Cache revalidation hook for the site serving published articles.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, instrument};

use seopress_shared::{RevalidateConfig, Result, SeoPressError, read_secret};

const USER_AGENT: &str = concat!("seopress/", env!("CARGO_PKG_VERSION"));

/// Sends `POST {url}` with `{"paths": [...]}`. Single attempt.
#[derive(Debug, Clone)]
pub struct Revalidator {
    http: Client,
    url: String,
    secret: Option<String>,
}

impl Revalidator {
    pub fn new(url: impl Into<String>, secret: Option<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SeoPressError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
            secret,
        })
    }

    /// `None` when revalidation is disabled. The secret is optional.
    pub fn from_config(config: &RevalidateConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        Self::new(
            &config.url,
            read_secret(&config.secret_env),
            Duration::from_secs(config.timeout_secs),
        )
        .map(Some)
    }

    #[instrument(skip_all, fields(url = %self.url))]
    pub async fn revalidate(&self, paths: &[String]) -> Result<()> {
        let mut request = self.http.post(&self.url).json(&json!({ "paths": paths }));
        if let Some(secret) = &self.secret {
            request = request.bearer_auth(secret);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SeoPressError::Network(format!("{}: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SeoPressError::Network(format!("{}: HTTP {status}", self.url)));
        }
        debug!(?paths, "cache revalidated");
        Ok(())
    }
}
