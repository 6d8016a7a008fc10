//! Best-effort copy of published articles into a remote repository through a
//! GitHub-style contents API.
//!
//! One push is `GET` (to learn the current blob `sha`, if any) followed by a
//! `PUT` of the base64 content. Network errors and 5xx answers are retried
//! with linear backoff; 4xx answers are not.

use std::time::Duration;

use base64::{Engine, engine::general_purpose};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use seopress_shared::{MirrorConfig, Result, SeoPressError, read_secret};

use crate::publisher::PublishedDocument;

const USER_AGENT: &str = concat!("seopress/", env!("CARGO_PKG_VERSION"));
const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct RepositoryMirror {
    http: Client,
    config: MirrorConfig,
    token: String,
    backoff: Duration,
}

#[derive(Debug, Deserialize)]
struct ContentsEntry {
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: String,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

/// Outcome of a single attempt that did not succeed.
enum AttemptError {
    Retryable(SeoPressError),
    Fatal(SeoPressError),
}

impl RepositoryMirror {
    pub fn new(config: MirrorConfig, token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SeoPressError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            config,
            token: token.into(),
            backoff: DEFAULT_BACKOFF,
        })
    }

    /// `None` when mirroring is disabled. Fails when enabled without a token.
    pub fn from_config(config: &MirrorConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let token = read_secret(&config.token_env).ok_or_else(|| {
            SeoPressError::config(format!(
                "mirror is enabled but {} is not set",
                config.token_env
            ))
        })?;
        Self::new(config.clone(), token).map(Some)
    }

    /// Base delay between attempts; attempt `n` waits `n * backoff`.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn contents_url(&self, slug: &str) -> String {
        let prefix = self.config.path_prefix.trim_matches('/');
        let path = if prefix.is_empty() {
            format!("{slug}.md")
        } else {
            format!("{prefix}/{slug}.md")
        };
        format!(
            "{}/repos/{}/{}/contents/{path}",
            self.config.api_base.trim_end_matches('/'),
            self.config.owner,
            self.config.repo,
        )
    }

    /// Push one document, retrying transient failures.
    #[instrument(skip_all, fields(slug = %doc.slug))]
    pub async fn push(&self, doc: &PublishedDocument) -> Result<()> {
        let attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.try_push(doc).await {
                Ok(()) => {
                    info!(attempt, "article mirrored");
                    return Ok(());
                }
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Retryable(e)) if attempt >= attempts => return Err(e),
                Err(AttemptError::Retryable(e)) => {
                    let delay = self.backoff * attempt;
                    warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "mirror push failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn try_push(&self, doc: &PublishedDocument) -> std::result::Result<(), AttemptError> {
        let url = self.contents_url(&doc.slug);
        let sha = self.existing_sha(&url).await?;
        debug!(%url, exists = sha.is_some(), "mirror target resolved");

        let body = PutContents {
            message: format!("Publish {}", doc.slug),
            content: general_purpose::STANDARD.encode(doc.content.as_bytes()),
            branch: &self.config.branch,
            sha,
        };

        let response = self
            .request(self.http.put(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AttemptError::Retryable(SeoPressError::Network(format!("{url}: {e}"))))?;

        check_status(&url, response.status())
    }

    async fn existing_sha(&self, url: &str) -> std::result::Result<Option<String>, AttemptError> {
        let response = self
            .request(self.http.get(url))
            .query(&[("ref", self.config.branch.as_str())])
            .send()
            .await
            .map_err(|e| AttemptError::Retryable(SeoPressError::Network(format!("{url}: {e}"))))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_status(url, response.status())?;

        let entry: ContentsEntry = response.json().await.map_err(|e| {
            AttemptError::Fatal(SeoPressError::parse(format!("invalid contents response: {e}")))
        })?;
        Ok(Some(entry.sha))
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
    }
}

fn check_status(url: &str, status: StatusCode) -> std::result::Result<(), AttemptError> {
    if status.is_success() {
        return Ok(());
    }
    let err = SeoPressError::Network(format!("{url}: HTTP {status}"));
    if status.is_server_error() {
        Err(AttemptError::Retryable(err))
    } else {
        Err(AttemptError::Fatal(err))
    }
}
