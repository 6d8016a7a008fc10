//! Transport seam to the text-generation endpoint.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use seopress_shared::{LlmConfig, Result, SeoPressError};
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("seopress/", env!("CARGO_PKG_VERSION"));

/// Which article part a completion is for. Used for logging and by
/// scripted generators in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    Title,
    Outline,
    Section,
    Meta,
    Tags,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Outline => "outline",
            Self::Section => "section",
            Self::Meta => "meta",
            Self::Tags => "tags",
        }
    }
}

/// One system + user prompt pair.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub purpose: Purpose,
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
}

/// Raw text returned by the endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
}

impl Completion {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Anything that can turn a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;
}

// ---------------------------------------------------------------------------
// OpenAI-compatible chat completions
// ---------------------------------------------------------------------------

/// [`TextGenerator`] backed by `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct ChatCompletionsGenerator {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl ChatCompletionsGenerator {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SeoPressError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
        })
    }

    /// Build from the `[llm]` config section and an already-resolved key.
    pub fn from_config(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        Self::new(
            &config.base_url,
            api_key,
            &config.model,
            config.temperature,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for ChatCompletionsGenerator {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let start = Instant::now();
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: self.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, purpose = request.purpose.as_str(), "generation request failed");
                SeoPressError::Network(format!("{url}: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "generation endpoint error");
            return Err(SeoPressError::Generation {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| SeoPressError::parse(format!("invalid completion body: {e}")))?;

        // A successful call with no text is a degenerate answer, not an error;
        // the cleanup fallbacks handle it.
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!(
            model = %self.model,
            purpose = request.purpose.as_str(),
            chars = content.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "completion received"
        );

        Ok(Completion { content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> CompletionRequest {
        CompletionRequest {
            purpose: Purpose::Title,
            system: "You write titles.".into(),
            user: "office interior design".into(),
            max_tokens: 60,
        }
    }

    fn generator(server: &MockServer) -> ChatCompletionsGenerator {
        ChatCompletionsGenerator::new(
            format!("{}/v1/", server.uri()),
            "test-key",
            "test-model",
            0.5,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn posts_chat_request_and_reads_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-model",
                "max_tokens": 60,
                "messages": [
                    {"role": "system", "content": "You write titles."},
                    {"role": "user", "content": "office interior design"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "Office Interior Design Guide"}},
                    {"message": {"role": "assistant", "content": "ignored"}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let completion = generator(&server).complete(request()).await.unwrap();
        assert_eq!(completion.content, "Office Interior Design Guide");
    }

    #[tokio::test]
    async fn non_success_status_is_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let err = generator(&server).complete(request()).await.unwrap_err();
        match err {
            SeoPressError::Generation { status, message } => {
                assert_eq!(status, 500);
                assert!(message.contains("upstream exploded"));
            }
            other => panic!("expected Generation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_yield_empty_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let completion = generator(&server).complete(request()).await.unwrap();
        assert!(completion.content.is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = generator(&server).complete(request()).await.unwrap_err();
        assert!(matches!(err, SeoPressError::Parse { .. }));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_error() {
        let generator = ChatCompletionsGenerator::new(
            "http://127.0.0.1:9",
            "k",
            "m",
            0.7,
            Duration::from_millis(500),
        )
        .unwrap();
        let err = generator.complete(request()).await.unwrap_err();
        assert!(matches!(err, SeoPressError::Network(_)));
    }
}
