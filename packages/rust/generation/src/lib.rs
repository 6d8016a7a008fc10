//! Text generation for article parts.
//!
//! [`GenerationClient`] exposes one operation per article part. Each sends a
//! fixed system prompt plus a keyword-specific user prompt through a
//! [`TextGenerator`], then normalizes the answer. Transport and HTTP errors
//! propagate unchanged; only degenerate-but-successful answers are patched
//! with fallbacks.

mod client;
pub mod normalize;
mod prompts;
pub mod scripted;

use std::sync::Arc;

use async_trait::async_trait;
use seopress_shared::{Intent, Result, Stage};
use tracing::instrument;

pub use client::{ChatCompletionsGenerator, Completion, CompletionRequest, Purpose, TextGenerator};
pub use scripted::ScriptedGenerator;

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        (**self).complete(request).await
    }
}

/// Article-part operations over any [`TextGenerator`].
#[derive(Debug, Clone)]
pub struct GenerationClient<G> {
    generator: G,
}

impl<G: TextGenerator> GenerationClient<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    async fn ask(&self, purpose: Purpose, system: &str, user: String, max_tokens: u32) -> Result<String> {
        let completion = self
            .generator
            .complete(CompletionRequest {
                purpose,
                system: system.to_string(),
                user,
                max_tokens,
            })
            .await?;
        Ok(completion.content)
    }

    /// Title of at most 100 characters; never empty.
    #[instrument(skip_all, fields(%keyword, %stage))]
    pub async fn generate_title(&self, keyword: &str, stage: Stage, intent: Intent) -> Result<String> {
        let raw = self
            .ask(Purpose::Title, prompts::TITLE_SYSTEM, prompts::title(keyword, stage, intent), 60)
            .await?;
        Ok(normalize::clean_title(&raw, keyword))
    }

    /// Up to eight headings; the six-heading default when none are usable.
    #[instrument(skip_all, fields(%keyword))]
    pub async fn generate_outline(&self, title: &str, keyword: &str, stage: Stage) -> Result<Vec<String>> {
        let raw = self
            .ask(Purpose::Outline, prompts::OUTLINE_SYSTEM, prompts::outline(title, keyword, stage), 400)
            .await?;

        let outline = normalize::parse_outline(&raw);
        if outline.is_empty() {
            tracing::warn!(%keyword, "no headings in outline answer, using default outline");
            return Ok(normalize::default_outline(keyword));
        }
        Ok(outline)
    }

    /// Section body of at least 100 characters.
    #[instrument(skip_all, fields(%heading))]
    pub async fn generate_section(&self, heading: &str, keyword: &str, context: &str) -> Result<String> {
        let raw = self
            .ask(Purpose::Section, prompts::SECTION_SYSTEM, prompts::section(heading, keyword, context), 900)
            .await?;
        Ok(normalize::clean_section(&raw, heading, keyword, context))
    }

    /// Meta description (≤ 155 chars) and 3 to 5 tags, from two calls.
    #[instrument(skip_all, fields(%keyword, content_chars = content.len()))]
    pub async fn generate_meta_and_tags(
        &self,
        title: &str,
        keyword: &str,
        content: &str,
    ) -> Result<(String, Vec<String>)> {
        let raw_meta = self
            .ask(Purpose::Meta, prompts::META_SYSTEM, prompts::meta(title, keyword, content), 120)
            .await?;
        let raw_tags = self
            .ask(Purpose::Tags, prompts::TAGS_SYSTEM, prompts::tags(title, keyword, content), 60)
            .await?;

        Ok((
            normalize::clean_meta(&raw_meta, keyword),
            normalize::clean_tags(&raw_tags, keyword),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seopress_shared::SeoPressError;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn scripted(generator: ScriptedGenerator) -> GenerationClient<ScriptedGenerator> {
        GenerationClient::new(generator)
    }

    #[tokio::test]
    async fn title_is_cleaned_and_prompt_carries_keyword() {
        let client = scripted(
            ScriptedGenerator::new().with_reply(Purpose::Title, "1. \"Office Interior Design Done Right\""),
        );
        let title = client
            .generate_title("office interior design", Stage::Tofu, Intent::Informational)
            .await
            .unwrap();
        assert_eq!(title, "Office Interior Design Done Right");

        let calls = client.generator().calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].user.contains("office interior design"));
        assert!(calls[0].user.contains("TOFU"));
        assert_eq!(calls[0].system, prompts::TITLE_SYSTEM);
    }

    #[tokio::test]
    async fn empty_outline_answer_uses_default_template() {
        let client = scripted(ScriptedGenerator::new().with_reply(Purpose::Outline, "Sorry, I can't help."));
        let outline = client
            .generate_outline("Title", "office interior design", Stage::Mofu)
            .await
            .unwrap();
        assert_eq!(outline, normalize::default_outline("office interior design"));
        assert_eq!(outline.len(), 6);
    }

    #[tokio::test]
    async fn short_section_answer_is_padded() {
        let client = scripted(ScriptedGenerator::new().with_reply(Purpose::Section, "x".repeat(50)));
        let body = client
            .generate_section("Why It Matters", "office interior design", "Guide")
            .await
            .unwrap();
        assert!(body.chars().count() >= 100);
    }

    #[tokio::test]
    async fn meta_and_tags_use_two_calls() {
        let client = scripted(
            ScriptedGenerator::new()
                .with_reply(Purpose::Meta, "A concise description.")
                .with_reply(Purpose::Tags, "Design, Office, Workspace, Lighting"),
        );
        let (meta, tags) = client
            .generate_meta_and_tags("Title", "office interior design", "body text")
            .await
            .unwrap();

        assert_eq!(meta, "A concise description.");
        assert_eq!(tags, vec!["design", "office", "workspace", "lighting"]);
        assert_eq!(client.generator().call_count(Purpose::Meta), 1);
        assert_eq!(client.generator().call_count(Purpose::Tags), 1);
    }

    #[tokio::test]
    async fn generation_failure_propagates() {
        let client = scripted(ScriptedGenerator::new().with_failure(Purpose::Section, 500));
        let err = client.generate_section("H", "k", "c").await.unwrap_err();
        assert!(matches!(err, SeoPressError::Generation { status: 500, .. }));
    }

    #[tokio::test]
    async fn shared_generator_works_through_arc() {
        let shared: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::new());
        let client = GenerationClient::new(shared);
        let title = client.generate_title("k", Stage::Bofu, Intent::Commercial).await.unwrap();
        assert!(!title.is_empty());
    }

    #[tokio::test]
    async fn http_generator_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("Write the outline"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "## One\n## Two\n## Three"}}]
            })))
            .mount(&server)
            .await;

        let generator =
            ChatCompletionsGenerator::new(server.uri(), "key", "model", 0.7, Duration::from_secs(5)).unwrap();
        let outline = GenerationClient::new(generator)
            .generate_outline("Title", "keyword", Stage::Tofu)
            .await
            .unwrap();
        assert_eq!(outline, vec!["One", "Two", "Three"]);
    }
}
