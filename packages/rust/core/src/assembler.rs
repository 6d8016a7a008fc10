//! Article assembler.
//!
//! Drives a [`GenerationClient`] through a fixed sequence of stages, each
//! consuming the previous stage's typed result:
//!
//! ```text
//! Start → Title → Outline → Sections → MetaAndTags → SlugAndSchema → Done
//!          Titled   Outlined   Drafted     Described     GeneratedDocument
//! ```
//!
//! Any stage error aborts the run and is tagged with the stage name; no
//! partial document is ever returned.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use seopress_generation::{GenerationClient, TextGenerator};
use seopress_markdown::{count_words, reading_time, slugify, truncate_chars};
use seopress_shared::{
    GeneratedDocument, KeywordRecord, PublishConfig, Result, SchemaEntity, Section, SeoPressError,
    StructuredData,
};

/// Characters of drafted body sent along with the meta/tags prompts.
pub const META_CONTEXT_CHARS: usize = 6000;

/// Assembly stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyStage {
    Start,
    Title,
    Outline,
    Sections,
    MetaAndTags,
    SlugAndSchema,
    Done,
}

impl AssemblyStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Title => "title",
            Self::Outline => "outline",
            Self::Sections => "sections",
            Self::MetaAndTags => "meta_and_tags",
            Self::SlugAndSchema => "slug_and_schema",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for AssemblyStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress callbacks for long-running assembly.
pub trait AssemblyProgress: Send + Sync {
    /// Called when a stage starts.
    fn stage(&self, stage: AssemblyStage);
    /// Called after each section body is written.
    fn section_written(&self, heading: &str, current: usize, total: usize);
}

/// No-op progress for headless and test usage.
pub struct SilentProgress;

impl AssemblyProgress for SilentProgress {
    fn stage(&self, _stage: AssemblyStage) {}
    fn section_written(&self, _heading: &str, _current: usize, _total: usize) {}
}

// ---------------------------------------------------------------------------
// Stage results
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Titled {
    title: String,
}

#[derive(Debug)]
struct Outlined {
    title: String,
    outline: Vec<String>,
}

#[derive(Debug)]
struct Drafted {
    title: String,
    outline: Vec<String>,
    sections: Vec<Section>,
}

#[derive(Debug)]
struct Described {
    title: String,
    outline: Vec<String>,
    sections: Vec<Section>,
    meta_description: String,
    tags: Vec<String>,
}

enum State {
    Start,
    Titled(Titled),
    Outlined(Outlined),
    Drafted(Drafted),
    Described(Described),
    Done(Box<GeneratedDocument>),
}

impl State {
    /// The stage that consumes this state.
    fn next_stage(&self) -> AssemblyStage {
        match self {
            Self::Start => AssemblyStage::Title,
            Self::Titled(_) => AssemblyStage::Outline,
            Self::Outlined(_) => AssemblyStage::Sections,
            Self::Drafted(_) => AssemblyStage::MetaAndTags,
            Self::Described(_) => AssemblyStage::SlugAndSchema,
            Self::Done(_) => AssemblyStage::Done,
        }
    }
}

// ---------------------------------------------------------------------------
// Assembler
// ---------------------------------------------------------------------------

/// Builds one [`GeneratedDocument`] per keyword record.
pub struct Assembler<G> {
    client: GenerationClient<G>,
    publish: PublishConfig,
}

impl<G: TextGenerator> Assembler<G> {
    pub fn new(client: GenerationClient<G>, publish: PublishConfig) -> Self {
        Self { client, publish }
    }

    pub fn client(&self) -> &GenerationClient<G> {
        &self.client
    }

    /// Run every stage for `record`.
    #[instrument(skip_all, fields(keyword = %record.keyword, stage = %record.stage))]
    pub async fn assemble(
        &self,
        record: &KeywordRecord,
        progress: &dyn AssemblyProgress,
    ) -> Result<GeneratedDocument> {
        let started_at = Utc::now();
        progress.stage(AssemblyStage::Start);

        let mut state = State::Start;
        loop {
            let stage = state.next_stage();
            if let State::Done(document) = state {
                progress.stage(AssemblyStage::Done);
                info!(
                    slug = %document.slug,
                    sections = document.sections.len(),
                    words = document.word_count,
                    "article assembled"
                );
                return Ok(*document);
            }

            progress.stage(stage);
            debug!(%stage, "entering stage");
            state = self
                .advance(state, record, started_at, progress)
                .await
                .map_err(|e| e.in_stage(stage.as_str()))?;
        }
    }

    async fn advance(
        &self,
        state: State,
        record: &KeywordRecord,
        started_at: DateTime<Utc>,
        progress: &dyn AssemblyProgress,
    ) -> Result<State> {
        let keyword = record.keyword.as_str();

        match state {
            State::Start => {
                let title = self
                    .client
                    .generate_title(keyword, record.stage, record.intent)
                    .await?;
                Ok(State::Titled(Titled { title }))
            }

            State::Titled(Titled { title }) => {
                let outline = self.client.generate_outline(&title, keyword, record.stage).await?;
                Ok(State::Outlined(Outlined { title, outline }))
            }

            State::Outlined(Outlined { title, outline }) => {
                let mut sections = Vec::with_capacity(outline.len());
                let mut previous: Option<&str> = None;

                for (i, heading) in outline.iter().enumerate() {
                    let context = match previous {
                        Some(prev) => format!("{title} (previous section: {prev})"),
                        None => title.clone(),
                    };
                    let body = self.client.generate_section(heading, keyword, &context).await?;
                    progress.section_written(heading, i + 1, outline.len());
                    sections.push(Section {
                        heading: heading.clone(),
                        body,
                    });
                    previous = Some(heading);
                }

                Ok(State::Drafted(Drafted {
                    title,
                    outline,
                    sections,
                }))
            }

            State::Drafted(Drafted {
                title,
                outline,
                sections,
            }) => {
                let body = render_sections(&sections);
                let excerpt = truncate_chars(&body, META_CONTEXT_CHARS);
                let (meta_description, tags) = self
                    .client
                    .generate_meta_and_tags(&title, keyword, excerpt)
                    .await?;

                Ok(State::Described(Described {
                    title,
                    outline,
                    sections,
                    meta_description,
                    tags,
                }))
            }

            State::Described(described) => {
                let document = self.finish(described, record, started_at)?;
                Ok(State::Done(Box::new(document)))
            }

            State::Done(document) => Ok(State::Done(document)),
        }
    }

    fn finish(
        &self,
        described: Described,
        record: &KeywordRecord,
        generated_at: DateTime<Utc>,
    ) -> Result<GeneratedDocument> {
        let Described {
            title,
            outline,
            sections,
            meta_description,
            tags,
        } = described;

        let mut slug = slugify(&title);
        if slug.is_empty() {
            slug = slugify(&record.keyword);
        }
        if slug.is_empty() {
            return Err(SeoPressError::validation(format!(
                "cannot derive a slug from title '{title}' or keyword '{}'",
                record.keyword
            )));
        }

        let word_count = count_words(&render_sections(&sections));
        let structured_data = StructuredData {
            context: "https://schema.org".to_string(),
            kind: "BlogPosting".to_string(),
            headline: title.clone(),
            description: meta_description.clone(),
            author: SchemaEntity::organization(&self.publish.author),
            publisher: SchemaEntity::organization(&self.publish.publisher),
            date_published: generated_at,
            date_modified: generated_at,
            keywords: tags.clone(),
            word_count,
            main_entity_of_page: Some(format!(
                "{}{}/{slug}",
                self.publish.site_url.trim_end_matches('/'),
                self.publish.url_prefix.trim_end_matches('/'),
            )),
        };

        Ok(GeneratedDocument {
            keyword: record.keyword.clone(),
            stage: record.stage,
            intent: record.intent,
            title,
            slug,
            outline,
            sections,
            meta_description,
            tags,
            word_count,
            reading_time: reading_time(word_count),
            structured_data,
            generated_at,
        })
    }
}

/// Sections as `## heading` blocks separated by blank lines.
pub fn render_sections(sections: &[Section]) -> String {
    sections
        .iter()
        .map(|s| format!("## {}\n\n{}", s.heading, s.body.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}
