//! Local publisher: renders a [`GeneratedDocument`] to a Markdown file with
//! front matter and writes it under the content directory.

use std::path::{Path, PathBuf};

use chrono::SecondsFormat;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use seopress_markdown::{FrontMatter, split_front_matter};
use seopress_shared::{
    GeneratedDocument, KeywordRecord, KeywordStatus, PublishConfig, Result, SeoPressError,
};

use crate::assembler::render_sections;

/// A document that has been written to the content directory.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedDocument {
    pub path: PathBuf,
    /// Public URL: `{url_prefix}/{slug}`.
    pub url: String,
    pub slug: String,
    /// Hex SHA-256 of `content`.
    pub content_hash: String,
    pub content: String,
    pub write: ArticleWrite,
}

/// What `publish` did on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleWrite {
    Created,
    /// An article with the same slug and different content was replaced.
    Replaced,
    /// The file already held identical content and was left untouched.
    Unchanged,
}

fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct Publisher {
    config: PublishConfig,
}

impl Publisher {
    pub fn new(config: PublishConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    pub fn content_dir(&self) -> &Path {
        Path::new(&self.config.content_dir)
    }

    pub fn document_path(&self, slug: &str) -> PathBuf {
        self.content_dir().join(format!("{slug}.md"))
    }

    pub fn url_for(&self, slug: &str) -> String {
        format!("{}/{slug}", self.config.url_prefix.trim_end_matches('/'))
    }

    /// Full file content: front matter, sections, call to action, JSON-LD.
    pub fn render(&self, doc: &GeneratedDocument) -> Result<String> {
        let mut front = FrontMatter::new();
        front
            .str("title", &doc.title)
            .str("slug", &doc.slug)
            .str("excerpt", &doc.meta_description)
            .str("date", doc.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true))
            .list("tags", &doc.tags)
            .int("readingTime", i64::from(doc.reading_time))
            .str("stage", doc.stage.as_str())
            .str("intent", doc.intent.as_str())
            .bool("draft", false)
            .str(
                "coverImage",
                format!(
                    "{}/{}.jpg",
                    self.config.cover_image_prefix.trim_end_matches('/'),
                    doc.slug
                ),
            );

        let schema = serde_json::to_string_pretty(&doc.structured_data).map_err(|e| {
            SeoPressError::validation(format!("structured data serialization failed: {e}"))
        })?;
        // A literal `</` would close the script element early.
        let schema = schema.replace("</", "<\\/");

        let mut out = front.render();
        out.push('\n');
        out.push_str(&render_sections(&doc.sections));
        out.push_str("\n\n");

        let cta = self.config.cta.trim();
        if !cta.is_empty() {
            out.push_str(cta);
            out.push_str("\n\n");
        }

        out.push_str("<script type=\"application/ld+json\">\n");
        out.push_str(&schema);
        out.push_str("\n</script>\n");
        Ok(out)
    }

    /// Render and write `{content_dir}/{slug}.md` (temp file + rename).
    /// An existing file with the same slug is replaced unless its content
    /// hash already matches.
    #[instrument(skip_all, fields(slug = %doc.slug))]
    pub fn publish(&self, doc: &GeneratedDocument) -> Result<PublishedDocument> {
        let content = self.render(doc)?;
        let hash = content_hash(&content);
        let dir = self.content_dir();
        std::fs::create_dir_all(dir).map_err(|e| SeoPressError::io(dir, e))?;

        let path = self.document_path(&doc.slug);
        let existing = match std::fs::read_to_string(&path) {
            Ok(old) => Some(content_hash(&old)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(SeoPressError::io(&path, e)),
        };

        let write = match existing {
            Some(old) if old == hash => {
                debug!(path = %path.display(), %hash, "article unchanged, skipping write");
                ArticleWrite::Unchanged
            }
            existing => {
                if existing.is_some() {
                    warn!(path = %path.display(), "overwriting existing article with the same slug");
                }
                let temp = dir.join(format!(".{}.md.tmp", doc.slug));
                std::fs::write(&temp, &content).map_err(|e| SeoPressError::io(&temp, e))?;
                std::fs::rename(&temp, &path).map_err(|e| SeoPressError::io(&path, e))?;
                info!(path = %path.display(), bytes = content.len(), %hash, "article written");
                if existing.is_some() {
                    ArticleWrite::Replaced
                } else {
                    ArticleWrite::Created
                }
            }
        };

        Ok(PublishedDocument {
            path,
            url: self.url_for(&doc.slug),
            slug: doc.slug.clone(),
            content_hash: hash,
            content,
            write,
        })
    }

    /// Check that a `published` record points at an existing article whose
    /// front matter slug matches the last URL segment.
    pub fn verify_published(&self, record: &KeywordRecord) -> Result<()> {
        if record.status != KeywordStatus::Published {
            return Err(SeoPressError::validation(format!(
                "'{}' is {}, not published",
                record.keyword, record.status
            )));
        }

        let url = record
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| SeoPressError::validation(format!("'{}' has no url", record.keyword)))?;

        let slug = url.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
        let path = self.document_path(slug);
        let content = std::fs::read_to_string(&path).map_err(|e| SeoPressError::io(&path, e))?;
        let (front, _) = split_front_matter(&content)?;

        match front.get_str("slug") {
            Some(found) if found == slug => {
                debug!(keyword = %record.keyword, %url, "published article verified");
                Ok(())
            }
            found => Err(SeoPressError::validation(format!(
                "{} has slug {found:?}, expected '{slug}'",
                path.display()
            ))),
        }
    }

    /// Verify every `published` record; returns the failures by keyword.
    pub fn verify_all(&self, records: &[KeywordRecord]) -> Vec<(String, SeoPressError)> {
        records
            .iter()
            .filter(|r| r.status == KeywordStatus::Published)
            .filter_map(|r| self.verify_published(r).err().map(|e| (r.keyword.clone(), e)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use seopress_shared::{Intent, SchemaEntity, Section, Stage, StructuredData};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("seopress-publish-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn publisher(content_dir: &Path) -> Publisher {
        Publisher::new(PublishConfig {
            content_dir: content_dir.display().to_string(),
            ..PublishConfig::default()
        })
    }

    fn document() -> GeneratedDocument {
        let now = Utc::now();
        GeneratedDocument {
            keyword: "office interior design".into(),
            stage: Stage::Tofu,
            intent: Intent::Informational,
            title: "Office Interior Design \"Basics\"".into(),
            slug: "office-interior-design-basics".into(),
            outline: vec!["Planning".into(), "Lighting".into()],
            sections: vec![
                Section {
                    heading: "Planning".into(),
                    body: "Plan the space around how people work.".into(),
                },
                Section {
                    heading: "Lighting".into(),
                    body: "Use daylight where you can.".into(),
                },
            ],
            meta_description: "A short guide to office interiors.".into(),
            tags: vec!["office design".into(), "interiors".into(), "workspace".into()],
            word_count: 14,
            reading_time: 1,
            structured_data: StructuredData {
                context: "https://schema.org".into(),
                kind: "BlogPosting".into(),
                headline: "Office Interior Design </script> Basics".into(),
                description: "A short guide to office interiors.".into(),
                author: SchemaEntity::organization("Editorial Team"),
                publisher: SchemaEntity::organization("Example Studio"),
                date_published: now,
                date_modified: now,
                keywords: vec!["office design".into()],
                word_count: 14,
                main_entity_of_page: None,
            },
            generated_at: now,
        }
    }

    #[test]
    fn render_has_front_matter_sections_cta_and_schema() {
        let tmp = temp_dir();
        let content = publisher(&tmp).render(&document()).unwrap();

        let (front, body) = split_front_matter(&content).unwrap();
        assert_eq!(front.get_str("title"), Some("Office Interior Design \"Basics\""));
        assert_eq!(front.get_str("slug"), Some("office-interior-design-basics"));
        assert_eq!(front.get_str("stage"), Some("TOFU"));
        assert_eq!(front.get_str("intent"), Some("informational"));
        assert_eq!(
            front.get_str("coverImage"),
            Some("/images/blog/office-interior-design-basics.jpg")
        );

        let planning = body.find("## Planning").unwrap();
        let lighting = body.find("## Lighting").unwrap();
        let cta = body.find("## Ready to Start Your Project?").unwrap();
        let script = body.find("<script type=\"application/ld+json\">").unwrap();
        assert!(planning < lighting && lighting < cta && cta < script);
        assert!(body.contains("\"@type\": \"BlogPosting\""));
        assert!(!body.contains("</script> Basics"));
        assert!(body.trim_end().ends_with("</script>"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn publish_writes_file_named_by_slug() {
        let tmp = temp_dir();
        let content_dir = tmp.join("content/blog");
        let published = publisher(&content_dir).publish(&document()).unwrap();

        assert_eq!(published.path, content_dir.join("office-interior-design-basics.md"));
        assert_eq!(published.url, "/blog/office-interior-design-basics");
        assert_eq!(published.content_hash.len(), 64);
        assert_eq!(published.write, ArticleWrite::Created);
        assert_eq!(std::fs::read_to_string(&published.path).unwrap(), published.content);

        let leftovers: Vec<_> = std::fs::read_dir(&content_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|n| n.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn same_slug_overwrites() {
        let tmp = temp_dir();
        let publisher = publisher(&tmp);
        let mut doc = document();
        let first = publisher.publish(&doc).unwrap();

        doc.meta_description = "Rewritten.".into();
        let second = publisher.publish(&doc).unwrap();

        assert_eq!(first.path, second.path);
        assert_ne!(first.content_hash, second.content_hash);
        assert_eq!(second.write, ArticleWrite::Replaced);
        assert!(std::fs::read_to_string(&second.path).unwrap().contains("Rewritten."));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn identical_content_is_not_rewritten() {
        let tmp = temp_dir();
        let publisher = publisher(&tmp);
        let doc = document();
        let first = publisher.publish(&doc).unwrap();
        let written_at = std::fs::metadata(&first.path).unwrap().modified().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(20));
        let second = publisher.publish(&doc).unwrap();

        assert_eq!(second.write, ArticleWrite::Unchanged);
        assert_eq!(first.content_hash, second.content_hash);
        assert_eq!(std::fs::metadata(&second.path).unwrap().modified().unwrap(), written_at);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn verify_published_checks_slug_and_file() {
        let tmp = temp_dir();
        let publisher = publisher(&tmp);
        let published = publisher.publish(&document()).unwrap();

        let mut record = KeywordRecord::queued("office interior design");
        record.status = KeywordStatus::Published;
        record.url = Some(published.url.clone());
        assert!(publisher.verify_published(&record).is_ok());

        record.url = Some("/blog/missing-article".into());
        assert!(publisher.verify_published(&record).is_err());

        record.url = None;
        assert!(publisher.verify_published(&record).is_err());

        record.url = Some(published.url);
        let queued = KeywordRecord::queued("reception area ideas");
        assert!(publisher.verify_all(&[record.clone(), queued]).is_empty());

        record.status = KeywordStatus::Failed;
        assert!(publisher.verify_published(&record).is_err());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
