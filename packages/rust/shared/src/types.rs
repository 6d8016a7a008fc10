//! Core domain types for the keyword queue and generated articles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SeoPressError;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Implements `as_str`, `Display`, and case-insensitive `FromStr` for a
/// field-less enum from a `Variant => "text"` table.
macro_rules! text_enum {
    ($name:ident, $what:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical text form, as stored in the keyword table.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = SeoPressError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case($text) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(SeoPressError::parse(format!(
                    concat!("unknown ", $what, " '{}'"),
                    s
                )))
            }
        }
    };
}

/// Lifecycle state of a keyword record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordStatus {
    #[default]
    Queued,
    Generating,
    Published,
    Failed,
}

text_enum!(KeywordStatus, "status", {
    Queued => "queued",
    Generating => "generating",
    Published => "published",
    Failed => "failed",
});

/// Marketing funnel position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stage {
    #[default]
    Tofu,
    Mofu,
    Bofu,
}

text_enum!(Stage, "stage", {
    Tofu => "TOFU",
    Mofu => "MOFU",
    Bofu => "BOFU",
});

impl Stage {
    /// How the article should be framed for a reader at this funnel position.
    pub fn framing(&self) -> &'static str {
        match self {
            Self::Tofu => "educational and awareness-building, for readers just discovering the topic",
            Self::Mofu => "consideration-focused, comparing approaches for readers evaluating options",
            Self::Bofu => "decision-focused and persuasive, for readers ready to hire or buy",
        }
    }
}

/// Search intent behind a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    #[default]
    Informational,
    Transactional,
    Commercial,
    Comparison,
}

text_enum!(Intent, "intent", {
    Informational => "informational",
    Transactional => "transactional",
    Commercial => "commercial",
    Comparison => "comparison",
});

/// Queue priority. Ordering is `High < Medium < Low`, so an ascending sort
/// puts the most urgent keywords first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

text_enum!(Priority, "priority", {
    High => "high",
    Medium => "medium",
    Low => "low",
});

// ---------------------------------------------------------------------------
// KeywordRecord
// ---------------------------------------------------------------------------

/// One row of the keyword table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordRecord {
    /// Search term; unique within the table.
    pub keyword: String,
    #[serde(default)]
    pub status: KeywordStatus,
    #[serde(default)]
    pub stage: Stage,
    #[serde(default)]
    pub intent: Intent,
    #[serde(default)]
    pub priority: Priority,
    /// Set whenever a generation attempt starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_generated: Option<DateTime<Utc>>,
    /// Public URL of the published article.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

impl KeywordRecord {
    /// A fresh queued record with default stage, intent, and priority.
    pub fn queued(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into().trim().to_string(),
            status: KeywordStatus::Queued,
            stage: Stage::default(),
            intent: Intent::default(),
            priority: Priority::default(),
            last_generated: None,
            url: None,
            title: None,
            excerpt: None,
        }
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_intent(mut self, intent: Intent) -> Self {
        self.intent = intent;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

// ---------------------------------------------------------------------------
// GeneratedDocument
// ---------------------------------------------------------------------------

/// One heading + body pair of an article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub body: String,
}

/// schema.org `BlogPosting` block embedded in every published article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredData {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub headline: String,
    pub description: String,
    pub author: SchemaEntity,
    pub publisher: SchemaEntity,
    #[serde(rename = "datePublished")]
    pub date_published: DateTime<Utc>,
    #[serde(rename = "dateModified")]
    pub date_modified: DateTime<Utc>,
    pub keywords: Vec<String>,
    #[serde(rename = "wordCount")]
    pub word_count: usize,
    #[serde(rename = "mainEntityOfPage", default, skip_serializing_if = "Option::is_none")]
    pub main_entity_of_page: Option<String>,
}

/// A named author or publisher inside [`StructuredData`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaEntity {
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
}

impl SchemaEntity {
    pub fn organization(name: impl Into<String>) -> Self {
        Self {
            kind: "Organization".into(),
            name: name.into(),
        }
    }
}

/// The complete output of one assembly run. Never mutated after assembly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedDocument {
    pub keyword: String,
    pub stage: Stage,
    pub intent: Intent,
    pub title: String,
    pub slug: String,
    pub outline: Vec<String>,
    pub sections: Vec<Section>,
    pub meta_description: String,
    pub tags: Vec<String>,
    pub word_count: usize,
    pub reading_time: u32,
    pub structured_data: StructuredData,
    pub generated_at: DateTime<Utc>,
}
