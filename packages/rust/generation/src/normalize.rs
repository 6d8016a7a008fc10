//! Turn raw completions into usable article parts.
//!
//! Models answer loosely: quoted titles, numbered lists, restated headings,
//! one-line sections. Every function here accepts whatever came back and
//! returns something publishable, falling back to deterministic text when
//! the answer is unusable.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use seopress_markdown::{clean_section_body, truncate_chars};
use tracing::{debug, warn};

pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_OUTLINE_HEADINGS: usize = 8;
pub const MIN_SECTION_CHARS: usize = 100;
pub const MAX_META_CHARS: usize = 155;
pub const MIN_TAGS: usize = 3;
pub const MAX_TAGS: usize = 5;

static LEADING_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:#{1,6}\s+|\d+[.)]\s+|[-*•]\s+)").expect("valid regex")
});

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:title|meta description|description)\s*:\s*").expect("valid regex")
});

fn is_wrapper_char(c: char) -> bool {
    matches!(c, '"' | '\'' | '\u{201C}' | '\u{201D}' | '\u{2018}' | '\u{2019}' | '*' | '_' | '`')
}

/// Strip list markers, labels, quotes and emphasis until the line stops changing.
fn strip_decorations(line: &str) -> String {
    let mut current = line.trim().to_string();
    loop {
        let next = LEADING_MARKER_RE.replace(&current, "");
        let next = LABEL_RE.replace(&next, "");
        let next = next.trim_matches(is_wrapper_char).trim().to_string();
        if next == current {
            return next;
        }
        current = next;
    }
}

// ---------------------------------------------------------------------------
// Title
// ---------------------------------------------------------------------------

/// Upper-case the first letter of every word.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn clean_title(raw: &str, keyword: &str) -> String {
    let first_line = raw.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    let cleaned = strip_decorations(first_line);
    let title = truncate_chars(&cleaned, MAX_TITLE_CHARS).trim_end().to_string();

    if title.is_empty() {
        warn!(%keyword, "empty title from model, using keyword");
        return title_case(keyword);
    }
    title
}

// ---------------------------------------------------------------------------
// Outline
// ---------------------------------------------------------------------------

/// Headings from every line starting with `##`, capped at eight.
pub fn parse_outline(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| l.starts_with("##"))
        .map(|l| strip_decorations(l.trim_start_matches('#')))
        .filter(|h| !h.is_empty())
        .take(MAX_OUTLINE_HEADINGS)
        .collect()
}

/// The six-heading template used when the model returns no usable outline.
pub fn default_outline(keyword: &str) -> Vec<String> {
    let kw = title_case(keyword);
    vec![
        format!("What Is {kw}?"),
        format!("Why {kw} Matters"),
        format!("Key Benefits of {kw}"),
        format!("How to Get Started with {kw}"),
        "Common Mistakes to Avoid".to_string(),
        format!("Final Thoughts on {kw}"),
    ]
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

fn restates_heading(line: &str, heading: &str) -> bool {
    let candidate = strip_decorations(line.trim().trim_start_matches('#'));
    let candidate = candidate.trim_end_matches(':').trim();
    !candidate.is_empty() && candidate.eq_ignore_ascii_case(heading.trim())
}

/// Clean a section body; too-short bodies are replaced with filler.
pub fn clean_section(raw: &str, heading: &str, keyword: &str, context: &str) -> String {
    let mut body = clean_section_body(raw);

    let restated = body
        .lines()
        .next()
        .filter(|first| restates_heading(first, heading))
        .map(str::len);
    if let Some(len) = restated {
        body = body[len..].trim_start().to_string();
    }

    if body.trim().chars().count() < MIN_SECTION_CHARS {
        debug!(%heading, chars = body.trim().chars().count(), "section too short, using filler");
        return filler_paragraph(keyword, context);
    }
    body
}

/// Deterministic paragraph of at least [`MIN_SECTION_CHARS`] characters.
pub fn filler_paragraph(keyword: &str, context: &str) -> String {
    let context = context.trim();
    let lead = if context.is_empty() {
        format!("When planning {keyword}, it pays to slow down and look at the details.")
    } else {
        format!("In the context of {context}, {keyword} deserves careful thought.")
    };
    format!(
        "{lead} Start by defining what success looks like for your team, then compare a few \
         options against that goal before committing. Small decisions made early tend to shape \
         the final result, so take notes, ask questions, and revisit your plan as you learn more."
    )
}

// ---------------------------------------------------------------------------
// Meta description and tags
// ---------------------------------------------------------------------------

/// First paragraph, single-lined, at most [`MAX_META_CHARS`] characters.
pub fn clean_meta(raw: &str, keyword: &str) -> String {
    let paragraph = raw
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty())
        .unwrap_or("");
    let joined = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut meta = strip_decorations(&joined);

    if meta.is_empty() {
        warn!(%keyword, "empty meta description from model, using default");
        meta = format!(
            "Everything you need to know about {keyword}: practical advice and ideas to help you \
             plan with confidence."
        );
    }

    if meta.chars().count() > MAX_META_CHARS {
        meta = format!("{}...", truncate_chars(&meta, MAX_META_CHARS - 3));
    }
    meta
}

/// Lower-cased, de-duplicated tags, at most five. May return fewer than three.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.split([',', '\n'])
        .map(|t| strip_decorations(t).replace('#', "").trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .take(MAX_TAGS)
        .collect()
}

/// Tags used when the model returns fewer than three.
pub fn default_tags(keyword: &str) -> Vec<String> {
    let mut tags = vec![keyword.trim().to_lowercase()];
    for generic in ["guide", "tips", "best practices"] {
        if !tags.iter().any(|t| t == generic) {
            tags.push(generic.to_string());
        }
    }
    tags
}

/// [`parse_tags`] with the [`default_tags`] fallback applied.
pub fn clean_tags(raw: &str, keyword: &str) -> Vec<String> {
    let tags = parse_tags(raw);
    if tags.len() < MIN_TAGS {
        debug!(%keyword, parsed = tags.len(), "too few tags, using defaults");
        return default_tags(keyword);
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_strips_quotes_numbering_and_labels() {
        assert_eq!(
            clean_title("\"Office Interior Design: 10 Ideas\"", "x"),
            "Office Interior Design: 10 Ideas"
        );
        assert_eq!(clean_title("1. Modern Office Layouts", "x"), "Modern Office Layouts");
        assert_eq!(clean_title("Title: **Bright Workspaces**", "x"), "Bright Workspaces");
        assert_eq!(
            clean_title("\u{201C}Curly Quoted\u{201D}\nSecond option", "x"),
            "Curly Quoted"
        );
        assert_eq!(clean_title("\n\n- Leading Blank Lines\n", "x"), "Leading Blank Lines");
    }

    #[test]
    fn title_is_capped_at_100_chars() {
        let long = "Ä".repeat(150);
        assert_eq!(clean_title(&long, "x").chars().count(), 100);
    }

    #[test]
    fn empty_title_falls_back_to_keyword() {
        assert_eq!(clean_title("  \n\"\"\n", "office interior design"), "Office Interior Design");
        assert_eq!(clean_title("", "loft conversion"), "Loft Conversion");
    }

    #[test]
    fn outline_keeps_only_h2_lines() {
        let raw = "Here is your outline:\n## Introduction\nSome text\n## **Planning the Space**\n##\n### Lighting Choices\n";
        assert_eq!(
            parse_outline(raw),
            vec!["Introduction", "Planning the Space", "Lighting Choices"]
        );
    }

    #[test]
    fn outline_is_capped_at_eight() {
        let raw: String = (1..=12).map(|i| format!("## Heading {i}\n")).collect();
        let outline = parse_outline(&raw);
        assert_eq!(outline.len(), 8);
        assert_eq!(outline[7], "Heading 8");
    }

    #[test]
    fn outline_without_headings_is_empty_and_default_has_six() {
        assert!(parse_outline("1. Intro\n2. Body").is_empty());
        let fallback = default_outline("office interior design");
        assert_eq!(fallback.len(), 6);
        assert_eq!(fallback[0], "What Is Office Interior Design?");
    }

    #[test]
    fn section_drops_restated_heading() {
        let raw = format!("## Planning the Space\n\n{}", "Measure every room first. ".repeat(6));
        let body = clean_section(&raw, "Planning the Space", "office design", "ctx");
        assert!(body.starts_with("Measure every room"));

        let plain = format!("planning the space:\n{}", "Measure every room first. ".repeat(6));
        let body = clean_section(&plain, "Planning the Space", "office design", "ctx");
        assert!(body.starts_with("Measure every room"));
    }

    #[test]
    fn short_section_becomes_filler() {
        let raw = "A".repeat(50);
        let body = clean_section(&raw, "Heading", "office interior design", "Guide - Intro");
        assert!(body.chars().count() >= MIN_SECTION_CHARS);
        assert!(body.contains("office interior design"));
    }

    #[test]
    fn filler_is_long_even_without_context() {
        assert!(filler_paragraph("", "").chars().count() >= MIN_SECTION_CHARS);
    }

    #[test]
    fn meta_uses_first_paragraph_and_truncates() {
        assert_eq!(
            clean_meta("\"Short and sweet.\"\n\nIgnored second paragraph.", "k"),
            "Short and sweet."
        );

        let long = "word ".repeat(60);
        let meta = clean_meta(&long, "k");
        assert_eq!(meta.chars().count(), 155);
        assert!(meta.ends_with("..."));
    }

    #[test]
    fn empty_meta_falls_back() {
        let meta = clean_meta("   ", "office interior design");
        assert!(meta.contains("office interior design"));
        assert!(meta.chars().count() <= MAX_META_CHARS);
    }

    #[test]
    fn tags_are_normalized_and_deduplicated() {
        let raw = "#Office Design, Workspace\n- office design\n1. Lighting, productivity, ergonomics, extra";
        assert_eq!(
            parse_tags(raw),
            vec!["office design", "workspace", "lighting", "productivity", "ergonomics"]
        );
    }

    #[test]
    fn too_few_tags_use_defaults() {
        let tags = clean_tags("design", "Office Interior Design");
        assert_eq!(tags, vec!["office interior design", "guide", "tips", "best practices"]);
        assert!((MIN_TAGS..=MAX_TAGS).contains(&tags.len()));
    }
}
