//! Markdown helpers for generated articles.
//!
//! Slug derivation, word counting, reading time, front matter rendering and
//! parsing, and the cleanup passes applied to model-written section bodies.

mod cleanup;
mod frontmatter;

use std::sync::LazyLock;

use regex::Regex;

pub use frontmatter::{FrontMatter, FrontValue, split_front_matter};

/// Words per minute used for the reading-time estimate.
pub const WORDS_PER_MINUTE: usize = 200;

/// Derive a URL slug from a title.
///
/// Lower-cases, strips every character that is not a word character,
/// whitespace or hyphen, then collapses whitespace/hyphen runs into a single
/// hyphen. `slugify(slugify(t)) == slugify(t)` for every input.
pub fn slugify(title: &str) -> String {
    static NON_WORD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));
    static SEPARATOR_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[\s-]+").expect("valid regex"));

    let lower = title.to_lowercase();
    let stripped = NON_WORD_RE.replace_all(&lower, "");
    let hyphenated = SEPARATOR_RE.replace_all(stripped.trim(), "-");
    hyphenated.trim_matches('-').to_string()
}

/// Count words in a Markdown body (excluding fenced code blocks and bare
/// heading markers).
pub fn count_words(md: &str) -> usize {
    static CODE_BLOCK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));

    let without_code = CODE_BLOCK_RE.replace_all(md, "");
    without_code
        .split_whitespace()
        .filter(|w| !w.chars().all(|c| c == '#'))
        .count()
}

/// Minutes to read `word_count` words, rounded up. Never less than one.
pub fn reading_time(word_count: usize) -> u32 {
    word_count.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Clean a model-written section body for embedding under a `##` heading.
pub fn clean_section_body(md: &str) -> String {
    cleanup::run_pipeline(md)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic_title() {
        assert_eq!(
            slugify("Office Interior Design: 10 Ideas for 2025!"),
            "office-interior-design-10-ideas-for-2025"
        );
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Open -- Plan   Offices  "), "open-plan-offices");
        assert_eq!(slugify("Why “Biophilic” Design Works"), "why-biophilic-design-works");
    }

    #[test]
    fn slugify_is_idempotent() {
        let titles = [
            "Office Interior Design: The Complete Guide",
            "  --Leading & trailing--  ",
            "Café Fit-Outs — What They Cost",
            "snake_case_stays",
            "",
            "!!!",
        ];
        for title in titles {
            let once = slugify(title);
            assert_eq!(slugify(&once), once, "not idempotent for {title:?}");
        }
    }

    #[test]
    fn slugify_never_has_edge_hyphens() {
        let slug = slugify("- Hello World -");
        assert!(!slug.starts_with('-'));
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn count_words_skips_code_and_heading_markers() {
        let md = "## Heading Words\n\nOne two three.\n\n```\nnot counted here\n```\n";
        assert_eq!(count_words(md), 5);
    }

    #[test]
    fn reading_time_rounds_up() {
        assert_eq!(reading_time(0), 1);
        assert_eq!(reading_time(1), 1);
        assert_eq!(reading_time(200), 1);
        assert_eq!(reading_time(201), 2);
        assert_eq!(reading_time(1750), 9);
    }

    #[test]
    fn truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn clean_section_body_trims() {
        assert_eq!(clean_section_body("\n\n  Body text.  \n\n"), "Body text.");
    }
}
