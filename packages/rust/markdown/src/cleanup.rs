//! Cleanup pipeline for model-generated Markdown section bodies.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.
//! Section bodies are rendered under a `##` heading, so anything the model
//! emits at `#`/`##` level is demoted to keep the outline intact.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on a generated section body.
pub(crate) fn run_pipeline(md: &str) -> String {
    let mut result = md.to_string();

    result = unwrap_code_fence(&result);
    result = demote_headings(&result);
    result = strip_leftover_html(&result);
    result = normalize_whitespace(&result);
    result = clean_blank_lines(&result);

    result.trim().to_string()
}

// ---------------------------------------------------------------------------
// Pass 1: Unwrap a whole-body code fence
// ---------------------------------------------------------------------------

/// Models sometimes wrap the whole answer in ```` ```markdown ... ``` ````.
fn unwrap_code_fence(md: &str) -> String {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)^\s*```(?:markdown|md)?[ \t]*\n(.*?)\n?```\s*$").expect("valid regex")
    });

    match FENCE_RE.captures(md) {
        Some(caps) => caps[1].to_string(),
        None => md.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Pass 2: Demote headings below the section level
// ---------------------------------------------------------------------------

/// Turn `#` and `##` headings into `###` so they nest under the section heading.
fn demote_headings(md: &str) -> String {
    static H_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("valid regex"));

    let mut in_code_block = false;
    let mut lines: Vec<String> = Vec::new();

    for line in md.lines() {
        if line.trim_start().starts_with("```") {
            in_code_block = !in_code_block;
        }

        match H_RE.captures(line) {
            Some(caps) if !in_code_block && caps[1].len() < 3 => {
                lines.push(format!("### {}", caps[2].trim()));
            }
            _ => lines.push(line.to_string()),
        }
    }

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Pass 3: Strip leftover HTML tags
// ---------------------------------------------------------------------------

/// Remove block-level HTML wrappers, keeping their text.
fn strip_leftover_html(md: &str) -> String {
    static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"</?(?:div|span|section|article|p|header|footer|h[1-6])(?:\s[^>]*)?>")
            .expect("valid regex")
    });

    let mut result = String::new();
    let mut in_code_block = false;

    for line in md.lines() {
        if line.trim_start().starts_with("```") {
            in_code_block = !in_code_block;
        }

        if in_code_block {
            result.push_str(line);
        } else {
            result.push_str(&HTML_TAG_RE.replace_all(line, ""));
        }
        result.push('\n');
    }

    if result.ends_with('\n') {
        result.pop();
    }

    result
}

// ---------------------------------------------------------------------------
// Pass 4: Normalize whitespace
// ---------------------------------------------------------------------------

/// Trim trailing whitespace on every line.
fn normalize_whitespace(md: &str) -> String {
    md.lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 5: Collapse blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of blank lines into a single paragraph break.
fn clean_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwrap_code_fence_removes_markdown_wrapper() {
        let input = "```markdown\nFirst paragraph.\n\nSecond.\n```";
        assert_eq!(unwrap_code_fence(input), "First paragraph.\n\nSecond.");
    }

    #[test]
    fn unwrap_code_fence_leaves_inline_code_blocks() {
        let input = "Intro text.\n\n```css\n.a { color: red; }\n```\n\nOutro.";
        assert_eq!(unwrap_code_fence(input), input);
    }

    #[test]
    fn demote_headings_nests_under_section() {
        let input = "# Big\n\nText\n\n## Medium\n\n### Small";
        let result = demote_headings(input);
        assert_eq!(result, "### Big\n\nText\n\n### Medium\n\n### Small");
    }

    #[test]
    fn demote_headings_ignores_code_blocks() {
        let input = "```bash\n# a shell comment\n```";
        assert_eq!(demote_headings(input), input);
    }

    #[test]
    fn strip_leftover_html_keeps_text() {
        let input = "<p>Natural light matters.</p>";
        assert_eq!(strip_leftover_html(input), "Natural light matters.");
    }

    #[test]
    fn clean_blank_lines_collapses_excess() {
        let input = "Line 1\n\n\n\n\nLine 2";
        assert_eq!(clean_blank_lines(input), "Line 1\n\nLine 2");
    }

    #[test]
    fn full_pipeline_cleans_body() {
        let input = "```md\n## Why It Matters   \n\n\n\n<div>Open plans boost collaboration.</div>\n```";
        let result = run_pipeline(input);

        assert_eq!(result, "### Why It Matters\n\nOpen plans boost collaboration.");
    }
}
