//! Ordered key/value front matter blocks delimited by `---` lines.

use seopress_shared::{Result, SeoPressError};

/// A single front matter value.
#[derive(Debug, Clone, PartialEq)]
pub enum FrontValue {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
}

impl FrontValue {
    fn render(&self) -> String {
        match self {
            Self::Str(s) => quote(s),
            Self::Int(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::List(items) => {
                let quoted: Vec<String> = items.iter().map(|s| quote(s)).collect();
                format!("[{}]", quoted.join(", "))
            }
        }
    }
}

/// Front matter entries in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    entries: Vec<(String, FrontValue)>,
}

impl FrontMatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append or replace a value.
    pub fn set(&mut self, key: impl Into<String>, value: FrontValue) -> &mut Self {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    pub fn str(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.set(key, FrontValue::Str(value.into()))
    }

    pub fn int(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        self.set(key, FrontValue::Int(value))
    }

    pub fn bool(&mut self, key: impl Into<String>, value: bool) -> &mut Self {
        self.set(key, FrontValue::Bool(value))
    }

    pub fn list(&mut self, key: impl Into<String>, values: &[String]) -> &mut Self {
        self.set(key, FrontValue::List(values.to_vec()))
    }

    pub fn get(&self, key: &str) -> Option<&FrontValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// String value for `key`, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(FrontValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as a `---` delimited block ending with a newline.
    pub fn render(&self) -> String {
        let mut fm = String::from("---\n");
        for (key, value) in &self.entries {
            fm.push_str(&format!("{key}: {}\n", value.render()));
        }
        fm.push_str("---\n");
        fm
    }
}

/// Split a document into its front matter and the body that follows.
pub fn split_front_matter(doc: &str) -> Result<(FrontMatter, &str)> {
    let rest = doc
        .strip_prefix("---\n")
        .or_else(|| doc.strip_prefix("---\r\n"))
        .ok_or_else(|| SeoPressError::parse("document does not start with front matter"))?;

    let mut front = FrontMatter::new();
    let mut offset = 0;

    for line in rest.split_inclusive('\n') {
        offset += line.len();
        let trimmed = line.trim_end();

        if trimmed == "---" {
            return Ok((front, &rest[offset..]));
        }
        if trimmed.is_empty() {
            continue;
        }

        let (key, raw) = trimmed
            .split_once(':')
            .ok_or_else(|| SeoPressError::parse(format!("front matter line without key: {trimmed}")))?;
        front.set(key.trim(), parse_value(raw.trim())?);
    }

    Err(SeoPressError::parse("front matter is not closed with ---"))
}

fn parse_value(raw: &str) -> Result<FrontValue> {
    if raw.starts_with('"') {
        let (value, rest) = parse_quoted(raw)?;
        if !rest.trim().is_empty() {
            return Err(SeoPressError::parse(format!("trailing characters after string: {raw}")));
        }
        return Ok(FrontValue::Str(value));
    }

    if let Some(inner) = raw.strip_prefix('[') {
        let mut items = Vec::new();
        let mut rest = inner.trim_start();
        loop {
            if let Some(after) = rest.strip_prefix(']') {
                if !after.trim().is_empty() {
                    return Err(SeoPressError::parse(format!("trailing characters after list: {raw}")));
                }
                return Ok(FrontValue::List(items));
            }
            let (item, after) = parse_quoted(rest)?;
            items.push(item);
            rest = after.trim_start();
            rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
            if rest.is_empty() {
                return Err(SeoPressError::parse(format!("unterminated list: {raw}")));
            }
        }
    }

    match raw {
        "true" => Ok(FrontValue::Bool(true)),
        "false" => Ok(FrontValue::Bool(false)),
        _ => match raw.parse::<i64>() {
            Ok(n) => Ok(FrontValue::Int(n)),
            Err(_) => Ok(FrontValue::Str(raw.to_string())),
        },
    }
}

/// Parse a leading double-quoted string, returning it and the remainder.
fn parse_quoted(s: &str) -> Result<(String, &str)> {
    let body = s
        .strip_prefix('"')
        .ok_or_else(|| SeoPressError::parse(format!("expected quoted string: {s}")))?;

    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return Ok((out, &body[idx + 1..])),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, other)) => out.push(other),
                None => break,
            },
            other => out.push(other),
        }
    }

    Err(SeoPressError::parse(format!("unterminated string: {s}")))
}

/// Double-quote a value, escaping backslashes, quotes and newlines.
fn quote(s: &str) -> String {
    let escaped = s
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    format!("\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FrontMatter {
        let mut fm = FrontMatter::new();
        fm.str("title", "Office \"Zen\" Design")
            .str("slug", "office-zen-design")
            .list("tags", &["office design".into(), "workspace".into()])
            .int("readingTime", 7)
            .bool("draft", false);
        fm
    }

    #[test]
    fn render_produces_delimited_block() {
        let rendered = sample().render();
        assert!(rendered.starts_with("---\n"));
        assert!(rendered.ends_with("---\n"));
        assert!(rendered.contains("title: \"Office \\\"Zen\\\" Design\"\n"));
        assert!(rendered.contains("tags: [\"office design\", \"workspace\"]\n"));
        assert!(rendered.contains("readingTime: 7\n"));
        assert!(rendered.contains("draft: false\n"));
    }

    #[test]
    fn split_recovers_rendered_values() {
        let doc = format!("{}\n## First\n\nBody.\n", sample().render());
        let (fm, body) = split_front_matter(&doc).unwrap();

        assert_eq!(fm.get_str("title"), Some("Office \"Zen\" Design"));
        assert_eq!(fm.get_str("slug"), Some("office-zen-design"));
        assert_eq!(fm.get("readingTime"), Some(&FrontValue::Int(7)));
        assert_eq!(fm.get("draft"), Some(&FrontValue::Bool(false)));
        assert_eq!(
            fm.get("tags"),
            Some(&FrontValue::List(vec!["office design".into(), "workspace".into()]))
        );
        assert!(body.contains("## First"));
    }

    #[test]
    fn set_replaces_existing_key() {
        let mut fm = sample();
        fm.str("slug", "renamed");
        assert_eq!(fm.get_str("slug"), Some("renamed"));
        assert_eq!(fm.len(), 5);
    }

    #[test]
    fn split_rejects_missing_front_matter() {
        let err = split_front_matter("# Just a heading\n").unwrap_err();
        assert!(err.to_string().contains("does not start with front matter"));
    }

    #[test]
    fn split_rejects_unclosed_block() {
        assert!(split_front_matter("---\ntitle: \"x\"\n").is_err());
    }

    #[test]
    fn empty_list_parses() {
        let (fm, _) = split_front_matter("---\ntags: []\n---\n").unwrap();
        assert_eq!(fm.get("tags"), Some(&FrontValue::List(vec![])));
    }

    #[test]
    fn newlines_survive_round_trip() {
        let mut fm = FrontMatter::new();
        fm.str("excerpt", "line one\nline two");
        let (parsed, _) = split_front_matter(&fm.render()).unwrap();
        assert_eq!(parsed.get_str("excerpt"), Some("line one\nline two"));
    }
}
