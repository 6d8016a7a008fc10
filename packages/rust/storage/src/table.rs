//! CSV codec for the keyword table.
//!
//! Header: `keyword,status,stage,intent,priority,last_generated,url,title,excerpt`.
//! Fields containing a comma, quote, or line break are quoted with doubled
//! inner quotes (RFC 4180). Columns are located by header name, so extra or
//! reordered columns in hand-edited files still load.

use chrono::{DateTime, SecondsFormat, Utc};
use seopress_shared::{KeywordRecord, Result, SeoPressError};
use tracing::warn;

/// Column order used when writing the table.
pub const COLUMNS: [&str; 9] = [
    "keyword",
    "status",
    "stage",
    "intent",
    "priority",
    "last_generated",
    "url",
    "title",
    "excerpt",
];

/// Parse the full table text into records.
pub fn parse_table(text: &str) -> Result<Vec<KeywordRecord>> {
    let rows = parse_rows(text)?;
    let mut rows = rows.into_iter();

    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let index = ColumnIndex::from_header(&header)?;

    let mut records = Vec::new();
    for (n, row) in rows.enumerate() {
        // Line numbers are 1-based and the header occupies line 1.
        let line = n + 2;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let record = index
            .record(&row)
            .map_err(|e| SeoPressError::parse(format!("keyword table row {line}: {e}")))?;

        if records.iter().any(|r: &KeywordRecord| r.keyword == record.keyword) {
            warn!(keyword = %record.keyword, line, "duplicate keyword in table, keeping first");
            continue;
        }
        records.push(record);
    }

    Ok(records)
}

/// Render records as table text, header first.
pub fn render_table(records: &[KeywordRecord]) -> String {
    let mut out = String::new();
    push_row(&mut out, COLUMNS.iter().map(|c| c.to_string()));

    for r in records {
        push_row(
            &mut out,
            [
                r.keyword.clone(),
                r.status.to_string(),
                r.stage.to_string(),
                r.intent.to_string(),
                r.priority.to_string(),
                r.last_generated
                    .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
                    .unwrap_or_default(),
                r.url.clone().unwrap_or_default(),
                r.title.clone().unwrap_or_default(),
                r.excerpt.clone().unwrap_or_default(),
            ]
            .into_iter(),
        );
    }

    out
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

struct ColumnIndex {
    positions: [Option<usize>; COLUMNS.len()],
}

impl ColumnIndex {
    fn from_header(header: &[String]) -> Result<Self> {
        let mut positions = [None; COLUMNS.len()];
        for (slot, name) in positions.iter_mut().zip(COLUMNS) {
            *slot = header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name));
        }

        if positions[0].is_none() {
            return Err(SeoPressError::parse(
                "keyword table header has no 'keyword' column",
            ));
        }
        Ok(Self { positions })
    }

    fn cell<'a>(&self, row: &'a [String], column: usize) -> &'a str {
        self.positions[column]
            .and_then(|i| row.get(i))
            .map(|s| s.trim())
            .unwrap_or("")
    }

    fn record(&self, row: &[String]) -> Result<KeywordRecord> {
        let keyword = self.cell(row, 0);
        if keyword.is_empty() {
            return Err(SeoPressError::parse("empty keyword"));
        }

        let last_generated = match self.cell(row, 5) {
            "" => None,
            raw => Some(
                DateTime::parse_from_rfc3339(raw)
                    .map_err(|e| SeoPressError::parse(format!("bad last_generated '{raw}': {e}")))?
                    .with_timezone(&Utc),
            ),
        };

        Ok(KeywordRecord {
            keyword: keyword.to_string(),
            status: parse_or_default(self.cell(row, 1))?,
            stage: parse_or_default(self.cell(row, 2))?,
            intent: parse_or_default(self.cell(row, 3))?,
            priority: parse_or_default(self.cell(row, 4))?,
            last_generated,
            url: non_empty(self.cell(row, 6)),
            title: non_empty(self.cell(row, 7)),
            excerpt: non_empty(self.cell(row, 8)),
        })
    }
}

fn parse_or_default<T>(raw: &str) -> Result<T>
where
    T: Default + std::str::FromStr<Err = SeoPressError>,
{
    if raw.is_empty() {
        Ok(T::default())
    } else {
        raw.parse()
    }
}

fn non_empty(raw: &str) -> Option<String> {
    (!raw.is_empty()).then(|| raw.to_string())
}

// ---------------------------------------------------------------------------
// Row-level codec
// ---------------------------------------------------------------------------

/// Split text into rows of unquoted cells.
fn parse_rows(text: &str) -> Result<Vec<Vec<String>>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.push('"');
                }
                '"' => in_quotes = false,
                other => cell.push(other),
            }
            continue;
        }

        match c {
            '"' if cell.is_empty() => in_quotes = true,
            ',' => row.push(std::mem::take(&mut cell)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut cell));
                rows.push(std::mem::take(&mut row));
            }
            other => cell.push(other),
        }
    }

    if in_quotes {
        return Err(SeoPressError::parse("keyword table ends inside a quoted field"));
    }
    if !cell.is_empty() || !row.is_empty() {
        row.push(cell);
        rows.push(row);
    }

    Ok(rows)
}

fn push_row(out: &mut String, cells: impl Iterator<Item = String>) {
    let escaped: Vec<String> = cells.map(|c| escape_cell(&c)).collect();
    out.push_str(&escaped.join(","));
    out.push('\n');
}

fn escape_cell(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
