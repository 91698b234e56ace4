//! Front-matter parsing
//!
//! Content documents may start with a header block delimited by `---` lines.
//! The header uses a small YAML-like dialect: `key: value` scalars, named
//! lists of `- item` lines, lists of records where each `- key: value` item
//! can be extended by four-space indented `key: value` lines, and inline
//! `[...]` list literals. Anything else in the header is ignored; parsing
//! never fails.

use indexmap::IndexMap;
use serde::Serialize;

/// Marker line opening and closing the header block
const DELIMITER: &str = "---";

/// Indentation that marks a record continuation line
const CONTINUATION_INDENT: &str = "    ";

/// A record element of a list: field name to value
pub type Record = IndexMap<String, String>;

/// Decoded header, in declaration order
pub type Frontmatter = IndexMap<String, FrontmatterValue>;

/// A single front-matter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FrontmatterValue {
    Scalar(String),
    List(Vec<String>),
    ListOfRecords(Vec<Record>),
}

impl FrontmatterValue {
    /// The value as a string, if it is a scalar
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FrontmatterValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a list of strings, if it is a scalar list
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FrontmatterValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// The value as a list of records
    pub fn as_records(&self) -> Option<&[Record]> {
        match self {
            FrontmatterValue::ListOfRecords(records) => Some(records),
            _ => None,
        }
    }
}

/// A content document split into its header and body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedDocument {
    pub frontmatter: Frontmatter,
    pub body: String,
}

impl ParsedDocument {
    /// Parse a document. Text without a well-formed header comes back
    /// unchanged as the body with empty front-matter.
    pub fn parse(input: &str) -> Self {
        match split_header(input) {
            Some((header, body)) => {
                let mut state = HeaderState::default();
                for line in header.lines() {
                    state.feed(line);
                }
                Self {
                    frontmatter: state.finish(),
                    body: body.to_string(),
                }
            }
            None => Self {
                frontmatter: Frontmatter::new(),
                body: input.to_string(),
            },
        }
    }

    pub fn get(&self, key: &str) -> Option<&FrontmatterValue> {
        self.frontmatter.get(key)
    }

    /// Scalar value for `key`
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FrontmatterValue::as_str)
    }

    /// Scalar list for `key`
    pub fn get_list(&self, key: &str) -> Option<&[String]> {
        self.get(key).and_then(FrontmatterValue::as_list)
    }

    /// Record list for `key`
    pub fn get_records(&self, key: &str) -> Option<&[Record]> {
        self.get(key).and_then(FrontmatterValue::as_records)
    }

    /// The `title` field, if present
    pub fn title(&self) -> Option<&str> {
        self.get_str("title")
    }
}

/// Split `input` into (header, body) when it opens with a delimited header
/// of at least one line.
fn split_header(input: &str) -> Option<(&str, &str)> {
    let mut lines = input.split_inclusive('\n');

    let first = lines.next()?;
    if !first.ends_with('\n') || strip_eol(first) != DELIMITER {
        return None;
    }

    let header_start = first.len();
    let mut offset = header_start;
    let mut has_header_line = false;

    for line in lines {
        if has_header_line && strip_eol(line) == DELIMITER {
            let header = &input[header_start..offset];
            let body = &input[offset + line.len()..];
            return Some((header, body));
        }
        has_header_line = true;
        offset += line.len();
    }

    None
}

fn strip_eol(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Remove one matching pair of surrounding double or single quotes
fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn is_list_literal(value: &str) -> bool {
    value.starts_with('[') && value.ends_with(']')
}

/// Decode an inline `[...]` literal as a JSON array
fn decode_list_literal(value: &str) -> Option<FrontmatterValue> {
    let items: Vec<serde_json::Value> = serde_json::from_str(value).ok()?;

    if !items.is_empty() && items.iter().all(serde_json::Value::is_object) {
        let records: Vec<Record> = items
            .iter()
            .filter_map(serde_json::Value::as_object)
            .map(|object| {
                object
                    .iter()
                    .map(|(k, v)| (k.clone(), json_to_string(v)))
                    .collect()
            })
            .collect();
        return Some(FrontmatterValue::ListOfRecords(records));
    }

    Some(FrontmatterValue::List(
        items.iter().map(json_to_string).collect(),
    ))
}

fn json_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

enum ListItem {
    Scalar(String),
    Record(Record),
}

/// Line-by-line header reducer
#[derive(Default)]
struct HeaderState {
    frontmatter: Frontmatter,
    /// Key of the list that `- item` lines append to
    list: Option<String>,
    /// Record element still receiving continuation lines
    record: Option<Record>,
}

impl HeaderState {
    fn feed(&mut self, line: &str) {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let trimmed = line.trim();

        if trimmed.is_empty() {
            return;
        }

        if let Some(rest) = trimmed.strip_prefix('-') {
            self.list_item(rest.trim());
            return;
        }

        if line.starts_with(CONTINUATION_INDENT) && line.contains(':') {
            self.continuation(trimmed);
            return;
        }

        if !line.starts_with(char::is_whitespace) {
            if let Some((key, value)) = line.split_once(':') {
                self.key_value(key.trim(), value.trim());
                return;
            }
        }

        tracing::debug!("Ignoring front-matter line: {:?}", line);
    }

    fn list_item(&mut self, rest: &str) {
        if self.list.is_none() {
            tracing::debug!("Ignoring list item outside a list: {:?}", rest);
            return;
        }

        self.flush_record();

        match rest.split_once(':') {
            Some((key, value)) => {
                let mut record = Record::new();
                record.insert(key.trim().to_string(), strip_quotes(value.trim()).to_string());
                self.record = Some(record);
            }
            None => self.push(ListItem::Scalar(strip_quotes(rest).to_string())),
        }
    }

    fn continuation(&mut self, field: &str) {
        let Some(record) = self.record.as_mut() else {
            tracing::debug!("Dropping continuation line without a record: {:?}", field);
            return;
        };

        if let Some((key, value)) = field.split_once(':') {
            record.insert(key.trim().to_string(), strip_quotes(value.trim()).to_string());
        }
    }

    fn key_value(&mut self, key: &str, value: &str) {
        self.flush_record();

        if value.is_empty() {
            self.frontmatter
                .insert(key.to_string(), FrontmatterValue::List(Vec::new()));
            self.list = Some(key.to_string());
            return;
        }

        self.list = None;

        let value = strip_quotes(value);
        let decoded = if is_list_literal(value) {
            decode_list_literal(value)
        } else {
            None
        };

        self.frontmatter.insert(
            key.to_string(),
            decoded.unwrap_or_else(|| FrontmatterValue::Scalar(value.to_string())),
        );
    }

    fn flush_record(&mut self) {
        if let Some(record) = self.record.take() {
            self.push(ListItem::Record(record));
        }
    }

    fn push(&mut self, item: ListItem) {
        let Some(value) = self
            .list
            .as_ref()
            .and_then(|key| self.frontmatter.get_mut(key))
        else {
            return;
        };

        match item {
            ListItem::Scalar(scalar) => match value {
                FrontmatterValue::List(items) => items.push(scalar),
                _ => tracing::debug!("Dropping scalar item in a record list: {:?}", scalar),
            },
            ListItem::Record(record) => {
                if matches!(value, FrontmatterValue::List(items) if items.is_empty()) {
                    *value = FrontmatterValue::ListOfRecords(Vec::new());
                }
                match value {
                    FrontmatterValue::ListOfRecords(records) => records.push(record),
                    _ => tracing::debug!("Dropping record item in a scalar list"),
                }
            }
        }
    }

    fn finish(mut self) -> Frontmatter {
        self.flush_record();
        self.frontmatter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, &str)]) -> Record {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_text_without_header_is_body() {
        for input in [
            "",
            "Just some text",
            "--- not a delimiter\ntitle: x\n---\n",
            "\n---\ntitle: x\n---\nbody",
            "---\ntitle: never closed\n",
            "----\ntitle: x\n----\nbody",
            "---",
        ] {
            let doc = ParsedDocument::parse(input);
            assert!(doc.frontmatter.is_empty(), "input {:?}", input);
            assert_eq!(doc.body, input);
        }
    }

    #[test]
    fn test_scalar_quotes_stripped() {
        let doc = ParsedDocument::parse("---\ntitle: \"Hello\"\nsubtitle: 'World'\n---\nBody\n");
        assert_eq!(doc.title(), Some("Hello"));
        assert_eq!(doc.get_str("subtitle"), Some("World"));
        assert_eq!(doc.body, "Body\n");
    }

    #[test]
    fn test_unmatched_quotes_kept() {
        let doc = ParsedDocument::parse("---\na: \"Hello'\nb: \"\n---\n");
        assert_eq!(doc.get_str("a"), Some("\"Hello'"));
        assert_eq!(doc.get_str("b"), Some("\""));
    }

    #[test]
    fn test_value_with_colon() {
        let doc = ParsedDocument::parse("---\nlink: https://example.org/a\n---\n");
        assert_eq!(doc.get_str("link"), Some("https://example.org/a"));
    }

    #[test]
    fn test_named_list_keeps_order() {
        let content = "---\ntags:\n  - rust\n  - \"web\"\n  - cms\ntitle: Tagged\n---\nText";
        let doc = ParsedDocument::parse(content);
        assert_eq!(
            doc.get_list("tags"),
            Some(&["rust".to_string(), "web".to_string(), "cms".to_string()][..])
        );
        assert_eq!(doc.title(), Some("Tagged"));
        assert_eq!(doc.body, "Text");
    }

    #[test]
    fn test_empty_named_list() {
        let doc = ParsedDocument::parse("---\nitems:\ntitle: x\n---\n");
        assert_eq!(doc.get_list("items"), Some(&[][..]));
    }

    #[test]
    fn test_list_of_records() {
        let content = r#"---
title: Clubs
clubs:
  - name: "Chess"
    day: Monday
  - name: Robotics
    day: 'Friday'
    room: B12
footer: done
---
"#;
        let doc = ParsedDocument::parse(content);
        assert_eq!(
            doc.get_records("clubs"),
            Some(
                &[
                    record(&[("name", "Chess"), ("day", "Monday")]),
                    record(&[("name", "Robotics"), ("day", "Friday"), ("room", "B12")]),
                ][..]
            )
        );
        assert_eq!(doc.get_str("footer"), Some("done"));
        assert_eq!(doc.body, "");
    }

    #[test]
    fn test_record_flushed_at_end_of_header() {
        let doc = ParsedDocument::parse("---\nlinks:\n- label: Home\n    href: /\n---\n");
        assert_eq!(
            doc.get_records("links"),
            Some(&[record(&[("label", "Home"), ("href", "/")])][..])
        );
    }

    #[test]
    fn test_continuation_without_record_is_dropped() {
        let content = "---\ntitle: x\n    stray: value\nitems:\n    orphan: 1\n- a\n---\n";
        let doc = ParsedDocument::parse(content);
        assert_eq!(doc.frontmatter.len(), 2);
        assert_eq!(doc.get_list("items"), Some(&["a".to_string()][..]));
        assert!(doc.get("stray").is_none());
        assert!(doc.get("orphan").is_none());
    }

    #[test]
    fn test_list_item_outside_list_is_dropped() {
        let doc = ParsedDocument::parse("---\n- loose\ntitle: x\n- after scalar\n---\n");
        assert_eq!(doc.frontmatter.len(), 1);
        assert_eq!(doc.title(), Some("x"));
    }

    #[test]
    fn test_mixed_list_keeps_first_kind() {
        let doc = ParsedDocument::parse("---\nitems:\n- plain\n- key: value\n- other\n---\n");
        assert_eq!(
            doc.get_list("items"),
            Some(&["plain".to_string(), "other".to_string()][..])
        );
    }

    #[test]
    fn test_inline_list_literal() {
        let doc = ParsedDocument::parse("---\ntags: [\"a\", \"b\", 3]\n---\n");
        assert_eq!(
            doc.get_list("tags"),
            Some(&["a".to_string(), "b".to_string(), "3".to_string()][..])
        );
    }

    #[test]
    fn test_inline_record_literal() {
        let doc = ParsedDocument::parse("---\nlinks: [{\"href\": \"/a\", \"n\": 1}]\n---\n");
        assert_eq!(
            doc.get_records("links"),
            Some(&[record(&[("href", "/a"), ("n", "1")])][..])
        );
    }

    #[test]
    fn test_invalid_list_literal_kept_as_string() {
        let doc = ParsedDocument::parse("---\ntags: [a, b]\n---\n");
        assert_eq!(doc.get_str("tags"), Some("[a, b]"));
    }

    #[test]
    fn test_crlf_line_endings() {
        let doc = ParsedDocument::parse("---\r\ntitle: \"Win\"\r\nlist:\r\n- one\r\n---\r\nBody\r\n");
        assert_eq!(doc.title(), Some("Win"));
        assert_eq!(doc.get_list("list"), Some(&["one".to_string()][..]));
        assert_eq!(doc.body, "Body\r\n");
    }

    #[test]
    fn test_header_closed_at_end_of_input() {
        let doc = ParsedDocument::parse("---\ntitle: x\n---");
        assert_eq!(doc.title(), Some("x"));
        assert_eq!(doc.body, "");
    }

    #[test]
    fn test_body_keeps_later_delimiters() {
        let doc = ParsedDocument::parse("---\ntitle: x\n---\nintro\n---\nmore\n");
        assert_eq!(doc.body, "intro\n---\nmore\n");
    }

    #[test]
    fn test_serializes_untagged() {
        let doc = ParsedDocument::parse("---\ntitle: x\ntags:\n- a\n---\nb");
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"frontmatter": {"title": "x", "tags": ["a"]}, "body": "b"})
        );
    }
}
