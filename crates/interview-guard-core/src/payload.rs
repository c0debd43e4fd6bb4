//! Extraction of a structured payload from raw model text.
//!
//! Models wrap JSON in prose, Markdown fences, or both, and sometimes emit
//! several fragments. Every balanced `{...}` / `[...]` span is collected in one
//! pass; spans are tried longest first (earliest on ties) and the first one
//! that parses as JSON wins. When bracket tracking finds nothing usable (a
//! stray quote in prose can throw it off), each `{` / `[` offset is handed to
//! the JSON parser directly. No parseable span means no payload, which the
//! caller treats as a zero-item candidate.
//!
//! A span nested inside an unclosed bracket is most likely a fragment of a
//! truncated payload. It is accepted only when it still reads as a whole item
//! list: an `{"items": ...}` wrapper or a non-empty array of objects. A lone
//! item object from inside a cut-off list would otherwise be clamped to the
//! first question.

use serde_json::Value;
use std::cmp::Reverse;

/// One untrusted item as the model wrote it. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateItem {
    pub question: Option<String>,
    pub answer: Option<String>,
    pub status: Option<String>,
    pub evidence: Vec<String>,
}

impl CandidateItem {
    /// Read an item leniently; anything that is not an object yields an empty item.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

        let evidence = match obj.get("evidence") {
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(single)) => vec![single.clone()],
            _ => Vec::new(),
        };

        Self {
            question: text("question"),
            answer: text("answer"),
            status: text("status"),
            evidence,
        }
    }

    /// Whether the model claims this item is answered.
    pub fn claims_answered(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| s.trim().eq_ignore_ascii_case("answered"))
            .unwrap_or(false)
    }
}

/// The model's response as far as it could be parsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    /// The extracted JSON value, if any span parsed
    pub payload: Option<Value>,

    /// Items read leniently from the payload, in model order
    pub items: Vec<CandidateItem>,
}

impl Candidate {
    /// A candidate with no payload and no items.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse raw model text into a candidate. Never fails.
    pub fn parse(raw: &str) -> Self {
        match extract_payload(raw) {
            Some(value) => Self::from_payload(value),
            None => Self::empty(),
        }
    }

    /// Build a candidate from an already-parsed payload.
    pub fn from_payload(payload: Value) -> Self {
        let items = item_values(&payload)
            .map(|values| values.iter().map(CandidateItem::from_value).collect())
            .unwrap_or_default();
        Self {
            payload: Some(payload),
            items,
        }
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }
}

/// Locate the item list inside a payload.
///
/// Accepts `{"items": [...]}`, a bare array, or a lone item object.
pub fn item_values(payload: &Value) -> Option<&[Value]> {
    match payload {
        Value::Array(items) => Some(items.as_slice()),
        Value::Object(obj) => match obj.get("items") {
            Some(Value::Array(items)) => Some(items.as_slice()),
            Some(_) => None,
            None if obj.contains_key("status") || obj.contains_key("question") => {
                Some(std::slice::from_ref(payload))
            }
            None => None,
        },
        _ => None,
    }
}

/// Find the preferred JSON object or array embedded in `raw`.
pub fn extract_payload(raw: &str) -> Option<Value> {
    let mut spans = balanced_spans(raw);
    spans.sort_by(|a, b| b.len().cmp(&a.len()).then(a.start.cmp(&b.start)));

    spans
        .into_iter()
        .find_map(|span| {
            serde_json::from_str::<Value>(&raw[span.start..span.end])
                .ok()
                .filter(|value| is_usable(value, span.nested))
        })
        .or_else(|| parse_from_openers(raw))
}

/// Whether a parsed span may stand as the payload.
fn is_usable(value: &Value, nested: bool) -> bool {
    match value {
        Value::Array(items) if nested => !items.is_empty() && items.iter().all(Value::is_object),
        Value::Object(obj) if nested => obj.contains_key("items"),
        Value::Array(_) | Value::Object(_) => true,
        _ => false,
    }
}

/// Let the JSON parser read one value from every `{` / `[` offset.
///
/// Offsets are not known to be top level here, so only whole item lists count.
fn parse_from_openers(raw: &str) -> Option<Value> {
    raw.char_indices()
        .filter(|&(_, c)| matches!(c, '{' | '['))
        .filter_map(|(start, _)| {
            let mut stream = serde_json::Deserializer::from_str(&raw[start..]).into_iter::<Value>();
            match stream.next() {
                Some(Ok(value)) if is_usable(&value, true) => {
                    Some((start, stream.byte_offset(), value))
                }
                _ => None,
            }
        })
        .min_by_key(|(start, len, _)| (Reverse(*len), *start))
        .map(|(_, _, value)| value)
}

/// A balanced bracket span, as byte offsets into the raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
    /// Opened while another bracket was still open
    nested: bool,
}

impl Span {
    fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Every balanced bracket span, string-literal aware.
fn balanced_spans(raw: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (pos, c) in raw.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' if !stack.is_empty() => in_string = true,
            '{' | '[' => stack.push((c, pos)),
            '}' | ']' => {
                let expected = if c == '}' { '{' } else { '[' };
                match stack.pop() {
                    Some((open, start)) if open == expected => spans.push(Span {
                        start,
                        end: pos + 1,
                        nested: !stack.is_empty(),
                    }),
                    Some(_) => stack.clear(),
                    None => {}
                }
            }
            _ => {}
        }
    }

    spans
}
