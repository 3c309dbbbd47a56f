//! Fault-tolerant parsing of the model's two-part response
//!
//! The prompt asks for `ANSWER: ...` followed by `JSON:` and a decision
//! object, but models wrap JSON in code fences, leave trailing commas,
//! or truncate mid-object at the token limit. Recovery is a pipeline of
//! fallible transforms tried in sequence; each either yields a parsed
//! object or signals "try next". Only total failure produces a synthetic
//! fallback record, and nothing here ever raises past this boundary.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::types::{Confidence, Decision, DecisionResult};

const ANSWER_MARKER: &str = "ANSWER:";
const JSON_MARKER: &str = "JSON:";

/// Characters of unparsed text retained for diagnostics
const PREVIEW_CHARS: usize = 200;

static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([}\]])").unwrap());

/// Parser for raw LLM output
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse raw model output into a `DecisionResult`.
    ///
    /// Always returns a result; parse failures degrade to a synthetic
    /// `Information` record carrying the error and a preview of the
    /// unparsed text.
    pub fn parse(&self, raw: &str) -> DecisionResult {
        let text = raw.trim();

        if text.contains(ANSWER_MARKER) && text.contains(JSON_MARKER) {
            // Everything before the first JSON: marker is the direct answer
            let marker_at = text.find(JSON_MARKER).unwrap_or(0);
            let direct_answer = text[..marker_at]
                .replace(ANSWER_MARKER, "")
                .trim()
                .to_string();
            let json_part = &text[marker_at + JSON_MARKER.len()..];

            let cleaned = clean_json_block(json_part);
            match parse_with_recovery(&cleaned) {
                Some(value) => DecisionResult::from_llm_value(&value, direct_answer),
                None => synthetic_fallback(
                    direct_answer,
                    "Failed to parse JSON part",
                    &cleaned,
                ),
            }
        } else {
            // No markers at all: the whole text might still be a bare
            // JSON object
            let cleaned = clean_json_block(text);
            match parse_with_recovery(&cleaned) {
                Some(value) => DecisionResult::from_llm_value(
                    &value,
                    "Please check the detailed analysis below.".to_string(),
                ),
                None => synthetic_fallback(
                    "Unable to process the response.".to_string(),
                    "Response contained no ANSWER:/JSON: markers and no parseable JSON",
                    text,
                ),
            }
        }
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Synthetic degraded record returned when every recovery tier fails
fn synthetic_fallback(direct_answer: String, error: &str, unparsed: &str) -> DecisionResult {
    let preview: String = unparsed.chars().take(PREVIEW_CHARS).collect();
    DecisionResult {
        direct_answer,
        decision: Decision::Information,
        amount: None,
        confidence: Confidence::Low,
        summary: format!(
            "The model response could not be parsed into a decision object ({}). \
             The raw response preview is retained for diagnostics.",
            error
        ),
        justification: Vec::new(),
        additional_requirements: Vec::new(),
        metadata: None,
        parsing_error: Some(error.to_string()),
        raw_preview: if preview.is_empty() {
            None
        } else {
            Some(preview)
        },
    }
}

/// Strip surrounding code fences and trailing commas before a closing
/// brace or bracket
fn clean_json_block(text: &str) -> String {
    let mut cleaned = text.trim();

    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }

    TRAILING_COMMA
        .replace_all(cleaned.trim(), "$1")
        .into_owned()
}

/// Recovery pipeline: strict parse, balanced-span extraction,
/// delimiter completion, then truncation backoff. `None` means every
/// tier failed.
fn parse_with_recovery(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }

    if let Some(span) = extract_first_json(text) {
        if let Ok(value) = serde_json::from_str(span) {
            return Some(value);
        }
    }

    if let Some(completed) = complete_delimiters(text) {
        if let Ok(value) = serde_json::from_str(&completed) {
            return Some(value);
        }
    }

    truncation_backoff(text)
}

/// Scan state after walking a JSON fragment: open delimiters and
/// whether the fragment ends inside a string literal
struct ScanState {
    stack: Vec<char>,
    in_string: bool,
}

fn scan_delimiters(text: &str) -> ScanState {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escape_next = false;

    for ch in text.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if in_string && ch == '\\' {
            escape_next = true;
            continue;
        }
        if ch == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        match ch {
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                // Pop only on a matching closer; stray closers are left
                // for serde to reject later
                if stack.last() == Some(&ch) {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    ScanState { stack, in_string }
}

/// Find the first balanced `{...}` span, tracking nesting depth and
/// ignoring braces inside string literals
fn extract_first_json(text: &str) -> Option<&str> {
    let mut depth = 0i32;
    let mut start: Option<usize> = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if in_string && ch == '\\' {
            escape_next = true;
            continue;
        }
        if ch == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        match ch {
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start {
                        return Some(&text[s..i + ch.len_utf8()]);
                    }
                }
            }
            _ => {}
        }
    }

    None
}

/// Repair-by-completion: close a dangling string literal and append the
/// closers for every unmatched open delimiter. Returns `None` when there
/// is nothing to complete.
fn complete_delimiters(text: &str) -> Option<String> {
    let state = scan_delimiters(text);
    if state.stack.is_empty() && !state.in_string {
        return None;
    }

    let mut completed = text.trim_end().to_string();
    if state.in_string {
        completed.push('"');
    }

    // A trailing comma before the appended closers would re-break the JSON
    let trimmed = completed.trim_end().strip_suffix(',').map(str::to_string);
    if let Some(t) = trimmed {
        completed = t;
    }

    for closer in state.stack.iter().rev() {
        completed.push(*closer);
    }

    Some(completed)
}

/// Truncation backoff: progressively drop trailing lines and retry the
/// completion repair, stopping at the first line count that parses
fn truncation_backoff(text: &str) -> Option<Value> {
    let lines: Vec<&str> = text.lines().collect();

    for cut in 1..lines.len() {
        let candidate = lines[..lines.len() - cut].join("\n");
        let repaired = complete_delimiters(&candidate).unwrap_or_else(|| candidate.clone());
        if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
            return Some(value);
        }
    }

    None
}
