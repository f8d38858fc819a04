//! Best-effort repair of loosely formatted story responses returned by
//! LLMs. A model asked for a `{"storySegment": ..., "choices": [...]}`
//! object will sometimes wrap it in prose or code fences, truncate it
//! before the closing brace, or emit unquoted choice items. This module
//! turns such a payload back into a validated [`StoryUnit`] or an explicit
//! error; a partially repaired value is never returned.

use serde_json::Value;
use thiserror::Error;

use crate::dto::StoryUnit;

/// Number of choices a valid story response must offer.
pub const CHOICE_COUNT: usize = 3;

#[derive(Error, Debug)]
pub enum SanitizeError {
    #[error("input is empty or not usable text")]
    EmptyInput,
    #[error("no opening '{{' found in response")]
    NoObject,
    #[error("response unparseable after repair: {reason}")]
    Unparseable { reason: String, buffer: String },
    #[error("parsed response has the wrong shape: {0}")]
    WrongShape(String),
}

/// Which heuristics fired during one sanitize call. The sanitizer itself
/// never logs; callers decide what of this to report.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RepairTrace {
    /// Input was already valid and well shaped; no repair ran.
    pub fast_path: bool,
    pub stripped_fence: bool,
    /// No closing '}' was found at or after the opening one.
    pub missing_close: bool,
    /// A '}' was appended because the tail looked like the end of a
    /// string literal or an array.
    pub appended_brace: bool,
    pub dropped_trailing_comma: bool,
    /// Choice items rewritten into double-quoted string literals.
    pub requoted_items: usize,
}

/// Recovers a [`StoryUnit`] from a raw generation payload.
pub fn sanitize_story_response(raw: &str) -> Result<StoryUnit, SanitizeError> {
    sanitize_with_trace(raw).0
}

/// Like [`sanitize_story_response`], but also reports which repair
/// heuristics were applied.
pub fn sanitize_with_trace(raw: &str) -> (Result<StoryUnit, SanitizeError>, RepairTrace) {
    let mut trace = RepairTrace::default();
    let result = run_pipeline(raw, &mut trace);
    (result, trace)
}

fn run_pipeline(raw: &str, trace: &mut RepairTrace) -> Result<StoryUnit, SanitizeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SanitizeError::EmptyInput);
    }

    // Fast path: already valid and well shaped. A payload that parses but
    // has the wrong shape still goes through the repair passes below,
    // since they may fix unrelated issues in the same text.
    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        if let Ok(unit) = story_unit_from_value(&v) {
            trace.fast_path = true;
            return Ok(unit);
        }
    }

    let mut buf = strip_code_fences(trimmed, trace).trim().to_string();
    buf = extract_object_span(buf, trace)?;
    buf = repair_choices_array(buf, trace);

    let value: Value = serde_json::from_str(&buf).map_err(|e| SanitizeError::Unparseable {
        reason: e.to_string(),
        buffer: buf.clone(),
    })?;
    story_unit_from_value(&value).map_err(SanitizeError::WrongShape)
}

/// Checks the shape invariant and lifts a parsed value into a
/// [`StoryUnit`]. The error string names the first violation found.
fn story_unit_from_value(value: &Value) -> Result<StoryUnit, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| String::from("not a JSON object"))?;
    let segment = obj
        .get("storySegment")
        .and_then(Value::as_str)
        .ok_or_else(|| String::from("missing or non-string storySegment"))?;
    let choices = obj
        .get("choices")
        .and_then(Value::as_array)
        .ok_or_else(|| String::from("missing or non-array choices"))?;
    if choices.len() != CHOICE_COUNT {
        return Err(format!(
            "expected {CHOICE_COUNT} choices, got {}",
            choices.len()
        ));
    }
    let mut out = Vec::with_capacity(CHOICE_COUNT);
    for c in choices {
        out.push(
            c.as_str()
                .ok_or_else(|| String::from("non-string choice"))?
                .to_string(),
        );
    }
    Ok(StoryUnit {
        story_segment: segment.to_string(),
        choices: out,
    })
}

/// Remove common Markdown code fences around the payload. Only markers at
/// the very start and end of the buffer are recognized.
fn strip_code_fences<'a>(s: &'a str, trace: &mut RepairTrace) -> &'a str {
    let mut t = s;
    for prefix in ["```json", "```"] {
        if let Some(rest) = t.strip_prefix(prefix) {
            t = rest;
            trace.stripped_fence = true;
            break;
        }
    }
    if let Some(rest) = t.trim_end().strip_suffix("```") {
        t = rest;
        trace.stripped_fence = true;
    }
    t
}

/// Truncates the buffer to the span between the first '{' and the last
/// '}'. With no closing brace, a single '}' is appended when the trimmed
/// tail looks like the end of a string literal or an array; otherwise the
/// buffer is left untouched and the final parse decides.
fn extract_object_span(mut buf: String, trace: &mut RepairTrace) -> Result<String, SanitizeError> {
    let first = buf.find('{').ok_or(SanitizeError::NoObject)?;
    match buf.rfind('}') {
        Some(last) if last >= first => Ok(buf[first..=last].to_string()),
        _ => {
            trace.missing_close = true;
            let tail_len = buf.trim_end().len();
            if buf[..tail_len].ends_with('"') || buf[..tail_len].ends_with(']') {
                buf.truncate(tail_len);
                buf.push('}');
                trace.appended_brace = true;
            }
            Ok(buf)
        }
    }
}

/// Rewrites the content of the `"choices"` array so every item is a
/// double-quoted JSON string. Items that are already clean string
/// literals are kept verbatim; everything else, bare numerals included,
/// is escaped and wrapped so the shape check can accept it. A missing
/// array is not an error here; the final parse reports it.
fn repair_choices_array(buf: String, trace: &mut RepairTrace) -> String {
    let Some((open, close)) = find_choices_array(&buf) else {
        return buf;
    };
    let mut content = buf[open + 1..close].trim();
    if let Some(stripped) = content.strip_suffix(',') {
        content = stripped.trim_end();
        trace.dropped_trailing_comma = true;
    }

    let mut items: Vec<String> = Vec::new();
    for raw_item in split_top_level(content) {
        let item = raw_item.trim();
        if item.is_empty() {
            continue;
        }
        items.push(requote_item(item, trace));
    }

    let mut out = String::with_capacity(buf.len() + 8);
    out.push_str(&buf[..open + 1]);
    out.push_str(&items.join(", "));
    out.push_str(&buf[close..]);
    out
}

/// Locates the `"choices"` array and returns the byte offsets of its
/// opening and closing brackets. Quote state, escapes and nesting are
/// tracked character by character, so items containing commas or brackets
/// inside string literals do not end the scan early. Returns `None` when
/// the key or a matching ']' is absent.
fn find_choices_array(s: &str) -> Option<(usize, usize)> {
    let key = "\"choices\"";
    let key_end = s.find(key)? + key.len();

    let mut open = None;
    let mut seen_colon = false;
    for (i, ch) in s[key_end..].char_indices() {
        if ch.is_whitespace() {
            continue;
        }
        match (seen_colon, ch) {
            (false, ':') => seen_colon = true,
            (true, '[') => {
                open = Some(key_end + i);
                break;
            }
            _ => return None,
        }
    }
    let open = open?;

    let mut depth = 1usize;
    let mut in_str = false;
    let mut esc = false;
    for (i, ch) in s[open + 1..].char_indices() {
        if in_str {
            if esc {
                esc = false;
            } else if ch == '\\' {
                esc = true;
            } else if ch == '"' {
                in_str = false;
            }
            continue;
        }
        match ch {
            '"' => in_str = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some((open, open + 1 + i));
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits array content on separators at bracket depth zero, outside both
/// double- and single-quoted runs.
fn split_top_level(content: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut start = 0usize;
    let mut depth = 0usize;
    let mut in_str = false;
    let mut esc = false;
    let mut quote = '"';
    for (i, ch) in content.char_indices() {
        if in_str {
            if esc {
                esc = false;
            } else if ch == '\\' {
                esc = true;
            } else if ch == quote {
                in_str = false;
            }
            continue;
        }
        match ch {
            '"' | '\'' => {
                in_str = true;
                quote = ch;
            }
            '[' | '{' => depth += 1,
            ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(&content[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&content[start..]);
    items
}

/// Normalizes one candidate item to a double-quoted JSON string literal.
/// Bare numerals are quoted too: the shape invariant demands string
/// choices, so keeping them numeric would only defer the failure.
fn requote_item(item: &str, trace: &mut RepairTrace) -> String {
    if item.len() >= 2 && item.starts_with('"') && item.ends_with('"') {
        return item.to_string();
    }
    let rewritten = if item.len() >= 2 && item.starts_with('\'') && item.ends_with('\'') {
        let inner = &item[1..item.len() - 1];
        format!("\"{}\"", inner.replace('"', "\\\""))
    } else {
        format!("\"{}\"", item.replace('"', "\\\""))
    };
    trace.requoted_items += 1;
    rewritten
}
