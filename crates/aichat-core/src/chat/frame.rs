//! Stream frame parser.
//!
//! The provider emits line-delimited `data:`-prefixed JSON chunks in the
//! OpenAI-compatible shape. Parsing never fails: anything that cannot be
//! understood is reported as [`Frame::Empty`] so the stream keeps going.

use serde_json::Value;

use aichat_types::llm::UNKNOWN_ERROR_CODE;

/// An incremental text fragment on one of the two output channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    Reasoning(String),
    Answer(String),
}

/// Classification of one raw frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Delta(Delta),
    /// Finish reason `stop`, or the `[DONE]` sentinel.
    Done,
    /// Finish reason `length`; the caller may resume.
    Continue,
    /// Keep-alives, blank lines, malformed or content-free chunks.
    Empty,
    /// The provider embedded an error object in the stream.
    UpstreamError { code: String, raw: Value },
}

const DATA_MARKER: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// One payload found in a raw frame.
enum Segment {
    Done,
    Json(Value),
}

/// Classify one raw frame.
///
/// When two JSON objects arrive glued together in one frame (the provider
/// occasionally drops the blank separator line), only the last complete
/// object is used and the earlier ones are discarded. The `data:` marker is
/// only recognised at the start of a payload, never inside string values.
pub fn parse_frame(raw: &str) -> Frame {
    let payload = match last_segment(raw) {
        Some(Segment::Done) => return Frame::Done,
        Some(Segment::Json(value)) if value.is_object() => value,
        _ => return Frame::Empty,
    };

    if let Some(error) = payload.get("error") {
        return Frame::UpstreamError {
            code: error_code(error),
            raw: payload.clone(),
        };
    }

    let Some(choice) = payload.pointer("/choices/0") else {
        return Frame::Empty;
    };

    match choice.get("finish_reason").and_then(Value::as_str) {
        Some("stop") => return Frame::Done,
        Some("length") => return Frame::Continue,
        _ => {}
    }

    let delta = choice.get("delta");
    let non_empty = |key: &str| {
        delta
            .and_then(|d| d.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    if let Some(reasoning) = non_empty("reasoning_content") {
        Frame::Delta(Delta::Reasoning(reasoning))
    } else if let Some(answer) = non_empty("content") {
        Frame::Delta(Delta::Answer(answer))
    } else {
        Frame::Empty
    }
}

/// Walk the payloads of a frame in order and return the last one that parsed.
///
/// Each payload is an optional `data:` marker followed by either the `[DONE]`
/// sentinel or one JSON value. Decoding stops at the first payload that is
/// neither.
fn last_segment(raw: &str) -> Option<Segment> {
    let mut rest = raw;
    let mut last = None;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        let body = rest
            .strip_prefix(DATA_MARKER)
            .map_or(rest, str::trim_start);

        if let Some(after) = body.strip_prefix(DONE_SENTINEL) {
            let tail = after.trim_start();
            if !(tail.is_empty() || tail.starts_with(DATA_MARKER)) {
                break;
            }
            last = Some(Segment::Done);
            rest = after;
            continue;
        }

        let mut values = serde_json::Deserializer::from_str(body).into_iter::<Value>();
        match values.next() {
            Some(Ok(value)) => {
                last = Some(Segment::Json(value));
                rest = &body[values.byte_offset()..];
            }
            _ => break,
        }
    }

    last
}

fn error_code(error: &Value) -> String {
    error
        .get("code")
        .and_then(Value::as_str)
        .or_else(|| error.get("type").and_then(Value::as_str))
        .or_else(|| error.as_str())
        .unwrap_or(UNKNOWN_ERROR_CODE)
        .to_string()
}
