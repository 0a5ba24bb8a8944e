use polyz_protocol::TokenUsage;
use serde_json::{Map, Value};
use thiserror::Error;

const CONTENT_KEY: &str = "\"content\":";
const PREVIEW_CHARS: usize = 200;

/// Successful interpretation of a response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    Reply {
        text: String,
        usage: Option<TokenUsage>,
        /// Recovered by substring search from a body that is not valid JSON
        via_fallback: bool,
    },

    /// Valid JSON object with none of the recognized reply fields
    Empty { usage: Option<TokenUsage> },
}

impl ParsedResponse {
    pub fn text(&self) -> Option<&str> {
        match self {
            ParsedResponse::Reply { text, .. } => Some(text),
            ParsedResponse::Empty { .. } => None,
        }
    }

    pub fn usage(&self) -> Option<TokenUsage> {
        match self {
            ParsedResponse::Reply { usage, .. } | ParsedResponse::Empty { usage } => *usage,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("response is not in a recognized format: {preview}")]
    Format { preview: String },

    #[error("response JSON is {kind}, expected an object")]
    UnexpectedShape { kind: &'static str },
}

/// Extract the reply text from a backend response body.
///
/// JSON objects are searched for `content`, then `response`, then the same
/// two fields inside a `result` object. A body that is not JSON at all gets
/// one more chance: the first quoted string after a literal `"content":`.
pub fn parse_response(body: &[u8]) -> Result<ParsedResponse, ParseError> {
    let text = String::from_utf8_lossy(body);

    let value = match serde_json::from_str::<Value>(&text) {
        Ok(value) => value,
        Err(e) => {
            log::debug!("Response is not valid JSON ({e}), trying substring extraction");
            return fallback_content(&text)
                .map(|text| {
                    log::debug!("Extracted content by substring search");
                    ParsedResponse::Reply {
                        text,
                        usage: None,
                        via_fallback: true,
                    }
                })
                .ok_or_else(|| ParseError::Format {
                    preview: preview(&text),
                });
        }
    };

    let object = match value {
        Value::Object(object) => object,
        other => {
            return Err(ParseError::UnexpectedShape {
                kind: json_kind(&other),
            })
        }
    };

    let usage = token_usage(&object);
    if let Some(usage) = usage {
        log::info!("Token usage: {usage}");
    }

    match reply_text(&object) {
        Some((shape, text)) => {
            log::debug!("Reply found in `{shape}`");
            Ok(ParsedResponse::Reply {
                text: text.to_string(),
                usage,
                via_fallback: false,
            })
        }
        None => {
            let keys: Vec<&str> = object.keys().map(String::as_str).collect();
            log::debug!("No reply field in response; keys: {keys:?}");
            Ok(ParsedResponse::Empty { usage })
        }
    }
}

fn reply_text(object: &Map<String, Value>) -> Option<(&'static str, &str)> {
    if let Some(text) = object.get("content").and_then(Value::as_str) {
        return Some(("content", text));
    }
    if let Some(text) = object.get("response").and_then(Value::as_str) {
        return Some(("response", text));
    }
    let result = object.get("result").and_then(Value::as_object)?;
    if let Some(text) = result.get("content").and_then(Value::as_str) {
        return Some(("result.content", text));
    }
    result
        .get("response")
        .and_then(Value::as_str)
        .map(|text| ("result.response", text))
}

fn token_usage(object: &Map<String, Value>) -> Option<TokenUsage> {
    let usage_object = object
        .get("token_usage")
        .and_then(Value::as_object)
        .or_else(|| {
            object
                .get("result")
                .and_then(Value::as_object)
                .and_then(|r| r.get("token_usage"))
                .and_then(Value::as_object)
        })?;
    let usage = TokenUsage::from_object(usage_object);
    (!usage.is_empty()).then_some(usage)
}

/// Text between the first two quotes following `"content":`
fn fallback_content(text: &str) -> Option<String> {
    let start = text.find(CONTENT_KEY)? + CONTENT_KEY.len();
    let rest = &text[start..];
    let open = rest.find('"')? + 1;
    let close = rest[open..].find('"')? + open;
    let content = &rest[open..close];
    (!content.is_empty()).then(|| content.to_string())
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reply(text: &str) -> ParsedResponse {
        ParsedResponse::Reply {
            text: text.to_string(),
            usage: None,
            via_fallback: false,
        }
    }

    #[test]
    fn recognized_shapes_in_priority_order() {
        assert_eq!(parse_response(br#"{"content":"hi"}"#), Ok(reply("hi")));
        assert_eq!(parse_response(br#"{"response":"yo"}"#), Ok(reply("yo")));
        assert_eq!(parse_response(br#"{"result":{"content":"deep"}}"#), Ok(reply("deep")));
        assert_eq!(parse_response(br#"{"result":{"response":"ok"}}"#), Ok(reply("ok")));
        assert_eq!(
            parse_response(br#"{"response":"second","content":"first"}"#),
            Ok(reply("first"))
        );
        assert_eq!(
            parse_response(br#"{"content":null,"result":{"content":"nested"}}"#),
            Ok(reply("nested"))
        );
    }

    #[test]
    fn object_without_reply_is_empty_not_error() {
        assert_eq!(
            parse_response(b"{}"),
            Ok(ParsedResponse::Empty { usage: None })
        );
        assert_eq!(
            parse_response(br#"{"result":"done"}"#),
            Ok(ParsedResponse::Empty { usage: None })
        );
    }

    #[test]
    fn fallback_substring_extraction() {
        let parsed = parse_response(br#"not json at all "content":"fallback""#).unwrap();
        assert_eq!(
            parsed,
            ParsedResponse::Reply {
                text: "fallback".to_string(),
                usage: None,
                via_fallback: true,
            }
        );

        // truncated JSON still yields the first quoted run
        let parsed = parse_response(br#"{"content": "partial answer", "token_us"#).unwrap();
        assert_eq!(parsed.text(), Some("partial answer"));
    }

    #[test]
    fn unrecoverable_bodies_are_format_errors() {
        assert!(matches!(
            parse_response(b"<html>502 Bad Gateway</html>"),
            Err(ParseError::Format { .. })
        ));
        assert!(matches!(
            parse_response(br#"oops "content":"""#),
            Err(ParseError::Format { .. })
        ));

        let long = "x".repeat(1000);
        let Err(ParseError::Format { preview }) = parse_response(long.as_bytes()) else {
            panic!("expected format error");
        };
        assert_eq!(preview.len(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn non_object_json_is_unexpected_shape() {
        assert_eq!(
            parse_response(b"[1,2]"),
            Err(ParseError::UnexpectedShape { kind: "an array" })
        );
        assert_eq!(
            parse_response(br#""just a string""#),
            Err(ParseError::UnexpectedShape { kind: "a string" })
        );
    }

    #[test]
    fn token_usage_top_level_or_nested() {
        let parsed =
            parse_response(br#"{"content":"hi","token_usage":{"input_tokens":12,"output_tokens":3}}"#)
                .unwrap();
        assert_eq!(
            parsed.usage(),
            Some(TokenUsage {
                input_tokens: Some(12),
                output_tokens: Some(3),
                total_tokens: None,
            })
        );

        let parsed =
            parse_response(br#"{"result":{"response":"ok","token_usage":{"total_tokens":40}}}"#)
                .unwrap();
        assert_eq!(parsed.usage().and_then(|u| u.total_tokens), Some(40));

        let parsed = parse_response(br#"{"content":"hi","token_usage":{"note":"n/a"}}"#).unwrap();
        assert_eq!(parsed.usage(), None);
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let mut body = br#"{"content":"caf"#.to_vec();
        body.push(0xFF);
        body.extend_from_slice(br#""}"#);
        let parsed = parse_response(&body).unwrap();
        assert_eq!(parsed.text(), Some("caf\u{FFFD}"));
    }
}
