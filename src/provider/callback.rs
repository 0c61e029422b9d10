//! Parsing of provider webhook bodies.
//!
//! Deepgram posts the full pre-recorded response to the callback URL. Only a
//! handful of fields matter here:
//! - `metadata.request_id`: correlates the callback with a job
//! - top-level `error`: a truthy value means transcription failed
//! - `results.channels[0].alternatives[0]`: the transcript
//! - `metadata.duration`, `metadata.channels`, `metadata.created`

use crate::jobs::{CallbackOutcome, ErrorDetail, TranscriptMetadata, TranscriptPayload};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("callback body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("callback body has no metadata.request_id")]
    MissingRequestId,
}

/// A callback body reduced to what the job lifecycle needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCallback {
    pub request_id: String,
    pub outcome: CallbackOutcome,
}

/// Parse a raw webhook body.
pub fn parse_callback(body: &[u8]) -> Result<ParsedCallback, CallbackError> {
    let payload: Value = serde_json::from_slice(body)?;

    let request_id = payload
        .pointer("/metadata/request_id")
        .or_else(|| payload.get("request_id"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or(CallbackError::MissingRequestId)?
        .to_string();

    let outcome = match payload.get("error") {
        Some(error) if is_truthy(error) => CallbackOutcome::Failure(ErrorDetail::new(error.clone())),
        _ => CallbackOutcome::Success(TranscriptPayload {
            transcript: extract_transcript(&payload),
            metadata: extract_metadata(&payload),
        }),
    };

    Ok(ParsedCallback { request_id, outcome })
}

/// `null`, `false`, `0` and `""` do not count as an error.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Paragraph-formatted transcript when smart formatting produced one, else the
/// plain alternative transcript, else empty.
fn extract_transcript(payload: &Value) -> String {
    let alternative = payload.pointer("/results/channels/0/alternatives/0");

    alternative
        .and_then(|alt| alt.pointer("/paragraphs/transcript"))
        .or_else(|| alternative.and_then(|alt| alt.get("transcript")))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn extract_metadata(payload: &Value) -> TranscriptMetadata {
    let metadata = payload.get("metadata");
    let field = |name: &str| metadata.and_then(|m| m.get(name));

    TranscriptMetadata {
        duration: field("duration").and_then(Value::as_f64),
        channels: field("channels")
            .and_then(Value::as_u64)
            .and_then(|c| u32::try_from(c).ok()),
        created: field("created").and_then(Value::as_str).map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_success_payload() {
        let parsed = parse_callback(&body(json!({
            "metadata": {
                "request_id": "abc123",
                "created": "2024-05-01T12:00:05.000Z",
                "duration": 12.3,
                "channels": 1
            },
            "results": {
                "channels": [{
                    "alternatives": [{
                        "transcript": "hello world",
                        "paragraphs": { "transcript": "\nHello world." }
                    }]
                }]
            }
        })))
        .unwrap();

        assert_eq!(parsed.request_id, "abc123");
        match parsed.outcome {
            CallbackOutcome::Success(payload) => {
                assert_eq!(payload.transcript, "\nHello world.");
                assert_eq!(payload.metadata.duration, Some(12.3));
                assert_eq!(payload.metadata.channels, Some(1));
                assert_eq!(payload.metadata.created.as_deref(), Some("2024-05-01T12:00:05.000Z"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[rstest]
    #[case::plain_alternative(json!({"alternatives": [{"transcript": "hello world"}]}), "hello world")]
    #[case::no_alternatives(json!({"alternatives": []}), "")]
    #[case::empty_channel(json!({}), "")]
    fn test_transcript_fallbacks(#[case] channel: Value, #[case] expected: &str) {
        let parsed = parse_callback(&body(json!({
            "metadata": { "request_id": "abc123" },
            "results": { "channels": [channel] }
        })))
        .unwrap();

        match parsed.outcome {
            CallbackOutcome::Success(payload) => {
                assert_eq!(payload.transcript, expected);
                assert_eq!(payload.metadata, TranscriptMetadata::default());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_error_payload() {
        let parsed = parse_callback(&body(json!({
            "metadata": { "request_id": "xyz" },
            "error": "Bad Request: failed to process audio"
        })))
        .unwrap();

        assert_eq!(parsed.request_id, "xyz");
        assert_eq!(
            parsed.outcome,
            CallbackOutcome::Failure(ErrorDetail::from("Bad Request: failed to process audio"))
        );
    }

    #[rstest]
    #[case::null(json!(null))]
    #[case::empty_string(json!(""))]
    #[case::false_flag(json!(false))]
    #[case::zero(json!(0))]
    fn test_falsy_error_is_success(#[case] error: Value) {
        let parsed = parse_callback(&body(json!({
            "metadata": { "request_id": "a" },
            "error": error,
            "results": { "channels": [{ "alternatives": [{ "transcript": "hi" }] }] }
        })))
        .unwrap();

        match parsed.outcome {
            CallbackOutcome::Success(payload) => assert_eq!(payload.transcript, "hi"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[rstest]
    #[case::object(json!({"message": "bad audio"}))]
    #[case::true_flag(json!(true))]
    #[case::code(json!(400))]
    fn test_truthy_error_is_failure(#[case] error: Value) {
        let parsed = parse_callback(&body(json!({
            "metadata": { "request_id": "a" },
            "error": error.clone()
        })))
        .unwrap();

        assert_eq!(parsed.outcome, CallbackOutcome::Failure(ErrorDetail::new(error)));
    }

    #[test]
    fn test_oversized_channel_count_is_dropped() {
        let parsed = parse_callback(&body(json!({
            "metadata": { "request_id": "a", "channels": u64::from(u32::MAX) + 1 }
        })))
        .unwrap();

        match parsed.outcome {
            CallbackOutcome::Success(payload) => assert_eq!(payload.metadata.channels, None),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[rstest]
    #[case::no_metadata(json!({"results": {}}))]
    #[case::empty_id(json!({"metadata": {"request_id": ""}}))]
    #[case::numeric_id(json!({"metadata": {"request_id": 42}}))]
    fn test_missing_request_id(#[case] payload: Value) {
        assert!(matches!(
            parse_callback(&body(payload)),
            Err(CallbackError::MissingRequestId)
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            parse_callback(b"not json"),
            Err(CallbackError::InvalidJson(_))
        ));
    }
}
