//! Decoding of frame payloads into application events.
//!
//! Payloads are JSON objects with a `type` discriminator. Decoding is
//! exhaustive: every payload becomes exactly one [`StreamEvent`] or is
//! explicitly discarded.

use serde_json::{Map, Value};
use tracing::debug;

/// One application-level event from the chat stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Progress update carrying the full cumulative reply text.
    Chunk { text: String },
    /// Generated media announcement.
    Image { url: String },
    /// Terminal success. `content`, when present, is the final text.
    Done { content: Option<String> },
    /// Terminal failure with a human-readable cause.
    Error { detail: String },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. } | StreamEvent::Error { .. })
    }
}

/// Interpret one frame payload.
///
/// A payload that is not a JSON object is passed through as a raw
/// [`StreamEvent::Chunk`], so a non-conforming peer still shows progress.
/// Returns `None` for objects that carry nothing usable.
pub fn interpret(payload: &str) -> Option<StreamEvent> {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(obj)) => decode_object(&obj),
        Ok(_) | Err(_) => {
            debug!(len = payload.len(), "payload is not a JSON object; treating as raw chunk");
            Some(StreamEvent::Chunk {
                text: payload.to_string(),
            })
        }
    }
}

fn decode_object(obj: &Map<String, Value>) -> Option<StreamEvent> {
    let kind = obj.get("type").and_then(Value::as_str).unwrap_or("");

    match kind {
        "chunk" => Some(StreamEvent::Chunk {
            text: first_non_empty(obj, &["accumulated", "content"]).unwrap_or_default(),
        }),
        "image" => match first_non_empty(obj, &["data_url", "url"]) {
            Some(url) => Some(StreamEvent::Image { url }),
            None => {
                debug!("image event without a url; discarding");
                None
            }
        },
        "done" => Some(StreamEvent::Done {
            content: text_field(obj, "content").filter(|c| !c.is_empty()),
        }),
        "error" => {
            let detail = text_field(obj, "detail")
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| Value::Object(obj.clone()).to_string());
            Some(StreamEvent::Error { detail })
        }
        _ => {
            // Unknown or missing type: usable content still counts as progress.
            text_field(obj, "content").filter(|c| !c.is_empty())?;
            let text = first_non_empty(obj, &["accumulated", "content"])?;
            Some(StreamEvent::Chunk { text })
        }
    }
}

/// Field rendered as text: strings as-is, other scalars and structures as
/// their JSON form. `null` and absent fields give `None`.
fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn first_non_empty(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| text_field(obj, key))
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> Option<StreamEvent> {
        Some(StreamEvent::Chunk { text: text.into() })
    }

    #[test]
    fn chunk_prefers_accumulated() {
        assert_eq!(
            interpret(r#"{"type":"chunk","content":" there","accumulated":"Hi there"}"#),
            chunk("Hi there")
        );
    }

    #[test]
    fn chunk_falls_back_to_content() {
        assert_eq!(
            interpret(r#"{"type":"chunk","content":"Hi","accumulated":""}"#),
            chunk("Hi")
        );
        assert_eq!(interpret(r#"{"type":"chunk"}"#), chunk(""));
    }

    #[test]
    fn image_prefers_data_url() {
        assert_eq!(
            interpret(r#"{"type":"image","url":"/img/1.png"}"#),
            Some(StreamEvent::Image {
                url: "/img/1.png".into()
            })
        );
        assert_eq!(
            interpret(r#"{"type":"image","url":"/img/1.png","data_url":"data:image/png;base64,AA"}"#),
            Some(StreamEvent::Image {
                url: "data:image/png;base64,AA".into()
            })
        );
        assert_eq!(interpret(r#"{"type":"image"}"#), None);
    }

    #[test]
    fn done_with_and_without_content() {
        assert_eq!(
            interpret(r#"{"type":"done","content":"final"}"#),
            Some(StreamEvent::Done {
                content: Some("final".into())
            })
        );
        assert_eq!(
            interpret(r#"{"type":"done","content":""}"#),
            Some(StreamEvent::Done { content: None })
        );
        assert_eq!(
            interpret(r#"{"type":"done"}"#),
            Some(StreamEvent::Done { content: None })
        );
    }

    #[test]
    fn error_uses_detail_verbatim() {
        assert_eq!(
            interpret(r#"{"type":"error","detail":"gemini fallback failed"}"#),
            Some(StreamEvent::Error {
                detail: "gemini fallback failed".into()
            })
        );
    }

    #[test]
    fn error_without_detail_serializes_event() {
        let event = interpret(r#"{"type":"error","code":503}"#).unwrap();
        let StreamEvent::Error { detail } = event else {
            panic!("expected error event");
        };
        let parsed: Value = serde_json::from_str(&detail).unwrap();
        assert_eq!(parsed["code"], 503);
        assert_eq!(parsed["type"], "error");
    }

    #[test]
    fn error_with_structured_detail() {
        let event = interpret(r#"{"type":"error","detail":{"reason":"quota"}}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Error {
                detail: r#"{"reason":"quota"}"#.into()
            }
        );
    }

    #[test]
    fn untyped_event_with_content_is_chunk() {
        assert_eq!(interpret(r#"{"content":"partial"}"#), chunk("partial"));
        assert_eq!(
            interpret(r#"{"type":"delta","content":"x","accumulated":"abc x"}"#),
            chunk("abc x")
        );
    }

    #[test]
    fn untyped_event_without_content_is_discarded() {
        assert_eq!(interpret(r#"{"error":"Message content is required."}"#), None);
        assert_eq!(interpret(r#"{"accumulated":"only this"}"#), None);
        assert_eq!(interpret(r#"{"content":""}"#), None);
        assert_eq!(interpret("{}"), None);
    }

    #[test]
    fn malformed_payload_becomes_raw_chunk() {
        assert_eq!(interpret("plain words"), chunk("plain words"));
        assert_eq!(interpret(r#"{"type":"chunk","acc"#), chunk(r#"{"type":"chunk","acc"#));
    }

    #[test]
    fn non_object_json_becomes_raw_chunk() {
        assert_eq!(interpret("42"), chunk("42"));
        assert_eq!(interpret(r#""quoted""#), chunk(r#""quoted""#));
    }

    #[test]
    fn numeric_content_rendered_as_text() {
        assert_eq!(interpret(r#"{"type":"chunk","accumulated":7}"#), chunk("7"));
    }

    #[test]
    fn terminal_events() {
        assert!(StreamEvent::Done { content: None }.is_terminal());
        assert!(StreamEvent::Error { detail: "x".into() }.is_terminal());
        assert!(!StreamEvent::Chunk { text: "x".into() }.is_terminal());
        assert!(!StreamEvent::Image { url: "x".into() }.is_terminal());
    }
}
