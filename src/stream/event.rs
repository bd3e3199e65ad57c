use serde::Deserialize;

use super::error::ProtocolError;
use crate::types::Source;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";

/// An incremental update to the answer being streamed.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Sources(Vec<Source>),
    /// Text to append. Carries both the `chunk` (owner endpoint) and `answer` (public endpoint) tags.
    Chunk(String),
    Error(String),
    Done,
}

/// What a single line of the body turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Event(StreamEvent),
    /// The bare `[DONE]` payload.
    Terminator,
    /// Blank keep-alives, comments and anything without the data prefix.
    Ignored,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    sources: Option<Vec<Source>>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl TryFrom<RawEvent> for StreamEvent {
    type Error = ProtocolError;

    fn try_from(raw: RawEvent) -> Result<Self, ProtocolError> {
        match raw.kind.as_str() {
            "sources" => raw
                .sources
                .map(StreamEvent::Sources)
                .ok_or(ProtocolError::MissingField {
                    kind: "sources",
                    field: "sources",
                }),
            "chunk" => raw.content.map(StreamEvent::Chunk).ok_or(ProtocolError::MissingField {
                kind: "chunk",
                field: "content",
            }),
            "answer" => raw.content.map(StreamEvent::Chunk).ok_or(ProtocolError::MissingField {
                kind: "answer",
                field: "content",
            }),
            // the public endpoint reports errors under `content`
            "error" => raw
                .message
                .or(raw.content)
                .map(StreamEvent::Error)
                .ok_or(ProtocolError::MissingField {
                    kind: "error",
                    field: "message",
                }),
            "done" => Ok(StreamEvent::Done),
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }
}

/// Decodes one complete line of an event stream.
pub fn decode_line(line: &str) -> Result<Line, ProtocolError> {
    let line = line.strip_suffix('\r').unwrap_or(line);

    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(Line::Ignored);
    };

    if payload.trim() == DONE_SENTINEL {
        return Ok(Line::Terminator);
    }

    let raw: RawEvent = serde_json::from_str(payload)?;
    StreamEvent::try_from(raw).map(Line::Event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_every_event_kind() {
        assert_eq!(
            decode_line(r#"data: {"type":"sources","sources":[{"score":0.8,"content":"doc A"}]}"#)
                .unwrap(),
            Line::Event(StreamEvent::Sources(vec![Source {
                score: 0.8,
                content: "doc A".to_string(),
            }]))
        );
        assert_eq!(
            decode_line(r#"data: {"type":"chunk","content":"Hel"}"#).unwrap(),
            Line::Event(StreamEvent::Chunk("Hel".to_string()))
        );
        assert_eq!(
            decode_line(r#"data: {"type":"answer","content":"lo"}"#).unwrap(),
            Line::Event(StreamEvent::Chunk("lo".to_string()))
        );
        assert_eq!(
            decode_line(r#"data: {"type":"done"}"#).unwrap(),
            Line::Event(StreamEvent::Done)
        );
    }

    #[test]
    fn error_message_comes_from_either_field() {
        assert_eq!(
            decode_line(r#"data: {"type":"error","message":"boom"}"#).unwrap(),
            Line::Event(StreamEvent::Error("boom".to_string()))
        );
        assert_eq!(
            decode_line(r#"data: {"type":"error","content":"quota exceeded"}"#).unwrap(),
            Line::Event(StreamEvent::Error("quota exceeded".to_string()))
        );
    }

    #[test]
    fn non_data_lines_are_ignored() {
        assert_eq!(decode_line("").unwrap(), Line::Ignored);
        assert_eq!(decode_line(": keep-alive").unwrap(), Line::Ignored);
        assert_eq!(decode_line("event: message").unwrap(), Line::Ignored);
        assert_eq!(decode_line("data:{\"type\":\"done\"}").unwrap(), Line::Ignored);
    }

    #[test]
    fn done_sentinel_is_not_json() {
        assert_eq!(decode_line("data: [DONE]").unwrap(), Line::Terminator);
        assert_eq!(decode_line("data: [DONE]\r").unwrap(), Line::Terminator);
    }

    #[test]
    fn carriage_returns_are_stripped() {
        assert_eq!(
            decode_line("data: {\"type\":\"chunk\",\"content\":\"x\"}\r").unwrap(),
            Line::Event(StreamEvent::Chunk("x".to_string()))
        );
    }

    #[test]
    fn rejects_truncated_unknown_and_incomplete_payloads() {
        assert!(matches!(
            decode_line(r#"data: {"type":"chunk","cont"#),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            decode_line(r#"data: {"type":"status","content":"searching"}"#),
            Err(ProtocolError::UnknownType(kind)) if kind == "status"
        ));
        assert!(matches!(
            decode_line(r#"data: {"type":"chunk"}"#),
            Err(ProtocolError::MissingField { kind: "chunk", field: "content" })
        ));
    }
}
