use thiserror::Error;

/// The request could not be made, or the body could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request failed with status {status}")]
    RequestFailed { status: u16 },
    #[error("network error: {0}")]
    Network(String),
    #[error("response has no body")]
    MissingBody,
}

/// One event line that could not be decoded. Never fatal to the stream.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown event type `{0}`")]
    UnknownType(String),
    #[error("`{kind}` event is missing its `{field}` field")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
}
