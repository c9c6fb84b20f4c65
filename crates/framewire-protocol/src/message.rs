use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use framewire_codec::{Message, MessageKind};
use framewire_source::{FrameError, ResultBody};
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// Acknowledgement status for `result` and `execute`.
pub const STATUS_SUCCESS: &str = "success";

/// Error tag the server uses right before it drops a session.
pub const PROTOCOL_ERROR_TAG: &str = "protocol";

/// The four request types a server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Metadata,
    Frame,
    Result,
    Execute,
}

impl RequestType {
    pub const ALL: [RequestType; 4] = [
        RequestType::Metadata,
        RequestType::Frame,
        RequestType::Result,
        RequestType::Execute,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RequestType::Metadata => "metadata",
            RequestType::Frame => "frame",
            RequestType::Result => "result",
            RequestType::Execute => "execute",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        RequestType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownRequest(s.to_string()))
    }
}

/// A request as it travels on the wire: `{"request": <tag>, "body": {...}}`.
///
/// The tag stays a plain string so a server can tell an unknown request
/// type from a malformed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub request: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ResultBody>,
}

impl Request {
    pub fn new(kind: RequestType, body: Option<ResultBody>) -> Self {
        Self {
            request: kind.as_str().to_string(),
            body,
        }
    }

    pub fn metadata() -> Self {
        Self::new(RequestType::Metadata, None)
    }

    pub fn frame() -> Self {
        Self::new(RequestType::Frame, None)
    }

    pub fn result(body: ResultBody) -> Self {
        Self::new(RequestType::Result, Some(body))
    }

    pub fn execute(action: &str) -> Self {
        let mut body = ResultBody::new();
        body.insert("action".to_string(), action.into());
        Self::new(RequestType::Execute, Some(body))
    }

    /// The request type, if the tag is one this crate knows.
    pub fn kind(&self) -> Result<RequestType> {
        self.request.parse()
    }

    pub fn to_message(&self) -> Result<Message> {
        Ok(Message::json(serde_json::to_vec(self)?))
    }

    pub fn from_message(message: &Message) -> Result<Self> {
        if message.kind != MessageKind::Json {
            return Err(ProtocolError::MalformedRequest(
                "requests must be JSON messages".to_string(),
            ));
        }
        serde_json::from_slice(&message.payload)
            .map_err(|err| ProtocolError::MalformedRequest(err.to_string()))
    }
}

/// Body of an `execute` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteBody {
    pub action: String,
}

/// `{"status": "success"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub status: String,
}

impl Ack {
    pub fn success() -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
        }
    }
}

/// `{"error": <tag>, "message": <text>}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

impl ErrorReply {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self {
            error: PROTOCOL_ERROR_TAG.to_string(),
            message: message.into(),
        }
    }

    /// Rebuild the error on the client side.
    ///
    /// A protocol error means the server dropped the session, so it comes
    /// back as a fault.
    pub fn into_frame_error(self) -> FrameError {
        if self.error == PROTOCOL_ERROR_TAG {
            return FrameError::Faulted(format!("server closed session: {}", self.message));
        }
        let detail = (!self.message.is_empty()).then_some(self.message.as_str());
        FrameError::from_wire(&self.error, detail)
    }
}

impl From<&FrameError> for ErrorReply {
    fn from(err: &FrameError) -> Self {
        Self {
            error: err.tag().to_string(),
            message: err.detail().map_or_else(|| err.to_string(), str::to_string),
        }
    }
}

/// What a handler answers with.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Json(serde_json::Value),
    Binary(Bytes),
}

impl Reply {
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Reply::Json(serde_json::to_value(value)?))
    }

    pub fn ack() -> Self {
        Reply::Json(serde_json::json!({ "status": STATUS_SUCCESS }))
    }

    pub fn error(reply: &ErrorReply) -> Result<Self> {
        Self::json(reply)
    }

    pub fn into_message(self) -> Result<Message> {
        Ok(match self {
            Reply::Json(value) => Message::json(serde_json::to_vec(&value)?),
            Reply::Binary(data) => Message::binary(data),
        })
    }

    /// Interpret a message received by a client.
    ///
    /// JSON error replies become `Err`, with the server's error rebuilt.
    pub fn from_message(message: Message) -> std::result::Result<Self, FrameError> {
        match message.kind {
            MessageKind::Binary => Ok(Reply::Binary(message.payload)),
            MessageKind::Json => {
                let value: serde_json::Value = serde_json::from_slice(&message.payload)
                    .map_err(|err| FrameError::Faulted(format!("unreadable reply: {err}")))?;
                if value.get("error").is_some() {
                    let reply: ErrorReply = serde_json::from_value(value)
                        .map_err(|err| FrameError::Faulted(format!("unreadable error reply: {err}")))?;
                    return Err(reply.into_frame_error());
                }
                Ok(Reply::Json(value))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_shape() {
        let value = serde_json::to_value(Request::metadata()).unwrap();
        assert_eq!(value, json!({"request": "metadata"}));

        let value = serde_json::to_value(Request::execute("reset")).unwrap();
        assert_eq!(value, json!({"request": "execute", "body": {"action": "reset"}}));
    }

    #[test]
    fn unknown_tag_parses_as_request_but_not_as_kind() {
        let message = Message::json(&br#"{"request":"teleport"}"#[..]);
        let request = Request::from_message(&message).unwrap();
        assert!(matches!(request.kind(), Err(ProtocolError::UnknownRequest(tag)) if tag == "teleport"));
    }

    #[test]
    fn binary_request_is_malformed() {
        let message = Message::binary(vec![1u8, 2, 3]);
        assert!(matches!(
            Request::from_message(&message),
            Err(ProtocolError::MalformedRequest(_))
        ));
    }

    #[test]
    fn error_reply_rebuilds_frame_error() {
        let reply = ErrorReply::from(&FrameError::UnsupportedAction("zoom".into()));
        assert_eq!(reply.error, "unsupportedAction");
        assert_eq!(reply.message, "zoom");

        let message = Reply::error(&reply).unwrap().into_message().unwrap();
        let err = Reply::from_message(message).unwrap_err();
        assert_eq!(err, FrameError::UnsupportedAction("zoom".into()));
    }

    #[test]
    fn protocol_error_reply_is_a_fault() {
        let err = ErrorReply::protocol("unknown request type").into_frame_error();
        assert!(matches!(err, FrameError::Faulted(msg) if msg.contains("unknown request type")));
    }

    #[test]
    fn ack_shape() {
        let message = Reply::ack().into_message().unwrap();
        let ack: Ack = serde_json::from_slice(&message.payload).unwrap();
        assert_eq!(ack, Ack::success());
    }
}
