//! Wire dialect: JSON-RPC 2.0 with a streaming extension, framed as
//! newline-delimited JSON over plain TCP.
//!
//! Grounded on the reference `embed_server.py`'s `handle_client` loop
//! (the `jsonrpc` field check, the method-not-found/exception error
//! mapping, the `{"streaming": [...]}` sentinel triggering multi-frame
//! replies with a trailing `more` flag) and its front/daemon reverse
//! `progress`/`init_completed`/`init_error`/`ack` side-channel, adapted
//! from WebSocket framing to a line-oriented TCP stream.

pub mod dispatcher;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use twilog_common::errors::RpcErrorObject;

pub const PROTOCOL_VERSION: &str = "2.0";

/// An incoming request frame, parsed loosely so the dispatcher can reject a
/// malformed `jsonrpc` field itself rather than failing to deserialize.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// A reply frame. `more` is present only for streaming replies (always
/// `Some`, even for a single chunk); absent entirely for ordinary replies.
#[derive(Debug, Serialize)]
pub struct RpcReply {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub more: Option<bool>,
}

impl RpcReply {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: PROTOCOL_VERSION,
            id,
            result: Some(result),
            error: None,
            more: None,
        }
    }

    pub fn ok_chunk(id: Value, result: Value, more: bool) -> Self {
        Self {
            jsonrpc: PROTOCOL_VERSION,
            id,
            result: Some(result),
            error: None,
            more: Some(more),
        }
    }

    pub fn err(id: Value, error: RpcErrorObject) -> Self {
        Self {
            jsonrpc: PROTOCOL_VERSION,
            id,
            result: None,
            error: Some(error),
            more: None,
        }
    }
}

/// Reverse-direction frame the daemon pushes to the front process before
/// (and, for `progress`, during) initialisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressFrame {
    Progress { message: String },
    InitCompleted,
    InitError { error: String },
    Ack,
}

/// Line-buffered writer: one JSON value, newline-terminated, per `send`.
pub struct FrameWriter {
    inner: BufWriter<OwnedWriteHalf>,
}

impl FrameWriter {
    pub fn new(half: OwnedWriteHalf) -> Self {
        Self {
            inner: BufWriter::new(half),
        }
    }

    pub async fn send(&mut self, value: &impl Serialize) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(value).expect("rpc frame always serializes");
        line.push(b'\n');
        self.inner.write_all(&line).await?;
        self.inner.flush().await
    }
}

/// Line-buffered reader: one JSON value per line.
pub struct FrameReader {
    inner: BufReader<OwnedReadHalf>,
}

impl FrameReader {
    pub fn new(half: OwnedReadHalf) -> Self {
        Self {
            inner: BufReader::new(half),
        }
    }

    /// Reads the next line. `Ok(None)` on clean EOF (peer closed).
    pub async fn recv_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        let n = self.inner.read_line(&mut line).await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// `-32600`: the `jsonrpc` field is missing or not `"2.0"`.
pub fn invalid_request_error(id: Value) -> RpcReply {
    RpcReply::err(
        id,
        RpcErrorObject {
            code: -32600,
            message: "Invalid Request: jsonrpc must be \"2.0\"".to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_reply_has_no_more_field() {
        let reply = RpcReply::ok(Value::from(1), serde_json::json!({"a": 1}));
        let encoded = serde_json::to_value(&reply).unwrap();
        assert!(encoded.get("more").is_none());
    }

    #[test]
    fn chunk_reply_always_carries_more() {
        let reply = RpcReply::ok_chunk(Value::from(1), serde_json::json!([]), false);
        let encoded = serde_json::to_value(&reply).unwrap();
        assert_eq!(encoded.get("more"), Some(&Value::Bool(false)));
    }

    #[test]
    fn request_with_missing_jsonrpc_field_defaults_to_none() {
        let req: RpcRequest = serde_json::from_str(r#"{"id":1,"method":"get_status","params":{}}"#).unwrap();
        assert_eq!(req.jsonrpc, None);
    }
}
