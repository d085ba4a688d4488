// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - DDP Wire Codec
 * Double-encoded JSON array framing with SockJS frame letters
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde_json::Value;

use super::message::Message;
use crate::errors::{DdpError, DdpResult};

/// A decoded inbound websocket text frame
#[derive(Debug)]
pub enum Frame {
    /// SockJS `o`
    Open,
    /// SockJS `h`
    Heartbeat,
    /// SockJS `c[code,"reason"]`
    Close { code: u16, reason: String },
    /// Zero or more messages; each one decodes independently
    Messages(Vec<DdpResult<Message>>),
}

/// Encode a message as `["<json of message>"]`, the form Meteor accepts.
pub fn encode(message: &Message) -> DdpResult<String> {
    let inner = serde_json::to_string(message)?;
    Ok(serde_json::to_string(&[inner])?)
}

/// Decode a frame that must carry exactly one message.
pub fn decode(text: &str) -> DdpResult<Message> {
    match decode_frame(text)? {
        Frame::Messages(mut messages) if messages.len() == 1 => messages.remove(0),
        Frame::Messages(messages) => Err(DdpError::Codec(format!(
            "expected exactly one message, frame carried {}",
            messages.len()
        ))),
        other => Err(DdpError::Codec(format!("frame carries no message: {:?}", other))),
    }
}

/// Decode a websocket text frame, stripping any SockJS frame letter.
pub fn decode_frame(text: &str) -> DdpResult<Frame> {
    let (letter, body) = match text.chars().next() {
        Some(c) if c.is_ascii_lowercase() => (Some(c), &text[1..]),
        _ => (None, text),
    };

    match letter {
        Some('o') => return Ok(Frame::Open),
        Some('h') => return Ok(Frame::Heartbeat),
        Some('c') => return decode_close(body),
        _ => {}
    }

    if body.trim().is_empty() {
        return Ok(Frame::Messages(Vec::new()));
    }

    let value: Value = serde_json::from_str(body)?;
    let messages = match value {
        Value::Array(items) => items.into_iter().map(decode_item).collect(),
        Value::String(inner) => vec![parse_inner(&inner)],
        object @ Value::Object(_) => vec![serde_json::from_value(object).map_err(DdpError::from)],
        other => {
            return Err(DdpError::Codec(format!(
                "unexpected frame payload: {}",
                other
            )))
        }
    };

    Ok(Frame::Messages(messages))
}

fn decode_item(item: Value) -> DdpResult<Message> {
    match item {
        Value::String(inner) => parse_inner(&inner),
        object @ Value::Object(_) => Ok(serde_json::from_value(object)?),
        other => Err(DdpError::Codec(format!("unexpected array entry: {}", other))),
    }
}

fn parse_inner(inner: &str) -> DdpResult<Message> {
    Ok(serde_json::from_str(inner)?)
}

fn decode_close(body: &str) -> DdpResult<Frame> {
    let value: Value = serde_json::from_str(body)?;
    let code = value
        .get(0)
        .and_then(Value::as_u64)
        .and_then(|c| u16::try_from(c).ok())
        .unwrap_or(0);
    let reason = value
        .get(1)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok(Frame::Close { code, reason })
}
