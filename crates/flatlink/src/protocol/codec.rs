// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Framing and parsing of bus messages.
//!
//! Decoding is total: every malformed input maps to a [`DecodeError`]
//! variant, including protocol codes this crate has never heard of. The
//! functions here never touch a socket; callers hand in the topic frame and
//! the continuation frames they already pulled off the transport.
//!
//! Wire layout, all multipart:
//!
//! | message            | frames                                             |
//! |--------------------|----------------------------------------------------|
//! | command request    | topic = service name, `[version, protocol]`, JSON  |
//! | discover request   | topic = `disc`, `[version]`                        |
//! | discovery response | single JSON frame, no topic                        |
//!
//! Responses carry no topic frame on purpose: subscribers match on payload
//! prefix, and a leading topic would mean every client sees its own filter
//! echoed back.

use thiserror::Error;

use crate::config::{DISCOVER_TOPIC, PROTOCOL_VERSION};
use crate::protocol::types::{
    Command, CommandDescription, CommandHeader, DiscoverHeader, ServiceAnnouncement,
    ServiceDescription, WireProtocol,
};
use crate::transport::Frame;

/// A successfully decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// A command addressed to this service.
    Command(Command),
    /// A bus-wide discover broadcast.
    Discover(DiscoverHeader),
}

/// Why an inbound message could not be decoded. These are per-message
/// conditions; runtimes log them and move on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Topic frame is shorter than any topic this service listens on.
    #[error("topic frame too short ({0} bytes)")]
    TooShort(usize),

    /// The multipart message ended before the expected frame arrived.
    #[error("multipart message truncated before {0} frame")]
    TooFewFrames(&'static str),

    /// A header frame had the wrong byte count.
    #[error("malformed {what} header ({len} bytes)")]
    BadHeaderLength { what: &'static str, len: usize },

    /// The protocol code is defined but this crate does not speak it.
    #[error("{0} payloads are not implemented")]
    UnimplementedProtocol(WireProtocol),

    /// The protocol code matches nothing in the registry.
    #[error("unknown protocol code {0:#04x}")]
    UnknownProtocol(u8),

    /// The payload frame is not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    MalformedPayload(String),

    /// The payload parsed as JSON but lacks the required shape.
    #[error("payload missing required fields: {0}")]
    MissingField(String),
}

/// Classifies and parses one inbound multipart message.
///
/// `topic` is the first frame; `rest` holds every continuation frame in
/// order. `service_name` decides which topics count as command requests,
/// the transport subscription should already be filtering to exactly that
/// name plus the discover topic.
pub fn decode_request(
    service_name: &str,
    topic: &[u8],
    rest: &[Frame],
) -> Result<Request, DecodeError> {
    let shortest = DISCOVER_TOPIC.len().min(service_name.len());
    if topic.len() < shortest {
        return Err(DecodeError::TooShort(topic.len()));
    }
    if topic.len() == DISCOVER_TOPIC.len() && topic == DISCOVER_TOPIC {
        return decode_discover(rest);
    }
    // Anything else made it through the subscription filter as a command.
    decode_command(rest)
}

fn decode_discover(rest: &[Frame]) -> Result<Request, DecodeError> {
    let header = rest.first().ok_or(DecodeError::TooFewFrames("discover header"))?;
    if header.payload.len() != 1 {
        return Err(DecodeError::BadHeaderLength { what: "discover", len: header.payload.len() });
    }
    Ok(Request::Discover(DiscoverHeader { version: header.payload[0] }))
}

fn decode_command(rest: &[Frame]) -> Result<Request, DecodeError> {
    let header = parse_command_header(rest)?;
    let payload = rest.get(1).ok_or(DecodeError::TooFewFrames("command payload"))?;
    match header.protocol {
        WireProtocol::Json => decode_json_command(&payload.payload).map(Request::Command),
        other => Err(DecodeError::UnimplementedProtocol(other)),
    }
}

fn parse_command_header(rest: &[Frame]) -> Result<CommandHeader, DecodeError> {
    let header = rest.first().ok_or(DecodeError::TooFewFrames("command header"))?;
    if header.payload.len() != 2 {
        return Err(DecodeError::BadHeaderLength { what: "command", len: header.payload.len() });
    }
    let protocol =
        WireProtocol::try_from(header.payload[1]).map_err(DecodeError::UnknownProtocol)?;
    Ok(CommandHeader { version: header.payload[0], protocol })
}

/// Parses a JSON command payload into its typed form.
///
/// Parse failure and shape failure are reported separately so a log line can
/// tell corrupt bytes from a peer speaking a different schema.
pub fn decode_json_command(payload: &[u8]) -> Result<Command, DecodeError> {
    let value: serde_json::Value = serde_json::from_slice(payload)
        .map_err(|err| DecodeError::MalformedPayload(err.to_string()))?;
    serde_json::from_value(value).map_err(|err| DecodeError::MissingField(err.to_string()))
}

// ===== Encoding =====

/// Header frame bytes for a command request using `protocol` payloads.
#[must_use]
pub fn command_header_bytes(protocol: WireProtocol) -> [u8; 2] {
    [PROTOCOL_VERSION, protocol.code()]
}

/// Header frame bytes for a discover request.
#[must_use]
pub fn discover_header_bytes() -> [u8; 1] {
    [PROTOCOL_VERSION]
}

/// Serializes a command request payload.
pub fn encode_command(command: &Command) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(command)
}

/// Serializes a discovery response payload for `desc` advertising `commands`.
pub fn encode_announcement(
    desc: &ServiceDescription,
    commands: Vec<CommandDescription>,
) -> Result<Vec<u8>, serde_json::Error> {
    let announcement = ServiceAnnouncement {
        name: desc.name.clone(),
        version: desc.version.clone(),
        compatible_protocols: WireProtocol::mask_name(desc.compatible_protocols).to_string(),
        commands,
    };
    serde_json::to_vec(&announcement)
}
