// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Data model of the FlatLink wire protocol.
//!
//! Everything in this module is plain data: header structs mirroring the raw
//! bytes, and serde-derived shapes mirroring the JSON payloads. Parsing of
//! whole multipart messages lives in [`crate::protocol::codec`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ===== Payload protocols =====

/// Payload encodings a peer can announce. Values are single bits so a set of
/// them packs into the `compatible_protocols` mask of a service description.
///
/// Only [`WireProtocol::Json`] is implemented today; the other codes are
/// reserved on the wire and rejected by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireProtocol {
    /// Raw application-defined bytes.
    Binary = 0x01,
    /// UTF-8 JSON, the only encoding the codec accepts.
    Json = 0x02,
    /// Protocol Buffers framing.
    Protobuf = 0x04,
}

impl WireProtocol {
    /// The byte this protocol is identified by in command headers.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Human-readable name for a *single-bit* protocol mask, used when
    /// serializing `compatible_protocols`. Multi-bit or empty masks come out
    /// as `"Unknown"`.
    #[must_use]
    pub fn mask_name(mask: u8) -> &'static str {
        match mask {
            0x01 => "binary",
            0x02 => "JSON",
            0x04 => "protobuf",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for WireProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::mask_name(self.code()))
    }
}

impl TryFrom<u8> for WireProtocol {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0x01 => Ok(Self::Binary),
            0x02 => Ok(Self::Json),
            0x04 => Ok(Self::Protobuf),
            other => Err(other),
        }
    }
}

// ===== Raw headers =====

/// Parsed form of the one-byte discover header frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoverHeader {
    /// Protocol version the requesting client speaks.
    pub version: u8,
}

/// Parsed form of the two-byte command header frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    /// Protocol version the sending client speaks.
    pub version: u8,
    /// Encoding of the payload frame that follows.
    pub protocol: WireProtocol,
}

// ===== Command schema =====

/// Primitive types a command argument can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgType {
    #[serde(rename = "i8")]
    I8,
    #[serde(rename = "u8")]
    U8,
    #[serde(rename = "i16")]
    I16,
    #[serde(rename = "u16")]
    U16,
    #[serde(rename = "i32")]
    I32,
    #[serde(rename = "u32")]
    U32,
    #[serde(rename = "i64")]
    I64,
    #[serde(rename = "u64")]
    U64,
    #[serde(rename = "string")]
    Str,
    #[serde(rename = "blob")]
    Blob,
}

impl ArgType {
    /// Wire name of the type, as it appears in discovery responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::Str => "string",
            Self::Blob => "blob",
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArgType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "i8" => Ok(Self::I8),
            "u8" => Ok(Self::U8),
            "i16" => Ok(Self::I16),
            "u16" => Ok(Self::U16),
            "i32" => Ok(Self::I32),
            "u32" => Ok(Self::U32),
            "i64" => Ok(Self::I64),
            "u64" => Ok(Self::U64),
            "string" => Ok(Self::Str),
            "blob" => Ok(Self::Blob),
            other => Err(format!("unknown argument type '{other}'")),
        }
    }
}

/// Declared shape of one command argument, as published in discovery
/// responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSpec {
    /// Argument name callers use in requests.
    pub name: String,
    /// Declared primitive type of the value.
    #[serde(rename = "type")]
    pub ty: ArgType,
    /// Whether a request may omit this argument.
    pub optional: bool,
}

impl ArgSpec {
    /// Declares an argument a request must supply.
    #[must_use]
    pub fn required(name: &str, ty: ArgType) -> Self {
        Self { name: name.to_string(), ty, optional: false }
    }

    /// Declares an argument a request may omit.
    #[must_use]
    pub fn optional(name: &str, ty: ArgType) -> Self {
        Self { name: name.to_string(), ty, optional: true }
    }
}

// ===== Command payloads =====

/// One name/value pair inside a command request. Values travel as strings
/// regardless of the declared [`ArgType`]; handlers parse them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgValue {
    pub name: String,
    pub value: String,
}

impl ArgValue {
    #[must_use]
    pub fn new(name: &str, value: &str) -> Self {
        Self { name: name.to_string(), value: value.to_string() }
    }
}

/// A command request as carried in the JSON payload frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Name of the command to invoke.
    #[serde(rename = "command")]
    pub name: String,
    /// Arguments in the order the caller supplied them.
    #[serde(default)]
    pub args: Vec<ArgValue>,
}

impl Command {
    /// Builds a request with no arguments.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), args: Vec::new() }
    }

    /// Adds one argument, consuming and returning `self` for chaining.
    #[must_use]
    pub fn arg(mut self, name: &str, value: &str) -> Self {
        self.args.push(ArgValue::new(name, value));
        self
    }

    /// Looks up an argument value by name. First occurrence wins.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.args.iter().find(|a| a.name == name).map(|a| a.value.as_str())
    }
}

// ===== Service identity and discovery =====

/// Static identity a service is constructed with.
#[derive(Debug, Clone)]
pub struct ServiceDescription {
    /// Bus-wide unique name, also the topic commands are addressed to.
    pub name: String,
    /// Free-form version string, echoed in discovery responses.
    pub version: String,
    /// Bitmask of [`WireProtocol`] codes the service claims to accept.
    pub compatible_protocols: u8,
    /// Encoding the service prefers for future response payloads.
    pub preferred_protocol: WireProtocol,
}

impl ServiceDescription {
    /// A JSON-only description, the common case for bench services.
    #[must_use]
    pub fn json_only(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            compatible_protocols: WireProtocol::Json.code(),
            preferred_protocol: WireProtocol::Json,
        }
    }
}

/// One command entry inside a discovery response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDescription {
    pub name: String,
    pub args: Vec<ArgSpec>,
}

/// Discovery response payload: everything a client needs to address a
/// service and build well-formed requests against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAnnouncement {
    pub name: String,
    pub version: String,
    /// Name of the protocol mask, `"Unknown"` when the mask holds more than
    /// one bit (exact member list is lost on the wire, a known limitation).
    pub compatible_protocols: String,
    pub commands: Vec<CommandDescription>,
}
