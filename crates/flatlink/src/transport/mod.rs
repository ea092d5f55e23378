// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport seam between the runtimes and the engine proxy.
//!
//! Service and client runtimes talk to [`Transport`] only. The production
//! backend ([`zmq::ZmqTransport`], behind the `zmq-transport` feature) wraps
//! a PUB/SUB socket pair dialed into the engine proxy; [`inproc::InprocHub`]
//! provides the same semantics over channels so the full request path can be
//! exercised in tests without a broker process.

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::config::{DEFAULT_ENGINE_HOST, ENGINE_HOST_ENV, ENGINE_XPUB_PORT, ENGINE_XSUB_PORT};

pub mod inproc;
#[cfg(feature = "zmq-transport")]
pub mod zmq;

/// One frame of a multipart message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw frame bytes.
    pub payload: Vec<u8>,
    /// Whether another frame of the same message follows.
    pub more: bool,
}

impl Frame {
    /// A frame with continuation frames behind it.
    #[must_use]
    pub fn part(payload: impl Into<Vec<u8>>) -> Self {
        Self { payload: payload.into(), more: true }
    }

    /// The final frame of a message.
    #[must_use]
    pub fn last(payload: impl Into<Vec<u8>>) -> Self {
        Self { payload: payload.into(), more: false }
    }
}

/// Failures reported by transport backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No frame arrived within the requested timeout.
    #[error("no message within timeout")]
    WouldBlock,

    /// The peer side of the transport is gone.
    #[error("transport closed")]
    Closed,

    /// Backend-specific failure, carried as text.
    #[error("{0}")]
    Backend(String),
}

/// A connected publish/subscribe link to the engine bus.
///
/// Implementations pair one outbound publishing channel with one inbound
/// subscribed channel, the topology every FlatLink peer uses. Methods take
/// `&self`; a link is owned by a single runtime and is `Send` so the service
/// worker can carry it onto its thread, but it is not required to be `Sync`.
pub trait Transport: Send {
    /// Publishes one frame. `more` marks a continuation, matching
    /// [`Frame::more`] on the receiving side.
    fn send_frame(&self, payload: &[u8], more: bool) -> Result<(), TransportError>;

    /// Receives the next frame, waiting at most `timeout` when given.
    /// Returns [`TransportError::WouldBlock`] once the timeout passes with
    /// nothing to read; `None` blocks until a frame or link failure.
    fn recv_frame(&self, timeout: Option<Duration>) -> Result<Frame, TransportError>;

    /// Adds a prefix filter to the inbound channel. The empty prefix matches
    /// every message.
    fn subscribe(&self, topic: &[u8]) -> Result<(), TransportError>;

    /// Withdraws interest in a prefix previously passed to `subscribe`, or
    /// suppresses it when the current filters would otherwise match it.
    fn unsubscribe(&self, topic: &[u8]) -> Result<(), TransportError>;

    /// Waits up to `timeout` for the inbound channel to become readable.
    fn poll_readable(&self, timeout: Duration) -> Result<bool, TransportError>;
}

/// Resolved dial strings for both sides of the engine proxy.
///
/// Publishers connect to the ingress (XSUB) endpoint, subscribers to the
/// egress (XPUB) endpoint. Ports are fixed by
/// [`crate::config::ENGINE_XSUB_PORT`] and [`crate::config::ENGINE_XPUB_PORT`];
/// only the host varies per bench.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineEndpoints {
    /// Proxy ingress, e.g. `tcp://127.0.0.1:2808`.
    pub xsub: String,
    /// Proxy egress, e.g. `tcp://127.0.0.1:2809`.
    pub xpub: String,
}

impl EngineEndpoints {
    /// Endpoints for an engine proxy on `host`.
    #[must_use]
    pub fn for_host(host: &str) -> Self {
        Self {
            xsub: format!("tcp://{host}:{ENGINE_XSUB_PORT}"),
            xpub: format!("tcp://{host}:{ENGINE_XPUB_PORT}"),
        }
    }

    /// Endpoints from the `FLATLINK_ENGINE_HOST` environment variable,
    /// falling back to the loopback default.
    #[must_use]
    pub fn from_env() -> Self {
        match env::var(ENGINE_HOST_ENV) {
            Ok(host) if !host.is_empty() => Self::for_host(&host),
            _ => Self::default(),
        }
    }
}

impl Default for EngineEndpoints {
    fn default() -> Self {
        Self::for_host(DEFAULT_ENGINE_HOST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_carry_fixed_ports() {
        let endpoints = EngineEndpoints::for_host("10.1.2.3");
        assert_eq!(endpoints.xsub, "tcp://10.1.2.3:2808");
        assert_eq!(endpoints.xpub, "tcp://10.1.2.3:2809");
    }

    #[test]
    fn default_is_loopback() {
        assert_eq!(EngineEndpoints::default(), EngineEndpoints::for_host("127.0.0.1"));
    }

    #[test]
    fn frame_helpers_set_more_flag() {
        assert!(Frame::part(b"topic".as_slice()).more);
        assert!(!Frame::last(b"payload".as_slice()).more);
    }
}
