// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client runtime: publishes requests into the bus and gathers whatever
//! responses arrive within a fixed window.
//!
//! The bus has no reply channel, responses are ordinary publications the
//! client happens to be subscribed to. A client therefore subscribes to
//! everything, suppresses only the discover topic (so it never consumes
//! broadcasts meant for services), and treats "the window elapsed" as the
//! only notion of completion. Zero responses is a normal outcome.

use std::time::{Duration, Instant};

#[cfg(feature = "zmq-transport")]
use crate::config::SUBSCRIPTION_SETTLE_DELAY;
use crate::config::{DISCOVER_TOPIC, RESPONSE_WINDOW};
use crate::error::Result;
use crate::protocol::{codec, Command, WireProtocol};
use crate::transport::{Transport, TransportError};
#[cfg(feature = "zmq-transport")]
use crate::transport::{zmq::ZmqTransport, EngineEndpoints};

/// A requester on the bus. One instance per thread of control; the send and
/// receive calls take `&self` but the underlying link is not shared.
pub struct Client {
    transport: Box<dyn Transport>,
}

impl Client {
    /// Dials the engine proxy at `endpoints` over ZeroMQ.
    #[cfg(feature = "zmq-transport")]
    pub fn connect(endpoints: &EngineEndpoints) -> Result<Self> {
        let transport = ZmqTransport::connect(endpoints, Some(SUBSCRIPTION_SETTLE_DELAY))?;
        Self::with_transport(Box::new(transport))
    }

    /// Wraps an already connected transport, typically an in-process link in
    /// tests.
    pub fn with_transport(transport: Box<dyn Transport>) -> Result<Self> {
        transport.subscribe(b"")?;
        transport.unsubscribe(DISCOVER_TOPIC)?;
        log::debug!("[CLIENT] connected, rx filters: everything except 'disc'");
        Ok(Self { transport })
    }

    /// Publishes a command request to `service` as a three-frame message:
    /// topic, header, JSON payload. Returns `false` when encoding or any
    /// frame send fails; a `true` only means the request left this process.
    pub fn send_command(&self, service: &str, request: &Command) -> bool {
        let payload = match codec::encode_command(request) {
            Ok(payload) => payload,
            Err(err) => {
                log::error!("[CLIENT] failed to encode command '{}': {err}", request.name);
                return false;
            }
        };
        log::debug!("[CLIENT] sending command '{}' to '{service}'", request.name);
        let header = codec::command_header_bytes(WireProtocol::Json);
        self.send_parts(&[
            ("topic", service.as_bytes(), true),
            ("header", &header, true),
            ("payload", &payload, false),
        ])
    }

    /// Publishes a discover broadcast as a two-frame message: the discover
    /// topic and the version header.
    pub fn send_discover(&self) -> bool {
        log::debug!("[CLIENT] sending discover broadcast");
        let header = codec::discover_header_bytes();
        self.send_parts(&[("topic", DISCOVER_TOPIC, true), ("header", &header, false)])
    }

    /// Sends `(what, payload, more)` frames in order, logging which frame
    /// failed when one does.
    fn send_parts(&self, parts: &[(&str, &[u8], bool)]) -> bool {
        for (what, payload, more) in parts {
            if let Err(err) = self.transport.send_frame(payload, *more) {
                log::error!("[CLIENT] failed to send {what} frame: {err}");
                return false;
            }
        }
        true
    }

    /// Collects response frames until `window` elapses.
    ///
    /// Arrivals inside the window are drained immediately and do not extend
    /// it; the call returns as soon as the deadline passes. A receive error
    /// mid-drain loses that frame only, but a failed poll aborts the wait,
    /// since without a working poll the deadline cannot be honored.
    pub fn collect_responses(&self, window: Duration) -> Result<Vec<Vec<u8>>> {
        let deadline = Instant::now() + window;
        let mut responses = Vec::new();
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(responses);
            }
            match self.transport.poll_readable(deadline - now) {
                Ok(true) => self.drain_available(&mut responses)?,
                Ok(false) => return Ok(responses),
                Err(err) => {
                    log::error!("[CLIENT] poll failed: {err}");
                    return Err(err.into());
                }
            }
        }
    }

    /// Pulls every frame that is ready right now into `responses`.
    fn drain_available(&self, responses: &mut Vec<Vec<u8>>) -> Result<()> {
        loop {
            match self.transport.poll_readable(Duration::ZERO) {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(err) => {
                    log::error!("[CLIENT] poll failed: {err}");
                    return Err(err.into());
                }
            }
            match self.transport.recv_frame(Some(Duration::ZERO)) {
                Ok(frame) => responses.push(frame.payload),
                Err(TransportError::WouldBlock) => return Ok(()),
                Err(err) => {
                    log::error!("[CLIENT] failed to receive response: {err}");
                    return Ok(());
                }
            }
        }
    }

    /// Listens for [`RESPONSE_WINDOW`] and logs every response, pretty
    /// printed when it parses as JSON and verbatim otherwise. Returns
    /// whether anything arrived.
    pub fn recv_and_log_responses(&self) -> bool {
        let responses = match self.collect_responses(RESPONSE_WINDOW) {
            Ok(responses) => responses,
            Err(_) => return false,
        };
        for payload in &responses {
            match serde_json::from_slice::<serde_json::Value>(payload) {
                Ok(value) => log::info!("[CLIENT] response:\n{value:#}"),
                Err(_) => {
                    log::info!("[CLIENT] response: {}", String::from_utf8_lossy(payload));
                }
            }
        }
        !responses.is_empty()
    }
}
