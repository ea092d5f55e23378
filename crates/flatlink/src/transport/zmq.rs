// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ZeroMQ transport backend.
//!
//! One PUB socket dialed into the proxy ingress, one SUB socket dialed into
//! the proxy egress. Subscription filtering runs engine-side on the XPUB
//! socket, so `subscribe`/`unsubscribe` map straight onto socket options.

use std::thread;
use std::time::Duration;

use crate::transport::{EngineEndpoints, Frame, Transport, TransportError};

impl From<zmq::Error> for TransportError {
    fn from(err: zmq::Error) -> Self {
        match err {
            zmq::Error::EAGAIN => TransportError::WouldBlock,
            zmq::Error::ETERM => TransportError::Closed,
            other => TransportError::Backend(other.to_string()),
        }
    }
}

/// PUB/SUB socket pair connected to the engine proxy.
pub struct ZmqTransport {
    _context: zmq::Context,
    outbound: zmq::Socket,
    inbound: zmq::Socket,
}

impl ZmqTransport {
    /// Connects both sockets to the proxy at `endpoints`.
    ///
    /// `settle` inserts a pause between the outbound and inbound dials.
    /// Clients use it to give the engine time to install their subscription
    /// state before the first request is published; services skip it because
    /// they only ever answer traffic that arrives later.
    pub fn connect(
        endpoints: &EngineEndpoints,
        settle: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let context = zmq::Context::new();
        let outbound = context.socket(zmq::PUB)?;
        let inbound = context.socket(zmq::SUB)?;
        outbound.connect(&endpoints.xsub)?;
        if let Some(delay) = settle {
            thread::sleep(delay);
        }
        inbound.connect(&endpoints.xpub)?;
        log::debug!(
            "[ZMQ] connected to engine proxy tx={} rx={}",
            endpoints.xsub,
            endpoints.xpub
        );
        Ok(Self { _context: context, outbound, inbound })
    }
}

impl Transport for ZmqTransport {
    fn send_frame(&self, payload: &[u8], more: bool) -> Result<(), TransportError> {
        let flags = if more { zmq::SNDMORE } else { 0 };
        self.outbound.send(payload, flags)?;
        Ok(())
    }

    fn recv_frame(&self, timeout: Option<Duration>) -> Result<Frame, TransportError> {
        let timeout_ms = match timeout {
            Some(limit) => i32::try_from(limit.as_millis()).unwrap_or(i32::MAX),
            None => -1,
        };
        self.inbound.set_rcvtimeo(timeout_ms)?;
        let payload = self.inbound.recv_bytes(0)?;
        let more = self.inbound.get_rcvmore()?;
        Ok(Frame { payload, more })
    }

    fn subscribe(&self, topic: &[u8]) -> Result<(), TransportError> {
        self.inbound.set_subscribe(topic)?;
        Ok(())
    }

    fn unsubscribe(&self, topic: &[u8]) -> Result<(), TransportError> {
        self.inbound.set_unsubscribe(topic)?;
        Ok(())
    }

    fn poll_readable(&self, timeout: Duration) -> Result<bool, TransportError> {
        let timeout_ms = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
        let ready = self.inbound.poll(zmq::POLLIN, timeout_ms)?;
        Ok(ready > 0)
    }
}
