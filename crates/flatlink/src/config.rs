// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compile-time tuning constants for the FlatLink bus.
//!
//! Every number the wire protocol or the runtimes depend on lives here so
//! that a port of the engine (or a packet capture) can be checked against a
//! single file. Endpoint *strings* are built at runtime from these values,
//! see [`crate::transport::EngineEndpoints`].

use std::time::Duration;

// ===== Engine proxy =====

/// TCP port of the engine proxy ingress (XSUB side). Publishers connect here.
pub const ENGINE_XSUB_PORT: u16 = 2808;

/// TCP port of the engine proxy egress (XPUB side). Subscribers connect here.
pub const ENGINE_XPUB_PORT: u16 = 2809;

/// Largest frame the engine forwards, in bytes. The limit is enforced by the
/// engine deployment, not checked locally.
pub const ENGINE_MTU: usize = 8192;

/// Host the endpoints default to when nothing else is configured.
pub const DEFAULT_ENGINE_HOST: &str = "127.0.0.1";

/// Environment variable consulted by [`crate::transport::EngineEndpoints::from_env`]
/// to reach an engine proxy on another bench node.
pub const ENGINE_HOST_ENV: &str = "FLATLINK_ENGINE_HOST";

// ===== Wire protocol =====

/// Version byte carried in discover and command headers.
pub const PROTOCOL_VERSION: u8 = 1;

/// Topic a discover broadcast is published under. Services subscribe to it,
/// clients filter it out of their inbound stream.
pub const DISCOVER_TOPIC: &[u8] = b"disc";

// ===== Timing =====

/// How long a client listens for responses after publishing a request.
pub const RESPONSE_WINDOW: Duration = Duration::from_millis(800);

/// Upper bound on a single blocking receive inside the service worker loop.
/// The stop flag is re-checked at this cadence, so it is also the worst-case
/// latency a stop request can see from an idle worker.
pub const RECV_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Pause between connecting the outbound socket and the inbound socket on the
/// client side, giving the proxy time to propagate subscriptions before the
/// first request goes out.
pub const SUBSCRIPTION_SETTLE_DELAY: Duration = Duration::from_millis(100);

// ===== Filesystem =====

/// Directory a running service drops its `<name>.pid` file into unless the
/// builder overrides the path.
pub const PID_DIR: &str = "/run/flatlink";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ports_are_adjacent() {
        assert_eq!(ENGINE_XPUB_PORT, ENGINE_XSUB_PORT + 1);
    }

    #[test]
    fn poll_interval_divides_response_window() {
        let polls = RESPONSE_WINDOW.as_millis() / RECV_POLL_INTERVAL.as_millis();
        assert!(polls >= 2, "worker must get several stop-flag checks per window");
    }

    #[test]
    fn discover_topic_is_short_ascii() {
        assert_eq!(DISCOVER_TOPIC, b"disc");
        assert!(DISCOVER_TOPIC.is_ascii());
    }
}
