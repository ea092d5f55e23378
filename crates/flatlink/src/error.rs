// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-level error type.
//!
//! Only operations that can leave the caller without a usable runtime return
//! [`Error`]: constructors, `run_service`, and the client's response
//! collection (where a failed poll means the inbound stream is gone). Per
//! message problems inside the runtimes are logged and swallowed instead,
//! one bad frame on a shared bus must never take the process down.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced by service and client runtimes.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying transport failed while setting up or polling.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    /// `run_service` was called while the worker thread is already up.
    #[error("service worker already running")]
    AlreadyRunning,

    /// `run_service` was called after `stop_service`; a stopped service can
    /// only be brought back by constructing a new one.
    #[error("service already stopped")]
    Stopped,

    /// No transport was injected and the crate was built without the
    /// `zmq-transport` feature, so there is nothing to connect with.
    #[cfg(not(feature = "zmq-transport"))]
    #[error("no transport configured (enable the zmq-transport feature or inject one)")]
    NoTransport,
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
