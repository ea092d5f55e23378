// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! FlatLink: command and discovery bus for FlatSat test benches.
//!
//! Every peer talks to a central engine proxy over publish/subscribe. There
//! are no point-to-point connections and no reply channel; "responding"
//! means publishing a message the requester happens to be subscribed to.
//!
//! ```text
//!                    +----------------+
//!   PUB ------------>| XSUB      XPUB |------------> SUB
//!   (requests,       |  engine proxy  |  (filtered by topic prefix)
//!    responses)      +----------------+
//! ```
//!
//! A [`Service`] subscribes to its own name and to the discover topic,
//! dispatches decoded commands to registered handlers on a background
//! worker, and answers discover broadcasts with a JSON description of its
//! command surface. A [`Client`] publishes requests and then listens for a
//! fixed window, collecting every response that arrives in time.
//!
//! # Serving commands
//!
//! ```no_run
//! use std::sync::Arc;
//! use flatlink::{ArgSpec, ArgType, Command, Service, ServiceDescription};
//!
//! fn main() -> flatlink::Result<()> {
//!     let desc = ServiceDescription::json_only("radio", "1.0.0");
//!     let mut service = Service::builder(desc).build()?;
//!     service.register_command(
//!         "set_rate",
//!         vec![ArgSpec::required("hz", ArgType::U32)],
//!         Some(Arc::new(|cmd: &Command| {
//!             log::info!("set_rate {:?}", cmd.get("hz"));
//!         })),
//!     );
//!     service.run_service()?;
//!     // ... wait for a shutdown signal ...
//!     service.stop_service();
//!     Ok(())
//! }
//! ```
//!
//! # Discovering and commanding services
//!
//! ```no_run
//! use flatlink::{Client, Command, EngineEndpoints};
//!
//! fn main() -> flatlink::Result<()> {
//!     let client = Client::connect(&EngineEndpoints::from_env())?;
//!     if client.send_discover() {
//!         client.recv_and_log_responses();
//!     }
//!     client.send_command("radio", &Command::new("set_rate").arg("hz", "50"));
//!     Ok(())
//! }
//! ```
//!
//! The transport is a seam: production uses ZeroMQ (feature `zmq-transport`,
//! on by default), tests run the identical runtimes over
//! [`transport::inproc::InprocHub`] with no broker process.

pub mod client;
pub mod config;
pub mod error;
#[cfg(test)]
mod logtest;
pub mod protocol;
pub mod registry;
pub mod service;
pub mod transport;

pub use client::Client;
pub use error::{Error, Result};
pub use protocol::{
    ArgSpec, ArgType, ArgValue, Command, CommandDescription, DecodeError, Request,
    ServiceAnnouncement, ServiceDescription, WireProtocol,
};
pub use registry::{CommandHandler, CommandRegistry};
pub use service::{Service, ServiceBuilder};
pub use transport::inproc::{InprocHub, InprocTransport};
#[cfg(feature = "zmq-transport")]
pub use transport::zmq::ZmqTransport;
pub use transport::{EngineEndpoints, Frame, Transport, TransportError};

/// Crate version, as baked in at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
