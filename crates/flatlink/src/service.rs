// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service runtime: owns the bus link, the command registry, and the worker
//! thread that answers requests.
//!
//! Lifecycle is strictly forward: built (connected and subscribed), running
//! (worker up), stopped (worker joined). A stopped service cannot be
//! restarted; construct a new one. `stop_service` is idempotent and safe at
//! any point, including before the first `run_service` and from `Drop`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::{DISCOVER_TOPIC, PID_DIR, RECV_POLL_INTERVAL};
use crate::error::{Error, Result};
use crate::protocol::{codec, ArgSpec, Request, ServiceDescription};
use crate::registry::{CommandHandler, CommandRegistry};
use crate::transport::{EngineEndpoints, Frame, Transport, TransportError};
#[cfg(feature = "zmq-transport")]
use crate::transport::zmq::ZmqTransport;

/// Configures and connects a [`Service`].
pub struct ServiceBuilder {
    desc: ServiceDescription,
    #[cfg_attr(not(feature = "zmq-transport"), allow(dead_code))]
    endpoints: EngineEndpoints,
    transport: Option<Box<dyn Transport>>,
    pid_file: Option<PathBuf>,
}

impl ServiceBuilder {
    /// Points the service at a specific engine proxy. Ignored when a
    /// transport is injected.
    #[must_use]
    pub fn endpoints(mut self, endpoints: EngineEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Injects an already connected transport instead of dialing ZeroMQ.
    #[must_use]
    pub fn transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Overrides the default `<PID_DIR>/<name>.pid` location.
    #[must_use]
    pub fn pid_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.pid_file = Some(path.into());
        self
    }

    /// Connects to the bus and subscribes to the service's own name plus the
    /// discover topic.
    pub fn build(self) -> Result<Service> {
        let transport: Box<dyn Transport> = match self.transport {
            Some(transport) => transport,
            #[cfg(feature = "zmq-transport")]
            None => Box::new(ZmqTransport::connect(&self.endpoints, None)?),
            #[cfg(not(feature = "zmq-transport"))]
            None => return Err(Error::NoTransport),
        };
        transport.subscribe(self.desc.name.as_bytes())?;
        transport.subscribe(DISCOVER_TOPIC)?;
        log::info!(
            "[SERVICE] '{}' connected, rx filters: '{}', 'disc'",
            self.desc.name,
            self.desc.name
        );
        Ok(Service {
            desc: self.desc,
            registry: Arc::new(CommandRegistry::new()),
            transport: Some(transport),
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
            pid_file: self.pid_file,
        })
    }
}

/// A named peer on the bus that answers discover broadcasts and dispatches
/// commands addressed to it.
pub struct Service {
    desc: ServiceDescription,
    registry: Arc<CommandRegistry>,
    transport: Option<Box<dyn Transport>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    pid_file: Option<PathBuf>,
}

impl Service {
    /// Starts configuring a service for `desc`. Endpoints default to the
    /// loopback engine proxy.
    #[must_use]
    pub fn builder(desc: ServiceDescription) -> ServiceBuilder {
        ServiceBuilder {
            desc,
            endpoints: EngineEndpoints::default(),
            transport: None,
            pid_file: None,
        }
    }

    /// Name the service answers to on the bus.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.desc.name
    }

    /// Whether the worker thread is currently up.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Registers a command with its schema and an optional first handler.
    /// Registration always succeeds; see
    /// [`CommandRegistry::register_command`] for re-registration rules.
    pub fn register_command(
        &self,
        name: &str,
        schema: Vec<ArgSpec>,
        handler: Option<CommandHandler>,
    ) -> &Self {
        if !self.registry.register_command(name, schema, handler) {
            log::error!("[SERVICE] failed to register command '{name}'");
        }
        self
    }

    /// Appends a handler to an existing command. Returns `false` when the
    /// command was never registered.
    pub fn register_handler(&self, name: &str, handler: CommandHandler) -> bool {
        self.registry.register_handler(name, handler)
    }

    /// Spawns the worker thread and returns immediately.
    ///
    /// Writes the PID file first (best effort, a failure is logged and does
    /// not abort startup). Fails with [`Error::AlreadyRunning`] while a
    /// worker is up and with [`Error::Stopped`] once the service has been
    /// stopped.
    pub fn run_service(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Err(Error::AlreadyRunning);
        }
        if self.stop.load(Ordering::Relaxed) {
            return Err(Error::Stopped);
        }
        let transport = self.transport.take().ok_or(Error::Stopped)?;
        self.write_pid_file();

        let desc = self.desc.clone();
        let registry = Arc::clone(&self.registry);
        let stop = Arc::clone(&self.stop);
        log::info!("[SERVICE] starting '{}' worker", desc.name);
        self.worker = Some(thread::spawn(move || {
            worker_loop(&desc, &registry, transport.as_ref(), &stop);
        }));
        Ok(())
    }

    /// Signals the worker to stop and joins it.
    ///
    /// The worker notices the flag within one receive poll interval, so this
    /// returns promptly even on an idle bus. Calling it again, or before the
    /// service ever ran, is a no-op.
    pub fn stop_service(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            log::debug!("[SERVICE] joining '{}' worker", self.desc.name);
            if worker.join().is_err() {
                log::error!("[SERVICE] '{}' worker panicked", self.desc.name);
            }
        }
    }

    fn write_pid_file(&self) {
        let path = match &self.pid_file {
            Some(path) => path.clone(),
            None => Path::new(PID_DIR).join(format!("{}.pid", self.desc.name)),
        };
        match fs::write(&path, process::id().to_string()) {
            Ok(()) => log::debug!("[SERVICE] wrote pid file {}", path.display()),
            Err(err) => {
                log::warn!("[SERVICE] could not write pid file {}: {err}", path.display());
            }
        }
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        self.stop_service();
    }
}

fn worker_loop(
    desc: &ServiceDescription,
    registry: &CommandRegistry,
    transport: &dyn Transport,
    stop: &AtomicBool,
) {
    log::info!("[SERVICE] '{}' worker listening", desc.name);
    while !stop.load(Ordering::Relaxed) {
        let topic = match transport.recv_frame(Some(RECV_POLL_INTERVAL)) {
            Ok(frame) => frame,
            Err(TransportError::WouldBlock) => continue,
            Err(err) => {
                log::error!("[SERVICE] receive failed: {err}");
                continue;
            }
        };
        if !topic.more {
            log::error!("[SERVICE] dropping message: not multipart");
            continue;
        }
        let rest = match drain_message(transport) {
            Ok(frames) => frames,
            Err(err) => {
                log::error!("[SERVICE] dropping truncated multipart message: {err}");
                continue;
            }
        };
        handle_request(desc, registry, transport, &topic.payload, &rest);
    }
    log::info!("[SERVICE] '{}' worker stopped", desc.name);
}

/// Pulls the continuation frames of the message whose first frame was just
/// received.
fn drain_message(transport: &dyn Transport) -> std::result::Result<Vec<Frame>, TransportError> {
    let mut frames = Vec::new();
    loop {
        let frame = transport.recv_frame(Some(RECV_POLL_INTERVAL))?;
        let more = frame.more;
        frames.push(frame);
        if !more {
            return Ok(frames);
        }
    }
}

fn handle_request(
    desc: &ServiceDescription,
    registry: &CommandRegistry,
    transport: &dyn Transport,
    topic: &[u8],
    rest: &[Frame],
) {
    match codec::decode_request(&desc.name, topic, rest) {
        Ok(Request::Discover(header)) => {
            log::info!(
                "[SERVICE] discover (version {}) received, announcing '{}'",
                header.version,
                desc.name
            );
            announce(desc, registry, transport);
        }
        Ok(Request::Command(command)) => {
            log::debug!("[SERVICE] command '{}' received", command.name);
            if !registry.dispatch(&command) {
                log::error!("[SERVICE] failed to run command handler");
            }
        }
        Err(err) => log::error!("[SERVICE] dropping message: {err}"),
    }
}

/// Publishes the discovery response: a single topic-less JSON frame.
fn announce(desc: &ServiceDescription, registry: &CommandRegistry, transport: &dyn Transport) {
    match codec::encode_announcement(desc, registry.describe()) {
        Ok(payload) => {
            if let Err(err) = transport.send_frame(&payload, false) {
                log::error!("[SERVICE] failed to publish discovery response: {err}");
            }
        }
        Err(err) => log::error!("[SERVICE] failed to serialize discovery response: {err}"),
    }
}
