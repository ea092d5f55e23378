// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process transport backed by channels.
//!
//! An [`InprocHub`] plays the engine proxy: every message published on one
//! link fans out to every link whose filters match the first frame,
//! including the link that sent it. That mirrors the real proxy, where a
//! peer's subscriber leg receives its own publications back.
//!
//! Filters keep the proxy's prefix semantics with one extension: a prefix
//! that is unsubscribed without having been subscribed becomes an exclusion,
//! so a link can express "everything except discover traffic" the way
//! clients configure themselves on the real bus.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::transport::{Frame, Transport, TransportError};

type Message = Vec<Frame>;

/// Locks with poison recovery; a panicked handler thread must not wedge the
/// whole hub.
fn recover_lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::debug!("[INPROC] {} lock poisoned, recovering", what);
            poisoned.into_inner()
        }
    }
}

#[derive(Default)]
struct Filters {
    include: Vec<Vec<u8>>,
    exclude: Vec<Vec<u8>>,
}

impl Filters {
    fn matches(&self, first_frame: &[u8]) -> bool {
        if self.exclude.iter().any(|prefix| first_frame.starts_with(prefix)) {
            return false;
        }
        self.include.iter().any(|prefix| first_frame.starts_with(prefix))
    }

    fn subscribe(&mut self, prefix: &[u8]) {
        self.include.push(prefix.to_vec());
    }

    fn unsubscribe(&mut self, prefix: &[u8]) {
        if let Some(pos) = self.include.iter().position(|p| p == prefix) {
            self.include.remove(pos);
        } else {
            self.exclude.push(prefix.to_vec());
        }
    }
}

struct Peer {
    filters: Mutex<Filters>,
    sender: Sender<Message>,
}

/// Stand-in for the engine proxy. Cloning is cheap and every clone addresses
/// the same hub.
#[derive(Clone, Default)]
pub struct InprocHub {
    inner: Arc<HubInner>,
}

#[derive(Default)]
struct HubInner {
    peers: Mutex<Vec<Arc<Peer>>>,
}

impl InprocHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a new link to the hub. The link starts with no inbound
    /// filters, like a freshly connected SUB socket.
    #[must_use]
    pub fn link(&self) -> InprocTransport {
        let (sender, receiver) = unbounded();
        let peer = Arc::new(Peer { filters: Mutex::new(Filters::default()), sender });
        recover_lock(&self.inner.peers, "peers").push(Arc::clone(&peer));
        InprocTransport {
            hub: self.clone(),
            peer,
            receiver,
            staged: Mutex::new(Vec::new()),
            pending: Mutex::new(VecDeque::new()),
        }
    }

    fn publish(&self, message: Message) {
        let Some(first) = message.first() else { return };
        let peers = recover_lock(&self.inner.peers, "peers");
        for peer in peers.iter() {
            let matched = recover_lock(&peer.filters, "filters").matches(&first.payload);
            if matched {
                // Send only fails when the receiving link is mid-drop.
                let _ = peer.sender.send(message.clone());
            }
        }
    }

    fn unlink(&self, peer: &Arc<Peer>) {
        recover_lock(&self.inner.peers, "peers").retain(|p| !Arc::ptr_eq(p, peer));
    }
}

/// One peer's link to an [`InprocHub`].
///
/// Outbound frames are staged until a frame with `more == false` completes
/// the message; only whole messages reach the hub, matching multipart
/// delivery on the real proxy.
pub struct InprocTransport {
    hub: InprocHub,
    peer: Arc<Peer>,
    receiver: Receiver<Message>,
    staged: Mutex<Vec<Frame>>,
    pending: Mutex<VecDeque<Frame>>,
}

impl InprocTransport {
    fn take_pending(&self) -> Option<Frame> {
        recover_lock(&self.pending, "pending").pop_front()
    }

    fn queue_message(&self, message: Message) -> Result<Frame, TransportError> {
        let mut frames = VecDeque::from(message);
        let first = frames
            .pop_front()
            .ok_or_else(|| TransportError::Backend("empty message".to_string()))?;
        recover_lock(&self.pending, "pending").extend(frames);
        Ok(first)
    }
}

impl Transport for InprocTransport {
    fn send_frame(&self, payload: &[u8], more: bool) -> Result<(), TransportError> {
        let mut staged = recover_lock(&self.staged, "staged");
        staged.push(Frame { payload: payload.to_vec(), more });
        if !more {
            let message = std::mem::take(&mut *staged);
            drop(staged);
            self.hub.publish(message);
        }
        Ok(())
    }

    fn recv_frame(&self, timeout: Option<Duration>) -> Result<Frame, TransportError> {
        if let Some(frame) = self.take_pending() {
            return Ok(frame);
        }
        let message = match timeout {
            Some(limit) => self.receiver.recv_timeout(limit).map_err(|err| match err {
                RecvTimeoutError::Timeout => TransportError::WouldBlock,
                RecvTimeoutError::Disconnected => TransportError::Closed,
            })?,
            None => self.receiver.recv().map_err(|_| TransportError::Closed)?,
        };
        self.queue_message(message)
    }

    fn subscribe(&self, topic: &[u8]) -> Result<(), TransportError> {
        recover_lock(&self.peer.filters, "filters").subscribe(topic);
        Ok(())
    }

    fn unsubscribe(&self, topic: &[u8]) -> Result<(), TransportError> {
        recover_lock(&self.peer.filters, "filters").unsubscribe(topic);
        Ok(())
    }

    fn poll_readable(&self, timeout: Duration) -> Result<bool, TransportError> {
        if !recover_lock(&self.pending, "pending").is_empty() {
            return Ok(true);
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(message) => {
                recover_lock(&self.pending, "pending").extend(message);
                Ok(true)
            }
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }
}

impl Drop for InprocTransport {
    fn drop(&mut self) {
        self.hub.unlink(&self.peer);
    }
}
