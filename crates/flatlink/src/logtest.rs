// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Capturing log sink for tests that assert on emitted log lines.
//!
//! The `log` facade admits one global logger per process, so the sink is
//! installed once and shared by every test. Records are tagged with the
//! emitting thread and [`capture`] returns only the current thread's, which
//! keeps concurrently running tests out of each other's assertions.

use std::sync::{Mutex, Once};
use std::thread::{self, ThreadId};

static INSTALL: Once = Once::new();
static SINK: CaptureSink = CaptureSink;
static RECORDS: Mutex<Vec<(ThreadId, log::Level, String)>> = Mutex::new(Vec::new());

struct CaptureSink;

impl log::Log for CaptureSink {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        records().push((thread::current().id(), record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

fn records() -> std::sync::MutexGuard<'static, Vec<(ThreadId, log::Level, String)>> {
    match RECORDS.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Runs `f` and returns every log line the current thread emitted during it.
pub(crate) fn capture(f: impl FnOnce()) -> Vec<(log::Level, String)> {
    INSTALL.call_once(|| {
        let _ = log::set_logger(&SINK);
        log::set_max_level(log::LevelFilter::Trace);
    });
    let start = records().len();
    f();
    let me = thread::current().id();
    records()[start..]
        .iter()
        .filter(|(id, _, _)| *id == me)
        .map(|(_, level, message)| (*level, message.clone()))
        .collect()
}
