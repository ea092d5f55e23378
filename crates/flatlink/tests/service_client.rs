// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end exercises of the service and client runtimes over the
//! in-process hub: discovery, command dispatch, decode robustness, and the
//! client's fixed response window.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::items_after_statements,
    clippy::uninlined_format_args
)]

use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use flatlink::transport::inproc::InprocHub;
use flatlink::{
    ArgSpec, ArgType, Client, Command, CommandHandler, Service, ServiceAnnouncement,
    ServiceDescription, Transport,
};

type Trace = Arc<Mutex<Vec<String>>>;

fn tracing_handler(trace: &Trace, tag: &str) -> CommandHandler {
    let trace = Arc::clone(trace);
    let tag = tag.to_string();
    Arc::new(move |cmd: &Command| {
        let hz = cmd.get("hz").unwrap_or("-").to_string();
        trace.lock().unwrap().push(format!("{tag}:{}:{hz}", cmd.name));
    })
}

fn bus_service(hub: &InprocHub, name: &str, version: &str) -> Service {
    Service::builder(ServiceDescription::json_only(name, version))
        .transport(Box::new(hub.link()))
        .build()
        .unwrap()
}

fn bus_client(hub: &InprocHub) -> Client {
    Client::with_transport(Box::new(hub.link())).unwrap()
}

fn wait_until(mut cond: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    cond()
}

#[test]
fn discover_round_trip_returns_announcement() {
    let hub = InprocHub::new();
    let mut service = bus_service(&hub, "radio", "1.4.0");
    service.register_command("set_rate", vec![ArgSpec::required("hz", ArgType::U32)], None);
    service.register_command("reboot", Vec::new(), None);
    service.run_service().unwrap();

    let client = bus_client(&hub);
    assert!(client.send_discover());
    let responses = client.collect_responses(Duration::from_millis(300)).unwrap();
    service.stop_service();

    assert_eq!(responses.len(), 1, "exactly one service must answer");
    let announcement: ServiceAnnouncement = serde_json::from_slice(&responses[0]).unwrap();
    assert_eq!(announcement.name, "radio");
    assert_eq!(announcement.version, "1.4.0");
    assert_eq!(announcement.compatible_protocols, "JSON");
    assert_eq!(announcement.commands.len(), 2);
    let set_rate = announcement
        .commands
        .iter()
        .find(|c| c.name == "set_rate")
        .expect("set_rate must be advertised");
    assert_eq!(set_rate.args, vec![ArgSpec::required("hz", ArgType::U32)]);
}

#[test]
fn every_service_answers_a_discover_broadcast() {
    let hub = InprocHub::new();
    let mut radio = bus_service(&hub, "radio", "1.0.0");
    let mut power = bus_service(&hub, "power", "2.0.0");
    radio.run_service().unwrap();
    power.run_service().unwrap();

    let client = bus_client(&hub);
    assert!(client.send_discover());
    let responses = client.collect_responses(Duration::from_millis(300)).unwrap();
    radio.stop_service();
    power.stop_service();

    let mut names: Vec<String> = responses
        .iter()
        .map(|payload| serde_json::from_slice::<ServiceAnnouncement>(payload).unwrap().name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["power", "radio"]);
}

#[test]
fn command_dispatch_runs_handlers_in_registration_order() {
    let hub = InprocHub::new();
    let mut service = bus_service(&hub, "radio", "1.0.0");
    let trace: Trace = Arc::default();
    service.register_command(
        "set_rate",
        vec![ArgSpec::required("hz", ArgType::U32)],
        Some(tracing_handler(&trace, "first")),
    );
    service.register_command("set_rate", Vec::new(), Some(tracing_handler(&trace, "second")));
    service.run_service().unwrap();

    let client = bus_client(&hub);
    assert!(client.send_command("radio", &Command::new("set_rate").arg("hz", "50")));

    assert!(wait_until(|| trace.lock().unwrap().len() == 2, Duration::from_secs(2)));
    service.stop_service();
    assert_eq!(
        *trace.lock().unwrap(),
        vec!["first:set_rate:50", "second:set_rate:50"]
    );
}

#[test]
fn commands_for_other_services_are_never_seen() {
    let hub = InprocHub::new();
    let mut service = bus_service(&hub, "radio", "1.0.0");
    let trace: Trace = Arc::default();
    service.register_command("ping", Vec::new(), Some(tracing_handler(&trace, "h")));
    service.run_service().unwrap();

    let client = bus_client(&hub);
    assert!(client.send_command("power", &Command::new("ping")));
    thread::sleep(Duration::from_millis(200));
    service.stop_service();

    assert!(trace.lock().unwrap().is_empty());
}

#[test]
fn unknown_command_is_dropped_and_the_worker_keeps_serving() {
    let hub = InprocHub::new();
    let mut service = bus_service(&hub, "radio", "1.0.0");
    let trace: Trace = Arc::default();
    service.register_command("ping", Vec::new(), Some(tracing_handler(&trace, "h")));
    service.run_service().unwrap();

    let client = bus_client(&hub);
    assert!(client.send_command("radio", &Command::new("ghost")));
    assert!(client.send_command("radio", &Command::new("ping")));

    assert!(wait_until(|| !trace.lock().unwrap().is_empty(), Duration::from_secs(2)));
    service.stop_service();
    assert_eq!(*trace.lock().unwrap(), vec!["h:ping:-"]);
}

#[test]
fn undecodable_messages_do_not_kill_the_worker() {
    let hub = InprocHub::new();
    let mut service = bus_service(&hub, "radio", "1.0.0");
    let trace: Trace = Arc::default();
    service.register_command("ping", Vec::new(), Some(tracing_handler(&trace, "h")));
    service.run_service().unwrap();

    // A peer speaking the reserved binary protocol, then garbage JSON, then
    // a single-frame message with no continuation.
    let rogue = hub.link();
    rogue.send_frame(b"radio", true).unwrap();
    rogue.send_frame(&[1, 0x01], true).unwrap();
    rogue.send_frame(&[0, 1, 2], false).unwrap();

    rogue.send_frame(b"radio", true).unwrap();
    rogue.send_frame(&[1, 0x02], true).unwrap();
    rogue.send_frame(b"not json", false).unwrap();

    rogue.send_frame(b"radio", false).unwrap();

    let client = bus_client(&hub);
    assert!(client.send_command("radio", &Command::new("ping")));
    assert!(wait_until(|| !trace.lock().unwrap().is_empty(), Duration::from_secs(2)));
    service.stop_service();
    assert_eq!(*trace.lock().unwrap(), vec!["h:ping:-"]);
}

#[test]
fn panicking_handler_does_not_kill_the_worker() {
    let hub = InprocHub::new();
    let mut service = bus_service(&hub, "radio", "1.0.0");
    let trace: Trace = Arc::default();
    service.register_command(
        "selftest",
        Vec::new(),
        Some(Arc::new(|_cmd: &Command| std::panic::panic_any("selftest failure"))),
    );
    service.register_command("ping", Vec::new(), Some(tracing_handler(&trace, "h")));
    service.run_service().unwrap();

    let client = bus_client(&hub);
    assert!(client.send_command("radio", &Command::new("selftest")));
    assert!(client.send_command("radio", &Command::new("ping")));

    assert!(wait_until(|| !trace.lock().unwrap().is_empty(), Duration::from_secs(2)));
    assert!(service.is_running(), "worker must outlive a panicking handler");
    service.stop_service();
    assert_eq!(*trace.lock().unwrap(), vec!["h:ping:-"]);
}

#[test]
fn response_window_counts_only_in_window_arrivals() {
    let hub = InprocHub::new();
    let client = bus_client(&hub);

    // Feeder and window leave the barrier together, so the 750 ms arrival
    // lands 50 ms inside the 800 ms deadline and the 850 ms one 50 ms past
    // it.
    let epoch = Arc::new(Barrier::new(2));
    let feeder = hub.link();
    let feeder_epoch = Arc::clone(&epoch);
    let feeder_thread = thread::spawn(move || {
        feeder_epoch.wait();
        let start = Instant::now();
        let schedule: [(u64, &[u8]); 4] =
            [(100, b"one"), (300, b"two"), (750, b"three"), (850, b"late")];
        for (at_ms, payload) in schedule {
            let target = start + Duration::from_millis(at_ms);
            if let Some(remaining) = target.checked_duration_since(Instant::now()) {
                thread::sleep(remaining);
            }
            feeder.send_frame(payload, false).unwrap();
        }
    });

    epoch.wait();
    let started = Instant::now();
    let responses = client.collect_responses(Duration::from_millis(800)).unwrap();
    let elapsed = started.elapsed();
    feeder_thread.join().unwrap();

    let got: Vec<&[u8]> = responses.iter().map(Vec::as_slice).collect();
    assert_eq!(got, vec![b"one".as_slice(), b"two".as_slice(), b"three".as_slice()]);
    assert!(
        elapsed >= Duration::from_millis(800),
        "window must not close early, closed after {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_millis(2000),
        "a late arrival must not extend the window, closed after {elapsed:?}"
    );
}

#[test]
fn silent_window_returns_empty_and_logs_nothing_received() {
    let hub = InprocHub::new();
    let client = bus_client(&hub);
    assert!(client.send_discover());
    assert!(!client.recv_and_log_responses());
}

#[test]
fn stop_returns_within_the_poll_bound() {
    let hub = InprocHub::new();
    let mut service = bus_service(&hub, "radio", "1.0.0");
    service.run_service().unwrap();
    // Let the worker settle into its receive wait.
    thread::sleep(Duration::from_millis(150));

    let started = Instant::now();
    service.stop_service();
    assert!(
        started.elapsed() < Duration::from_secs(1),
        "stop took {:?}",
        started.elapsed()
    );
}

#[test]
fn discovery_reflects_commands_registered_after_startup() {
    let hub = InprocHub::new();
    let mut service = bus_service(&hub, "radio", "1.0.0");
    service.register_command("ping", Vec::new(), None);
    service.run_service().unwrap();
    service.register_command("late", Vec::new(), None);

    let client = bus_client(&hub);
    assert!(client.send_discover());
    let responses = client.collect_responses(Duration::from_millis(300)).unwrap();
    service.stop_service();

    let announcement: ServiceAnnouncement = serde_json::from_slice(&responses[0]).unwrap();
    let mut names: Vec<&str> =
        announcement.commands.iter().map(|c| c.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["late", "ping"]);
}
