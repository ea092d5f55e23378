// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `flatlink-pingd`: a minimal bench service that answers discovery and two
//! commands. Point it at an engine proxy to check a deployment end to end:
//!
//! ```text
//! flatlink-pingd --host bench-node &
//! flatlinkctl --host bench-node discover
//! flatlinkctl --host bench-node send pingd echo --arg text=hello --arg repeat=3
//! ```

use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use flatlink::{ArgSpec, ArgType, Command, EngineEndpoints, Service, ServiceDescription};

#[derive(Parser)]
#[command(name = "flatlink-pingd", version, about = "Reference FlatLink bench service")]
struct Args {
    /// Service name to claim on the bus
    #[arg(long, default_value = "pingd")]
    name: String,

    /// Engine proxy host (defaults to $FLATLINK_ENGINE_HOST, then loopback)
    #[arg(long)]
    host: Option<String>,

    /// Where to write the PID file instead of the default location
    #[arg(long)]
    pid_file: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let endpoints = match &args.host {
        Some(host) => EngineEndpoints::for_host(host),
        None => EngineEndpoints::from_env(),
    };

    let desc = ServiceDescription::json_only(&args.name, env!("CARGO_PKG_VERSION"));
    let mut builder = Service::builder(desc).endpoints(endpoints);
    if let Some(path) = args.pid_file {
        builder = builder.pid_file(path);
    }
    let mut service = match builder.build() {
        Ok(service) => service,
        Err(err) => {
            log::error!("[PINGD] cannot reach engine proxy: {err}");
            process::exit(1);
        }
    };

    service.register_command(
        "ping",
        Vec::new(),
        Some(Arc::new(|_cmd: &Command| log::info!("[PINGD] pong"))),
    );
    service.register_command(
        "echo",
        vec![
            ArgSpec::required("text", ArgType::Str),
            ArgSpec::optional("repeat", ArgType::U8),
        ],
        Some(Arc::new(|cmd: &Command| {
            let text = cmd.get("text").unwrap_or("");
            let repeat = cmd.get("repeat").and_then(|v| v.parse::<u8>().ok()).unwrap_or(1);
            for _ in 0..repeat {
                log::info!("[PINGD] echo: {text}");
            }
        })),
    );

    if let Err(err) = service.run_service() {
        log::error!("[PINGD] failed to start worker: {err}");
        process::exit(1);
    }
    log::info!("[PINGD] serving as '{}', ctrl-c to stop", service.name());

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    if let Err(err) = ctrlc::set_handler(move || flag.store(false, Ordering::Relaxed)) {
        log::error!("[PINGD] failed to install signal handler: {err}");
        process::exit(1);
    }
    while running.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(100));
    }

    log::info!("[PINGD] shutting down");
    service.stop_service();
}
