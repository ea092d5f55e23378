// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `flatlinkctl`: discover services on a FlatLink bus and send them
//! commands from the shell.

use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use flatlink::{ArgValue, Client, Command as BusCommand, EngineEndpoints, ServiceAnnouncement};

#[derive(Parser)]
#[command(name = "flatlinkctl", version, about = "Inspect and drive services on a FlatLink bus")]
struct Cli {
    /// Engine proxy host (defaults to $FLATLINK_ENGINE_HOST, then loopback)
    #[arg(long, global = true)]
    host: Option<String>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Broadcast a discover request and print every announcement received
    Discover {
        /// How long to listen for announcements, in milliseconds
        #[arg(long, default_value_t = 800)]
        window_ms: u64,
    },
    /// Publish a command to a service
    Send {
        /// Target service name
        service: String,
        /// Command name
        command: String,
        /// Command argument as NAME=VALUE, repeatable
        #[arg(long = "arg", value_name = "NAME=VALUE")]
        args: Vec<String>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let endpoints = match &cli.host {
        Some(host) => EngineEndpoints::for_host(host),
        None => EngineEndpoints::from_env(),
    };

    let client = match Client::connect(&endpoints) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("{} cannot reach engine proxy: {err}", "error:".red().bold());
            process::exit(1);
        }
    };

    let ok = match cli.action {
        Action::Discover { window_ms } => {
            run_discover(&client, Duration::from_millis(window_ms))
        }
        Action::Send { service, command, args } => {
            run_send(&client, &service, &command, &args)
        }
    };
    if !ok {
        process::exit(1);
    }
}

fn run_discover(client: &Client, window: Duration) -> bool {
    if !client.send_discover() {
        eprintln!("{} failed to publish discover request", "error:".red().bold());
        return false;
    }
    let responses = match client.collect_responses(window) {
        Ok(responses) => responses,
        Err(err) => {
            eprintln!("{} listening for responses failed: {err}", "error:".red().bold());
            return false;
        }
    };
    if responses.is_empty() {
        println!("{}", "no services responded".yellow());
        return true;
    }
    for payload in &responses {
        match serde_json::from_slice::<ServiceAnnouncement>(payload) {
            Ok(announcement) => print_announcement(&announcement),
            // Not every frame on the bus is an announcement; show it raw.
            Err(_) => println!("{}", String::from_utf8_lossy(payload)),
        }
    }
    true
}

fn print_announcement(announcement: &ServiceAnnouncement) {
    println!(
        "{} {} {}",
        announcement.name.green().bold(),
        announcement.version,
        format!("[{}]", announcement.compatible_protocols).cyan()
    );
    for command in &announcement.commands {
        let args: Vec<String> = command
            .args
            .iter()
            .map(|arg| {
                let marker = if arg.optional { "?" } else { "" };
                format!("{}{marker}: {}", arg.name, arg.ty)
            })
            .collect();
        println!("  {}({})", command.name.bold(), args.join(", "));
    }
}

fn run_send(client: &Client, service: &str, command: &str, args: &[String]) -> bool {
    let mut request = BusCommand::new(command);
    for raw in args {
        match parse_arg(raw) {
            Some((name, value)) => request.args.push(ArgValue::new(name, value)),
            None => {
                eprintln!(
                    "{} malformed --arg '{raw}', expected NAME=VALUE",
                    "error:".red().bold()
                );
                return false;
            }
        }
    }
    if !client.send_command(service, &request) {
        eprintln!("{} failed to publish command", "error:".red().bold());
        return false;
    }
    println!("{} {command} -> {service}", "sent".green());
    true
}

fn parse_arg(raw: &str) -> Option<(&str, &str)> {
    let (name, value) = raw.split_once('=')?;
    if name.is_empty() {
        return None;
    }
    Some((name, value))
}

#[cfg(test)]
mod tests {
    use super::parse_arg;

    #[test]
    fn parse_arg_splits_on_first_equals() {
        assert_eq!(parse_arg("key=value"), Some(("key", "value")));
        assert_eq!(parse_arg("key=a=b"), Some(("key", "a=b")));
        assert_eq!(parse_arg("key="), Some(("key", "")));
    }

    #[test]
    fn parse_arg_rejects_missing_name_or_equals() {
        assert_eq!(parse_arg("=value"), None);
        assert_eq!(parse_arg("novalue"), None);
    }
}
