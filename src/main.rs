use ndn_traffic::client::{Client, ClientOptions, RequestPattern};
use ndn_traffic::config::{self, TrafficPattern};
use ndn_traffic::error::ConfigError;
use ndn_traffic::face::memory::MemoryForwarder;
use ndn_traffic::logging::{self, LogTarget};
use ndn_traffic::server::{ResponsePattern, Server, ServerOptions};
use ndn_traffic::stats::write_json_report;
mod cmd;

use std::fmt::Display;
use std::path::Path;
use std::process::{self, ExitCode};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::Serialize;

/// Exit status of a run that could not read its configuration
const EXIT_CONFIG_ERROR: u8 = 2;

/// The entry point of the application.
///
/// Sets the logger and the signal handler up, then runs the engine chosen on the command line.
fn main() -> ExitCode {
    let args = cmd::Args::parse();
    let module = match args.command {
        cmd::Command::Server { .. } => "NdnTrafficServer",
        _ => "NdnTrafficClient",
    };
    let log_target = logging::init(module, &process::id().to_string());

    let (tx_shutdown, rx_shutdown) = bounded::<()>(0);
    let _shutdown = handle_signals(tx_shutdown);

    let outcome = match args.command {
        cmd::Command::Client { args } => run_client(args, rx_shutdown, &log_target),
        cmd::Command::Server {
            delay,
            count,
            quiet,
            seed,
            report_json,
            config,
        } => {
            let options = ServerOptions {
                content_delay: delay.map(Duration::from_millis),
                max_interests: count,
                quiet,
                seed,
            };
            run_server(&config, options, report_json.as_deref(), rx_shutdown, &log_target)
        }
        cmd::Command::Loopback {
            args,
            server_config,
            delay,
        } => run_loopback(args, &server_config, delay, rx_shutdown, &log_target),
    };
    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

/// The first signal drops the shutdown sender, which stops every engine. The second one aborts.
/// The returned handle keeps the sender alive while no signal is received.
fn handle_signals(tx_shutdown: Sender<()>) -> Arc<Mutex<Option<Sender<()>>>> {
    let shutdown = Arc::new(Mutex::new(Some(tx_shutdown)));
    let handler_shutdown = shutdown.clone();
    let handler = move || {
        let tx = handler_shutdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if tx.is_some() {
            log::warn!("Ending the traffic generation, please wait");
        } else {
            log::warn!("Ending immediately");
            process::abort();
        }
    };
    if let Err(e) = ctrlc::set_handler(handler) {
        log::warn!("Cannot set the signal handler: {e}");
    }
    shutdown
}

fn read_patterns<T: TrafficPattern>(path: &Path) -> Result<Vec<T>, ConfigError> {
    let parsed = config::read_configuration_file::<T>(path)?;
    let malformed = parsed.malformed_count();
    if malformed > 0 {
        log::warn!("{malformed} traffic pattern(s) dropped because of malformed lines");
    }
    if parsed.patterns.is_empty() {
        return Err(ConfigError::NoPattern(path.to_path_buf()));
    }
    Ok(parsed.patterns)
}

fn client_options(args: &cmd::ClientArgs) -> ClientOptions {
    ClientOptions {
        interval: Duration::from_millis(args.interval),
        max_interests: args.count,
        quiet: args.quiet,
        seed: args.seed,
    }
}

/// Print the report on standard output if the log goes to a file, and dump it as JSON if asked
fn publish_report(
    report: &(impl Display + Serialize),
    json: Option<&Path>,
    log_target: &LogTarget,
) {
    if log_target.is_file() {
        println!("{report}");
    }
    if let Some(path) = json {
        if let Err(e) = write_json_report(report, path) {
            log::error!("Cannot write report to {}: {e}", path.display());
        }
    }
}

fn forwarder() -> Option<MemoryForwarder> {
    MemoryForwarder::new()
        .map_err(|e| log::error!("Cannot start the forwarder: {e}"))
        .ok()
}

fn run_client(
    args: cmd::ClientArgs,
    shutdown: Receiver<()>,
    log_target: &LogTarget,
) -> Result<bool, ConfigError> {
    let patterns = read_patterns::<RequestPattern>(&args.config)?;
    let Some(forwarder) = forwarder() else {
        return Ok(false);
    };
    let client = Client::new(patterns, forwarder.face(), client_options(&args));
    let report = client.run(shutdown);
    publish_report(&report, args.report_json.as_deref(), log_target);
    Ok(!report.has_error)
}

fn run_server(
    config: &Path,
    options: ServerOptions,
    json: Option<&Path>,
    shutdown: Receiver<()>,
    log_target: &LogTarget,
) -> Result<bool, ConfigError> {
    let patterns = read_patterns::<ResponsePattern>(config)?;
    let Some(forwarder) = forwarder() else {
        return Ok(false);
    };
    let server = Server::new(patterns, forwarder.face(), options);
    let report = server.run(shutdown);
    publish_report(&report, json, log_target);
    Ok(!report.has_error)
}

/// Run a server in its own thread and a client in the current one. The server is stopped when
/// the client is done.
fn run_loopback(
    args: cmd::ClientArgs,
    server_config: &Path,
    delay: Option<u64>,
    shutdown: Receiver<()>,
    log_target: &LogTarget,
) -> Result<bool, ConfigError> {
    let server_patterns = read_patterns::<ResponsePattern>(server_config)?;
    let client_patterns = read_patterns::<RequestPattern>(&args.config)?;
    let Some(forwarder) = forwarder() else {
        return Ok(false);
    };

    let mut server = Server::new(
        server_patterns,
        forwarder.face(),
        ServerOptions {
            content_delay: delay.map(Duration::from_millis),
            max_interests: None,
            quiet: args.quiet,
            seed: args.seed.map(|s| s.wrapping_add(1)),
        },
    );
    // the routes must exist before the first Interest
    server.register_prefixes();
    let (tx_stop_server, rx_stop_server) = bounded::<()>(0);
    let builder = thread::Builder::new().name("Server".into());
    let server_handle = match builder.spawn(move || server.run(rx_stop_server)) {
        Ok(handle) => handle,
        Err(e) => {
            log::error!("Cannot start the server: {e}");
            return Ok(false);
        }
    };

    let client = Client::new(client_patterns, forwarder.face(), client_options(&args));
    let report = client.run(shutdown);
    drop(tx_stop_server);
    let server_ok = match server_handle.join() {
        Ok(server_report) => !server_report.has_error,
        Err(_) => {
            log::error!("The server thread panicked");
            false
        }
    };

    publish_report(&report, args.report_json.as_deref(), log_target);
    Ok(!report.has_error && server_ok)
}
