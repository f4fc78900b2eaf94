//! `LineChat` relay server.
//!
//! Serves the line chat over TCP and runs the UDP announcement channel:
//! received datagrams are printed, and every line typed on stdin is sent as
//! a timestamped datagram to the configured host and UDP port.
//!
//! # Usage
//!
//! ```bash
//! # Random ports in 8000-8999 (TCP) and 9000-9999 (UDP)
//! cargo run --bin linechat-relay
//!
//! # Fixed ports
//! cargo run --bin linechat-relay -- --tcp-port 8080 --udp-port 9090
//!
//! # Or via environment variables
//! LINECHAT_TCP_PORT=8080 cargo run --bin linechat-relay
//! ```

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use linechat_relay::announce::{self, AnnouncementChannel};
use linechat_relay::config::{RelayCliArgs, RelayConfig};
use linechat_relay::console::{self, ChannelLines, ConsoleEvents, LineSource};
use linechat_relay::error::RelayError;
use linechat_relay::relay::{self, RelayState};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = RelayCliArgs::parse();

    // Held until the end of `main` so buffered log records are flushed.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    let (mut config, config_error) = RelayConfig::load(&cli);
    match config_error {
        Some(e) => tracing::warn!(error = %e, "failed to load config file, using defaults"),
        None => tracing::info!("configuration loaded"),
    }

    // Read on a detached thread: a pending stdin read must not delay exit.
    let mut operator = match ChannelLines::stdin() {
        Ok(operator) => operator,
        Err(e) => {
            tracing::error!(error = %e, "failed to start operator input");
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.ask_udp_port {
        match console::prompt_port_override(&mut operator, &mut std::io::stdout(), config.udp_port)
            .await
        {
            Ok(port) => config.udp_port = port,
            Err(e) => tracing::warn!(error = %e, "failed to read UDP port override"),
        }
    }

    match run(&config, &mut operator).await {
        Ok(()) => {
            tracing::info!("relay shutting down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "relay failed to start");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Starts both channels and runs until interrupted.
async fn run<S: LineSource>(config: &RelayConfig, operator: &mut S) -> Result<(), RelayError> {
    let state = Arc::new(
        RelayState::with_settings(config.settings()).with_events(Arc::new(ConsoleEvents)),
    );
    let (tcp_addr, server) = relay::start_server_with_state(&config.tcp_addr(), state).await?;

    let target = announce::resolve_target(&config.host, config.udp_port).await?;
    let channel = AnnouncementChannel::bind(config.udp_port, target)?;

    tracing::info!(addr = %tcp_addr, "relay listening");
    tracing::info!(port = config.udp_port, %target, "announcement channel ready");
    println!("TCP relay listening on {tcp_addr}");
    println!("UDP announcements on port {} (sending to {target})", config.udp_port);

    let receiver = channel.spawn_receiver(|line| println!("{line}"));

    println!("Type a message to send over UDP:");
    let _ = std::io::stdout().flush();

    let sender = async {
        match channel.run_sender(operator).await {
            Ok(sent) => tracing::info!(sent, "operator input closed"),
            Err(e) => tracing::warn!(error = %e, "operator input failed"),
        }
        // The relay keeps serving after stdin closes.
        std::future::pending::<()>().await;
    };

    tokio::select! {
        () = sender => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!(error = %e, "failed to listen for interrupt");
            } else {
                println!("Shutting down...");
                tracing::info!("interrupt received");
            }
        }
        joined = server => {
            if let Err(e) = joined {
                tracing::error!(error = %e, "relay listener task failed");
            }
        }
    }

    receiver.abort();
    Ok(())
}

/// Initialize logging to stderr or, with `--log-file`, to a file.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> WorkerGuard {
    let file = file_path.and_then(|path| Some((path.parent()?, path.file_name()?)));

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if let Some((dir, name)) = file {
        let file_appender = tracing_appender::rolling::never(dir, name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        tracing_subscriber::fmt()
            .with_writer(non_blocking)
            .with_env_filter(env_filter)
            .with_ansi(false)
            .init();
        guard
    } else {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());
        tracing_subscriber::fmt()
            .with_writer(non_blocking)
            .with_env_filter(env_filter)
            .init();
        guard
    }
}
