//! Headless VNC client example - connect and log framebuffer updates.
//!
//! Usage:
//!   cargo run --example headless_connect --features cli -- localhost:5900 -P secret -n 10
//!
//! This example demonstrates:
//! - Building a configuration from command-line arguments
//! - Driving the poll loop until the handshake completes
//! - Supplying credentials when the server asks for them
//! - Requesting framebuffer updates and watching the version counter

use rfb_client::args::Args;
use rfb_client::{net, Config, ErrorCode, VncClient};
use std::io::{self, BufRead, Write};
use std::time::Duration;
use tracing::{error, info, warn};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_filter())),
        )
        .init();

    let wanted = args.updates;
    let config = Config::from_args(args)?;
    info!(
        "Connecting to {}:{}",
        config.connection.host, config.connection.port
    );

    net::initialize();
    let result = run(&config, wanted);
    net::deinitialize();
    result
}

fn run(config: &Config, wanted: u64) -> anyhow::Result<()> {
    let mut client = VncClient::from_config(config);
    let timeout = config.timeout();

    // Handshake, prompting for credentials when needed.
    while !client.is_connected() {
        if !client.advance(timeout) {
            anyhow::bail!(
                "connection failed: {}",
                client.error_description().unwrap_or("unknown error")
            );
        }

        match client.error_code() {
            ErrorCode::PasswordRequired => {
                let password = prompt("Password: ")?;
                client.set_password(password);
            }
            ErrorCode::CredentialsRequired => {
                let username = prompt("Username: ")?;
                let password = prompt("Password: ")?;
                client.set_credentials(username, password);
            }
            _ => {}
        }

        if client.state().is_terminal() {
            if let Some(reason) = client.failure_reason() {
                warn!("Server said: {}", reason);
            }
            anyhow::bail!(
                "handshake failed: {}",
                client.error_description().unwrap_or("unknown error")
            );
        }
    }

    info!(
        "Connected to {:?}: {}x{} @ {} bytes/pixel",
        client.server_name().unwrap_or_default(),
        client.framebuffer_width(),
        client.framebuffer_height(),
        client.framebuffer_bytes_per_pixel()
    );

    client.request_full_update(false);
    let mut seen = client.framebuffer_version();
    let mut updates = 0u64;

    // The session timeout only guards the handshake.
    while client.advance(None) {
        if client.state().is_terminal() {
            error!(
                "Session failed: {}",
                client.error_description().unwrap_or("unknown error")
            );
            break;
        }
        if client.peer_closed() {
            info!("Server closed the connection");
            break;
        }

        let version = client.framebuffer_version();
        if version != seen {
            updates += 1;
            info!(
                "Framebuffer version {} ({} bytes)",
                version,
                client.framebuffer().map_or(0, <[u8]>::len)
            );
            seen = version;

            if wanted > 0 && updates >= wanted {
                break;
            }
            client.request_full_update(true);
        }

        std::thread::sleep(Duration::from_millis(1));
    }

    client.disconnect();
    info!("Disconnected after {} updates", updates);
    Ok(())
}

fn prompt(label: &str) -> io::Result<String> {
    let mut out = io::stdout();
    out.write_all(label.as_bytes())?;
    out.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
