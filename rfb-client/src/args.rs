//! Command-line argument parsing for VNC client applications.
//!
//! This module is only available when the `cli` feature is enabled.
//! It provides a structured way to parse command-line arguments and
//! convert them into a `Config` object.
//!
//! # Examples
//!
//! ```no_run
//! use rfb_client::args::Args;
//! use rfb_client::Config;
//!
//! let args = Args::parse();
//! let config = Config::from_args(args)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::config::Config;
use crate::errors::RfbClientError;
use clap::Parser;

/// VNC client command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// VNC server address (host:port or host:display)
    ///
    /// Examples:
    ///   - localhost:5900
    ///   - 192.168.1.100:0 (display :0 = port 5900)
    ///   - vnc.example.com:1 (display :1 = port 5901)
    #[arg(value_name = "SERVER")]
    pub server: String,

    /// Server port (overrides port in SERVER if specified)
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Username for Apple Remote Desktop authentication
    #[arg(short = 'u', long, value_name = "USERNAME", env = "VNC_USERNAME")]
    pub username: Option<String>,

    /// Password for authentication
    #[arg(short = 'P', long, value_name = "PASSWORD", env = "VNC_PASSWORD")]
    pub password: Option<String>,

    /// Session timeout in milliseconds (0 disables it)
    #[arg(short = 't', long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Ask the server to disconnect other clients
    #[arg(long)]
    pub exclusive: bool,

    /// Do not keep pixel data locally
    #[arg(long)]
    pub discard_pixels: bool,

    /// Number of framebuffer updates to wait for before exiting (0 = run forever)
    #[arg(short = 'n', long, value_name = "COUNT", default_value_t = 0)]
    pub updates: u64,

    /// Configuration file path (TOML format)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Parse command-line arguments.
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse arguments from an iterator.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are invalid.
    pub fn try_parse_from<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Log filter directive implied by `-v` flags.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

impl Config {
    /// Create a configuration from command-line arguments.
    ///
    /// If a config file is specified in the arguments, it will be loaded
    /// first, then overridden by explicit command-line arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file cannot be read or parsed
    /// - The server address is invalid
    /// - The configuration validation fails
    pub fn from_args(args: Args) -> Result<Self, RfbClientError> {
        let mut config = match &args.config {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    RfbClientError::Config(format!("Failed to read config file '{}': {}", path, e))
                })?;
                toml::from_str(&text).map_err(|e| {
                    RfbClientError::Config(format!("Failed to parse config file '{}': {}", path, e))
                })?
            }
            None => Config::default(),
        };

        let (host, port) = parse_server_address(&args.server)?;
        config.connection.host = host;
        config.connection.port = args.port.unwrap_or(port);

        if args.username.is_some() {
            config.connection.username = args.username;
        }
        if args.password.is_some() {
            config.connection.password = args.password;
        }
        if let Some(timeout_ms) = args.timeout_ms {
            config.connection.timeout_ms = timeout_ms;
        }
        if args.exclusive {
            config.session.shared = false;
        }
        config.session.keep_framebuffer = !args.discard_pixels;

        config.validate()?;
        Ok(config)
    }
}

/// Parse server address in the format "host:port" or "host:display".
///
/// VNC display numbers (0-99) are converted to port numbers (5900-5999).
fn parse_server_address(server: &str) -> Result<(String, u16), RfbClientError> {
    if let Some((host, port_or_display)) = server.rsplit_once(':') {
        let num = port_or_display.parse::<u16>().map_err(|_| {
            RfbClientError::Config(format!(
                "Invalid port or display number: {}",
                port_or_display
            ))
        })?;

        let port = if num < 100 {
            // Display number: :0 = 5900, :1 = 5901, etc.
            5900 + num
        } else {
            num
        };

        Ok((host.to_string(), port))
    } else {
        Ok((server.to_string(), 5900))
    }
}
