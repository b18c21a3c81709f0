//! Trigger command: poke a running listener
//!
//! Connects to the listener and sends the trigger token as a single
//! plaintext payload. Host, port, and token can be given on the command
//! line; anything omitted is taken from the config file.

use anyhow::{Context, Result};
use colored::Colorize;
use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::path::PathBuf;

pub fn execute(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    token: Option<String>,
) -> Result<()> {
    let (host, port, token) = resolve(config_path, host, port, token)?;

    let mut stream = TcpStream::connect((host.as_str(), port))
        .with_context(|| format!("Failed to connect to {host}:{port} (is the listener running?)"))?;

    stream
        .write_all(token.as_bytes())
        .context("Failed to send trigger token")?;

    // Close both directions so the listener sees the payload and then EOF.
    stream.shutdown(Shutdown::Both).ok();

    println!(
        "{} Sent {:?} to {}",
        "✓".green().bold(),
        token,
        format!("{host}:{port}").dimmed()
    );
    Ok(())
}

/// Fill in whatever the command line left out from the config file. The
/// config is only loaded when something is actually missing, so a fully
/// specified trigger works without one.
fn resolve(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    token: Option<String>,
) -> Result<(String, u16, String)> {
    if let (Some(host), Some(port), Some(token)) = (host.clone(), port, token.clone()) {
        return Ok((host, port, token));
    }

    let config = super::load_config(config_path)?;
    let host = host.unwrap_or_else(|| connect_host(&config.listener.bind));
    let port = port.unwrap_or(config.listener.port);
    let token = token.unwrap_or(config.listener.token);
    Ok((host, port, token))
}

/// A listener bound to all interfaces is reached via loopback.
fn connect_host(bind: &str) -> String {
    if bind == "0.0.0.0" {
        "127.0.0.1".to_string()
    } else {
        bind.to_string()
    }
}
