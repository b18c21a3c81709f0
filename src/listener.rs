//! TCP trigger listener
//!
//! One listen cycle: bind, accept a single connection, read until the
//! trigger token arrives or the peer disconnects. The socket is dropped
//! after every cycle and bound fresh on the next one.

use anyhow::{Context, Result};
use std::io::Read;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Chunk size for reads from the trigger connection. A trigger token is
/// expected to arrive as a single chunk well under this size.
const READ_CHUNK_BYTES: usize = 1024;

/// How often the accept loop re-checks the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Result of one listen cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The peer sent a chunk exactly matching the trigger token.
    Triggered,
    /// The peer disconnected without sending the token. Not an error;
    /// the caller re-listens.
    Disconnected,
    /// The shutdown flag was set while waiting for a connection.
    ShuttingDown,
}

/// Bind the trigger socket.
///
/// A bind failure (port held by another process) is fatal to the listener;
/// there is no retry. std sets `SO_REUSEADDR` on Unix, so the
/// rebind-per-cycle loop does not trip over sockets left in TIME_WAIT.
pub fn bind(addr: &str, port: u16) -> Result<TcpListener> {
    let listener =
        TcpListener::bind((addr, port)).with_context(|| format!("Failed to bind {addr}:{port}"))?;

    // Non-blocking so the accept wait can poll the shutdown flag. The
    // accepted stream is switched back to blocking before reading.
    listener
        .set_nonblocking(true)
        .context("Failed to set listener to non-blocking")?;

    info!("Listening on port {port}");
    Ok(listener)
}

/// Wait for one connection and read from it until the token arrives or the
/// peer goes away.
///
/// Blocks until one of the [`TriggerOutcome`] cases happens. There is
/// deliberately no read timeout: a connected client that never sends and
/// never closes hangs the listener.
pub fn await_trigger(
    listener: &TcpListener,
    token: &str,
    shutdown: &AtomicBool,
) -> Result<TriggerOutcome> {
    let (stream, peer) = loop {
        if shutdown.load(Ordering::SeqCst) {
            return Ok(TriggerOutcome::ShuttingDown);
        }
        match listener.accept() {
            Ok(pair) => break pair,
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(e) => return Err(e).context("Failed to accept connection"),
        }
    };

    read_trigger(stream, peer, token)
}

fn read_trigger(mut stream: TcpStream, peer: SocketAddr, token: &str) -> Result<TriggerOutcome> {
    // The accepted stream may inherit non-blocking mode from the listener;
    // reads here must block.
    stream
        .set_nonblocking(false)
        .context("Failed to set connection to blocking")?;

    info!("Connected by {peer}");

    let mut buf = [0u8; READ_CHUNK_BYTES];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) => return Ok(TriggerOutcome::Disconnected),
            Ok(n) => n,
            Err(e) => {
                // Abrupt close, reset, partial read error: same as no trigger
                debug!("Read error from {peer}: {e}");
                return Ok(TriggerOutcome::Disconnected);
            }
        };

        match std::str::from_utf8(&buf[..n]) {
            Ok(text) if text == token => {
                info!("Received '{token}' command from {peer}");
                return Ok(TriggerOutcome::Triggered);
            }
            Ok(text) => debug!("Ignoring payload from {peer}: {:?}", text),
            Err(_) => debug!("Ignoring non-UTF-8 payload from {peer}"),
        }
    }
}
