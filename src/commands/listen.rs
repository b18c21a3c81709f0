//! Listen command: the reset listener control loop
//!
//! Bind, wait for one trigger connection, redeploy, re-listen. The loop
//! never exits on its own; only a bind failure (fatal) or Ctrl-C ends it.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

use crate::deploy;
use crate::listener::{self, TriggerOutcome};
use crate::preflight;

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config_path)?;

    // A missing build tool would only surface mid-deploy otherwise; abort
    // before the socket is ever bound.
    preflight::check(&config)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::SeqCst);
        })
        .context("Failed to install Ctrl-C handler")?;
    }

    info!(
        "Redeploy pipeline armed: {} service(s) under {}",
        config.services.len(),
        config.source.root_dir().display()
    );

    loop {
        // Fresh socket every cycle; a bind failure is fatal, with no retry.
        let socket = listener::bind(&config.listener.bind, config.listener.port)?;

        match listener::await_trigger(&socket, &config.listener.token, &shutdown)? {
            TriggerOutcome::Triggered => {
                // Close the socket before mutating the working tree; a
                // second operator queues in the accept backlog until the
                // next cycle binds.
                drop(socket);

                if let Err(e) = deploy::run(&config) {
                    error!("Redeploy failed: {e:#}");
                }
            }
            TriggerOutcome::Disconnected => {
                info!("No trigger received, listening again");
            }
            TriggerOutcome::ShuttingDown => {
                info!("Shutdown requested, exiting");
                return Ok(());
            }
        }
    }
}
