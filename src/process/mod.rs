//! Process lifecycle utilities
//!
//! Liveness probes, pattern sweeps, and detached launches shared by the
//! redeploy pipeline.

use anyhow::{bail, Context, Result};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::fs::OpenOptions;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

const TERMINATE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Check if a process with the given PID is alive
///
/// Uses `kill -0` to check if the process exists and can receive signals.
/// This doesn't actually send a signal to the process, it only checks if
/// it exists and is owned by the current user (or we have permission to
/// signal it).
pub fn is_process_alive(pid: u32) -> bool {
    Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Terminate a process by PID: SIGTERM, wait up to `grace`, then SIGKILL.
///
/// Returns `true` if a process was found and signalled, `false` if no such
/// process was running. Signal delivery errors (e.g. the process exiting
/// between the liveness probe and the signal) are ignored.
pub fn terminate_pid(pid: u32, grace: Duration) -> bool {
    if !is_process_alive(pid) {
        return false;
    }

    let target = Pid::from_raw(pid as i32);
    let _ = kill(target, Signal::SIGTERM);

    let deadline = Instant::now() + grace;
    while Instant::now() < deadline {
        if !is_process_alive(pid) {
            return true;
        }
        thread::sleep(TERMINATE_POLL_INTERVAL);
    }

    debug!("pid {pid} survived SIGTERM, sending SIGKILL");
    let _ = kill(target, Signal::SIGKILL);
    true
}

/// Kill every process whose command line matches `pattern`.
///
/// Runs `pkill -f <pattern>`. Exit code 1 means nothing matched, which is
/// not an error; the sweep is expected to come up empty after the tracked
/// instance has already been terminated by PID.
pub fn kill_by_pattern(pattern: &str) -> Result<()> {
    let status = Command::new("pkill")
        .arg("-f")
        .arg(pattern)
        .status()
        .context("Failed to execute pkill")?;

    match status.code() {
        Some(0) | Some(1) => Ok(()),
        Some(code) => bail!("pkill -f '{pattern}' failed with exit code {code}"),
        None => bail!("pkill -f '{pattern}' was killed by a signal"),
    }
}

/// Launch a command detached from the calling process.
///
/// stdin is closed, stdout/stderr are appended to `log_path`, and the child
/// gets its own process group so a signal aimed at the listener does not
/// take the launched service down with it. Returns the child's PID; the
/// `Child` handle is handed to a reaper thread and not otherwise supervised.
pub fn spawn_detached(argv: &[String], cwd: &Path, log_path: &Path) -> Result<u32> {
    let (program, args) = argv
        .split_first()
        .context("Cannot launch an empty command")?;

    let log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log sink {}", log_path.display()))?;
    let log_err = log.try_clone().context("Failed to clone log sink")?;

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err))
        .process_group(0);

    let child = command
        .spawn()
        .with_context(|| format!("Failed to launch '{program}' in {}", cwd.display()))?;

    let pid = child.id();
    spawn_reaper_thread(child);

    Ok(pid)
}

/// Spawn a background thread to reap a child process when it exits.
///
/// The listener runs for a long time and never waits on launched services,
/// so without this every exited service would linger as a zombie.
fn spawn_reaper_thread(mut child: std::process::Child) {
    thread::spawn(move || {
        let _ = child.wait();
    });
}
