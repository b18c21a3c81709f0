//! Per-service redeploy
//!
//! install -> build -> terminate prior instances -> launch, in that order.
//! The termination step always runs strictly before the launch step so old
//! and new instances never contend for the same port; the cost is a brief
//! downtime window while the new instance starts.

use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{run_command, StepOutcome};
use crate::config::ServiceConfig;
use crate::process;
use crate::state::{ServiceRegistry, StateDir};

/// How long a previous instance gets to exit on SIGTERM before SIGKILL.
const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// Run every step for one service. Step failures are recorded, not fatal:
/// a failed build still proceeds to kill-and-launch, matching the
/// rebuild-whatever-is-there contract of the refresh step.
pub fn redeploy(
    service: &ServiceConfig,
    root: &Path,
    state: &StateDir,
    registry: &mut ServiceRegistry,
) -> Vec<StepOutcome> {
    let mut outcomes = Vec::new();
    let dir = service.work_dir(root);
    let name = &service.name;

    if !service.install.is_empty() {
        outcomes.push(run_command(
            &format!("{name}: install"),
            &service.install,
            Some(&dir),
        ));
    }

    if !service.build.is_empty() {
        outcomes.push(run_command(
            &format!("{name}: build"),
            &service.build,
            Some(&dir),
        ));
    }

    // The instance we launched last time is stopped by its tracked pid, so
    // an unrelated process sharing a name pattern is never the casualty.
    if let Some(prev) = registry.get(name) {
        let label = format!("{name}: stop pid {}", prev.pid);
        info!("Running {label}");
        if process::terminate_pid(prev.pid, TERMINATE_GRACE) {
            info!("Stopped previous {name} instance (pid {})", prev.pid);
        } else {
            debug!("Previous {name} instance (pid {}) already gone", prev.pid);
        }
        outcomes.push(StepOutcome::success(&label));
    }

    // Pattern sweep for instances respin did not launch.
    for pattern in &service.kill_patterns {
        let label = format!("{name}: pkill {pattern}");
        info!("Running {label}");
        match process::kill_by_pattern(pattern) {
            Ok(()) => outcomes.push(StepOutcome::success(&label)),
            Err(e) => {
                warn!("{label} failed: {e:#}");
                outcomes.push(StepOutcome::failed(&label, format!("{e:#}")));
            }
        }
    }

    let label = format!("{name}: launch");
    info!("Running {label}");
    match process::spawn_detached(&service.launch, &dir, &state.service_log(name)) {
        Ok(pid) => {
            info!("Launched {name} (pid {pid})");
            registry.record(name, pid);
            outcomes.push(StepOutcome::success(&label));
        }
        Err(e) => {
            warn!("{label} failed: {e:#}");
            outcomes.push(StepOutcome::failed(&label, format!("{e:#}")));
        }
    }

    outcomes
}
