//! Working-tree refresh
//!
//! Stash-then-pull on the configured repository root, run before any
//! service is touched. Failures (merge conflicts, network errors, not a
//! repository) are reported as step outcomes; the pipeline still proceeds
//! to the redeploy steps, rebuilding whatever is on disk.

use std::path::Path;

use super::{run_command, StepOutcome};

/// Refresh the working tree at `root` from its configured remote.
///
/// Invoked exactly once per trigger, strictly before any redeploy step.
pub fn refresh_source(root: &Path, stash: bool) -> Vec<StepOutcome> {
    let mut outcomes = Vec::new();

    if stash {
        // Uncommitted local edits (including untracked files) would make
        // the pull fail outright; park them in the stash instead.
        outcomes.push(run_git(root, &["stash", "--include-untracked"], "git stash"));
    }

    outcomes.push(run_git(root, &["pull"], "git pull"));
    outcomes
}

fn run_git(root: &Path, args: &[&str], label: &str) -> StepOutcome {
    let mut argv = vec![
        "git".to_string(),
        "-C".to_string(),
        root.display().to_string(),
    ];
    argv.extend(args.iter().map(|s| s.to_string()));
    run_command(label, &argv, None)
}
