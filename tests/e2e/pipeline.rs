//! Full pipeline runs against scratch directories.
//!
//! Steps are `/bin/sh` one-liners that leave markers on disk, and launches
//! are real detached processes, so ordering and liveness can be asserted
//! from the outside.

use respin::config::{Config, ListenerConfig, ServiceConfig, SourceConfig};
use respin::deploy;
use respin::process::{is_process_alive, terminate_pid};
use respin::state::StateDir;
use serial_test::serial;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn sh(cmd: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), cmd.to_string()]
}

fn base_config(root: &Path) -> Config {
    Config {
        listener: ListenerConfig::default(),
        source: SourceConfig {
            root: root.display().to_string(),
            stash: false,
        },
        services: Vec::new(),
    }
}

fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    condition()
}

#[test]
#[serial]
fn pipeline_runs_every_step_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let mut config = base_config(root);
    config.source.stash = true;
    config.services.push(ServiceConfig {
        name: "web".to_string(),
        path: ".".to_string(),
        install: sh("echo install >> steps.txt"),
        build: sh("echo build >> steps.txt"),
        kill_patterns: vec!["respin-e2e-no-such-pattern".to_string()],
        launch: vec!["sleep".to_string(), "30".to_string()],
    });

    let record = deploy::run(&config).unwrap();

    let labels: Vec<&str> = record.steps.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "git stash",
            "git pull",
            "web: install",
            "web: build",
            "web: pkill respin-e2e-no-such-pattern",
            "web: launch",
        ]
    );

    // The scratch root is not a repository: the refresh fails, but the
    // pipeline proceeds to every remaining step anyway.
    assert!(record.steps[0].status.is_failed());
    assert!(record.steps[1].status.is_failed());
    assert!(!record.steps[5].status.is_failed());

    let steps = std::fs::read_to_string(root.join("steps.txt")).unwrap();
    assert_eq!(steps, "install\nbuild\n");

    // The launch is tracked, alive, and logging into the state directory
    let registry = StateDir::new(root).load_registry();
    let pid = registry.get("web").unwrap().pid;
    assert!(is_process_alive(pid));
    assert!(root.join(".respin/logs/web.log").exists());
    assert!(root.join(".respin/deploys.jsonl").exists());

    terminate_pid(pid, Duration::from_secs(5));
}

#[test]
#[serial]
fn second_deploy_stops_the_tracked_instance_before_launching() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let mut config = base_config(root);
    config.services.push(ServiceConfig {
        name: "web".to_string(),
        path: ".".to_string(),
        install: Vec::new(),
        build: Vec::new(),
        kill_patterns: Vec::new(),
        launch: vec!["sleep".to_string(), "30".to_string()],
    });

    let first = deploy::run(&config).unwrap();
    // stash = false: the refresh is a bare pull
    assert_eq!(first.steps[0].label, "git pull");
    assert!(!first.steps.iter().any(|s| s.label == "git stash"));

    let pid_one = StateDir::new(root).load_registry().get("web").unwrap().pid;
    assert!(is_process_alive(pid_one));

    let second = deploy::run(&config).unwrap();
    let pid_two = StateDir::new(root).load_registry().get("web").unwrap().pid;

    assert_ne!(pid_one, pid_two);
    assert!(is_process_alive(pid_two));
    assert!(wait_until(Duration::from_secs(5), || !is_process_alive(pid_one)));

    // The stop of the previous instance is recorded strictly before the
    // launch of the new one.
    let labels: Vec<&str> = second.steps.iter().map(|s| s.label.as_str()).collect();
    let stop_idx = labels
        .iter()
        .position(|l| l.starts_with("web: stop pid"))
        .expect("Second deploy should record a stop step");
    let launch_idx = labels.iter().position(|l| *l == "web: launch").unwrap();
    assert!(stop_idx < launch_idx);

    terminate_pid(pid_two, Duration::from_secs(5));
}

#[test]
#[serial]
fn failed_build_still_proceeds_to_launch() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let mut config = base_config(root);
    config.services.push(ServiceConfig {
        name: "web".to_string(),
        path: ".".to_string(),
        install: Vec::new(),
        build: sh("echo no >&2; exit 1"),
        kill_patterns: Vec::new(),
        launch: sh("echo launched >> launched.txt"),
    });

    let record = deploy::run(&config).unwrap();

    let build = record
        .steps
        .iter()
        .find(|s| s.label == "web: build")
        .unwrap();
    assert!(build.status.is_failed());

    let launch = record
        .steps
        .iter()
        .find(|s| s.label == "web: launch")
        .unwrap();
    assert!(!launch.status.is_failed());

    // The launch is detached; give it a moment to run.
    assert!(wait_until(Duration::from_secs(5), || root
        .join("launched.txt")
        .exists()));
}

#[test]
#[serial]
fn deploy_history_accumulates_records() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let mut config = base_config(root);
    config.services.push(ServiceConfig {
        name: "web".to_string(),
        path: ".".to_string(),
        install: Vec::new(),
        build: Vec::new(),
        kill_patterns: Vec::new(),
        launch: sh("true"),
    });

    deploy::run(&config).unwrap();
    deploy::run(&config).unwrap();

    let state = StateDir::new(root);
    let last = state.last_record().expect("Should have a deploy record");
    assert!(last.steps.iter().any(|s| s.label == "web: launch"));

    let history = std::fs::read_to_string(root.join(".respin/deploys.jsonl")).unwrap();
    assert_eq!(history.lines().count(), 2);
}
