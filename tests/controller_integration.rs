//! Integration tests for svcctl.
//!
//! These tests run the real subprocess executor against stand-in
//! `systemctl` and `apt` scripts written into a temporary directory.
//! The scripts record every invocation and answer from small state files.

#![cfg(unix)]

use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::json;
use tempfile::TempDir;

use svcctl::agent::{Action, ManagedService, ServiceAgent};
use svcctl::config::{
    read_service_config, write_service_config, Broker, CommandSettings, ServiceConfig,
};
use svcctl::controller::ServiceController;
use svcctl::error::{CommandErrorKind, ServiceError};
use svcctl::executor::{CancelToken, SystemRunner};
use svcctl::services::{to_service, Service, ServiceMap, ServiceState};

const SYSTEMCTL: &str = r#"#!/bin/sh
case "$1" in
  is-active|is-enabled)
    echo "systemctl $*" >> "@ROOT@/calls.log"
    f="@ROOT@/state/$1-$2"
    if [ -f "$f" ]; then
      value=$(cat "$f")
      echo "$value"
      [ "$value" = "active" ] && exit 0
      [ "$value" = "enabled" ] && exit 0
    fi
    exit 3
    ;;
  start|stop)
    echo "systemctl $*" >> "@ROOT@/calls.log"
    [ -f "@ROOT@/state/hang-$1-$2" ] && exec sleep 30
    if [ -f "@ROOT@/state/fail-$1-$2" ]; then
      echo "Job for $2.service failed." >&2
      exit 1
    fi
    exit 0
    ;;
esac
exit 0
"#;

const APT: &str = r#"#!/bin/sh
case "$1" in
  install|remove)
    echo "apt $*" >> "@ROOT@/calls.log"
    pkg="$3"
    if [ -f "@ROOT@/state/broken-$pkg" ]; then
      echo "Reading package lists..."
      echo "E: Unable to locate package $pkg" >&2
      exit 100
    fi
    echo "Setting up $pkg ..."
    exit 0
    ;;
  show)
    echo "apt $*" >> "@ROOT@/calls.log"
    echo "WARNING: apt does not have a stable CLI interface." >&2
    f="@ROOT@/state/version-$2"
    if [ -f "$f" ]; then
      echo "Package: $2"
      echo "Version: $(cat "$f")"
      echo "Priority: optional"
      exit 0
    fi
    echo "E: No packages found" >&2
    exit 100
    ;;
esac
exit 0
"#;

/// Temporary host with scripted service and package managers.
struct TestHost {
    root: TempDir,
    systemctl: PathBuf,
    apt: PathBuf,
}

impl TestHost {
    fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir_all(root.path().join("state")).expect("Failed to create state dir");
        fs::write(root.path().join("calls.log"), "").expect("Failed to create call log");

        let systemctl = install_script(root.path(), "systemctl", SYSTEMCTL);
        let apt = install_script(root.path(), "apt", APT);

        Self {
            root,
            systemctl,
            apt,
        }
    }

    fn set(&self, name: &str, value: &str) {
        fs::write(self.root.path().join("state").join(name), value)
            .expect("Failed to write state file");
    }

    fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.root.path().join("calls.log"))
            .expect("Failed to read call log")
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn commands(&self) -> CommandSettings {
        CommandSettings {
            service_manager: self.systemctl.display().to_string(),
            package_manager: self.apt.display().to_string(),
            status_timeout_seconds: 5,
            control_timeout_seconds: 1,
            install_timeout_seconds: 5,
            remove_timeout_seconds: 5,
            query_timeout_seconds: 5,
        }
    }

    fn controller(&self) -> ServiceController<SystemRunner> {
        ServiceController::new(SystemRunner::default(), self.commands())
    }

    fn relative_calls(&self) -> Vec<String> {
        let systemctl = self.systemctl.display().to_string();
        let apt = self.apt.display().to_string();
        self.calls()
            .into_iter()
            .map(|c| c.replace(&systemctl, "systemctl").replace(&apt, "apt"))
            .collect()
    }
}

fn install_script(root: &Path, name: &str, body: &str) -> PathBuf {
    let path = root.join(name);
    let body = body.replace("@ROOT@", &root.display().to_string());
    fs::write(&path, body).expect("Failed to write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("Failed to set script permissions");

    // A concurrently forked test process may briefly hold the write fd.
    for _ in 0..100 {
        match Command::new(&path).arg("warmup").output() {
            Err(e) if e.raw_os_error() == Some(26) => thread::sleep(Duration::from_millis(10)),
            _ => break,
        }
    }

    path
}

fn service(name: &str, package: &str) -> Service {
    Service {
        name: name.to_string(),
        package_name: package.to_string(),
        ..Service::default()
    }
}

fn service_map(entries: &[(&str, &str)]) -> ServiceMap {
    entries
        .iter()
        .map(|(name, package)| (name.to_string(), service(name, package)))
        .collect()
}

#[test]
fn test_status_mapping_through_real_processes() {
    let host = TestHost::new();
    host.set("is-active-crashed", "failed");
    host.set("is-enabled-crashed", "disabled");
    host.set("is-active-up", "active");
    host.set("is-active-idle", "inactive");
    host.set("is-enabled-idle", "disabled");
    host.set("is-active-ghost", "inactive");
    host.set("is-enabled-ghost", "enabled");

    let ctl = host.controller();
    assert_eq!(ctl.state(&service("crashed", "x")), ServiceState::Failed);
    assert_eq!(ctl.state(&service("up", "x")), ServiceState::Running);
    assert_eq!(ctl.state(&service("idle", "x")), ServiceState::Stopped);
    assert_eq!(ctl.state(&service("ghost", "x")), ServiceState::Missing);
    // No state files at all: both probes print nothing.
    assert_eq!(ctl.state(&service("unknown", "x")), ServiceState::Missing);

    let calls = host.relative_calls();
    assert!(!calls.contains(&"systemctl is-enabled crashed".to_string()));
    assert!(!calls.contains(&"systemctl is-enabled up".to_string()));
    assert!(calls.contains(&"systemctl is-enabled idle".to_string()));
}

#[test]
fn test_missing_service_manager() {
    let host = TestHost::new();
    let commands = CommandSettings {
        service_manager: host.root.path().join("no-such-systemctl").display().to_string(),
        ..host.commands()
    };
    let ctl = ServiceController::new(SystemRunner::default(), commands);
    let svc = service("broker", "mosquitto");

    assert_eq!(ctl.state(&svc), ServiceState::Missing);
    assert!(ctl.probe_state(&svc).is_err());
    assert_eq!(ctl.status(&svc).status, None);
    assert!(matches!(
        ctl.start(&svc),
        Err(ServiceError::Command {
            kind: CommandErrorKind::ExecutionFailed { .. }
        })
    ));
}

#[test]
fn test_install_and_remove_output() {
    let host = TestHost::new();
    host.set("broken-nosuchpkg", "");
    let ctl = host.controller();

    let output = ctl.install(&service("broker", "mosquitto")).unwrap();
    assert!(output.contains("Setting up mosquitto"));

    let err = ctl.install(&service("other", "nosuchpkg")).unwrap_err();
    let output = err.command_output().expect("failure carries output");
    assert!(output.contains("Reading package lists"));
    assert!(output.contains("Unable to locate package nosuchpkg"));

    ctl.remove(&service("broker", "mosquitto")).unwrap();

    assert_eq!(
        host.relative_calls(),
        vec![
            "apt install -y mosquitto",
            "apt install -y nosuchpkg",
            "apt remove -y mosquitto",
        ]
    );
}

#[test]
fn test_start_failure_reports_stderr() {
    let host = TestHost::new();
    host.set("fail-start-broker", "");
    let err = host.controller().start(&service("broker", "mosquitto")).unwrap_err();
    assert!(err
        .command_output()
        .is_some_and(|o| o.contains("Job for broker.service failed.")));
    host.controller().stop(&service("broker", "mosquitto")).unwrap();
}

#[test]
fn test_hung_command_times_out() {
    let host = TestHost::new();
    host.set("hang-start-broker", "");

    let start = Instant::now();
    let err = host.controller().start(&service("broker", "mosquitto")).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Command {
            kind: CommandErrorKind::Timeout { timeout_secs: 1 }
        }
    ));
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_package_version() {
    let host = TestHost::new();
    host.set("version-mosquitto", "1.2.3-ubuntu1");
    let ctl = host.controller();

    assert_eq!(
        ctl.package_version("mosquitto"),
        Some("1.2.3-ubuntu1".to_string())
    );
    assert_eq!(ctl.package_version("absent"), None);
    assert!(ctl.probe_package_version("absent").is_err());
}

#[test]
fn test_batch_install_attempts_every_package() {
    let host = TestHost::new();
    host.set("broken-pkg-a", "");
    host.set("broken-pkg-b", "");

    host.controller()
        .install_packages(&service_map(&[("a", "pkg-a"), ("b", "pkg-b")]));

    let mut calls = host.relative_calls();
    calls.sort();
    assert_eq!(calls, vec!["apt install -y pkg-a", "apt install -y pkg-b"]);
}

#[test]
fn test_batch_start_and_remove() {
    let host = TestHost::new();
    host.set("is-active-up", "active");
    host.set("is-active-down", "inactive");
    host.set("is-enabled-down", "disabled");
    let services = service_map(&[("up", "pkg-up"), ("down", "pkg-down")]);
    let ctl = host.controller();

    ctl.start_services(&services);
    let calls = host.relative_calls();
    assert!(calls.contains(&"systemctl start down".to_string()));
    assert!(!calls.contains(&"systemctl start up".to_string()));

    ctl.remove_services(&services);
    let calls = host.relative_calls();
    for (unit, package) in [("up", "pkg-up"), ("down", "pkg-down")] {
        let stop = calls
            .iter()
            .position(|c| c == &format!("systemctl stop {unit}"))
            .expect("stop issued");
        assert_eq!(calls[stop + 1], format!("apt remove -y {package}"));
    }
}

#[test]
fn test_agent_stop_interrupts_running_command() {
    let host = TestHost::new();
    host.set("is-active-broker", "inactive");
    host.set("hang-start-broker", "");

    let cancel = CancelToken::new();
    let commands = CommandSettings {
        control_timeout_seconds: 60,
        ..host.commands()
    };
    let controller = ServiceController::new(SystemRunner::new(cancel.clone()), commands);
    let agent = Arc::new(
        ServiceAgent::new(controller, Action::Start, cancel)
            .with_services(service_map(&[("broker", "mosquitto")])),
    );

    let worker = Arc::clone(&agent);
    let started = Instant::now();
    let handle = thread::spawn(move || worker.run());

    thread::sleep(Duration::from_millis(500));
    agent.stop();

    let result = handle.join().expect("worker panicked");
    assert!(matches!(
        result,
        Err(ServiceError::Command {
            kind: CommandErrorKind::Cancelled
        })
    ));
    assert!(started.elapsed() < Duration::from_secs(20));
}

#[test]
fn test_agent_status_from_services_file() {
    let host = TestHost::new();
    host.set("is-active-mosquitto", "active");
    host.set("is-active-scylla", "failed");

    let services_file = host.root.path().join("services.json");
    fs::write(
        &services_file,
        json!({
            "broker": {"name": "mosquitto", "packageName": "mosquitto"},
            "db": {"name": "scylla", "packageName": "scylla-server"}
        })
        .to_string(),
    )
    .unwrap();

    let mut agent = ServiceAgent::new(host.controller(), Action::Status, CancelToken::new());
    agent.initialize(&services_file).unwrap();
    agent.run().unwrap();

    let statuses: HashMap<String, Option<String>> = agent
        .statuses()
        .into_iter()
        .map(|s| (s.service.name, s.status))
        .collect();
    assert_eq!(statuses["mosquitto"].as_deref(), Some("running"));
    assert_eq!(statuses["scylla"].as_deref(), Some("failed"));
}

#[test]
fn test_service_config_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gateway.json");

    let config = ServiceConfig {
        local_broker: Broker {
            ip: "127.0.0.1".to_string(),
            port: "1883".to_string(),
            ..Broker::default()
        },
        log_level: String::new(),
        ..ServiceConfig::default()
    };
    write_service_config(&path, &config).unwrap();

    let loaded = read_service_config(&path).unwrap();
    assert_eq!(loaded.log_level, "INFO");
    assert_eq!(loaded.local_broker, config.local_broker);

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["localBroker"]["port"], "1883");
    assert_eq!(raw["logLevel"], "");
}

#[test]
fn test_service_descriptor_with_embedded_config() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("broker.json");
    fs::write(
        &config_path,
        json!({
            "networkBroker": {"ip": "10.0.0.5", "port": "8883", "caPath": "/etc/ssl/ca.pem"},
            "db": {"dbCluster": {"connectors": [{"ip": "10.0.0.10", "port": "9042"}]}}
        })
        .to_string(),
    )
    .unwrap();

    let mut service = to_service(&json!({
        "name": "mosquitto",
        "units": ["mosquitto.service"],
        "packageName": "mosquitto",
        "configFile": config_path,
    }))
    .unwrap();
    service.config = read_service_config(&service.config_file).unwrap();

    assert_eq!(service.config.network_broker.ca_path, "/etc/ssl/ca.pem");
    assert_eq!(service.config.db.db_cluster.connectors.len(), 1);
    assert_eq!(service.config.log_level, "INFO");
}
