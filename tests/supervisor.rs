// tests/supervisor.rs
#![cfg(target_os = "linux")]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use launcher::errors::LauncherError;
use launcher::launch::{
    ArgumentPassing, LaunchOutcome, LaunchRequest, RealLaunchBackend, StopOutcome, Supervisor,
};
use launcher::template::Ambient;
use launcher_test_utils::{LauncherHome, MetadataBuilder, init_tracing, with_timeout};
use tokio::sync::Mutex;

const META: &str = "org/example/svc-meta/1.0/svc-meta-1.0.tar.gz";

/// Writing an executable while another test forks can leave it busy, so
/// tests that spawn run one at a time.
static SPAWN_LOCK: Mutex<()> = Mutex::const_new(());

const FAKE_JAVA: &str = r#"#!/bin/sh
cat "${1#@}" > args.txt
echo "$APP_MODE" > env.txt
echo started
exec sleep 30
"#;

fn home() -> LauncherHome {
    let home = LauncherHome::new().write("jdk/bin/java", FAKE_JAVA);
    let java = home.path().join("jdk/bin/java");
    fs::set_permissions(&java, fs::Permissions::from_mode(0o755)).unwrap();

    let jdk = home.path().join("jdk").display().to_string();
    home.with_profile_config("prod", &[("java.home", jdk.as_str()), ("mode", "green")])
        .with_command("prod", "svc", "org.example:svc-meta:1.0")
        .with_metadata(
            META,
            &MetadataBuilder::new("${systemProperties} com.example.Main ${arguments}")
                .with_env("APP_MODE", "${mode}")
                .with_system_property("app.name", "demo"),
        )
}

struct Harness {
    home: LauncherHome,
    ambient: Ambient,
}

impl Harness {
    fn new() -> Self {
        Self {
            home: home(),
            ambient: Ambient::default(),
        }
    }

    fn work_file(&self, name: &str) -> PathBuf {
        self.home.layout().work_dir("prod", "svc").join(name)
    }

    fn pid_file(&self) -> PathBuf {
        self.home.layout().pid_file("prod", "svc")
    }

    async fn start(&self, passing: ArgumentPassing) -> launcher::errors::Result<LaunchOutcome> {
        let (layout, repository, cache) =
            (self.home.layout(), self.home.repository(), self.home.cache());
        let supervisor = Supervisor::new(&layout, &repository, &cache, &self.ambient);
        let request = LaunchRequest::new("prod", "svc").with_args(["--port", "8080"]);
        supervisor
            .start(&request, &RealLaunchBackend::with_passing(passing))
            .await
    }

    async fn stop(&self, forcibly: bool) -> StopOutcome {
        let (layout, repository, cache) =
            (self.home.layout(), self.home.repository(), self.home.cache());
        let supervisor = Supervisor::new(&layout, &repository, &cache, &self.ambient);
        let outcome = if forcibly {
            supervisor.kill("prod", "svc").await
        } else {
            supervisor.stop("prod", "svc").await
        };
        outcome.unwrap()
    }
}

async fn wait_for_file(path: &Path) -> String {
    with_timeout(async {
        loop {
            if let Ok(contents) = fs::read_to_string(path) {
                if !contents.is_empty() {
                    return contents;
                }
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await
}

fn started_pid(outcome: LaunchOutcome) -> u32 {
    match outcome {
        LaunchOutcome::Started { pid } => pid,
        other => panic!("expected a started process, got {other:?}"),
    }
}

#[tokio::test]
async fn start_then_stop_through_stdin_indirection() {
    init_tracing();
    let _guard = SPAWN_LOCK.lock().await;
    let harness = Harness::new();

    let pid = started_pid(harness.start(ArgumentPassing::Stdin).await.unwrap());
    assert_eq!(fs::read_to_string(harness.pid_file()).unwrap(), pid.to_string());

    let args = wait_for_file(&harness.work_file("args.txt")).await;
    assert_eq!(args, "\"-Dapp.name=demo\" com.example.Main --port 8080");
    assert_eq!(wait_for_file(&harness.work_file("env.txt")).await, "green\n");

    assert_eq!(harness.stop(false).await, StopOutcome::Terminated(pid));
    assert!(!harness.pid_file().exists());

    let log_dir = harness.home.layout().log_dir("prod", "svc");
    let logs: Vec<_> = fs::read_dir(log_dir).unwrap().collect();
    assert_eq!(logs.len(), 1);
    let log = logs.into_iter().next().unwrap().unwrap().path();
    assert_eq!(fs::read_to_string(log).unwrap(), "started\n");
}

#[tokio::test]
async fn argument_file_fallback_hands_over_the_same_blob() {
    let _guard = SPAWN_LOCK.lock().await;
    let harness = Harness::new();

    let pid = started_pid(harness.start(ArgumentPassing::File).await.unwrap());
    let args = wait_for_file(&harness.work_file("args.txt")).await;
    assert_eq!(args, "\"-Dapp.name=demo\" com.example.Main --port 8080");
    assert!(harness.home.layout().args_file("prod", "svc").is_file());

    assert_eq!(harness.stop(true).await, StopOutcome::Killed(pid));
    assert!(!harness.pid_file().exists());
}

#[tokio::test]
async fn second_start_is_refused_while_running() {
    let _guard = SPAWN_LOCK.lock().await;
    let harness = Harness::new();

    let pid = started_pid(harness.start(ArgumentPassing::Stdin).await.unwrap());
    wait_for_file(&harness.work_file("env.txt")).await;

    let err = harness.start(ArgumentPassing::Stdin).await.unwrap_err();
    assert!(matches!(err, LauncherError::AlreadyRunning(running) if running == pid));

    assert_eq!(harness.stop(true).await, StopOutcome::Killed(pid));
}

#[tokio::test]
async fn stop_without_pid_file_reports_it() {
    let harness = Harness::new();
    assert_eq!(harness.stop(false).await, StopOutcome::PidFileNotFound);
    assert_eq!(harness.stop(true).await, StopOutcome::PidFileNotFound);
}

#[tokio::test]
async fn stale_pid_file_is_cleared() {
    let harness = Harness::new();
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let stale = child.id();
    child.wait().unwrap();

    fs::create_dir_all(harness.pid_file().parent().unwrap()).unwrap();
    fs::write(harness.pid_file(), stale.to_string()).unwrap();

    assert_eq!(harness.stop(false).await, StopOutcome::ProcessNotFound(stale));
    assert!(!harness.pid_file().exists());
}

#[tokio::test]
async fn garbage_pid_file_is_an_error() {
    let harness = Harness::new();
    fs::create_dir_all(harness.pid_file().parent().unwrap()).unwrap();
    fs::write(harness.pid_file(), "not-a-pid").unwrap();

    let (layout, repository, cache) =
        (harness.home.layout(), harness.home.repository(), harness.home.cache());
    let supervisor = Supervisor::new(&layout, &repository, &cache, &harness.ambient);
    let err = supervisor.stop("prod", "svc").await.unwrap_err();
    assert!(matches!(err, LauncherError::InvalidPidFile { .. }));
    assert!(harness.pid_file().exists());
}
