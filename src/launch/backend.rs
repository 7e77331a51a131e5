// src/launch/backend.rs

//! Pluggable launch backend.
//!
//! The supervisor hands a finished [`LaunchPlan`] to a `LaunchBackend`
//! instead of spawning directly:
//!
//! - [`RealLaunchBackend`] creates the command's runtime directories, spawns
//!   the executable with argument-file indirection and records the PID.
//! - [`DryRunBackend`] renders the plan to stdout and touches nothing.
//!
//! Tests plug in their own backend to observe plans without processes.

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::future::Future;
use std::io::Write as _;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{Context, anyhow};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use super::escape::{escape_arg, escape_env};
use super::plan::LaunchPlan;
use super::process::write_pid_file;
use crate::errors::Result;

/// Directory whose presence means `/dev/fd/0` names the child's stdin.
const DEV_FD: &str = "/dev/fd";

/// What a backend did with a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    Started { pid: u32 },
    DryRun,
}

pub trait LaunchBackend: Send + Sync {
    fn launch<'a>(
        &'a self,
        plan: &'a LaunchPlan,
    ) -> Pin<Box<dyn Future<Output = Result<LaunchOutcome>> + Send + 'a>>;
}

/// How the argument blob reaches the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentPassing {
    /// `@/dev/fd/0`, blob written to the child's stdin.
    Stdin,
    /// `@<args file>`, stdin closed.
    File,
}

impl ArgumentPassing {
    pub fn detect() -> Self {
        if Path::new(DEV_FD).exists() {
            ArgumentPassing::Stdin
        } else {
            ArgumentPassing::File
        }
    }
}

/// Spawns real processes.
#[derive(Debug, Clone)]
pub struct RealLaunchBackend {
    passing: ArgumentPassing,
}

impl RealLaunchBackend {
    pub fn new() -> Self {
        Self::with_passing(ArgumentPassing::detect())
    }

    pub fn with_passing(passing: ArgumentPassing) -> Self {
        Self { passing }
    }
}

impl Default for RealLaunchBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LaunchBackend for RealLaunchBackend {
    fn launch<'a>(
        &'a self,
        plan: &'a LaunchPlan,
    ) -> Pin<Box<dyn Future<Output = Result<LaunchOutcome>> + Send + 'a>> {
        Box::pin(async move {
            let pid = spawn(plan, self.passing).await?;
            Ok(LaunchOutcome::Started { pid })
        })
    }
}

async fn spawn(plan: &LaunchPlan, passing: ArgumentPassing) -> anyhow::Result<u32> {
    for dir in [parent(&plan.log_file)?, plan.work_dir.as_path(), parent(&plan.pid_file)?] {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&plan.log_file)
        .with_context(|| format!("opening log file {}", plan.log_file.display()))?;
    let log_err = log.try_clone().context("duplicating log file handle")?;

    let mut cmd = Command::new(&plan.executable);
    cmd.envs(&plan.environment)
        .current_dir(&plan.work_dir)
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err));

    match passing {
        ArgumentPassing::Stdin => {
            cmd.arg(format!("@{DEV_FD}/0")).stdin(Stdio::piped());
        }
        ArgumentPassing::File => {
            fs::write(&plan.args_file, &plan.arguments)
                .with_context(|| format!("writing {}", plan.args_file.display()))?;
            cmd.arg(format!("@{}", plan.args_file.display()))
                .stdin(Stdio::null());
        }
    }

    debug!(
        executable = %plan.executable.display(),
        work_dir = %plan.work_dir.display(),
        log = %plan.log_file.display(),
        ?passing,
        "spawning process"
    );

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning {}", plan.executable.display()))?;
    let pid = child
        .id()
        .ok_or_else(|| anyhow!("spawned process exited before its PID was read"))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(plan.arguments.as_bytes())
            .await
            .context("writing arguments to child stdin")?;
        stdin.shutdown().await.context("closing child stdin")?;
    }

    write_pid_file(&plan.pid_file, pid)?;
    info!(profile = %plan.profile, command = %plan.command, pid, "process started");
    Ok(pid)
}

fn parent(path: &Path) -> anyhow::Result<&Path> {
    path.parent()
        .ok_or_else(|| anyhow!("{} has no parent directory", path.display()))
}

/// Prints the plan instead of spawning.
#[derive(Debug, Clone, Default)]
pub struct DryRunBackend;

impl LaunchBackend for DryRunBackend {
    fn launch<'a>(
        &'a self,
        plan: &'a LaunchPlan,
    ) -> Pin<Box<dyn Future<Output = Result<LaunchOutcome>> + Send + 'a>> {
        Box::pin(async move {
            let rendered = render_plan(plan)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
            Ok(LaunchOutcome::DryRun)
        })
    }
}

/// Human-readable rendering of a plan.
pub fn render_plan(plan: &LaunchPlan) -> Result<String> {
    let mut out = String::new();
    let _ = writeln!(out, "profile: {}", plan.profile);
    let _ = writeln!(out, "command: {}", plan.command);
    let _ = writeln!(out, "executable: {}", plan.executable.display());
    let _ = writeln!(out, "working directory: {}", plan.work_dir.display());
    let _ = writeln!(out, "log file: {}", plan.log_file.display());
    let _ = writeln!(out, "pid file: {}", plan.pid_file.display());

    out.push_str("environment:\n");
    for (name, value) in &plan.environment {
        let _ = writeln!(out, "  {name}='{}'", escape_env(value)?);
    }
    out.push_str("system properties:\n");
    for (name, value) in &plan.system_properties {
        let _ = writeln!(out, "  {}={}", escape_arg(name)?, escape_arg(value)?);
    }
    out.push_str("attachments:\n");
    for (name, path) in &plan.attachments {
        let _ = writeln!(out, "  {name} -> {}", path.display());
    }
    out.push_str("dependencies:\n");
    for path in &plan.dependencies {
        let _ = writeln!(out, "  {}", path.display());
    }
    out.push_str("arguments:\n");
    out.push_str(&plan.arguments);
    if !plan.arguments.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn plan(root: &Path) -> LaunchPlan {
        LaunchPlan {
            profile: "prod".to_string(),
            command: "api".to_string(),
            executable: root.join("jdk/bin/java"),
            arguments: "-cp \"/c/a.jar\" Main".to_string(),
            environment: BTreeMap::from([("GREETING".to_string(), "it's\tme".to_string())]),
            system_properties: BTreeMap::from([("app.name".to_string(), "demo".to_string())]),
            attachments: BTreeMap::from([("lib".to_string(), root.join("cache/lib"))]),
            dependencies: vec![root.join("repo/a.jar")],
            time_file_name: "2026-10-16T10-00-00_123Z".to_string(),
            log_file: root.join("commands/prod/api/log/output.2026-10-16T10-00-00_123Z.log"),
            work_dir: root.join("commands/prod/api/work"),
            pid_file: root.join("commands/prod/api/run/process.pid"),
            args_file: root.join("commands/prod/api/args"),
        }
    }

    #[test]
    fn rendered_plan_escapes_environment_values() {
        let root = Path::new("/srv/launcher");
        let rendered = render_plan(&plan(root)).unwrap();
        assert!(rendered.contains("executable: /srv/launcher/jdk/bin/java\n"));
        assert!(rendered.contains("  GREETING='it\\'s\\tme'\n"));
        assert!(rendered.contains("  app.name=demo\n"));
        assert!(rendered.contains("  lib -> /srv/launcher/cache/lib\n"));
        assert!(rendered.ends_with("arguments:\n-cp \"/c/a.jar\" Main\n"));
    }

    #[tokio::test]
    async fn dry_run_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan(dir.path());
        let outcome = DryRunBackend.launch(&plan).await.unwrap();
        assert_eq!(outcome, LaunchOutcome::DryRun);
        for path in [&plan.log_file, &plan.work_dir, &plan.pid_file, &plan.args_file] {
            assert!(!path.exists(), "{} should not exist", path.display());
        }
    }
}
