// src/launch/supervisor.rs

//! Start/stop/kill lifecycle over the PID file.
//!
//! A command is running iff its PID file exists and names a live process.
//! There is no lock around check and act; two operators racing on one
//! command can both pass the liveness check.

use std::fmt;

use tracing::{info, warn};

use super::backend::{LaunchBackend, LaunchOutcome};
use super::plan::{LaunchRequest, Planner};
use super::process::{
    ProcessState, Termination, probe, read_pid_file, remove_pid_file, request_termination,
    supports_graceful_termination, wait_for_exit,
};
use crate::cache::ResourceCache;
use crate::errors::{LauncherError, Result};
use crate::layout::Layout;
use crate::repository::Repository;
use crate::template::Ambient;

/// Result of a stop or kill request. `Display` gives the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    PidFileNotFound,
    ProcessNotFound(u32),
    NotAlive(u32),
    GracefulUnsupported(u32),
    Terminated(u32),
    Killed(u32),
    Refused(u32),
}

impl StopOutcome {
    /// Whether the PID file was removed as part of this outcome.
    pub fn clears_pid_file(&self) -> bool {
        matches!(
            self,
            StopOutcome::ProcessNotFound(_)
                | StopOutcome::NotAlive(_)
                | StopOutcome::Terminated(_)
                | StopOutcome::Killed(_)
        )
    }
}

impl fmt::Display for StopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopOutcome::PidFileNotFound => write!(f, "Process PID file not found"),
            StopOutcome::ProcessNotFound(pid) => write!(f, "Process not found for PID={pid}"),
            StopOutcome::NotAlive(pid) => write!(f, "Process is not alive for PID={pid}"),
            StopOutcome::GracefulUnsupported(pid) => {
                write!(f, "Graceful termination not supported for PID={pid}")
            }
            StopOutcome::Terminated(pid) => {
                write!(f, "Process terminated successfully for PID={pid}")
            }
            StopOutcome::Killed(pid) => write!(f, "Process terminated forcibly for PID={pid}"),
            StopOutcome::Refused(pid) => write!(f, "Cannot terminate process for PID={pid}"),
        }
    }
}

/// Lifecycle operations for commands under one launcher home.
pub struct Supervisor<'a> {
    layout: &'a Layout,
    repository: &'a dyn Repository,
    cache: &'a ResourceCache,
    ambient: &'a Ambient,
}

impl<'a> Supervisor<'a> {
    pub fn new(
        layout: &'a Layout,
        repository: &'a dyn Repository,
        cache: &'a ResourceCache,
        ambient: &'a Ambient,
    ) -> Self {
        Self {
            layout,
            repository,
            cache,
            ambient,
        }
    }

    /// Plan `request` and hand the plan to `backend`.
    ///
    /// Fails before planning when the command's PID file names a live
    /// process.
    pub async fn start(
        &self,
        request: &LaunchRequest,
        backend: &dyn LaunchBackend,
    ) -> Result<LaunchOutcome> {
        let pid_file = self.layout.pid_file(&request.profile, &request.command);
        if let Some(pid) = read_pid_file(&pid_file)?.filter(|pid| probe(*pid) == ProcessState::Alive) {
            return Err(LauncherError::AlreadyRunning(pid));
        }

        let plan = Planner::new(self.layout, self.repository, self.cache, self.ambient)
            .plan(request)
            .await?;
        backend.launch(&plan).await
    }

    /// Plan `request` and hand the plan to `backend` regardless of whether
    /// the command is running.
    pub async fn dry_run(
        &self,
        request: &LaunchRequest,
        backend: &dyn LaunchBackend,
    ) -> Result<LaunchOutcome> {
        let plan = Planner::new(self.layout, self.repository, self.cache, self.ambient)
            .plan(request)
            .await?;
        backend.launch(&plan).await
    }

    /// `SIGTERM` and wait for exit.
    pub async fn stop(&self, profile: &str, command: &str) -> Result<StopOutcome> {
        self.terminate(profile, command, Termination::Graceful).await
    }

    /// `SIGKILL` and wait for exit.
    pub async fn kill(&self, profile: &str, command: &str) -> Result<StopOutcome> {
        self.terminate(profile, command, Termination::Forcible).await
    }

    async fn terminate(
        &self,
        profile: &str,
        command: &str,
        termination: Termination,
    ) -> Result<StopOutcome> {
        let pid_file = self.layout.pid_file(profile, command);
        let Some(pid) = read_pid_file(&pid_file)? else {
            return Ok(StopOutcome::PidFileNotFound);
        };

        let outcome = match probe(pid) {
            ProcessState::Missing => StopOutcome::ProcessNotFound(pid),
            ProcessState::Defunct => StopOutcome::NotAlive(pid),
            ProcessState::Alive
                if termination == Termination::Graceful && !supports_graceful_termination() =>
            {
                StopOutcome::GracefulUnsupported(pid)
            }
            ProcessState::Alive => match request_termination(pid, termination) {
                Ok(()) => {
                    info!(profile, command, pid, ?termination, "termination requested");
                    wait_for_exit(pid).await;
                    match termination {
                        Termination::Graceful => StopOutcome::Terminated(pid),
                        Termination::Forcible => StopOutcome::Killed(pid),
                    }
                }
                Err(reason) => {
                    warn!(profile, command, pid, %reason, "termination refused");
                    StopOutcome::Refused(pid)
                }
            },
        };

        if outcome.clears_pid_file() {
            remove_pid_file(&pid_file)?;
        }
        Ok(outcome)
    }
}
