// src/launch/process.rs

//! OS process probing and signalling, plus PID file I/O.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use tracing::trace;

use crate::errors::{LauncherError, Result};

/// How often [`wait_for_exit`] re-checks liveness.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// No process with that id exists.
    Missing,
    /// The process exists but has terminated (zombie).
    Defunct,
    Alive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// `SIGTERM`.
    Graceful,
    /// `SIGKILL`.
    Forcible,
}

/// Read a PID file. `Ok(None)` when the file does not exist.
pub fn read_pid_file(path: &Path) -> Result<Option<u32>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    match content.trim().parse::<u32>() {
        Ok(pid) if pid != 0 && i32::try_from(pid).is_ok() => Ok(Some(pid)),
        _ => Err(LauncherError::InvalidPidFile {
            path: path.to_path_buf(),
            content,
        }),
    }
}

pub fn write_pid_file(path: &Path, pid: u32) -> Result<()> {
    fs::write(path, pid.to_string())?;
    Ok(())
}

pub fn remove_pid_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
        _ => Ok(()),
    }
}

pub fn is_alive(pid: u32) -> bool {
    probe(pid) == ProcessState::Alive
}

#[cfg(unix)]
pub fn probe(pid: u32) -> ProcessState {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return ProcessState::Missing;
    };
    match kill(Pid::from_raw(raw), None) {
        Ok(()) | Err(Errno::EPERM) => {
            if is_zombie(pid) {
                ProcessState::Defunct
            } else {
                ProcessState::Alive
            }
        }
        Err(_) => ProcessState::Missing,
    }
}

#[cfg(not(unix))]
pub fn probe(_pid: u32) -> ProcessState {
    ProcessState::Missing
}

#[cfg(target_os = "linux")]
fn is_zombie(pid: u32) -> bool {
    // The state field follows the parenthesised command name, which may
    // itself contain spaces or parentheses.
    fs::read_to_string(format!("/proc/{pid}/stat"))
        .ok()
        .and_then(|stat| {
            let rest = &stat[stat.rfind(')')? + 1..];
            rest.split_whitespace().next().map(|state| state == "Z")
        })
        .unwrap_or(false)
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_zombie(_pid: u32) -> bool {
    false
}

/// Whether a process can be asked to shut down on its own terms.
pub fn supports_graceful_termination() -> bool {
    cfg!(unix)
}

/// Ask the OS to terminate `pid`. `Err` carries the refusal reason.
#[cfg(unix)]
pub fn request_termination(pid: u32, termination: Termination) -> std::result::Result<(), String> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|e| e.to_string())?;
    let signal = match termination {
        Termination::Graceful => Signal::SIGTERM,
        Termination::Forcible => Signal::SIGKILL,
    };
    trace!(pid, ?signal, "sending signal");
    kill(Pid::from_raw(raw), signal).map_err(|errno| errno.desc().to_string())
}

#[cfg(not(unix))]
pub fn request_termination(_pid: u32, _termination: Termination) -> std::result::Result<(), String> {
    Err("process signals are not supported on this platform".to_string())
}

/// Poll until `pid` is no longer alive.
pub async fn wait_for_exit(pid: u32) {
    while is_alive(pid) {
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    trace!(pid, "process exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn pid_file_tolerates_whitespace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("process.pid");
        assert_eq!(read_pid_file(&path).unwrap(), None);

        fs::write(&path, " 4242\n").unwrap();
        assert_eq!(read_pid_file(&path).unwrap(), Some(4242));

        write_pid_file(&path, 17).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "17");

        remove_pid_file(&path).unwrap();
        remove_pid_file(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn garbage_pid_files_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("process.pid");
        for content in ["abc", "", "0", "-5", "12 34", "4294967295"] {
            fs::write(&path, content).unwrap();
            assert!(
                matches!(read_pid_file(&path), Err(LauncherError::InvalidPidFile { .. })),
                "{content:?} should be rejected"
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn current_process_is_alive() {
        assert_eq!(probe(std::process::id()), ProcessState::Alive);
        assert!(supports_graceful_termination());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn killed_child_is_no_longer_alive() {
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id();
        assert!(is_alive(pid));

        request_termination(pid, Termination::Forcible).unwrap();
        tokio::time::timeout(Duration::from_secs(5), wait_for_exit(pid))
            .await
            .unwrap();
        assert_ne!(probe(pid), ProcessState::Alive);
        let _ = child.wait();
    }
}
