//! Process spawning and liveness polling.
//!
//! The supervisor talks to child processes only through the [`ProcessHandle`]
//! and [`ProcessSpawner`] traits, so tests can substitute fakes and the
//! production implementation stays confined to this module. Children are
//! observed (liveness polled via `try_wait`), never waited on.

use std::io;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use tracing::{debug, warn};

/// Default shell used to interpret job commands.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// A handle to one live child process.
pub trait ProcessHandle: Send {
    /// Request the process to stop.
    fn stop(&mut self);

    /// Poll whether the process is still alive.
    fn is_running(&mut self) -> bool;
}

/// Spawns processes for job commands.
pub trait ProcessSpawner: Send + Sync {
    /// Spawn `command` with the given working directory and shell.
    fn spawn(
        &self,
        command: &str,
        home: Option<&Path>,
        shell: Option<&str>,
    ) -> io::Result<Box<dyn ProcessHandle>>;
}

/// Production spawner: runs commands through a shell (`shell -c command`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellSpawner;

impl ProcessSpawner for ShellSpawner {
    fn spawn(
        &self,
        command: &str,
        home: Option<&Path>,
        shell: Option<&str>,
    ) -> io::Result<Box<dyn ProcessHandle>> {
        let shell = shell.unwrap_or(DEFAULT_SHELL);
        let mut cmd = Command::new(shell);
        cmd.arg("-c").arg(command);
        if let Some(dir) = home {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());

        let child = cmd.spawn()?;
        debug!("Spawned '{command}' (pid {})", child.id());
        Ok(Box::new(ChildHandle { child }))
    }
}

/// Handle over a [`std::process::Child`].
struct ChildHandle {
    child: Child,
}

impl ProcessHandle for ChildHandle {
    fn stop(&mut self) {
        if let Err(e) = self.child.kill() {
            warn!("Failed to stop pid {}: {e}", self.child.id());
        }
    }

    fn is_running(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                debug!("Pid {} exited with {status}", self.child.id());
                false
            }
            Err(e) => {
                warn!("Failed to poll pid {}: {e}", self.child.id());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_spawner_runs_and_exits() {
        let mut handle = ShellSpawner.spawn("true", None, None).unwrap();
        // Wait for the short-lived process to finish.
        for _ in 0..100 {
            if !handle.is_running() {
                return;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        panic!("process did not exit");
    }

    #[test]
    fn test_shell_spawner_stop_kills_long_runner() {
        let mut handle = ShellSpawner.spawn("sleep 60", None, None).unwrap();
        assert!(handle.is_running());
        handle.stop();
        for _ in 0..100 {
            if !handle.is_running() {
                return;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        panic!("process survived stop");
    }

    #[test]
    fn test_spawn_honors_working_directory() {
        let handle = ShellSpawner.spawn("pwd", Some(Path::new("/")), None);
        assert!(handle.is_ok());
    }

    #[test]
    fn test_spawn_with_missing_shell_fails() {
        let result = ShellSpawner.spawn("true", None, Some("/nonexistent/shell"));
        assert!(result.is_err());
    }
}
