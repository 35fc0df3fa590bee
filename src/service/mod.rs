//! Service supervision.
//!
//! A [`Supervisor`] keeps one long-running process alive for a `@service`
//! job: starting it, resynchronizing its belief about liveness before every
//! action, and stopping it on request. The state machine is
//! Inactive → Starting → Running → Stopping → Inactive.

pub mod process;

use std::fmt;
use tracing::{debug, info, warn};

use crate::core::settings::JobSettings;
use crate::notify::Notifier;
use process::{ProcessHandle, ProcessSpawner};

/// Lifecycle state of a supervised service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceState {
    /// No process is running or being started.
    #[default]
    Inactive,
    /// A launch is in progress.
    Starting,
    /// The process was observed alive.
    Running,
    /// A stop was requested and the process has not yet been observed dead.
    Stopping,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceState::Inactive => "inactive",
            ServiceState::Starting => "starting",
            ServiceState::Running => "running",
            ServiceState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// State machine managing one service's process.
#[derive(Default)]
pub struct Supervisor {
    state: ServiceState,
    process: Option<Box<dyn ProcessHandle>>,
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("state", &self.state)
            .field("has_process", &self.process.is_some())
            .finish()
    }
}

impl Supervisor {
    /// Create an idle supervisor.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current believed state.
    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Poll the owned process and resynchronize belief with reality.
    ///
    /// If the state was `Running` but the process is dead or absent, the
    /// supervisor drops to `Inactive` and warns once about the unexpected
    /// termination. A requested stop (`Stopping`) that has completed drops
    /// to `Inactive` quietly. Returns the freshly observed liveness.
    pub fn check_is_running(&mut self, command: &str) -> bool {
        let alive = match self.process.as_mut() {
            Some(process) => process.is_running(),
            None => false,
        };

        if !alive {
            match self.state {
                ServiceState::Running => {
                    warn!("Service terminated unexpectedly: '{command}'");
                    self.state = ServiceState::Inactive;
                    self.process = None;
                }
                ServiceState::Stopping => {
                    debug!("Service stopped: '{command}'");
                    self.state = ServiceState::Inactive;
                    self.process = None;
                }
                _ => {}
            }
        }

        alive
    }

    /// Start the service unless it is already starting, running, or stopping.
    ///
    /// Spawn failures are logged and relayed through the notifier; they are
    /// never propagated to the caller. The state always settles to `Running`
    /// if the process is observed alive afterwards, else `Inactive`.
    pub fn run(
        &mut self,
        command: &str,
        settings: &JobSettings,
        spawner: &dyn ProcessSpawner,
        notifier: &dyn Notifier,
    ) {
        self.check_is_running(command);

        match self.state {
            ServiceState::Starting => {
                warn!("Run: service is already starting: '{command}'");
                return;
            }
            ServiceState::Running => {
                warn!("Run: service is already running: '{command}'");
                return;
            }
            ServiceState::Stopping => {
                warn!("Run: unable to start, service is stopping: '{command}'");
                return;
            }
            ServiceState::Inactive => {}
        }

        self.state = ServiceState::Starting;

        info!("Starting service: {command}");
        match spawner.spawn(command, settings.home.as_deref(), settings.shell.as_deref()) {
            Ok(handle) => {
                self.process = Some(handle);
                debug!("Process started");
            }
            Err(e) => {
                let text = format!("Failed to start service '{command}': {e}");
                tracing::error!("{text}");
                notifier.send(&format!("Failed to start service {command}"), &text, settings);
            }
        }

        self.state = if self.check_is_running(command) {
            ServiceState::Running
        } else {
            ServiceState::Inactive
        };
    }

    /// Request the service to stop.
    ///
    /// From `Starting` or `Running` this issues a stop and moves straight to
    /// `Stopping`; the transition to `Inactive` happens when a later
    /// `check_is_running` observes the process dead.
    pub fn terminate(&mut self, command: &str) {
        self.check_is_running(command);

        match self.state {
            ServiceState::Starting | ServiceState::Running => {
                info!("Terminating service: {command}");
                if let Some(process) = self.process.as_mut() {
                    process.stop();
                }
                self.state = ServiceState::Stopping;
            }
            ServiceState::Stopping => {
                warn!("Terminate: service is already stopping: '{command}'");
            }
            ServiceState::Inactive => {}
        }
    }
}
