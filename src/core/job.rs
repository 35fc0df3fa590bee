//! Job model.
//!
//! A [`Job`] is a verbatim command plus a settings snapshot, tagged with its
//! kind: time-triggered cron jobs carry a compiled [`CronSchedule`] and the
//! next instant they should fire; service jobs carry a [`Supervisor`] that
//! keeps their process alive.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::env;
use std::path::Path;
use tracing::{debug, warn};

use super::schedule::{split_word, CronSchedule};
use super::settings::JobSettings;
use crate::notify::Notifier;
use crate::service::process::ProcessSpawner;
use crate::service::{ServiceState, Supervisor};

/// Kind-specific payload of a job.
#[derive(Debug)]
pub enum JobKind {
    /// Fired at computed future instants.
    Cron(CronState),
    /// Kept continuously running.
    Service(Supervisor),
}

/// Scheduling state of a cron job.
#[derive(Debug, Clone)]
pub struct CronState {
    schedule: CronSchedule,
    /// Next instant the job should fire; `None` means never (reboot jobs,
    /// or no occurrence within a year).
    next_run: Option<NaiveDateTime>,
}

impl CronState {
    /// The compiled schedule.
    pub fn schedule(&self) -> &CronSchedule {
        &self.schedule
    }
}

/// One entry of the crontab: a command, its settings snapshot, and kind.
#[derive(Debug)]
pub struct Job {
    command: String,
    settings: JobSettings,
    kind: JobKind,
}

/// Serializable description of a job, for display and `list --json`.
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub command: String,
    pub kind: &'static str,
    pub reboot: bool,
    pub next_run: Option<NaiveDateTime>,
    pub state: Option<String>,
}

impl Job {
    /// Create a time-triggered job. `next_run` starts unset; callers
    /// recalculate it immediately after construction.
    pub fn cron(command: impl Into<String>, settings: JobSettings, schedule: CronSchedule) -> Job {
        Job {
            command: command.into(),
            settings,
            kind: JobKind::Cron(CronState {
                schedule,
                next_run: None,
            }),
        }
    }

    /// Create a supervised service job.
    pub fn service(command: impl Into<String>, settings: JobSettings) -> Job {
        Job {
            command: command.into(),
            settings,
            kind: JobKind::Service(Supervisor::new()),
        }
    }

    /// The verbatim command text from the definition line.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The settings snapshot captured at definition time.
    pub fn settings(&self) -> &JobSettings {
        &self.settings
    }

    /// The kind-specific payload.
    pub fn kind(&self) -> &JobKind {
        &self.kind
    }

    /// Whether this is a service job.
    pub fn is_service(&self) -> bool {
        matches!(self.kind, JobKind::Service(_))
    }

    /// Whether this is an `@reboot` job.
    pub fn is_reboot(&self) -> bool {
        matches!(&self.kind, JobKind::Cron(state) if state.schedule.is_reboot())
    }

    /// The next instant this job should fire, if any.
    pub fn next_run(&self) -> Option<NaiveDateTime> {
        match &self.kind {
            JobKind::Cron(state) => state.next_run,
            JobKind::Service(_) => None,
        }
    }

    /// Whether a cron job is due at `now`.
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        matches!(&self.kind, JobKind::Cron(state) if state.next_run.is_some_and(|t| t <= now))
    }

    /// Recompute the next execution instant from `origin`.
    ///
    /// Reboot jobs get the "never" sentinel (they are fired once at daemon
    /// startup). Service jobs are lifecycle-driven and this is a no-op.
    pub fn recalc_next_run(&mut self, origin: NaiveDateTime) {
        let JobKind::Cron(state) = &mut self.kind else {
            return;
        };

        if state.schedule.is_reboot() {
            state.next_run = None;
            debug!("Next job start :: at boot :: for {}", self.command);
            return;
        }

        state.next_run = state.schedule.next_after(origin);
        match state.next_run {
            Some(at) => debug!("Next job start {at} for {}", self.command),
            None => warn!("No start time for job found: {}", self.command),
        }
    }

    /// Resynchronize a service's liveness belief. No-op for cron jobs.
    pub fn check_is_running(&mut self) -> bool {
        match &mut self.kind {
            JobKind::Service(supervisor) => supervisor.check_is_running(&self.command),
            JobKind::Cron(_) => false,
        }
    }

    /// Start a service job's process. No-op for cron jobs.
    pub fn run_service(&mut self, spawner: &dyn ProcessSpawner, notifier: &dyn Notifier) {
        if let JobKind::Service(supervisor) = &mut self.kind {
            supervisor.run(&self.command, &self.settings, spawner, notifier);
        }
    }

    /// Request a service job's process to stop. No-op for cron jobs.
    pub fn terminate(&mut self) {
        if let JobKind::Service(supervisor) = &mut self.kind {
            supervisor.terminate(&self.command);
        }
    }

    /// Warn if the command's executable cannot be found.
    ///
    /// A sanity check at load time only; the job is kept either way, since
    /// the executable may appear before the job fires.
    pub fn verify_executable(&self) {
        let (word, _) = split_word(&self.command);
        if word.is_empty() || !find_executable(word, self.settings.home.as_deref()) {
            warn!("Executable '{word}' not found for job: {}", self.command);
        }
    }

    /// A serializable summary for display.
    pub fn summary(&self) -> JobSummary {
        match &self.kind {
            JobKind::Cron(state) => JobSummary {
                command: self.command.clone(),
                kind: "cron",
                reboot: state.schedule.is_reboot(),
                next_run: state.next_run,
                state: None,
            },
            JobKind::Service(supervisor) => JobSummary {
                command: self.command.clone(),
                kind: "service",
                reboot: false,
                next_run: None,
                state: Some(supervisor.state().to_string()),
            },
        }
    }

    /// The current service state, if this is a service job.
    pub fn service_state(&self) -> Option<ServiceState> {
        match &self.kind {
            JobKind::Service(supervisor) => Some(supervisor.state()),
            JobKind::Cron(_) => None,
        }
    }
}

/// Look up `program` as a path (absolute, or relative to `home`) or on PATH.
fn find_executable(program: &str, home: Option<&Path>) -> bool {
    let path = Path::new(program);
    if path.is_absolute() {
        return path.exists();
    }
    if program.contains('/') {
        return home.map_or_else(|| path.exists(), |home| home.join(path).exists());
    }

    env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).any(|dir| dir.join(program).exists()))
        .unwrap_or(false)
}
