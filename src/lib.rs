//! chrond - a crontab-style job scheduler and service supervisor.
//!
//! Parses a crontab-like configuration into time-triggered cron jobs and
//! supervised service jobs, computes next execution times, and drives both
//! from a once-per-interval polling loop.

pub mod config;
pub mod core;
pub mod notify;
pub mod scheduler;
pub mod service;

pub use config::{Config, ConfigError};
pub use self::core::field::{Field, FieldError, FieldKind};
pub use self::core::job::{Job, JobKind, JobSummary};
pub use self::core::schedule::{CronSchedule, ScheduleError};
pub use self::core::settings::{GlobalSettings, JobSettings};
pub use notify::{LogNotifier, Notifier};
pub use scheduler::Daemon;
pub use service::process::{ProcessHandle, ProcessSpawner, ShellSpawner};
pub use service::{ServiceState, Supervisor};
