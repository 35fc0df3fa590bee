//! Global and per-job settings.
//!
//! Crontab assignment lines (`key = value`) are applied against the global
//! settings first and, failing that, against a running per-job aggregate.
//! Each job captures an independent snapshot of the aggregate at the moment
//! it is defined, so later assignments never affect earlier jobs.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Daemon-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    /// Seconds between scheduler ticks.
    pub check_interval: u64,
    /// Whether to fire jobs whose time passed while the daemon was down.
    pub run_missed: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            check_interval: 60,
            run_missed: false,
        }
    }
}

impl GlobalSettings {
    /// Apply an assignment if the key belongs to the global settings.
    ///
    /// Returns true when the key was recognized, even if the value failed to
    /// parse (the failure is logged and the previous value kept) — a
    /// recognized key must not fall through to job-line parsing.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        match key.to_lowercase().as_str() {
            "checkinterval" | "check_interval" => {
                match value.parse() {
                    Ok(seconds) => self.check_interval = seconds,
                    Err(_) => warn!("Invalid check interval '{value}', keeping previous"),
                }
                true
            }
            "runmissed" | "run_missed" => {
                match parse_bool(value) {
                    Some(flag) => self.run_missed = flag,
                    None => warn!("Invalid boolean '{value}' for {key}, keeping previous"),
                }
                true
            }
            _ => false,
        }
    }
}

/// Per-job settings, snapshotted into each job at definition time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    /// Working directory for spawned processes.
    pub home: Option<PathBuf>,
    /// Shell used to interpret commands.
    pub shell: Option<String>,
    /// Recipient for failure notifications.
    pub mailto: Option<String>,
    /// Sender address for failure notifications.
    pub mailfrom: Option<String>,
    /// SMTP relay for failure notifications.
    pub smtp_host: Option<String>,
}

impl JobSettings {
    /// Settings seeded with the configuration file's directory as home.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: Some(home.into()),
            ..Self::default()
        }
    }

    /// Apply an assignment if the key belongs to the job settings.
    ///
    /// Returns true when the key was recognized.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        match key.to_lowercase().as_str() {
            "home" => self.home = Some(PathBuf::from(value)),
            "shell" => self.shell = Some(value.to_string()),
            "mailto" => self.mailto = Some(value.to_string()),
            "mailfrom" => self.mailfrom = Some(value.to_string()),
            "smtphost" | "smtp_host" => self.smtp_host = Some(value.to_string()),
            _ => return false,
        }
        true
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
