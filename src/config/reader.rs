//! Crontab parsing and configuration loading.
//!
//! The configuration is a line-oriented text file. Each line is either a
//! comment, an assignment (`key = value`), or a job definition (a five-field
//! cron line or an `@` macro). Malformed lines are logged and skipped; a
//! broken or empty file degrades to "schedule nothing".

use chrono::{Local, NaiveDateTime};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::core::job::Job;
use crate::core::schedule::{split_word, CronSchedule};
use crate::core::settings::{GlobalSettings, JobSettings};

/// Errors that can occur when loading a configuration file.
///
/// Only the file read itself can fail; the line grammar is forgiving and
/// reports problems as diagnostics instead.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Parsed configuration: global settings plus jobs in declaration order.
#[derive(Debug, Default)]
pub struct Config {
    pub settings: GlobalSettings,
    pub jobs: Vec<Job>,
}

impl Config {
    /// Load and parse a crontab file.
    ///
    /// The file's directory seeds the per-job `home` setting. Next execution
    /// times are computed against the current wall-clock time.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path)?;
        let home = path.parent().filter(|p| !p.as_os_str().is_empty());
        let config = Self::parse(&text, home, Local::now().naive_local());
        info!(
            "Loaded {} job(s) from {}",
            config.jobs.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse crontab text. Never fails: invalid lines are logged and skipped.
    pub fn parse(text: &str, home: Option<&Path>, origin: NaiveDateTime) -> Config {
        let mut config = Config::default();
        let mut running = match home {
            Some(home) => JobSettings::with_home(home),
            None => JobSettings::default(),
        };

        for (index, raw) in text.lines().enumerate() {
            let line = preprocess_line(raw);
            if line.is_empty() {
                continue;
            }

            if let Some((key, value)) = try_parse_assignment(&line) {
                if config.settings.set(key, value) || running.set(key, value) {
                    continue;
                }
            }

            if let Some(mut job) = try_parse_job(&line, &running) {
                job.recalc_next_run(origin);
                job.verify_executable();
                config.jobs.push(job);
                continue;
            }

            error!("Invalid configuration directive on line {}: {line}", index + 1);
        }

        config
    }
}

/// Strip comments and normalize whitespace on a raw input line.
///
/// Tabs become spaces and the line is trimmed. `\#` collapses to a literal
/// `#`; an unescaped `#` terminates the line. An empty result means the line
/// contributes nothing.
pub fn preprocess_line(raw: &str) -> String {
    let line = raw.replace('\t', " ");
    let line = line.trim();

    let mut result = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'#') {
            result.push('#');
            chars.next();
            continue;
        }
        if c == '#' {
            break;
        }
        result.push(c);
    }

    result.trim().to_string()
}

/// Recognize `key = value`: the second whitespace token must be exactly `=`.
fn try_parse_assignment(line: &str) -> Option<(&str, &str)> {
    let (key, rest) = split_word(line);
    let (eq, value) = split_word(rest);
    (eq == "=" && !key.is_empty()).then_some((key, value))
}

/// Recognize a job definition line, snapshotting the running settings.
fn try_parse_job(line: &str, running: &JobSettings) -> Option<Job> {
    let mut line = line;
    let expanded;

    if line.starts_with('@') {
        let (macro_token, rest) = split_word(line);
        match macro_token.to_lowercase().as_str() {
            "@service" => return Some(Job::service(rest, running.clone())),
            "@reboot" => return Some(Job::cron(rest, running.clone(), CronSchedule::reboot())),
            "@yearly" | "@annually" => expanded = format!("0 0 1 1 * {rest}"),
            "@monthly" => expanded = format!("0 0 1 * * {rest}"),
            "@weekly" => expanded = format!("0 0 * * 0 {rest}"),
            "@daily" => expanded = format!("0 0 * * * {rest}"),
            "@hourly" => expanded = format!("0 * * * * {rest}"),
            _ => return None,
        }
        line = &expanded;
    }

    match CronSchedule::parse(line) {
        Ok((schedule, command)) => Some(Job::cron(command, running.clone(), schedule)),
        Err(e) => {
            debug!("Not a job line: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn origin() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap()
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn test_preprocess_strips_comments() {
        assert_eq!(preprocess_line("cmd # comment"), "cmd");
        assert_eq!(preprocess_line("# whole line"), "");
        assert_eq!(preprocess_line("   "), "");
        assert_eq!(preprocess_line("\tcmd\targ\t"), "cmd arg");
    }

    #[test]
    fn test_preprocess_keeps_escaped_hash() {
        assert_eq!(preprocess_line(r"cmd \# literal"), "cmd # literal");
        assert_eq!(preprocess_line(r"cmd \#x # gone"), "cmd #x");
    }

    #[test]
    fn test_assignment_requires_equals_as_second_token() {
        assert_eq!(
            try_parse_assignment("home = /srv/jobs"),
            Some(("home", "/srv/jobs"))
        );
        assert_eq!(try_parse_assignment("home=/srv/jobs"), None);
        assert_eq!(try_parse_assignment("home to = x"), None);
    }

    #[test]
    fn test_parse_five_field_job() {
        let config = Config::parse("0 * * * * echo hi", None, origin());
        assert_eq!(config.jobs.len(), 1);
        assert_eq!(config.jobs[0].command(), "echo hi");
        assert_eq!(config.jobs[0].next_run(), Some(at(2026, 3, 10, 10, 0)));
    }

    #[test]
    fn test_hourly_macro_equivalent_to_five_fields() {
        use crate::core::job::JobKind;

        let explicit = Config::parse("0 * * * * foo", None, origin());
        let shorthand = Config::parse("@hourly foo", None, origin());

        assert_eq!(shorthand.jobs[0].command(), "foo");
        assert_eq!(explicit.jobs[0].next_run(), shorthand.jobs[0].next_run());

        // The expanded macro compiles to the exact same domain vectors.
        let (JobKind::Cron(a), JobKind::Cron(b)) =
            (explicit.jobs[0].kind(), shorthand.jobs[0].kind())
        else {
            panic!("expected cron jobs");
        };
        assert_eq!(a.schedule(), b.schedule());
    }

    #[test]
    fn test_macros_are_case_insensitive() {
        let config = Config::parse("@Daily echo x\n@HOURLY echo y", None, origin());
        assert_eq!(config.jobs.len(), 2);
        assert_eq!(config.jobs[0].next_run(), Some(at(2026, 3, 11, 0, 0)));
        assert_eq!(config.jobs[1].next_run(), Some(at(2026, 3, 10, 10, 0)));
    }

    #[test]
    fn test_yearly_macro_targets_jan_first() {
        let config = Config::parse("@yearly happy new year", None, origin());
        assert_eq!(config.jobs[0].next_run(), Some(at(2027, 1, 1, 0, 0)));
    }

    #[test]
    fn test_reboot_job_has_no_next_run() {
        let config = Config::parse("@reboot echo booted", None, origin());
        assert!(config.jobs[0].is_reboot());
        assert_eq!(config.jobs[0].command(), "echo booted");
        assert_eq!(config.jobs[0].next_run(), None);
    }

    #[test]
    fn test_service_job_keeps_verbatim_command() {
        let config = Config::parse("@service run-server --port 8080", None, origin());
        assert!(config.jobs[0].is_service());
        assert_eq!(config.jobs[0].command(), "run-server --port 8080");
    }

    #[test]
    fn test_unknown_macro_is_invalid_line() {
        let config = Config::parse("@fortnightly echo x", None, origin());
        assert!(config.jobs.is_empty());
    }

    #[test]
    fn test_invalid_lines_skipped_valid_lines_kept_in_order() {
        let text = "\
0 * * * * first
not a job at all
61 * * * * bad minute
@daily second
";
        let config = Config::parse(text, None, origin());
        assert_eq!(config.jobs.len(), 2);
        assert_eq!(config.jobs[0].command(), "first");
        assert_eq!(config.jobs[1].command(), "second");
    }

    #[test]
    fn test_empty_config_schedules_nothing() {
        let config = Config::parse("", None, origin());
        assert!(config.jobs.is_empty());

        let config = Config::parse("# only comments\n\n\t\n", None, origin());
        assert!(config.jobs.is_empty());
    }

    #[test]
    fn test_assignments_route_global_then_job() {
        let text = "\
check_interval = 30
home = /srv/jobs
@service run-server
";
        let config = Config::parse(text, None, origin());
        assert_eq!(config.settings.check_interval, 30);
        assert_eq!(
            config.jobs[0].settings().home,
            Some(PathBuf::from("/srv/jobs"))
        );
    }

    #[test]
    fn test_unknown_assignment_key_is_diagnostic_not_job() {
        let config = Config::parse("frobnicate = yes", None, origin());
        assert!(config.jobs.is_empty());
    }

    #[test]
    fn test_settings_snapshot_taken_at_definition_time() {
        let text = "\
home = /first
0 * * * * one
home = /second
0 * * * * two
";
        let config = Config::parse(text, None, origin());
        assert_eq!(config.jobs[0].settings().home, Some(PathBuf::from("/first")));
        assert_eq!(
            config.jobs[1].settings().home,
            Some(PathBuf::from("/second"))
        );
    }

    #[test]
    fn test_home_seeded_from_config_directory() {
        let config = Config::parse(
            "@service run-server",
            Some(Path::new("/etc/chrond")),
            origin(),
        );
        assert_eq!(
            config.jobs[0].settings().home,
            Some(PathBuf::from("/etc/chrond"))
        );
    }

    #[test]
    fn test_comment_only_suffix_on_job_line() {
        let config = Config::parse("@daily echo hi # nightly greeting", None, origin());
        assert_eq!(config.jobs.len(), 1);
        assert_eq!(config.jobs[0].command(), "echo hi");
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = Config::load(Path::new("/no/such/crontab"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
