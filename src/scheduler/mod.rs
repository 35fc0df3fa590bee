//! The polling driver.
//!
//! A [`Daemon`] owns the parsed [`Config`] and walks it once per tick:
//! cron jobs whose next execution time has arrived are fired and
//! rescheduled, and service jobs are resynchronized and restarted on
//! demand. A single driver task mutates the jobs; children run
//! concurrently but are only observed.

use chrono::{Local, NaiveDateTime, TimeDelta};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::core::job::Job;
use crate::notify::{LogNotifier, Notifier};
use crate::service::process::{ProcessSpawner, ShellSpawner};
use crate::service::ServiceState;

/// The top-level scheduler loop.
pub struct Daemon {
    config: Config,
    spawner: Arc<dyn ProcessSpawner>,
    notifier: Arc<dyn Notifier>,
    tick_interval: Duration,
}

impl Daemon {
    /// Create a daemon over a parsed configuration with production
    /// collaborators. The tick interval comes from the `check_interval`
    /// setting.
    pub fn new(config: Config) -> Daemon {
        let tick_interval = Duration::from_secs(config.settings.check_interval.max(1));
        Daemon {
            config,
            spawner: Arc::new(ShellSpawner),
            notifier: Arc::new(LogNotifier),
            tick_interval,
        }
    }

    /// Substitute the process spawner.
    pub fn with_spawner(mut self, spawner: Arc<dyn ProcessSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    /// Substitute the notification transport.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Override the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// The managed jobs.
    pub fn jobs(&self) -> &[Job] {
        &self.config.jobs
    }

    /// Fire `@reboot` jobs once and start every service.
    pub fn startup(&mut self) {
        let now = Local::now().naive_local();
        for job in &mut self.config.jobs {
            if job.is_reboot() {
                fire_cron(job, &*self.spawner, &*self.notifier);
            } else if job.is_service() {
                job.run_service(&*self.spawner, &*self.notifier);
            }
        }
        // Reboot jobs keep the "never" sentinel; everything else is already
        // scheduled from load time, but recompute in case load was long ago.
        for job in &mut self.config.jobs {
            if !job.is_reboot() && !job.is_service() && job.next_run().is_none() {
                job.recalc_next_run(now);
            }
        }
    }

    /// One pass over all jobs at instant `now`.
    pub fn tick(&mut self, now: NaiveDateTime) {
        // Jobs overdue by more than this were missed while the driver was
        // not ticking (suspend, clock jump); run_missed decides their fate.
        let grace = TimeDelta::seconds(2 * self.tick_interval.as_secs().max(60) as i64);
        let run_missed = self.config.settings.run_missed;

        for job in &mut self.config.jobs {
            if job.is_service() {
                job.check_is_running();
                if job.service_state() == Some(ServiceState::Inactive) {
                    job.run_service(&*self.spawner, &*self.notifier);
                }
                continue;
            }

            if !job.is_due(now) {
                continue;
            }

            let overdue = job
                .next_run()
                .map(|at| now - at)
                .unwrap_or_else(TimeDelta::zero);
            if overdue > grace && !run_missed {
                warn!("Skipping missed job (overdue {overdue}): {}", job.command());
            } else {
                fire_cron(job, &*self.spawner, &*self.notifier);
            }
            job.recalc_next_run(now);
        }
    }

    /// Request every service to stop.
    pub fn terminate_all(&mut self) {
        for job in &mut self.config.jobs {
            job.terminate();
        }
    }

    /// Resynchronize every service and report whether any is still not
    /// inactive. Used to drain services after [`Daemon::terminate_all`].
    pub fn services_active(&mut self) -> bool {
        let mut active = false;
        for job in &mut self.config.jobs {
            if job.is_service() {
                job.check_is_running();
                if job.service_state() != Some(ServiceState::Inactive) {
                    active = true;
                }
            }
        }
        active
    }

    /// Run until Ctrl-C, then stop all services and drain.
    pub async fn run(mut self) {
        self.startup();

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(Local::now().naive_local());
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        self.terminate_all();
        for _ in 0..50 {
            if !self.services_active() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        info!("Scheduler stopped");
    }
}

/// Spawn a one-shot process for a cron job. The handle is dropped; the child
/// runs to completion on its own.
fn fire_cron(job: &Job, spawner: &dyn ProcessSpawner, notifier: &dyn Notifier) {
    let settings = job.settings();
    info!("Starting job: {}", job.command());
    if let Err(e) = spawner.spawn(
        job.command(),
        settings.home.as_deref(),
        settings.shell.as_deref(),
    ) {
        let text = format!("Failed to start job '{}': {e}", job.command());
        error!("{text}");
        notifier.send(
            &format!("Failed to start job {}", job.command()),
            &text,
            settings,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::JobSettings;
    use crate::service::process::ProcessHandle;
    use chrono::NaiveDate;
    use std::io;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    struct FakeProcess {
        alive: Arc<AtomicBool>,
    }

    impl ProcessHandle for FakeProcess {
        fn stop(&mut self) {
            self.alive.store(false, Ordering::SeqCst);
        }

        fn is_running(&mut self) -> bool {
            self.alive.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct CountingSpawner {
        commands: Mutex<Vec<String>>,
        alive: Arc<AtomicBool>,
    }

    impl CountingSpawner {
        fn spawned(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }
    }

    impl ProcessSpawner for CountingSpawner {
        fn spawn(
            &self,
            command: &str,
            _home: Option<&Path>,
            _shell: Option<&str>,
        ) -> io::Result<Box<dyn ProcessHandle>> {
            self.commands.lock().unwrap().push(command.to_string());
            self.alive.store(true, Ordering::SeqCst);
            Ok(Box::new(FakeProcess {
                alive: self.alive.clone(),
            }))
        }
    }

    #[derive(Default)]
    struct CountingNotifier {
        sent: AtomicUsize,
    }

    impl Notifier for CountingNotifier {
        fn send(&self, _subject: &str, _body: &str, _settings: &JobSettings) {
            self.sent.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn daemon_for(text: &str, origin: NaiveDateTime) -> (Daemon, Arc<CountingSpawner>) {
        let config = Config::parse(text, None, origin);
        let spawner = Arc::new(CountingSpawner::default());
        let daemon = Daemon::new(config)
            .with_spawner(spawner.clone())
            .with_notifier(Arc::new(CountingNotifier::default()));
        (daemon, spawner)
    }

    #[test]
    fn test_startup_fires_reboot_jobs_and_services() {
        let origin = at(2026, 3, 10, 9, 15);
        let (mut daemon, spawner) = daemon_for(
            "@reboot echo boot\n@service run-server\n0 * * * * echo hourly\n",
            origin,
        );

        daemon.startup();

        let spawned = spawner.spawned();
        assert_eq!(spawned, vec!["echo boot", "run-server"]);
        assert_eq!(
            daemon.jobs()[1].service_state(),
            Some(ServiceState::Running)
        );
    }

    #[test]
    fn test_tick_fires_due_job_once_and_reschedules() {
        let origin = at(2026, 3, 10, 9, 15);
        let (mut daemon, spawner) = daemon_for("0 * * * * echo hourly\n", origin);

        // Not due yet.
        daemon.tick(at(2026, 3, 10, 9, 59));
        assert!(spawner.spawned().is_empty());

        // Due at 10:00; fires and reschedules for 11:00.
        daemon.tick(at(2026, 3, 10, 10, 0));
        assert_eq!(spawner.spawned(), vec!["echo hourly"]);
        assert_eq!(daemon.jobs()[0].next_run(), Some(at(2026, 3, 10, 11, 0)));

        // Same minute again: already rescheduled, no double fire.
        daemon.tick(at(2026, 3, 10, 10, 0));
        assert_eq!(spawner.spawned().len(), 1);
    }

    #[test]
    fn test_tick_restarts_dead_service() {
        let origin = at(2026, 3, 10, 9, 15);
        let (mut daemon, spawner) = daemon_for("@service run-server\n", origin);

        daemon.startup();
        assert_eq!(spawner.spawned().len(), 1);

        // Service stays up: no respawn.
        daemon.tick(at(2026, 3, 10, 9, 16));
        assert_eq!(spawner.spawned().len(), 1);

        // Service dies: next tick restarts it.
        spawner.alive.store(false, Ordering::SeqCst);
        daemon.tick(at(2026, 3, 10, 9, 17));
        assert_eq!(spawner.spawned().len(), 2);
    }

    #[test]
    fn test_missed_jobs_skipped_unless_run_missed() {
        let origin = at(2026, 3, 10, 9, 15);
        let (mut daemon, spawner) = daemon_for("0 * * * * echo hourly\n", origin);

        // Hours overdue without run_missed: skipped but rescheduled.
        daemon.tick(at(2026, 3, 10, 14, 30));
        assert!(spawner.spawned().is_empty());
        assert_eq!(daemon.jobs()[0].next_run(), Some(at(2026, 3, 10, 15, 0)));

        let (mut daemon, spawner) =
            daemon_for("run_missed = yes\n0 * * * * echo hourly\n", origin);
        daemon.tick(at(2026, 3, 10, 14, 30));
        assert_eq!(spawner.spawned().len(), 1);
    }

    #[test]
    fn test_terminate_all_stops_services() {
        let origin = at(2026, 3, 10, 9, 15);
        let (mut daemon, _spawner) = daemon_for("@service run-server\n", origin);

        daemon.startup();
        daemon.terminate_all();
        assert_eq!(
            daemon.jobs()[0].service_state(),
            Some(ServiceState::Stopping)
        );

        // FakeProcess::stop flips liveness, so the drain check settles.
        assert!(!daemon.services_active());
        assert_eq!(
            daemon.jobs()[0].service_state(),
            Some(ServiceState::Inactive)
        );
    }
}
