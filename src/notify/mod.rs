//! Failure notifications.
//!
//! The supervisor and scheduler report job failures through the [`Notifier`]
//! trait. Delivery is best-effort: implementations must swallow their own
//! errors, since a notification failure must never take down the daemon.

use tracing::{info, warn};

use crate::core::settings::JobSettings;

/// Transport for failure notifications.
pub trait Notifier: Send + Sync {
    /// Deliver a notification. Must not panic or propagate errors.
    fn send(&self, subject: &str, body: &str, settings: &JobSettings);
}

/// Notifier that writes notifications to the log.
///
/// Stands in for a mail transport when no SMTP relay is configured; the
/// per-job `mailto`/`smtp_host` settings are surfaced so an operator can see
/// where a real transport would have delivered.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, subject: &str, body: &str, settings: &JobSettings) {
        match (&settings.mailto, &settings.smtp_host) {
            (Some(mailto), Some(host)) => {
                info!("Notification for {mailto} via {host}: {subject}");
            }
            (Some(mailto), None) => {
                warn!("No smtp_host configured, dropping mail to {mailto}: {subject}");
            }
            _ => {}
        }
        info!("{subject}: {body}");
    }
}
