//! Notification sinks

use std::str::FromStr;
use std::time::Duration;

use notify_rust::{Notification, Timeout};
use serde::Deserialize;
use tokio::runtime::Handle;
use tracing::warn;

use super::NotificationSink;
use crate::error::{MonitorError, Result};

/// Desktop notification through the platform notification service
///
/// Inside a tokio runtime the D-Bus call runs on the blocking pool and its
/// failure is only logged; the cycle never waits on the notification daemon.
pub struct DesktopNotifier;

impl NotificationSink for DesktopNotifier {
    fn notify(
        &self,
        title: &str,
        message: &str,
        source_tag: &str,
        timeout: Duration,
    ) -> Result<()> {
        let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        let mut notification = Notification::new();
        notification
            .summary(title)
            .body(message)
            .appname(source_tag)
            .timeout(Timeout::Milliseconds(millis));

        deliver_detached(move || {
            notification
                .show()
                .map(|_| ())
                .map_err(|e| MonitorError::Notification(e.to_string()))
        })
    }
}

/// Run `deliver` on the blocking pool when a runtime is available, inline otherwise
fn deliver_detached<F>(deliver: F) -> Result<()>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn_blocking(move || {
                if let Err(e) = deliver() {
                    warn!(
                        event = "alert_delivery_failed",
                        error = %e,
                        "Desktop notification failed"
                    );
                }
            });
            Ok(())
        }
        Err(_) => deliver(),
    }
}

/// Writes alerts to the log only; for headless hosts
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(
        &self,
        title: &str,
        message: &str,
        source_tag: &str,
        _timeout: Duration,
    ) -> Result<()> {
        warn!(event = "notification", source = %source_tag, title = %title, "{}", message);
        Ok(())
    }
}

/// Which sink the monitor delivers alerts through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    #[default]
    Desktop,
    Log,
}

impl FromStr for NotifierKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "desktop" => Ok(NotifierKind::Desktop),
            "log" => Ok(NotifierKind::Log),
            other => Err(format!("unknown notifier '{other}' (expected desktop or log)")),
        }
    }
}

/// Build the configured sink
pub fn create_notifier(kind: NotifierKind) -> Box<dyn NotificationSink> {
    match kind {
        NotifierKind::Desktop => Box::new(DesktopNotifier),
        NotifierKind::Log => Box::new(LogNotifier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_log_notifier_always_succeeds() {
        let sink = LogNotifier;
        assert!(sink
            .notify("title", "body", "hostwatch", Duration::from_secs(10))
            .is_ok());
    }

    #[tokio::test]
    async fn test_detached_delivery_does_not_wait() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (done_tx, done_rx) = mpsc::channel();

        let result = deliver_detached(move || {
            release_rx.recv().ok();
            done_tx.send(()).ok();
            Err(MonitorError::Notification("no notification daemon".into()))
        });

        // Delivery is still blocked on the release channel here
        assert!(result.is_ok());
        release_tx.send(()).unwrap();
        tokio::task::spawn_blocking(move || done_rx.recv())
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_delivery_runs_inline_without_runtime() {
        let result = deliver_detached(|| Err(MonitorError::Notification("no bus".into())));
        assert!(matches!(result, Err(MonitorError::Notification(_))));
    }

    #[test]
    fn test_notifier_kind_parsing() {
        assert_eq!("Desktop".parse::<NotifierKind>(), Ok(NotifierKind::Desktop));
        assert_eq!("log".parse::<NotifierKind>(), Ok(NotifierKind::Log));
        assert!("webhook".parse::<NotifierKind>().is_err());
    }
}
