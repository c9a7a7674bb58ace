// ── Notification channel ──
//
// A single slot holding the one notification currently on screen. A new
// publish replaces whatever is there. Each publish arms its own clear
// timer, and a timer only clears the notification it was armed for, so a
// superseded timer firing late can never erase a newer message.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Monotonic per channel; identifies which publish a timer belongs to.
    pub id: u64,
    pub message: String,
    pub severity: Severity,
    pub expires_at: Instant,
}

impl Notification {
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

struct ChannelInner {
    slot: watch::Sender<Option<Notification>>,
    next_id: AtomicU64,
    display_for: Duration,
}

/// Process-wide (per context) single-slot notification channel. Cheap to
/// clone.
#[derive(Clone)]
pub struct NotificationChannel {
    inner: Arc<ChannelInner>,
}

impl NotificationChannel {
    pub fn new(display_for: Duration) -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            inner: Arc::new(ChannelInner {
                slot,
                next_id: AtomicU64::new(1),
                display_for,
            }),
        }
    }

    pub fn display_duration(&self) -> Duration {
        self.inner.display_for
    }

    /// Show `message`, replacing any current notification.
    pub fn publish(&self, message: impl Into<String>, severity: Severity) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let notification = Notification {
            id,
            message: message.into(),
            severity,
            expires_at: Instant::now() + self.inner.display_for,
        };
        debug!(id, %severity, message = %notification.message, "notification");
        self.inner.slot.send_replace(Some(notification));

        // Outside a runtime the slot still expires lazily via `current()`.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let inner = Arc::downgrade(&self.inner);
            let delay = self.inner.display_for;
            handle.spawn(async move {
                tokio::time::sleep(delay).await;
                if let Some(inner) = inner.upgrade() {
                    clear_if_current(&inner.slot, id);
                }
            });
        }
        id
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.publish(message, Severity::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.publish(message, Severity::Error)
    }

    /// The notification on screen, if any and not yet expired.
    pub fn current(&self) -> Option<Notification> {
        self.inner.slot.borrow().clone().filter(|n| !n.is_expired())
    }

    /// Clear the notification now.
    pub fn dismiss(&self) {
        self.inner.slot.send_if_modified(|slot| slot.take().is_some());
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Notification>> {
        self.inner.slot.subscribe()
    }
}

fn clear_if_current(slot: &watch::Sender<Option<Notification>>, id: u64) {
    slot.send_if_modified(|current| {
        if current.as_ref().is_some_and(|n| n.id == id) {
            *current = None;
            true
        } else {
            false
        }
    });
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn clears_after_display_duration() {
        let channel = NotificationChannel::default();
        channel.success("Asset created successfully");

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert_eq!(
            channel.current().map(|n| n.message),
            Some("Asset created successfully".to_owned())
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(channel.current().is_none());
        assert!(channel.subscribe().borrow().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn last_write_wins_and_old_timer_spares_newer() {
        let channel = NotificationChannel::default();
        let mut rx = channel.subscribe();

        channel.success("first");
        tokio::time::sleep(Duration::from_millis(2000)).await;
        channel.error("second");

        assert_eq!(rx.borrow_and_update().as_ref().map(|n| n.message.as_str()), Some("second"));

        // The first timer fires at 3.0s; "second" must survive it.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let shown = channel.current().unwrap_or_else(|| panic!("second notification cleared early"));
        assert_eq!(shown.message, "second");
        assert_eq!(shown.severity, Severity::Error);

        // Its own timer fires at 5.0s.
        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert!(channel.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_clears_immediately() {
        let channel = NotificationChannel::new(Duration::from_secs(10));
        channel.publish("saved", Severity::Info);
        channel.dismiss();
        assert!(channel.current().is_none());
    }

    #[test]
    fn severity_renders_lowercase() {
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!("error".parse::<Severity>().ok(), Some(Severity::Error));
    }
}
