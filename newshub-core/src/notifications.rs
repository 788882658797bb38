use std::time::Duration;

use chrono::Utc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::models::{Notification, NotificationKind};
use crate::store::{StateKey, Store};

pub const DEFAULT_NOTIFICATION_DURATION: Duration = Duration::from_millis(3000);

impl Store {
    /// Appends a notification and returns its ID immediately. A non-zero `duration`
    /// schedules its removal on the current Tokio runtime.
    pub fn add_notification(
        &self,
        message: impl Into<String>,
        kind: NotificationKind,
        duration: Duration,
    ) -> u64 {
        let message = message.into();
        let id = self.mutate(StateKey::Notifications, |inner| {
            let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
            let id = now.max(inner.last_notification_id + 1);
            inner.last_notification_id = id;
            inner.state.notifications.push(Notification { id, message, kind });
            id
        });

        if !duration.is_zero() {
            self.schedule_dismiss(id, duration);
        }
        id
    }

    /// No-op when the ID is unknown.
    pub fn remove_notification(&self, id: u64) {
        if let Some(timer) = self.lock().timers.remove(&id) {
            timer.abort();
        }
        self.drop_notification(id);
    }

    fn schedule_dismiss(&self, id: u64, duration: Duration) {
        let Ok(handle) = Handle::try_current() else {
            warn!(id, "no async runtime, notification will not auto-dismiss");
            return;
        };
        let store = self.clone();
        // Spawn under the lock so the timer is registered before it can fire.
        let mut inner = self.lock();
        let timer = handle.spawn(async move {
            tokio::time::sleep(duration).await;
            store.lock().timers.remove(&id);
            store.drop_notification(id);
        });
        inner.timers.insert(id, timer);
    }

    fn drop_notification(&self, id: u64) {
        if !self.lock().state.notifications.iter().any(|n| n.id == id) {
            debug!(id, "notification already gone");
            return;
        }
        self.mutate(StateKey::Notifications, |inner| {
            inner.state.notifications.retain(|n| n.id != id);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn ids_are_strictly_increasing() {
        let store = Store::new(MemoryStorage::shared());
        let a = store.add_notification("a", NotificationKind::Info, Duration::ZERO);
        let b = store.add_notification("b", NotificationKind::Info, Duration::ZERO);
        let c = store.add_notification("c", NotificationKind::Info, Duration::ZERO);
        assert!(a < b && b < c);
        assert_eq!(store.notifications().len(), 3);
    }

    #[test]
    fn without_runtime_notification_stays_until_removed() {
        let store = Store::new(MemoryStorage::shared());
        let id = store.add_notification("kept", NotificationKind::Warning, Duration::from_millis(10));
        assert_eq!(store.notifications().len(), 1);
        store.remove_notification(id);
        assert!(store.notifications().is_empty());
    }
}
