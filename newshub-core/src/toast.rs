//! Single rendering subscriber for the store's notification list.
//!
//! A notification removed from the store stays on screen for [`FADE_DURATION`]
//! while it fades out, then disappears.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::ToastPalette;
use crate::models::{Notification, NotificationKind};
use crate::store::{StateKey, StateValue, Store, SubscriptionId};

pub const FADE_DURATION: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq)]
struct Toast {
    id: u64,
    message: String,
    kind: NotificationKind,
    leaving_since: Option<Instant>,
}

/// One toast as it should be drawn this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ToastFrame {
    pub id: u64,
    pub message: String,
    pub kind: NotificationKind,
    pub background: [u8; 3],
    /// 1.0 while shown, falling to 0.0 across the fade.
    pub opacity: f32,
}

pub struct ToastLayer {
    store: Store,
    toasts: Arc<Mutex<Vec<Toast>>>,
    palette: ToastPalette,
    subscription: SubscriptionId,
}

impl std::fmt::Debug for ToastLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToastLayer")
            .field("toasts", &*lock(&self.toasts))
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

impl ToastLayer {
    pub fn attach(store: &Store, palette: ToastPalette) -> Self {
        let toasts = Arc::new(Mutex::new(Vec::new()));
        sync(&toasts, &store.notifications(), Instant::now());

        let sink = Arc::clone(&toasts);
        let subscription = store.subscribe(StateKey::Notifications, move |value| {
            if let StateValue::Notifications(list) = value {
                sync(&sink, list, Instant::now());
            }
        });

        Self {
            store: store.clone(),
            toasts,
            palette,
            subscription,
        }
    }

    /// Drops fully faded toasts and returns what remains to draw.
    pub fn frame(&self, now: Instant) -> Vec<ToastFrame> {
        let mut toasts = lock(&self.toasts);
        toasts.retain(|toast| {
            toast
                .leaving_since
                .map_or(true, |since| now.saturating_duration_since(since) < FADE_DURATION)
        });
        toasts
            .iter()
            .map(|toast| ToastFrame {
                id: toast.id,
                message: toast.message.clone(),
                kind: toast.kind,
                background: self.palette.rgb(toast.kind),
                opacity: opacity(toast.leaving_since, now),
            })
            .collect()
    }

    /// True while anything is on screen, so the caller keeps repainting.
    pub fn is_animating(&self) -> bool {
        !lock(&self.toasts).is_empty()
    }

    /// Click-to-dismiss goes through the store so every observer agrees.
    pub fn dismiss(&self, id: u64) {
        self.store.remove_notification(id);
    }
}

impl Drop for ToastLayer {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription);
    }
}

fn sync(toasts: &Mutex<Vec<Toast>>, list: &[Notification], now: Instant) {
    let mut toasts = lock(toasts);
    for toast in toasts.iter_mut() {
        if toast.leaving_since.is_none() && !list.iter().any(|n| n.id == toast.id) {
            toast.leaving_since = Some(now);
        }
    }
    for notification in list {
        if !toasts.iter().any(|t| t.id == notification.id) {
            toasts.push(Toast {
                id: notification.id,
                message: notification.message.clone(),
                kind: notification.kind,
                leaving_since: None,
            });
        }
    }
}

fn opacity(leaving_since: Option<Instant>, now: Instant) -> f32 {
    match leaving_since {
        None => 1.0,
        Some(since) => {
            let elapsed = now.saturating_duration_since(since).as_secs_f32();
            (1.0 - elapsed / FADE_DURATION.as_secs_f32()).clamp(0.0, 1.0)
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn mirrors_store_and_fades_removed_toasts() {
        let store = Store::new(MemoryStorage::shared());
        let layer = ToastLayer::attach(&store, ToastPalette::default());

        let id = store.add_notification("Saved", NotificationKind::Success, Duration::ZERO);
        let start = Instant::now();
        let frames = layer.frame(start);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].background, [22, 163, 74]);
        assert_eq!(frames[0].opacity, 1.0);

        store.remove_notification(id);
        let removed_at = Instant::now();
        let halfway = layer.frame(removed_at + FADE_DURATION / 2);
        assert_eq!(halfway.len(), 1);
        assert!(halfway[0].opacity < 1.0);

        assert!(layer.frame(removed_at + FADE_DURATION).is_empty());
        assert!(!layer.is_animating());
    }

    #[test]
    fn picks_up_existing_notifications_on_attach() {
        let store = Store::new(MemoryStorage::shared());
        store.add_notification("early", NotificationKind::Warning, Duration::ZERO);
        let layer = ToastLayer::attach(&store, ToastPalette::default());
        assert_eq!(layer.frame(Instant::now())[0].message, "early");
    }

    #[test]
    fn dismiss_removes_from_store() {
        let store = Store::new(MemoryStorage::shared());
        let layer = ToastLayer::attach(&store, ToastPalette::default());
        let id = store.add_notification("bye", NotificationKind::Info, Duration::ZERO);
        layer.dismiss(id);
        assert!(store.notifications().is_empty());
    }
}
