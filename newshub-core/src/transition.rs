//! Fade-out page transitions for internal links.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    pub target: Option<String>,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            target: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkKind {
    /// Same-origin page load, resolved against the current page.
    Internal(Url),
    External,
    AnchorOnly,
    NewTab,
    Invalid,
}

pub fn classify(link: &Link, current: &Url) -> LinkKind {
    let href = link.href.trim();
    if href.is_empty() {
        return LinkKind::Invalid;
    }
    if href.starts_with('#') {
        return LinkKind::AnchorOnly;
    }
    if link.target.as_deref() == Some("_blank") {
        return LinkKind::NewTab;
    }
    match current.join(href) {
        Ok(resolved) if resolved.origin() == current.origin() => LinkKind::Internal(resolved),
        Ok(_) => LinkKind::External,
        Err(_) => LinkKind::Invalid,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionState {
    #[default]
    Idle,
    Transitioning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Started(Url),
    /// Left to the default behaviour (external, anchor, new tab...).
    Ignored(LinkKind),
    /// A transition is already running; the click is dropped.
    Busy,
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &Url);
}

pub trait TransitionSurface: Send + Sync {
    fn fade_out(&self);
    fn clear(&self);
}

struct Inner {
    state: Mutex<TransitionState>,
    current: Mutex<Url>,
    navigator: Arc<dyn Navigator>,
    surface: Arc<dyn TransitionSurface>,
    fade_out: Duration,
    settle: Duration,
}

#[derive(Clone)]
pub struct PageTransition {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PageTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageTransition")
            .field("state", &self.state())
            .field("current", &self.current_url())
            .finish_non_exhaustive()
    }
}

impl PageTransition {
    pub fn new(
        current: Url,
        navigator: Arc<dyn Navigator>,
        surface: Arc<dyn TransitionSurface>,
        fade_out: Duration,
        settle: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(TransitionState::Idle),
                current: Mutex::new(current),
                navigator,
                surface,
                fade_out,
                settle,
            }),
        }
    }

    pub fn state(&self) -> TransitionState {
        *lock(&self.inner.state)
    }

    pub fn current_url(&self) -> Url {
        lock(&self.inner.current).clone()
    }

    pub fn link_clicked(&self, link: &Link) -> ClickOutcome {
        let url = match classify(link, &self.current_url()) {
            LinkKind::Internal(url) => url,
            other => return ClickOutcome::Ignored(other),
        };

        {
            let mut state = lock(&self.inner.state);
            if *state == TransitionState::Transitioning {
                debug!(%url, "transition in progress, dropping click");
                return ClickOutcome::Busy;
            }
            *state = TransitionState::Transitioning;
        }
        self.inner.surface.fade_out();

        let inner = Arc::clone(&self.inner);
        let target = url.clone();
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(inner.fade_out).await;
                    inner.navigator.navigate(&target);
                });
            }
            Err(_) => {
                warn!(%url, "no async runtime, navigating without delay");
                inner.navigator.navigate(&target);
            }
        }
        ClickOutcome::Started(url)
    }

    /// The new page is in place; the transition classes go after the settle delay.
    pub fn page_loaded(&self, url: Url) {
        *lock(&self.inner.current) = url;
        let inner = Arc::clone(&self.inner);
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(inner.settle).await;
                    settle(&inner);
                });
            }
            Err(_) => settle(&inner),
        }
    }
}

fn settle(inner: &Inner) {
    *lock(&inner.state) = TransitionState::Idle;
    inner.surface.clear();
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("http://localhost:5000/articles").unwrap()
    }

    #[test]
    fn classify_covers_every_kind() {
        let current = page();
        assert_eq!(
            classify(&Link::new("/category/2"), &current),
            LinkKind::Internal(Url::parse("http://localhost:5000/category/2").unwrap())
        );
        assert_eq!(
            classify(&Link::new("article/3"), &current),
            LinkKind::Internal(Url::parse("http://localhost:5000/article/3").unwrap())
        );
        assert_eq!(classify(&Link::new("https://example.com/x"), &current), LinkKind::External);
        assert_eq!(classify(&Link::new("mailto:a@b.c"), &current), LinkKind::External);
        assert_eq!(classify(&Link::new("#top"), &current), LinkKind::AnchorOnly);
        assert_eq!(
            classify(&Link::new("/bookmarks").with_target("_blank"), &current),
            LinkKind::NewTab
        );
        assert_eq!(classify(&Link::new("  "), &current), LinkKind::Invalid);
    }
}
