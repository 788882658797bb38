//! Light/dark theme resolution and persistence.
//!
//! The theme is resolved from the saved preference, then the OS colour scheme,
//! then `light`. OS scheme changes are followed live only while the user has not
//! saved an explicit preference.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::storage::{SharedStorage, THEME_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }

    /// Glyph shown by every themed toggle icon.
    pub fn icon(self) -> &'static str {
        match self {
            Theme::Dark => "\u{263E}",
            Theme::Light => "\u{2600}",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visual layer the controller drives.
pub trait ThemeSurface: Send + Sync {
    /// Document-level marker (the `dark` class on the root element).
    fn apply_document_theme(&self, theme: Theme);
    fn update_indicators(&self, theme: Theme);
}

#[derive(Debug, Clone, Copy)]
struct ThemeState {
    current: Theme,
    system: Option<Theme>,
}

pub struct ThemeController {
    storage: SharedStorage,
    surface: Arc<dyn ThemeSurface>,
    state: Mutex<ThemeState>,
}

impl fmt::Debug for ThemeController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeController")
            .field("state", &*self.state.lock().unwrap_or_else(PoisonError::into_inner))
            .finish_non_exhaustive()
    }
}

impl ThemeController {
    /// Resolves and applies the initial theme without persisting it.
    pub fn new(
        storage: SharedStorage,
        surface: Arc<dyn ThemeSurface>,
        system: Option<Theme>,
    ) -> Self {
        let controller = Self {
            storage,
            surface,
            state: Mutex::new(ThemeState {
                current: Theme::Light,
                system,
            }),
        };
        let initial = controller
            .saved_preference()
            .or(system)
            .unwrap_or_default();
        controller.apply(initial);
        controller
    }

    pub fn current(&self) -> Theme {
        self.state().current
    }

    pub fn saved_preference(&self) -> Option<Theme> {
        match self.storage.get_item(THEME_KEY) {
            Ok(Some(raw)) => {
                let theme = Theme::parse(&raw);
                if theme.is_none() {
                    debug!(value = %raw, "ignoring unknown saved theme");
                }
                theme
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "failed to read theme preference");
                None
            }
        }
    }

    /// Flips, persists and returns the new theme.
    pub fn toggle(&self) -> Theme {
        let next = self.current().opposite();
        self.set(next);
        next
    }

    pub fn set(&self, theme: Theme) {
        self.apply(theme);
        if let Err(e) = self.storage.set_item(THEME_KEY, theme.as_str()) {
            warn!(error = %e, "failed to persist theme preference");
        }
        info!(%theme, "theme changed");
    }

    /// OS colour-scheme change notification.
    pub fn system_scheme_changed(&self, theme: Theme) {
        self.lock_state().system = Some(theme);
        if self.saved_preference().is_none() {
            self.apply(theme);
        } else {
            debug!(%theme, "explicit preference saved, ignoring system scheme change");
        }
    }

    /// Forgets the saved preference and falls back to the OS scheme.
    pub fn clear_preference(&self) {
        if let Err(e) = self.storage.remove_item(THEME_KEY) {
            warn!(error = %e, "failed to clear theme preference");
        }
        let fallback = self.state().system.unwrap_or_default();
        self.apply(fallback);
    }

    fn apply(&self, theme: Theme) {
        self.lock_state().current = theme;
        self.surface.apply_document_theme(theme);
        self.surface.update_indicators(theme);
    }

    fn state(&self) -> ThemeState {
        *self.lock_state()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ThemeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{LocalStorage, MemoryStorage};

    #[derive(Default)]
    struct Recorder {
        document: Mutex<Vec<Theme>>,
        indicators: Mutex<Vec<Theme>>,
    }

    impl ThemeSurface for Recorder {
        fn apply_document_theme(&self, theme: Theme) {
            self.document.lock().unwrap().push(theme);
        }

        fn update_indicators(&self, theme: Theme) {
            self.indicators.lock().unwrap().push(theme);
        }
    }

    fn controller(saved: Option<&str>, system: Option<Theme>) -> (ThemeController, Arc<MemoryStorage>, Arc<Recorder>) {
        let storage = MemoryStorage::shared();
        if let Some(saved) = saved {
            storage.set_item(THEME_KEY, saved).unwrap();
        }
        let surface = Arc::new(Recorder::default());
        let controller = ThemeController::new(storage.clone(), surface.clone(), system);
        (controller, storage, surface)
    }

    #[test]
    fn saved_preference_wins_over_system() {
        let (controller, _, surface) = controller(Some("light"), Some(Theme::Dark));
        assert_eq!(controller.current(), Theme::Light);
        assert_eq!(*surface.document.lock().unwrap(), vec![Theme::Light]);
    }

    #[test]
    fn system_scheme_used_without_preference() {
        let (controller, storage, _) = controller(None, Some(Theme::Dark));
        assert_eq!(controller.current(), Theme::Dark);
        // resolving does not persist anything
        assert_eq!(storage.get_item(THEME_KEY).unwrap(), None);
    }

    #[test]
    fn defaults_to_light() {
        let (controller, _, _) = controller(Some("purple"), None);
        assert_eq!(controller.current(), Theme::Light);
    }

    #[test]
    fn toggle_from_saved_light_persists_dark() {
        let (controller, storage, surface) = controller(Some("light"), None);
        assert_eq!(controller.toggle(), Theme::Dark);
        assert_eq!(storage.get_item(THEME_KEY).unwrap().as_deref(), Some("dark"));
        assert_eq!(surface.indicators.lock().unwrap().last(), Some(&Theme::Dark));
    }

    #[test]
    fn system_changes_tracked_only_without_preference() {
        let (controller, _, _) = controller(None, Some(Theme::Light));
        controller.system_scheme_changed(Theme::Dark);
        assert_eq!(controller.current(), Theme::Dark);

        controller.set(Theme::Light);
        controller.system_scheme_changed(Theme::Dark);
        assert_eq!(controller.current(), Theme::Light);

        controller.clear_preference();
        assert_eq!(controller.current(), Theme::Dark);
    }
}
