use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use tracing::{error, info};
use url::Url;

use crate::api::NewsApi;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::NotificationKind;
use crate::sidebar::SidebarController;
use crate::storage::SharedStorage;
use crate::store::Store;
use crate::theme::{Theme, ThemeController, ThemeSurface};
use crate::toast::ToastLayer;
use crate::transition::{Navigator, PageTransition, TransitionSurface};

pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred. Please try again.";

/// Host-provided pieces the controllers drive.
pub struct ContextParts {
    pub storage: SharedStorage,
    pub theme_surface: Arc<dyn ThemeSurface>,
    pub navigator: Arc<dyn Navigator>,
    pub transition_surface: Arc<dyn TransitionSurface>,
    /// OS colour scheme at startup, if the platform reports one.
    pub system_theme: Option<Theme>,
}

/// Built once at startup and handed to whoever needs it.
pub struct AppContext {
    pub config: AppConfig,
    pub api: NewsApi,
    pub store: Store,
    pub theme: ThemeController,
    pub sidebar: SidebarController,
    pub transition: PageTransition,
    pub toasts: ToastLayer,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("api", &self.api.base_url().as_str())
            .field("theme", &self.theme.current())
            .field("sidebar", &self.sidebar.is_open())
            .field("transition", &self.transition.state())
            .finish_non_exhaustive()
    }
}

impl AppContext {
    pub fn new(config: AppConfig, parts: ContextParts) -> Result<Self, ApiError> {
        let api = NewsApi::from_config(&config.api)?;
        Ok(Self::with_api(config, api, parts))
    }

    pub fn with_api(config: AppConfig, api: NewsApi, parts: ContextParts) -> Self {
        let store = Store::new(parts.storage.clone());
        let theme = ThemeController::new(parts.storage, parts.theme_surface, parts.system_theme);
        let sidebar = SidebarController::new(config.ui.sidebar_breakpoint);
        let start: Url = api.base_url().clone();
        let transition = PageTransition::new(
            start,
            parts.navigator,
            parts.transition_surface,
            config.ui.fade_out(),
            config.ui.settle(),
        );
        let toasts = ToastLayer::attach(&store, config.toast.clone());
        Self {
            config,
            api,
            store,
            theme,
            sidebar,
            transition,
            toasts,
        }
    }

    /// Bookmarks first, then articles and categories together.
    pub async fn init(&self) {
        self.store.load_bookmarks();
        let (articles, categories) = tokio::join!(
            self.store.load_articles(&self.api),
            self.store.load_categories(&self.api)
        );
        info!(
            articles = articles.len(),
            categories = categories.len(),
            bookmarks = self.store.bookmark_count(),
            "initial data loaded"
        );
    }

    pub async fn reload(&self) {
        tokio::join!(
            self.store.load_articles(&self.api),
            self.store.load_categories(&self.api)
        );
    }

    /// Toast with the configured default duration.
    pub fn notify(&self, message: impl Into<String>, kind: NotificationKind) -> u64 {
        self.store
            .add_notification(message, kind, self.config.ui.toast_duration())
    }

    /// Last-resort handler: log and tell the user, never abort.
    pub fn report_error(&self, err: &dyn fmt::Display) {
        error!(error = %err, "unhandled error");
        self.notify(GENERIC_ERROR_MESSAGE, NotificationKind::Error);
    }

    /// Routes panics through the same path as [`AppContext::report_error`],
    /// after the previously installed hook has run.
    pub fn install_panic_hook(&self) {
        thread_local! {
            static IN_HOOK: Cell<bool> = const { Cell::new(false) };
        }

        let store = self.store.clone();
        let duration = self.config.ui.toast_duration();
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            previous(panic_info);
            error!(panic = %panic_info, "global error");
            // A panicking notification subscriber must not loop back in here.
            if !IN_HOOK.with(|flag| flag.replace(true)) {
                store.add_notification(GENERIC_ERROR_MESSAGE, NotificationKind::Error, duration);
                IN_HOOK.with(|flag| flag.set(false));
            }
        }));
    }
}
