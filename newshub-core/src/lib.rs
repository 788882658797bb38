pub mod api;
pub mod bookmarks;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod notifications;
pub mod sidebar;
pub mod storage;
pub mod store;
pub mod text;
pub mod theme;
pub mod toast;
pub mod transition;

pub use api::NewsApi;
pub use bookmarks::{ArticleId, BookmarkSet};
pub use config::{ApiConfig, AppConfig, ToastPalette, UiConfig};
pub use context::{AppContext, ContextParts};
pub use error::{ApiError, ConfigError, StorageError, StoreError};
pub use models::{Article, Category, Filters, Notification, NotificationKind, SortBy, User};
pub use notifications::DEFAULT_NOTIFICATION_DURATION;
pub use sidebar::{SidebarController, SidebarView};
pub use storage::{FileStorage, LocalStorage, MemoryStorage, SharedStorage};
pub use store::{
    AppState, FiltersPatch, StateKey, StatePatch, StateValue, Store, SubscriptionId, UserPatch,
};
pub use theme::{Theme, ThemeController, ThemeSurface};
pub use toast::{ToastFrame, ToastLayer};
pub use transition::{ClickOutcome, Link, LinkKind, Navigator, PageTransition, TransitionState, TransitionSurface};
