use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::api::NewsApi;
use crate::bookmarks::BookmarkSet;
use crate::error::StoreError;
use crate::models::{Article, Category, Filters, Notification, SortBy, User};
use crate::storage::SharedStorage;

/// Everything the page knows about, created once at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub articles: Vec<Article>,
    pub categories: Vec<Category>,
    pub current_user: Option<User>,
    pub notifications: Vec<Notification>,
    pub bookmarks: BookmarkSet,
    pub filters: Filters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    Articles,
    Categories,
    CurrentUser,
    Notifications,
    Bookmarks,
    Filters,
}

impl StateKey {
    pub const ALL: [StateKey; 6] = [
        StateKey::Articles,
        StateKey::Categories,
        StateKey::CurrentUser,
        StateKey::Notifications,
        StateKey::Bookmarks,
        StateKey::Filters,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StateKey::Articles => "articles",
            StateKey::Categories => "categories",
            StateKey::CurrentUser => "currentUser",
            StateKey::Notifications => "notifications",
            StateKey::Bookmarks => "bookmarks",
            StateKey::Filters => "filters",
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value of one [`AppState`] field, tagged with the field it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    Articles(Vec<Article>),
    Categories(Vec<Category>),
    CurrentUser(Option<User>),
    Notifications(Vec<Notification>),
    Bookmarks(BookmarkSet),
    Filters(Filters),
}

impl StateValue {
    pub fn key(&self) -> StateKey {
        match self {
            StateValue::Articles(_) => StateKey::Articles,
            StateValue::Categories(_) => StateKey::Categories,
            StateValue::CurrentUser(_) => StateKey::CurrentUser,
            StateValue::Notifications(_) => StateKey::Notifications,
            StateValue::Bookmarks(_) => StateKey::Bookmarks,
            StateValue::Filters(_) => StateKey::Filters,
        }
    }

    fn read(state: &AppState, key: StateKey) -> Self {
        match key {
            StateKey::Articles => StateValue::Articles(state.articles.clone()),
            StateKey::Categories => StateValue::Categories(state.categories.clone()),
            StateKey::CurrentUser => StateValue::CurrentUser(state.current_user.clone()),
            StateKey::Notifications => StateValue::Notifications(state.notifications.clone()),
            StateKey::Bookmarks => StateValue::Bookmarks(state.bookmarks.clone()),
            StateKey::Filters => StateValue::Filters(state.filters.clone()),
        }
    }

    fn write(self, state: &mut AppState) {
        match self {
            StateValue::Articles(v) => state.articles = v,
            StateValue::Categories(v) => state.categories = v,
            StateValue::CurrentUser(v) => state.current_user = v,
            StateValue::Notifications(v) => state.notifications = v,
            StateValue::Bookmarks(v) => state.bookmarks = v,
            StateValue::Filters(v) => state.filters = v,
        }
    }
}

/// Partial record for [`Store::update`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FiltersPatch {
    pub search_term: Option<String>,
    pub selected_category: Option<Option<i64>>,
    pub sort_by: Option<SortBy>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<Option<String>>,
    pub is_admin: Option<bool>,
}

/// Shallow merges are only defined for record-shaped fields.
#[derive(Debug, Clone, PartialEq)]
pub enum StatePatch {
    Filters(FiltersPatch),
    CurrentUser(UserPatch),
}

impl StatePatch {
    pub fn key(&self) -> StateKey {
        match self {
            StatePatch::Filters(_) => StateKey::Filters,
            StatePatch::CurrentUser(_) => StateKey::CurrentUser,
        }
    }

    fn apply(self, state: &mut AppState) -> Result<(), StoreError> {
        match self {
            StatePatch::Filters(patch) => {
                let filters = &mut state.filters;
                if let Some(term) = patch.search_term {
                    filters.search_term = term;
                }
                if let Some(category) = patch.selected_category {
                    filters.selected_category = category;
                }
                if let Some(sort_by) = patch.sort_by {
                    filters.sort_by = sort_by;
                }
                Ok(())
            }
            StatePatch::CurrentUser(patch) => {
                let user = state
                    .current_user
                    .as_mut()
                    .ok_or(StoreError::NotARecord(StateKey::CurrentUser.as_str()))?;
                if let Some(username) = patch.username {
                    user.username = username;
                }
                if let Some(email) = patch.email {
                    user.email = email;
                }
                if let Some(is_admin) = patch.is_admin {
                    user.is_admin = is_admin;
                }
                Ok(())
            }
        }
    }
}

pub type Subscriber = Arc<dyn Fn(&StateValue) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub(crate) struct Inner {
    pub(crate) state: AppState,
    subscribers: Vec<(SubscriptionId, StateKey, Subscriber)>,
    next_subscription: u64,
    pub(crate) last_notification_id: u64,
    pub(crate) timers: HashMap<u64, JoinHandle<()>>,
    /// Bumped on every write to a key.
    versions: HashMap<StateKey, u64>,
}

impl Inner {
    fn bump(&mut self, key: StateKey) -> u64 {
        let version = self.versions.entry(key).or_default();
        *version += 1;
        *version
    }
}

/// Held across a write and its fan-out so deliveries from different threads
/// cannot overtake each other. The owning thread may re-enter, which lets
/// subscribers write back into the store.
#[derive(Default)]
struct Dispatch {
    owner: Mutex<Option<(ThreadId, usize)>>,
    released: Condvar,
}

impl Dispatch {
    fn enter(&self) -> DispatchGuard<'_> {
        let me = thread::current().id();
        let mut owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match *owner {
                None => {
                    *owner = Some((me, 1));
                    break;
                }
                Some((id, ref mut depth)) if id == me => {
                    *depth += 1;
                    break;
                }
                Some(_) => {}
            }
            owner = self
                .released
                .wait(owner)
                .unwrap_or_else(PoisonError::into_inner);
        }
        DispatchGuard { dispatch: self }
    }
}

struct DispatchGuard<'a> {
    dispatch: &'a Dispatch,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        let mut owner = self
            .dispatch
            .owner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some((_, depth)) = owner.as_mut() {
            *depth -= 1;
            if *depth == 0 {
                *owner = None;
                self.dispatch.released.notify_one();
            }
        }
    }
}

/// Shared handle to the application state. Clones observe the same state.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<Inner>>,
    dispatch: Arc<Dispatch>,
    pub(crate) storage: SharedStorage,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Store")
            .field("state", &inner.state)
            .field("subscribers", &inner.subscribers.len())
            .field("pending_timers", &inner.timers.len())
            .finish()
    }
}

impl Store {
    pub fn new(storage: SharedStorage) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: AppState::default(),
                subscribers: Vec::new(),
                next_subscription: 0,
                last_notification_id: 0,
                timers: HashMap::new(),
                versions: HashMap::new(),
            })),
            dispatch: Arc::default(),
            storage,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: StateKey) -> StateValue {
        StateValue::read(&self.lock().state, key)
    }

    /// Replaces one field wholesale, then runs that field's subscribers before returning.
    pub fn set(&self, value: StateValue) {
        self.mutate(value.key(), |inner| value.write(&mut inner.state));
    }

    pub fn subscribe<F>(&self, key: StateKey, callback: F) -> SubscriptionId
    where
        F: Fn(&StateValue) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        inner.subscribers.push((id, key, Arc::new(callback)));
        id
    }

    /// Returns `false` when the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(existing, _, _)| *existing != id);
        inner.subscribers.len() != before
    }

    /// Shallow merge into a record field. Merging into an absent user is rejected
    /// and leaves the state and subscribers untouched.
    pub fn update(&self, patch: StatePatch) -> Result<(), StoreError> {
        self.try_mutate(patch.key(), |inner| patch.apply(&mut inner.state))
    }

    /// Deep copy of the whole state.
    pub fn get_state(&self) -> AppState {
        self.lock().state.clone()
    }

    /// Restores defaults, cancels pending notification timers and notifies every key.
    /// Bookmarks survive: the in-memory set stays in step with durable storage.
    pub fn reset(&self) {
        let _dispatch = self.dispatch.enter();
        let values: Vec<(StateValue, u64)> = {
            let mut inner = self.lock();
            let bookmarks = std::mem::take(&mut inner.state.bookmarks);
            inner.state = AppState {
                bookmarks,
                ..AppState::default()
            };
            for (_, timer) in inner.timers.drain() {
                timer.abort();
            }
            StateKey::ALL
                .iter()
                .map(|key| (StateValue::read(&inner.state, *key), inner.bump(*key)))
                .collect()
        };
        for (value, version) in &values {
            self.notify(value, *version);
        }
    }

    /// Runs `mutate` under the lock, then notifies `key` with the resulting value.
    pub(crate) fn mutate<R>(&self, key: StateKey, mutate: impl FnOnce(&mut Inner) -> R) -> R {
        match self.try_mutate(key, |inner| Ok::<_, Infallible>(mutate(inner))) {
            Ok(result) => result,
            Err(never) => match never {},
        }
    }

    /// Like [`Store::mutate`], but an `Err` leaves subscribers alone.
    fn try_mutate<R, E>(
        &self,
        key: StateKey,
        mutate: impl FnOnce(&mut Inner) -> Result<R, E>,
    ) -> Result<R, E> {
        let _dispatch = self.dispatch.enter();
        let (result, current, version) = {
            let mut inner = self.lock();
            let result = mutate(&mut inner)?;
            let version = inner.bump(key);
            (result, StateValue::read(&inner.state, key), version)
        };
        self.notify(&current, version);
        Ok(result)
    }

    /// Subscribers run outside the state lock; a panicking one is logged and the rest
    /// still run. Delivery stops early once a subscriber has written a newer value,
    /// since that write already reached everyone.
    fn notify(&self, value: &StateValue, version: u64) {
        let key = value.key();
        let subscribers: Vec<Subscriber> = self
            .lock()
            .subscribers
            .iter()
            .filter(|(_, k, _)| *k == key)
            .map(|(_, _, callback)| Arc::clone(callback))
            .collect();
        for callback in subscribers {
            if self.lock().versions.get(&key) != Some(&version) {
                debug!(%key, version, "superseded during delivery");
                break;
            }
            if catch_unwind(AssertUnwindSafe(|| callback(value))).is_err() {
                error!(%key, "subscriber panicked, continuing with the remaining subscribers");
            }
        }
    }

    pub fn articles(&self) -> Vec<Article> {
        self.lock().state.articles.clone()
    }

    pub fn categories(&self) -> Vec<Category> {
        self.lock().state.categories.clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.lock().state.current_user.clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().state.notifications.clone()
    }

    pub fn bookmarks(&self) -> BookmarkSet {
        self.lock().state.bookmarks.clone()
    }

    pub fn filters(&self) -> Filters {
        self.lock().state.filters.clone()
    }

    pub fn set_current_user(&self, user: Option<User>) {
        self.set(StateValue::CurrentUser(user));
    }

    pub fn set_filters(&self, filters: Filters) {
        self.set(StateValue::Filters(filters));
    }

    /// `articles` narrowed by the current filters and ordered by `sort_by`.
    pub fn filtered_articles(&self) -> Vec<Article> {
        let inner = self.lock();
        let filters = &inner.state.filters;
        let mut visible: Vec<Article> = inner
            .state
            .articles
            .iter()
            .filter(|article| filters.matches(article))
            .cloned()
            .collect();
        match filters.sort_by {
            SortBy::Recent => visible.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortBy::Oldest => visible.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortBy::Title => visible.sort_by_key(|a| a.title.to_lowercase()),
        }
        visible
    }

    /// On failure the articles already in the store are kept and an empty list is returned.
    pub async fn load_articles(&self, api: &NewsApi) -> Vec<Article> {
        match api.fetch_articles().await {
            Ok(articles) => {
                self.set(StateValue::Articles(articles.clone()));
                articles
            }
            Err(err) => {
                warn!(error = %err, "failed to load articles");
                Vec::new()
            }
        }
    }

    pub async fn load_categories(&self, api: &NewsApi) -> Vec<Category> {
        match api.fetch_categories().await {
            Ok(categories) => {
                self.set(StateValue::Categories(categories.clone()));
                categories
            }
            Err(err) => {
                warn!(error = %err, "failed to load categories");
                Vec::new()
            }
        }
    }
}
