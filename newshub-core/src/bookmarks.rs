use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{Article, NotificationKind};
use crate::storage::BOOKMARKS_KEY;
use crate::store::{StateKey, Store};

const BOOKMARK_TOAST: Duration = Duration::from_millis(2000);

/// Integer article identity. String forms are coerced on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(i64);

impl ArticleId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    /// Leading/trailing whitespace is ignored; anything else must be an integer.
    pub fn parse(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }

    fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| is_integral_i64(*f)).map(|f| f as i64))
                .map(Self),
            serde_json::Value::String(s) => Self::parse(s),
            _ => None,
        }
    }
}

/// Whole floats only, and only those an `i64` can hold: `1e20` is dropped, not clamped.
fn is_integral_i64(f: f64) -> bool {
    f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

impl FromStr for ArticleId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<i64> for ArticleId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<i32> for ArticleId {
    fn from(id: i32) -> Self {
        Self(i64::from(id))
    }
}

impl From<&Article> for ArticleId {
    fn from(article: &Article) -> Self {
        Self(article.id)
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Bookmarked article IDs in insertion order, each at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkSet(Vec<ArticleId>);

impl BookmarkSet {
    pub fn contains(&self, id: ArticleId) -> bool {
        self.0.contains(&id)
    }

    /// Returns `false` if the ID was already present.
    pub fn insert(&mut self, id: ArticleId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.0.push(id);
        true
    }

    pub fn remove(&mut self, id: ArticleId) -> bool {
        let before = self.0.len();
        self.0.retain(|existing| *existing != id);
        self.0.len() != before
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ArticleId> + '_ {
        self.0.iter().copied()
    }

    /// Lenient decode of the persisted array: numeric strings are coerced,
    /// non-integer entries dropped, duplicates collapsed.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let values: Vec<serde_json::Value> = serde_json::from_str(raw)?;
        let mut set = Self::default();
        for value in &values {
            match ArticleId::from_json(value) {
                Some(id) => {
                    set.insert(id);
                }
                None => debug!(%value, "dropping non-integer bookmark entry"),
            }
        }
        Ok(set)
    }

    pub fn to_json(&self) -> String {
        let ids: Vec<i64> = self.iter().map(ArticleId::get).collect();
        serde_json::Value::from(ids).to_string()
    }
}

impl FromIterator<ArticleId> for BookmarkSet {
    fn from_iter<I: IntoIterator<Item = ArticleId>>(iter: I) -> Self {
        let mut set = Self::default();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl Store {
    /// Replaces the in-memory set with the persisted one. Missing or corrupt data
    /// yields an empty set.
    pub fn load_bookmarks(&self) {
        let loaded = match self.storage.get_item(BOOKMARKS_KEY) {
            Ok(Some(raw)) => BookmarkSet::from_json(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "corrupt bookmark data, starting empty");
                BookmarkSet::default()
            }),
            Ok(None) => BookmarkSet::default(),
            Err(e) => {
                warn!(error = %e, "failed to read bookmarks");
                BookmarkSet::default()
            }
        };
        self.mutate(StateKey::Bookmarks, |inner| inner.state.bookmarks = loaded);
    }

    pub fn save_bookmarks(&self) {
        let json = self.lock().state.bookmarks.to_json();
        if let Err(e) = self.storage.set_item(BOOKMARKS_KEY, &json) {
            warn!(error = %e, "failed to save bookmarks");
        }
    }

    pub fn is_bookmarked(&self, id: impl Into<ArticleId>) -> bool {
        self.lock().state.bookmarks.contains(id.into())
    }

    /// Adds the ID if absent, removes it otherwise. Returns the resulting membership.
    pub fn toggle_bookmark(&self, id: impl Into<ArticleId>) -> bool {
        let id = id.into();
        let bookmarked = self.mutate(StateKey::Bookmarks, |inner| {
            let bookmarks = &mut inner.state.bookmarks;
            if bookmarks.remove(id) {
                false
            } else {
                bookmarks.insert(id)
            }
        });
        self.save_bookmarks();
        if bookmarked {
            self.add_notification("Article bookmarked!", NotificationKind::Success, BOOKMARK_TOAST);
        } else {
            self.add_notification("Bookmark removed", NotificationKind::Info, BOOKMARK_TOAST);
        }
        bookmarked
    }

    /// Silent removal; returns whether the ID was bookmarked.
    pub fn remove_bookmark(&self, id: impl Into<ArticleId>) -> bool {
        let id = id.into();
        if !self.is_bookmarked(id) {
            return false;
        }
        self.mutate(StateKey::Bookmarks, |inner| inner.state.bookmarks.remove(id));
        self.save_bookmarks();
        true
    }

    pub fn clear_bookmarks(&self) {
        self.mutate(StateKey::Bookmarks, |inner| inner.state.bookmarks.clear());
        self.save_bookmarks();
        self.add_notification("All bookmarks cleared", NotificationKind::Info, BOOKMARK_TOAST);
    }

    pub fn bookmark_count(&self) -> usize {
        self.lock().state.bookmarks.len()
    }

    /// Bookmarked articles in `articles` order.
    pub fn bookmarked_articles(&self) -> Vec<Article> {
        let inner = self.lock();
        inner
            .state
            .articles
            .iter()
            .filter(|article| inner.state.bookmarks.contains(ArticleId(article.id)))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_id_coerces_numeric_strings() {
        assert_eq!(ArticleId::parse("5"), Some(ArticleId::new(5)));
        assert_eq!(ArticleId::parse(" 42 "), Some(ArticleId::new(42)));
        assert_eq!(ArticleId::parse("abc"), None);
        assert_eq!(ArticleId::from(5), ArticleId::parse("5").unwrap());
    }

    #[test]
    fn set_keeps_each_id_once() {
        let mut set = BookmarkSet::default();
        assert!(set.insert(ArticleId::new(1)));
        assert!(!set.insert(ArticleId::new(1)));
        assert!(set.insert(ArticleId::new(2)));
        assert_eq!(set.len(), 2);
        assert!(set.remove(ArticleId::new(1)));
        assert!(!set.remove(ArticleId::new(1)));
    }

    #[test]
    fn from_json_is_lenient_about_entries() {
        let set = BookmarkSet::from_json(r#"[3, "4", 3, "x", null, 5.0, 6.5]"#).unwrap();
        let ids: Vec<i64> = set.iter().map(ArticleId::get).collect();
        assert_eq!(ids, vec![3, 4, 5]);
        assert_eq!(set.to_json(), "[3,4,5]");
    }

    #[test]
    fn from_json_drops_floats_outside_i64() {
        let set = BookmarkSet::from_json("[1e20, -1e20, 7, 8e0]").unwrap();
        let ids: Vec<i64> = set.iter().map(ArticleId::get).collect();
        assert_eq!(ids, vec![7, 8]);
    }

    #[test]
    fn from_json_rejects_non_arrays() {
        assert!(BookmarkSet::from_json("{\"a\":1}").is_err());
        assert!(BookmarkSet::from_json("not json").is_err());
    }
}
