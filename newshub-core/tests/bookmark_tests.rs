use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use newshub_core::storage::BOOKMARKS_KEY;
use newshub_core::{
    Article, ArticleId, LocalStorage, MemoryStorage, NotificationKind, StateKey, StateValue, Store,
};

fn article(id: i64) -> Article {
    Article {
        id,
        title: format!("Article {id}"),
        content: String::new(),
        category_id: None,
        created_at: None,
        author: None,
    }
}

fn persisted(storage: &MemoryStorage) -> Option<String> {
    storage.get_item(BOOKMARKS_KEY).unwrap()
}

#[test]
fn toggle_twice_restores_membership_and_storage() {
    let storage = MemoryStorage::shared();
    let store = Store::new(storage.clone());
    store.toggle_bookmark(1);
    let before = persisted(&storage);
    let was = store.is_bookmarked(3);

    assert!(store.toggle_bookmark(3));
    assert!(store.is_bookmarked(3));
    assert_eq!(persisted(&storage).as_deref(), Some("[1,3]"));

    assert!(!store.toggle_bookmark(3));
    assert_eq!(store.is_bookmarked(3), was);
    assert_eq!(persisted(&storage), before);
}

#[test]
fn string_and_integer_ids_are_the_same_bookmark() {
    let store = Store::new(MemoryStorage::shared());
    let from_str = ArticleId::parse("5").unwrap();
    assert!(store.toggle_bookmark(from_str));
    assert!(store.is_bookmarked(5));
    assert!(store.is_bookmarked(ArticleId::parse(" 5").unwrap()));
    assert!(!store.toggle_bookmark(5));
    assert_eq!(store.bookmark_count(), 0);
}

#[test]
fn toggle_emits_transient_notifications() {
    let store = Store::new(MemoryStorage::shared());
    store.toggle_bookmark(8);
    store.toggle_bookmark(8);
    let notes = store.notifications();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].message, "Article bookmarked!");
    assert_eq!(notes[0].kind, NotificationKind::Success);
    assert_eq!(notes[1].message, "Bookmark removed");
    assert_eq!(notes[1].kind, NotificationKind::Info);
}

#[test]
fn bookmarked_articles_follow_article_order() {
    let store = Store::new(MemoryStorage::shared());
    store.set(StateValue::Articles(vec![article(4), article(1), article(9), article(2)]));
    store.toggle_bookmark(2);
    store.toggle_bookmark(4);
    store.toggle_bookmark(77); // not loaded

    let ids: Vec<i64> = store.bookmarked_articles().iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![4, 2]);
    assert_eq!(store.bookmark_count(), 3);
}

#[test]
fn load_replaces_memory_and_coerces_entries() {
    let storage = MemoryStorage::shared();
    storage.set_item(BOOKMARKS_KEY, r#"[1, "2", 2, "junk"]"#).unwrap();
    let store = Store::new(storage.clone());
    store.toggle_bookmark(40);

    store.load_bookmarks();
    let ids: Vec<i64> = store.bookmarks().iter().map(ArticleId::get).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn corrupt_or_missing_storage_yields_empty_set() {
    let storage = MemoryStorage::shared();
    storage.set_item(BOOKMARKS_KEY, "{ broken").unwrap();
    let store = Store::new(storage.clone());
    store.load_bookmarks();
    assert_eq!(store.bookmark_count(), 0);

    let fresh = Store::new(MemoryStorage::shared());
    fresh.load_bookmarks();
    assert_eq!(fresh.bookmark_count(), 0);
}

#[test]
fn remove_is_silent_and_clear_notifies() {
    let storage = MemoryStorage::shared();
    let store = Store::new(storage.clone());
    store.set(StateValue::Bookmarks([1, 2, 3].into_iter().map(ArticleId::new).collect()));

    assert!(store.remove_bookmark(2));
    assert!(!store.remove_bookmark(2));
    assert!(store.notifications().is_empty());
    assert_eq!(persisted(&storage).as_deref(), Some("[1,3]"));

    store.clear_bookmarks();
    assert_eq!(store.bookmark_count(), 0);
    assert_eq!(persisted(&storage).as_deref(), Some("[]"));
    assert_eq!(store.notifications()[0].message, "All bookmarks cleared");
}

#[test]
fn bookmark_changes_notify_subscribers() {
    let store = Store::new(MemoryStorage::shared());
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    store.subscribe(StateKey::Bookmarks, move |value| {
        assert!(matches!(value, StateValue::Bookmarks(_)));
        counter.fetch_add(1, Ordering::SeqCst);
    });
    store.toggle_bookmark(1);
    store.remove_bookmark(1);
    store.clear_bookmarks();
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[test]
fn reset_keeps_bookmarks_in_step_with_storage() {
    let storage = MemoryStorage::shared();
    let store = Store::new(storage.clone());
    store.toggle_bookmark(1);
    store.toggle_bookmark(2);

    store.reset();
    assert_eq!(store.bookmark_count(), 2);
    assert!(store.notifications().is_empty());

    store.toggle_bookmark(7);
    assert_eq!(persisted(&storage).as_deref(), Some("[1,2,7]"));
}
