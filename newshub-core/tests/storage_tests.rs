use newshub_core::storage::BOOKMARKS_KEY;
use newshub_core::{FileStorage, LocalStorage, Store};
use std::sync::Arc;

fn temp_dir(tag: &str) -> std::path::PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!(
        "newshub_{tag}_{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn bookmarks_survive_a_restart() {
    let dir = temp_dir("restart");

    let store = Store::new(Arc::new(FileStorage::open_in(&dir)));
    store.toggle_bookmark(12);
    store.toggle_bookmark(3);

    // Reopen from disk
    let reopened = Store::new(Arc::new(FileStorage::open_in(&dir)));
    reopened.load_bookmarks();
    assert!(reopened.is_bookmarked(12));
    assert!(reopened.is_bookmarked(3));
    assert_eq!(reopened.bookmark_count(), 2);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn open_uses_tmp_fallback_on_corrupted_json() {
    let dir = temp_dir("corrupt");
    std::fs::write(dir.join("storage.json"), b"{ this is not json ").unwrap();
    std::fs::write(
        dir.join("storage.json.tmp"),
        br#"{"newshub-theme":"dark","news_bookmarks":"[4]"}"#,
    )
    .unwrap();

    let storage = FileStorage::open_in(&dir);
    assert_eq!(storage.get_item("newshub-theme").unwrap().as_deref(), Some("dark"));
    assert_eq!(storage.get_item(BOOKMARKS_KEY).unwrap().as_deref(), Some("[4]"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn open_without_any_file_starts_empty() {
    let dir = temp_dir("empty");
    let storage = FileStorage::open_in(&dir);
    assert_eq!(storage.get_item(BOOKMARKS_KEY).unwrap(), None);
    storage.set_item("k", "v").unwrap();
    storage.remove_item("k").unwrap();
    assert_eq!(storage.get_item("k").unwrap(), None);
    assert!(storage.path().exists());

    let _ = std::fs::remove_dir_all(&dir);
}
