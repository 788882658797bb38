use newshub_core::{Article, Category, MemoryStorage, NewsApi, StateKey, StateValue, Store};
use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sample_articles() -> serde_json::Value {
    json!([
        {"id": 1, "title": "Budget passes", "content": "Parliament votes", "category_id": 2, "created_at": "2024-03-01T09:00:00"},
        {"id": 2, "title": "Cup final", "content": "Late winner", "category_id": 3, "created_at": "2024-03-02T18:30:00.250000"}
    ])
}

async fn api_for(server: &MockServer) -> NewsApi {
    NewsApi::new(Client::new(), &server.uri()).expect("valid base url")
}

#[tokio::test]
async fn load_articles_sets_state_and_returns_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/articles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_articles()))
        .mount(&server)
        .await;

    let store = Store::new(MemoryStorage::shared());
    let api = api_for(&server).await;
    let loaded = store.load_articles(&api).await;

    assert_eq!(loaded.len(), 2);
    assert_eq!(store.get(StateKey::Articles), StateValue::Articles(loaded));
}

#[tokio::test]
async fn load_categories_sets_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/categories"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": 1, "name": "Politics"}, {"id": 2, "name": "Sport"}])),
        )
        .mount(&server)
        .await;

    let store = Store::new(MemoryStorage::shared());
    let loaded = store.load_categories(&api_for(&server).await).await;
    assert_eq!(
        loaded,
        vec![
            Category { id: 1, name: "Politics".into() },
            Category { id: 2, name: "Sport".into() },
        ]
    );
    assert_eq!(store.categories(), loaded);
}

#[tokio::test]
async fn server_error_leaves_articles_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/articles"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
        .mount(&server)
        .await;

    let store = Store::new(MemoryStorage::shared());
    let loaded = store.load_articles(&api_for(&server).await).await;
    assert!(loaded.is_empty());
    assert_eq!(store.get(StateKey::Articles), StateValue::Articles(Vec::new()));
}

#[tokio::test]
async fn html_response_is_not_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html>login</html>", "text/html"))
        .mount(&server)
        .await;

    let store = Store::new(MemoryStorage::shared());
    let existing = vec![Category { id: 9, name: "Kept".into() }];
    store.set(StateValue::Categories(existing.clone()));

    let loaded = store.load_categories(&api_for(&server).await).await;
    assert!(loaded.is_empty());
    assert_eq!(store.categories(), existing);
}

#[tokio::test]
async fn malformed_json_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/articles"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("[{\"id\": ", "application/json"))
        .mount(&server)
        .await;

    let store = Store::new(MemoryStorage::shared());
    assert!(store.load_articles(&api_for(&server).await).await.is_empty());
    assert!(store.articles().is_empty());
}

#[tokio::test]
async fn unreachable_backend_returns_empty() {
    let store = Store::new(MemoryStorage::shared());
    let previous = vec![Article {
        id: 7,
        title: "cached".into(),
        content: String::new(),
        category_id: None,
        created_at: None,
        author: None,
    }];
    store.set(StateValue::Articles(previous.clone()));

    let api = NewsApi::new(Client::new(), "http://127.0.0.1:9").unwrap();
    assert!(store.load_articles(&api).await.is_empty());
    assert_eq!(store.articles(), previous);
}
