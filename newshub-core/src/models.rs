use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One record of `GET /api/articles`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author: Option<String>,
}

/// One record of `GET /api/categories`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Recent,
    Oldest,
    Title,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Filters {
    pub search_term: String,
    pub selected_category: Option<i64>,
    pub sort_by: SortBy,
}

impl Filters {
    pub fn matches(&self, article: &Article) -> bool {
        if let Some(category) = self.selected_category {
            if article.category_id != Some(category) {
                return false;
            }
        }
        let needle = self.search_term.trim().to_lowercase();
        needle.is_empty()
            || article.title.to_lowercase().contains(&needle)
            || article.content.to_lowercase().contains(&needle)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    /// Creation timestamp in milliseconds, strictly increasing per store.
    pub id: u64,
    pub message: String,
    pub kind: NotificationKind,
}

// The backend emits naive ISO timestamps (`2024-01-05T10:00:00`) as well as RFC 3339.
fn lenient_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| parse_timestamp(&value)))
}

pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_accepts_backend_shape() {
        let json = r#"{"id":3,"title":"T","content":"C","category_id":null,"created_at":"2024-01-05T10:00:00.123456"}"#;
        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.id, 3);
        assert!(article.created_at.is_some());
        assert_eq!(article.author, None);
    }

    #[test]
    fn filters_match_on_category_and_search() {
        let article = Article {
            id: 1,
            title: "Rust 2024 lands".into(),
            content: "Edition news".into(),
            category_id: Some(2),
            created_at: None,
            author: None,
        };
        let mut filters = Filters::default();
        assert!(filters.matches(&article));
        filters.search_term = "EDITION".into();
        assert!(filters.matches(&article));
        filters.selected_category = Some(3);
        assert!(!filters.matches(&article));
    }
}
