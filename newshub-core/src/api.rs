use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect, Client, ClientBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::models::{Article, Category};

pub const ARTICLES_PATH: &str = "/api/articles";
pub const CATEGORIES_PATH: &str = "/api/categories";

/// HTTP client for the NewsHub backend.
#[derive(Debug, Clone)]
pub struct NewsApi {
    client: Client,
    base: Url,
}

impl NewsApi {
    pub fn new(client: Client, base_url: &str) -> Result<Self, ApiError> {
        Ok(Self {
            client,
            base: Url::parse(base_url)?,
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = ClientBuilder::new()
            .redirect(redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!("NewsHub/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::new(client, &config.base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub async fn fetch_articles(&self) -> Result<Vec<Article>, ApiError> {
        self.get_json(ARTICLES_PATH).await
    }

    pub async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.get_json(CATEGORIES_PATH).await
    }

    /// Non-2xx responses and non-JSON content types are failures and are never parsed.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.base.join(path)?;
        debug!(%url, "fetching");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);
        if !content_type
            .as_deref()
            .map_or(false, |ct| ct.contains("application/json"))
        {
            return Err(ApiError::ContentType(content_type));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
