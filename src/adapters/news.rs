//! NewsAPI client used by the news query command.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::config::NewsConfig;
use crate::error::{PolyagentError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source: Option<ArticleSource>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "publishedAt")]
    pub published_at: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Clone)]
pub struct NewsClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl NewsClient {
    pub fn new(cfg: &NewsConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent("polyagent/0.1")
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                PolyagentError::Internal(format!("failed to build news HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: std::env::var(&cfg.api_key_env).ok(),
        })
    }

    /// Query articles matching the given keywords, newest first.
    pub async fn get_relevant_news(&self, keywords: &str) -> Result<Vec<Article>> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            PolyagentError::Validation("news API key is not configured".to_string())
        })?;

        let url = format!("{}/everything", self.base_url);
        let response: EverythingResponse = self
            .http
            .get(&url)
            .query(&[
                ("q", keywords),
                ("sortBy", "publishedAt"),
                ("apiKey", api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(
            "News query '{keywords}' returned {} articles",
            response.articles.len()
        );
        Ok(response.articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_everything_response() {
        let body = r#"{
            "status": "ok",
            "totalResults": 1,
            "articles": [{
                "source": {"id": null, "name": "Example Times"},
                "title": "Markets rally",
                "url": "https://example.com/a",
                "publishedAt": "2025-06-01T10:00:00Z"
            }]
        }"#;

        let parsed: EverythingResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.articles.len(), 1);
        let article = &parsed.articles[0];
        assert_eq!(article.title.as_deref(), Some("Markets rally"));
        assert_eq!(
            article.source.as_ref().and_then(|s| s.name.as_deref()),
            Some("Example Times")
        );
    }
}
