//! HTTP client for the KI trading model service

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::parse::parse_recommendation;
use crate::config;
use crate::error::{SourceError, SourceResult};
use crate::models::{FavoriteSymbol, Recommendation};
use crate::services::market_data::{FavoritesProvider, RecommendationSource};

pub struct KiTradingClient {
    base_url: Url,
    client: Client,
}

impl KiTradingClient {
    pub fn new(base_url: &str, timeout: Duration) -> SourceResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(base_url, client)
    }

    /// Build from `KITRADING_API_URL` / `KITRADING_TIMEOUT`
    pub fn from_env() -> SourceResult<Self> {
        Self::new(&config::get_kitrading_api_url(), config::get_kitrading_timeout())
    }

    pub fn with_client(base_url: &str, client: Client) -> SourceResult<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Health of the upstream service as reported by its `/health` endpoint
    pub async fn health_check(&self) -> SourceResult<Value> {
        self.get_json(&["health"], &[]).await
    }

    fn endpoint(&self, segments: &[&str]) -> SourceResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::Malformed(format!("base URL {} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> SourceResult<T> {
        let url = self.endpoint(segments)?;
        debug!(url = %url, "KiTradingClient: GET");

        let response = self.client.get(url.clone()).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                path: url.path().to_string(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait::async_trait]
impl FavoritesProvider for KiTradingClient {
    async fn list_favorites(&self) -> SourceResult<Vec<FavoriteSymbol>> {
        self.get_json(&["managed-symbols"], &[("favorites_only", "true")])
            .await
    }
}

#[async_trait::async_trait]
impl RecommendationSource for KiTradingClient {
    async fn get_recommendation(
        &self,
        symbol: &str,
        fast_mode: bool,
    ) -> SourceResult<Recommendation> {
        let use_llm = if fast_mode { "false" } else { "true" };
        let body: Value = self
            .get_json(&["recommendation", symbol], &[("use_llm", use_llm)])
            .await?;

        if body.is_null() {
            return Err(SourceError::Missing(symbol.to_string()));
        }
        parse_recommendation(symbol, &body)
    }
}
