use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;

use crate::core::Config;
use crate::error::ExtractionError;

/// Source of raw graveyard pages, one request per call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, player: &str) -> Result<String, ExtractionError>;
}

pub struct GraveyardClient {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl GraveyardClient {
    pub fn new(base_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            user_agent: user_agent.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.graveyard_base_url, &config.request_user_agent)
    }

    pub fn page_url(&self, player: &str) -> String {
        format!("{}{}", self.base_url, player)
    }
}

#[async_trait]
impl PageFetcher for GraveyardClient {
    async fn fetch_page(&self, player: &str) -> Result<String, ExtractionError> {
        let url = self.page_url(player);
        tracing::debug!("Fetching graveyard page {}", url);

        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| ExtractionError::transport(player, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::transport(
                player,
                format!("graveyard page returned status {}", status),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| ExtractionError::transport(player, e))
    }
}
