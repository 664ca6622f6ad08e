use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_GRAVEYARD_BASE_URL: &str = "https://www.realmeye.com/graveyard-of-player/";
pub const USERNAME_PLACEHOLDER: &str = "%username%";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub players: Vec<String>,
    pub discord_webhook: String,
    pub discord_avatar_url: String,
    pub discord_death_messages: Vec<String>,
    pub time_between_request: u64,
    pub request_user_agent: String,
    #[serde(default = "default_base_url")]
    pub graveyard_base_url: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_base_url() -> String {
    DEFAULT_GRAVEYARD_BASE_URL.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// First CLI argument (after the program name) or `config.json`.
    pub fn path_from_args<I>(args: I) -> String
    where
        I: IntoIterator<Item = String>,
    {
        args.into_iter()
            .nth(1)
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Read and parse without validating, so logging can be set up first.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(raw).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for player in &self.players {
            if !seen.insert(player.as_str()) {
                bail!("Player listed more than once: {}", player);
            }
        }

        if self.discord_death_messages.is_empty() {
            tracing::warn!("No discordDeathMessages configured; death notifications will fail");
        }
        for template in &self.discord_death_messages {
            if !template.contains(USERNAME_PLACEHOLDER) {
                tracing::warn!(
                    "Death message template has no {} placeholder: {}",
                    USERNAME_PLACEHOLDER,
                    template
                );
            }
        }

        Ok(())
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.time_between_request)
    }
}
