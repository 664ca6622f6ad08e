use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest death pulled from a player's graveyard page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeathRecord {
    pub player: String,
    pub died_at: DateTime<Utc>,
    pub class: String,
    pub base_fame: String,
    pub killed_by: String,
}

impl DeathRecord {
    pub fn formatted_time(&self) -> String {
        self.died_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub username: String,
    pub avatar_url: String,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub url: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    pub fn new(name: &str, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            inline,
        }
    }
}
