use async_trait::async_trait;
use rand::Rng;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};

use super::types::{DeathRecord, Embed, EmbedField, WebhookPayload};
use crate::core::config::{Config, USERNAME_PLACEHOLDER};
use crate::error::NotifyError;

pub const EMBED_COLOR: u32 = 16_777_215;

/// Delivers one detected death to the outside world.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, record: &DeathRecord) -> Result<(), NotifyError>;
}

pub fn render_title(template: &str, player: &str) -> String {
    template.replace(USERNAME_PLACEHOLDER, player)
}

pub fn pick_template<'a, R: Rng>(templates: &'a [String], rng: &mut R) -> Option<&'a str> {
    if templates.is_empty() {
        return None;
    }
    let idx = rng.gen_range(0..templates.len());
    Some(templates[idx].as_str())
}

pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
    avatar_url: String,
    death_messages: Vec<String>,
    page_base_url: String,
}

impl DiscordNotifier {
    pub fn new(
        webhook_url: impl Into<String>,
        avatar_url: impl Into<String>,
        death_messages: Vec<String>,
        page_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            webhook_url: webhook_url.into(),
            avatar_url: avatar_url.into(),
            death_messages,
            page_base_url: page_base_url.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.discord_webhook,
            &config.discord_avatar_url,
            config.discord_death_messages.clone(),
            &config.graveyard_base_url,
        )
    }

    /// The webhook username is the killer, so the message reads as if sent by it.
    pub fn build_payload<R: Rng>(
        &self,
        record: &DeathRecord,
        rng: &mut R,
    ) -> Result<WebhookPayload, NotifyError> {
        let template = pick_template(&self.death_messages, rng).ok_or(NotifyError::NoTemplates)?;

        Ok(WebhookPayload {
            username: record.killed_by.clone(),
            avatar_url: self.avatar_url.clone(),
            embeds: vec![Embed {
                title: render_title(template, &record.player),
                url: format!("{}{}", self.page_base_url, record.player),
                color: EMBED_COLOR,
                fields: vec![
                    EmbedField::new("Time", record.formatted_time(), false),
                    EmbedField::new("Class", record.class.clone(), true),
                    EmbedField::new("Base Fame", record.base_fame.clone(), true),
                ],
            }],
        })
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, record: &DeathRecord) -> Result<(), NotifyError> {
        let payload = {
            let mut rng = rand::thread_rng();
            self.build_payload(record, &mut rng)?
        };
        let body = serde_json::to_vec(&payload)?;

        let response = self
            .client
            .post(&self.webhook_url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => {
                tracing::debug!("Webhook accepted death notification for {}", record.player);
                Ok(())
            }
            status => Err(NotifyError::Status(status.as_u16())),
        }
    }
}
