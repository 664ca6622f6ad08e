use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::extractor::{fetch_latest_death, GraveyardParser};
use super::state::{is_unset, LastSeenState};
use crate::api::{DeathRecord, Notifier, PageFetcher};
use crate::error::ExtractStage;

/// How state advancement and notification are ordered for a new death.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryPolicy {
    /// Store the new time first, then notify once. A failed delivery is
    /// never retried (at-most-once).
    #[default]
    AdvanceThenNotify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Baseline,
    Unchanged,
    New,
}

/// Compare a fetched death time against the stored one.
pub fn classify(stored: DateTime<Utc>, fetched: DateTime<Utc>) -> Decision {
    if is_unset(&stored) {
        Decision::Baseline
    } else if fetched <= stored {
        Decision::Unchanged
    } else {
        Decision::New
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// First observation adopted as the baseline; nothing sent.
    Baseline(DateTime<Utc>),
    Unchanged,
    NewDeath { notified: bool },
    Skipped(ExtractStage),
    Untracked,
}

pub struct ChangeDetector {
    fetcher: Arc<dyn PageFetcher>,
    notifier: Arc<dyn Notifier>,
    parser: GraveyardParser,
    policy: DeliveryPolicy,
}

impl ChangeDetector {
    pub fn new(fetcher: Arc<dyn PageFetcher>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            fetcher,
            notifier,
            parser: GraveyardParser::new(),
            policy: DeliveryPolicy::default(),
        }
    }

    pub fn with_parser(mut self, parser: GraveyardParser) -> Self {
        self.parser = parser;
        self
    }

    pub async fn process_player(&self, player: &str, state: &mut LastSeenState) -> ProcessOutcome {
        let record = match fetch_latest_death(self.fetcher.as_ref(), &self.parser, player).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Skipping {} this cycle: {}", player, e);
                return ProcessOutcome::Skipped(e.stage);
            }
        };

        let stored = match state.get(player) {
            Ok(ts) => ts,
            Err(e) => {
                tracing::error!("{}", e);
                return ProcessOutcome::Untracked;
            }
        };

        match classify(stored, record.died_at) {
            Decision::Baseline => {
                tracing::info!(
                    "Baseline for {}: latest death at {}",
                    player,
                    record.formatted_time()
                );
                state.set(player, record.died_at);
                ProcessOutcome::Baseline(record.died_at)
            }
            Decision::Unchanged => {
                tracing::debug!("No new death for {}", player);
                ProcessOutcome::Unchanged
            }
            Decision::New => {
                tracing::info!(
                    "💀 New death for {}: {} {} ({} base fame) killed by {}",
                    player,
                    record.formatted_time(),
                    record.class,
                    record.base_fame,
                    record.killed_by
                );
                let notified = self.deliver(record, state).await;
                ProcessOutcome::NewDeath { notified }
            }
        }
    }

    async fn deliver(&self, record: DeathRecord, state: &mut LastSeenState) -> bool {
        match self.policy {
            DeliveryPolicy::AdvanceThenNotify => {
                state.set(&record.player, record.died_at);
                match self.notifier.notify(&record).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::error!(
                            "❌ Failed to deliver death notification for {}: {}",
                            record.player,
                            e
                        );
                        false
                    }
                }
            }
        }
    }
}
