use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::detector::{ChangeDetector, ProcessOutcome};
use super::state::LastSeenState;
use crate::api::{DiscordNotifier, GraveyardClient};
use crate::core::Config;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub baselines: usize,
    pub unchanged: usize,
    pub new_deaths: usize,
    pub notified: usize,
    pub skipped: usize,
}

impl CycleSummary {
    pub fn record(&mut self, outcome: &ProcessOutcome) {
        match outcome {
            ProcessOutcome::Baseline(_) => self.baselines += 1,
            ProcessOutcome::Unchanged => self.unchanged += 1,
            ProcessOutcome::NewDeath { notified } => {
                self.new_deaths += 1;
                if *notified {
                    self.notified += 1;
                }
            }
            ProcessOutcome::Skipped(_) | ProcessOutcome::Untracked => self.skipped += 1,
        }
    }
}

/// Sequential poller over every tracked player. Owns the last-seen state.
pub struct GraveyardTracker {
    players: Vec<String>,
    delay: Duration,
    detector: ChangeDetector,
    state: LastSeenState,
}

impl GraveyardTracker {
    pub fn new(players: Vec<String>, delay: Duration, detector: ChangeDetector) -> Self {
        let state = LastSeenState::initialize(players.iter().cloned());
        Self {
            players,
            delay,
            detector,
            state,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let detector = ChangeDetector::new(
            Arc::new(GraveyardClient::from_config(config)),
            Arc::new(DiscordNotifier::from_config(config)),
        );
        Self::new(config.players.clone(), config.request_delay(), detector)
    }

    pub fn state(&self) -> &LastSeenState {
        &self.state
    }

    pub fn players(&self) -> &[String] {
        &self.players
    }

    /// Poll forever until `shutdown` turns true (or its sender is dropped).
    /// Returns the number of completed cycles.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> u64 {
        tracing::info!(
            "🔔 Graveyard tracker starting: {} players, {:?} between requests",
            self.players.len(),
            self.delay
        );

        if self.players.is_empty() {
            tracing::warn!("No players configured; waiting for shutdown");
            let _ = shutdown.wait_for(|stop| *stop).await;
            return 0;
        }

        let mut cycles = 0;
        while let Some(summary) = self.poll_cycle(&mut shutdown).await {
            cycles += 1;
            tracing::info!(
                "Cycle {} done: {} new ({} notified), {} baseline, {} unchanged, {} skipped",
                cycles,
                summary.new_deaths,
                summary.notified,
                summary.baselines,
                summary.unchanged,
                summary.skipped
            );
        }

        tracing::info!("Graveyard tracker stopped after {} cycles", cycles);
        cycles
    }

    /// One full pass over every player, sleeping before each fetch.
    pub async fn run_cycle(&mut self) -> CycleSummary {
        let (_keep_open, mut shutdown) = watch::channel(false);
        self.poll_cycle(&mut shutdown).await.unwrap_or_default()
    }

    async fn poll_cycle(&mut self, shutdown: &mut watch::Receiver<bool>) -> Option<CycleSummary> {
        let mut summary = CycleSummary::default();

        for player in &self.players {
            tokio::select! {
                _ = tokio::time::sleep(self.delay) => {}
                _ = shutdown.wait_for(|stop| *stop) => return None,
            }

            let outcome = self.detector.process_player(player, &mut self.state).await;
            summary.record(&outcome);
        }

        Some(summary)
    }
}
