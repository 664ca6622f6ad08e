use std::fmt;
use thiserror::Error;

/// Point in the fetch-and-extract pipeline where a poll gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractStage {
    Transport,
    Tbody,
    Rows,
    Cells,
    Column,
    Timestamp,
}

impl fmt::Display for ExtractStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            ExtractStage::Transport => "transport",
            ExtractStage::Tbody => "structure:tbody",
            ExtractStage::Rows => "structure:rows",
            ExtractStage::Cells => "structure:cells",
            ExtractStage::Column => "structure:column",
            ExtractStage::Timestamp => "timestamp",
        };
        f.write_str(stage)
    }
}

#[derive(Debug, Error)]
#[error("extraction failed for {player} at {stage}: {detail}")]
pub struct ExtractionError {
    pub player: String,
    pub stage: ExtractStage,
    pub detail: String,
}

impl ExtractionError {
    pub fn new(player: &str, stage: ExtractStage, detail: impl Into<String>) -> Self {
        Self {
            player: player.to_string(),
            stage,
            detail: detail.into(),
        }
    }

    pub fn transport(player: &str, detail: impl fmt::Display) -> Self {
        Self::new(player, ExtractStage::Transport, detail.to_string())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("player not tracked: {0}")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("no death message templates configured")]
    NoTemplates,

    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("webhook responded with status {0}")]
    Status(u16),

    #[error("failed to encode webhook payload: {0}")]
    Encode(#[from] serde_json::Error),
}
