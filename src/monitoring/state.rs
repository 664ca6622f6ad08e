use chrono::{DateTime, Datelike, TimeZone, Utc};
use std::collections::HashMap;

use crate::error::StateError;

/// Placeholder for "no death observed yet": 0001-01-01T00:00:00Z.
pub fn unset_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub fn is_unset(ts: &DateTime<Utc>) -> bool {
    ts.year() <= 1
}

/// Last known death time per tracked player. Single writer; no locking.
#[derive(Debug, Clone, Default)]
pub struct LastSeenState {
    latest: HashMap<String, DateTime<Utc>>,
}

impl LastSeenState {
    pub fn initialize<I, S>(players: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unset = unset_timestamp();
        let latest = players
            .into_iter()
            .map(|player| (player.into(), unset))
            .collect();
        Self { latest }
    }

    pub fn get(&self, player: &str) -> Result<DateTime<Utc>, StateError> {
        self.latest
            .get(player)
            .copied()
            .ok_or_else(|| StateError::NotFound(player.to_string()))
    }

    /// Overwrites unconditionally; callers decide whether the time is newer.
    pub fn set(&mut self, player: &str, ts: DateTime<Utc>) {
        self.latest.insert(player.to_string(), ts);
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}
