pub mod detector;
pub mod extractor;
pub mod state;
pub mod tracker;

pub use detector::{ChangeDetector, DeliveryPolicy, ProcessOutcome};
pub use extractor::{fetch_latest_death, ColumnLayout, GraveyardParser};
pub use state::LastSeenState;
pub use tracker::{CycleSummary, GraveyardTracker};
