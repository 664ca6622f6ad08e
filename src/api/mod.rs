pub mod discord;
pub mod graveyard;
pub mod types;

pub use discord::{DiscordNotifier, Notifier};
pub use graveyard::{GraveyardClient, PageFetcher};
pub use types::*;
