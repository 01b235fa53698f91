//! Anonymous story intake and publication.
//!
//! This crate provides:
//! - An append-only JSON Lines story log with sequential identifiers
//! - The intake pipeline (validate, store, optionally publish)
//! - Admin listing and manual publication
//! - A transport-agnostic API ([`StoryDesk`]) for chat front ends
//!
//! # Quick Start
//!
//! ```ignore
//! use story_core::{BotConfig, StoryDesk, StoryService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BotConfig::from_env()?;
//!     let service = StoryService::new(config, my_publisher()).await?;
//!
//!     let outcome = service.submit(42, Some("alice".into()), "My story").await;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod format;
pub mod intake;
pub mod moderation;
pub mod publish;
pub mod record;
pub mod service;
pub mod store;
pub mod testing;

// Primary public API
pub use config::{BotConfig, ConfigError, PrivilegedUsers, PublishMode};
pub use intake::SubmitOutcome;
pub use moderation::{AdminError, PublishOutcome};
pub use publish::{PublishError, Publisher};
pub use record::{StoryId, StoryRecord};
pub use service::{StoryDesk, StoryService};
pub use store::{RecordStore, StoreError};
pub use testing::{RecordingPublisher, TestHarness};
