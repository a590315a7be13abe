//! # Trello HTTP Client
//!
//! This module provides a direct HTTP client for the Trello REST API: cards, lists,
//! checklists, members, labels, comments and attachments, with rate-limit-aware
//! retries.
//!
//! ## Modules
//!
//! - [`client`] - The client: request layer plus every Trello operation
//! - [`retry`] - Retry policy, status classification and the [`retry::Sleeper`] seam
//! - [`types`] - Records returned by the API and request payloads
//!
//! ## Quick Start
//!
//! ```no_run
//! use mcp_trello::client::TrelloClient;
//! use mcp_trello::config::TrelloConfig;
//!
//! # async fn example() -> Result<(), mcp_trello::TrelloError> {
//! let client = TrelloClient::new(TrelloConfig::from_env()?)?;
//!
//! let card = client.create_card("list-id", "Ship it", "", None).await?;
//! client.move_card(&card.id, "done-list-id").await?;
//! # Ok(())
//! # }
//! ```

#[allow(clippy::module_inception)]
pub mod client;
pub mod retry;
pub mod types;

pub use client::TrelloClient;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use types::*;
