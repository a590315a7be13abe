//! # Trello MCP Library
//!
//! This library provides tools for integrating with Trello through the Model
//! Context Protocol (MCP). It consists of two main components:
//!
//! ## Client Module
//!
//! The [`client`] module provides a direct HTTP client for the Trello REST API,
//! handling authentication parameters, JSON mapping and retries on rate limiting
//! and server errors.
//!
//! ## Server Module
//!
//! The [`server`] module implements an MCP server that exposes Trello operations
//! as standardized tools that AI assistants can use.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mcp_trello::{TrelloClient, TrelloConfig, TrelloMcpServer};
//!
//! # fn example() -> Result<(), mcp_trello::TrelloError> {
//! let config = TrelloConfig::new("api-key", "oauth-token");
//!
//! // Use the client directly
//! let client = TrelloClient::new(config.clone())?;
//!
//! // Or create an MCP server
//! let server = TrelloMcpServer::new(config)?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod server;

pub use client::TrelloClient;
pub use config::TrelloConfig;
pub use error::{ErrorKind, TrelloError};
pub use server::TrelloMcpServer;
