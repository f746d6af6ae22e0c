//! # codebolt-sdk
//!
//! Typed client for the Codebolt agent orchestration backend.
//!
//! ## Overview
//!
//! An agent talks to the backend over one WebSocket connection. Every call
//! is a JSON request tagged with a fresh `requestId`; the
//! [`MessageManager`] matches replies back to the waiting caller and routes
//! unsolicited pushes to subscribers. Domain modules wrap the backend's
//! services (event queue, mail, tasks, git, browser, ...) and a
//! [`ToolRegistry`] exposes them to LLM tool-calling harnesses.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use codebolt_sdk::{ClientConfig, CodeboltClient};
//! use codebolt_sdk::modules::agent_event_queue::AddEventInput;
//!
//! # async fn example() -> codebolt_sdk::Result<()> {
//! let client = CodeboltClient::connect(ClientConfig::new("ws://localhost:12345")).await?;
//!
//! let response = client
//!     .event_queue()
//!     .add_event(&AddEventInput::new("agent-b", serde_json::json!({"hello": "world"})))
//!     .await?;
//! println!("Queued: {}", response.is_success());
//!
//! let pending = client.event_queue().get_pending_queue_events(None).await?;
//! println!("{} event(s) waiting", pending.events.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **Transport** trait: WebSocket in production, in-memory for tests
//! - **MessageManager**: request/response correlation and push fan-out
//! - **modules**: one service struct per backend domain
//! - **tools**: schema-checked adapters returning a uniform `ToolResult`

pub mod client;
pub mod config;
pub mod error;
pub mod manager;
pub mod modules;
pub mod protocol;
pub mod tools;
pub mod transport;

// Re-export core types
pub use client::CodeboltClient;
pub use config::{ClientConfig, DuplicateAckPolicy};
pub use error::{ClientError, Result};
pub use manager::MessageManager;
pub use protocol::{BodyStyle, Operation, Request, Response, ResultField};
pub use tools::{
    DeclarativeTool, Kind, ParameterSchema, Tool, ToolDefinition, ToolError, ToolErrorType,
    ToolRegistry, ToolResult,
};
pub use transport::{MemoryTransport, Transport, WebSocketTransport};
