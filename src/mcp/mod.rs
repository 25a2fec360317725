//! Model Context Protocol (MCP) server implementation.
//!
//! This module implements the MCP surface for exposing CMS content as
//! URI-addressed resources and schema-validated tools. Three transports
//! feed one shared dispatcher over JSON-RPC 2.0 messages.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          MCP Server                          │
//! │                                                              │
//! │   ┌──────────┐  ┌──────────┐  ┌───────────────────────┐     │
//! │   │  stdio   │  │  socket  │  │  http (+SSE sessions) │     │
//! │   └────┬─────┘  └────┬─────┘  └──────────┬────────────┘     │
//! │        │             │                   │                  │
//! │        ▼             ▼                   ▼                  │
//! │   ┌──────────────────────────────────────────────────┐      │
//! │   │            Dispatcher (JSON-RPC routing)         │      │
//! │   └──────────────┬──────────────────┬────────────────┘      │
//! │                  ▼                  ▼                       │
//! │          ┌──────────────┐   ┌──────────────┐                │
//! │          │  Resources   │   │    Tools     │                │
//! │          └──────────────┘   └──────────────┘                │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod dispatcher;
pub mod http;
pub mod protocol;
pub mod server;
pub mod session;
pub mod socket;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use session::{SessionEvent, SessionRegistry};
pub use transport::{LineTransport, StdioTransport};
