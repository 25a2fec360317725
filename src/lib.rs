//! cms-mcp: MCP server exposing CMS content to AI assistants
//!
//! This library implements a Model Context Protocol server that publishes
//! CMS content as read-only, URI-addressed resources and invocable,
//! schema-validated tools over three simultaneous transports (stdio, TCP
//! socket, HTTP with SSE delivery).
//!
//! # Architecture
//!
//! The server provides the protocol plumbing. The CMS itself stays behind
//! narrow collaborator traits:
//!
//! - **Resources**: URI-template addressed reads (`cms://sites/list`,
//!   `cms://components/{name}`, ...) with first-registered-wins matching
//! - **Tools**: schema-validated operations (`get-site-info`,
//!   `search-content`, `clear-cache`)
//! - **Sessions**: HTTP clients submit requests and receive responses on
//!   a long-lived SSE stream, decoupled by a per-session outbox
//!
//! The CMS (not this crate) handles content storage and rendering; this
//! crate consumes it through the [`store`] traits.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`mcp`] — MCP protocol implementation and transports
//! - [`resources`] — URI-addressed resource providers
//! - [`store`] — Collaborator traits over the CMS backing store
//! - [`tools`] — Invocable tool implementations

pub mod config;
pub mod error;
pub mod mcp;
pub mod resources;
pub mod store;
pub mod tools;
