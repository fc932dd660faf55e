//! MCP (Model Context Protocol) server for azdo-tools.
//!
//! Exposes Azure DevOps operations as MCP tools over two transports:
//! newline-delimited JSON-RPC on stdio, and a session-based HTTP binding.
//! Both share one [`ToolRegistry`] and one [`ToolHandler`].

pub mod handlers;
pub mod http;
pub mod params;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod tools;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use handlers::ToolHandler;
pub use http::{router, serve_http, HttpState};
pub use registry::{Domain, ToolRegistry};
pub use server::{McpServer, Session};
