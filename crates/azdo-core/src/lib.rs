//! Core traits, types, and error handling for azdo-tools.
//!
//! This crate provides the foundational abstractions shared by the REST
//! client, the MCP server, and the CLI: the error taxonomy, the flattened
//! result types returned by tools, the domain client traits, and
//! configuration loading.

pub mod config;
pub mod error;
pub mod provider;
pub mod types;

pub use config::{Config, Settings};
pub use error::{Error, Result};
pub use provider::{
    BoardProvider, DevOpsClient, GitProvider, PipelineProvider, ProjectProvider, ReleaseProvider,
    UserProvider, WikiProvider, WorkItemProvider,
};
pub use types::*;
