//! Azure DevOps REST implementation of the azdo-core domain traits.
//!
//! [`AzureDevOpsClient`] talks to the organization's REST API with a
//! Personal Access Token. Most areas live on the organization host
//! (`dev.azure.com/<org>`); release management and identity search live on
//! the `vsrm.` and `vssps.` hosts respectively.

mod boards;
mod client;
mod git;
mod pipelines;
mod projects;
mod releases;
mod types;
mod users;
mod wiki;
mod work_items;

pub use client::AzureDevOpsClient;
pub use types::*;

/// REST API version sent with every request.
pub const API_VERSION: &str = "7.1";

/// Work item comments are only available on a preview version.
pub const COMMENTS_API_VERSION: &str = "7.1-preview.4";

/// `connectionData` is only available on a preview version.
pub const CONNECTION_DATA_API_VERSION: &str = "7.1-preview.1";

/// Largest id batch accepted by the work items endpoint.
pub const MAX_WORK_ITEM_BATCH: usize = 200;
