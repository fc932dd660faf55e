//! User and identity tools.

use azdo_core::{DevOpsClient, Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{list_json, to_json, top_property};
use crate::params::parse_args;
use crate::protocol::ToolDefinition;

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "get_current_user",
            "Get the user the server is authenticated as",
            json!({ "type": "object", "properties": {} }),
        ),
        ToolDefinition::new(
            "search_users",
            "Search users and groups by name or email",
            json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "minLength": 1, "description": "Name or email fragment" },
                    "top": top_property(20, 100)
                },
                "required": ["query"]
            }),
        ),
    ]
}

/// Tool names routed by [`handle`].
pub const HANDLED: &[&str] = &["get_current_user", "search_users"];

pub async fn handle(client: &dyn DevOpsClient, name: &str, args: Value) -> Result<Value> {
    match name {
        "get_current_user" => to_json(&client.get_current_user().await?),
        "search_users" => {
            let params: SearchParams = parse_args(args)?;
            let users = client.search_users(params.query.trim(), params.top).await?;
            list_json("users", &users)
        }
        _ => Err(Error::UnknownTool(name.to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    #[serde(default = "default_top")]
    top: u32,
}

fn default_top() -> u32 {
    20
}
