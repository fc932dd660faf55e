//! Tool modules, one per Azure DevOps domain.
//!
//! Each module exposes `definitions()`, the tool list it contributes to the
//! registry, and `handle()`, which routes a tool name to its implementation.
//! Handlers validate and resolve their parameters before the first client
//! call and return plain JSON values; enveloping happens in the dispatcher.

pub mod boards;
pub mod git;
pub mod pipelines;
pub mod projects;
pub mod releases;
pub mod users;
pub mod wiki;
pub mod work_items;

use azdo_core::{DevOpsClient, Error, Result};
use serde::Serialize;
use serde_json::{json, Value};

use crate::registry::Domain;

/// Names a domain's `handle` routes, as declared next to its match.
pub fn handled(domain: Domain) -> &'static [&'static str] {
    match domain {
        Domain::Projects => projects::HANDLED,
        Domain::WorkItems => work_items::HANDLED,
        Domain::Git => git::HANDLED,
        Domain::Pipelines => pipelines::HANDLED,
        Domain::Releases => releases::HANDLED,
        Domain::Wiki => wiki::HANDLED,
        Domain::Boards => boards::HANDLED,
        Domain::Users => users::HANDLED,
    }
}

/// Route a call to the domain that owns `name`.
///
/// Names missing from the domain's `HANDLED` list are rejected here, so a
/// match arm that is not listed is never reached.
pub async fn handle(
    domain: Domain,
    client: &dyn DevOpsClient,
    name: &str,
    args: Value,
) -> Result<Value> {
    if !handled(domain).contains(&name) {
        return Err(Error::UnknownTool(name.to_string()));
    }
    match domain {
        Domain::Projects => projects::handle(client, name, args).await,
        Domain::WorkItems => work_items::handle(client, name, args).await,
        Domain::Git => git::handle(client, name, args).await,
        Domain::Pipelines => pipelines::handle(client, name, args).await,
        Domain::Releases => releases::handle(client, name, args).await,
        Domain::Wiki => wiki::handle(client, name, args).await,
        Domain::Boards => boards::handle(client, name, args).await,
        Domain::Users => users::handle(client, name, args).await,
    }
}

/// Schema of the optional `project` argument shared by most tools.
pub(crate) fn project_property() -> Value {
    json!({
        "type": "string",
        "description": "Project name or id (defaults to the configured project)"
    })
}

/// Schema of a `top` argument with its default and range.
pub(crate) fn top_property(default: u32, maximum: u32) -> Value {
    json!({
        "type": "integer",
        "description": format!("Maximum number of results (default: {})", default),
        "minimum": 1,
        "maximum": maximum
    })
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// `{"count": n, "<key>": [..]}` for list results.
pub(crate) fn list_json<T: Serialize>(key: &str, items: &[T]) -> Result<Value> {
    let mut body = serde_json::Map::new();
    body.insert("count".to_string(), json!(items.len()));
    body.insert(key.to_string(), serde_json::to_value(items)?);
    Ok(Value::Object(body))
}
