//! Classic release tools.

use azdo_core::{CreateReleaseInput, DevOpsClient, Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{list_json, project_property, to_json, top_property};
use crate::params::parse_args;
use crate::protocol::ToolDefinition;

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "list_release_definitions",
            "List release definitions in a project",
            json!({
                "type": "object",
                "properties": { "project": project_property() }
            }),
        ),
        ToolDefinition::new(
            "list_releases",
            "List releases, optionally for one definition",
            json!({
                "type": "object",
                "properties": {
                    "definition_id": { "type": "integer", "minimum": 1 },
                    "top": top_property(20, 1000),
                    "project": project_property()
                }
            }),
        ),
        ToolDefinition::new(
            "get_release",
            "Get a release with its environments",
            json!({
                "type": "object",
                "properties": {
                    "release_id": { "type": "integer", "minimum": 1 },
                    "project": project_property()
                },
                "required": ["release_id"]
            }),
        ),
        ToolDefinition::new(
            "create_release",
            "Create a release from a release definition",
            json!({
                "type": "object",
                "properties": {
                    "definition_id": { "type": "integer", "minimum": 1 },
                    "description": { "type": "string" },
                    "is_draft": { "type": "boolean", "description": "Create as draft (default: false)" },
                    "project": project_property()
                },
                "required": ["definition_id"]
            }),
        ),
    ]
}

/// Tool names routed by [`handle`].
pub const HANDLED: &[&str] = &[
    "list_release_definitions",
    "list_releases",
    "get_release",
    "create_release",
];

pub async fn handle(client: &dyn DevOpsClient, name: &str, args: Value) -> Result<Value> {
    match name {
        "list_release_definitions" => {
            let params: ProjectParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            list_json(
                "definitions",
                &client.list_release_definitions(&project).await?,
            )
        }
        "list_releases" => {
            let params: ListReleasesParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            let releases = client
                .list_releases(&project, params.definition_id, params.top)
                .await?;
            list_json("releases", &releases)
        }
        "get_release" => {
            let params: ReleaseParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            to_json(&client.get_release(&project, params.release_id).await?)
        }
        "create_release" => {
            let params: CreateReleaseParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            let input = CreateReleaseInput {
                definition_id: params.definition_id,
                description: params.description,
                is_draft: params.is_draft,
            };
            to_json(&client.create_release(&project, &input).await?)
        }
        _ => Err(Error::UnknownTool(name.to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct ProjectParams {
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListReleasesParams {
    definition_id: Option<u64>,
    #[serde(default = "default_top")]
    top: u32,
    project: Option<String>,
}

fn default_top() -> u32 {
    20
}

#[derive(Debug, Deserialize)]
struct ReleaseParams {
    release_id: u64,
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateReleaseParams {
    definition_id: u64,
    description: Option<String>,
    #[serde(default)]
    is_draft: bool,
    project: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockClient;

    #[tokio::test]
    async fn test_list_releases_for_definition() {
        let client = MockClient::new();
        let value = handle(&client, "list_releases", json!({"definition_id": 4}))
            .await
            .unwrap();

        assert_eq!(value["releases"][0]["name"], "Release-31");
        assert_eq!(client.calls(), vec!["list_releases(Fabrikam, 4, 20)"]);
    }

    #[tokio::test]
    async fn test_create_release_defaults_to_non_draft() {
        let client = MockClient::new();
        let value = handle(
            &client,
            "create_release",
            json!({"definition_id": 4, "description": "hotfix"}),
        )
        .await
        .unwrap();

        assert_eq!(value["id"], 32);
        assert_eq!(value["definition_id"], 4);
        assert_eq!(client.calls(), vec!["create_release(Fabrikam, 4, false)"]);
    }
}
