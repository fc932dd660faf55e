//! Project and team tools.

use azdo_core::{DevOpsClient, Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{list_json, project_property, to_json, top_property};
use crate::params::parse_args;
use crate::protocol::ToolDefinition;

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "list_projects",
            "List projects in the Azure DevOps organization",
            json!({
                "type": "object",
                "properties": {
                    "top": top_property(100, 1000)
                }
            }),
        ),
        ToolDefinition::new(
            "get_project",
            "Get details of a project",
            json!({
                "type": "object",
                "properties": {
                    "project": project_property()
                }
            }),
        ),
        ToolDefinition::new(
            "list_teams",
            "List the teams of a project",
            json!({
                "type": "object",
                "properties": {
                    "project": project_property()
                }
            }),
        ),
    ]
}

/// Tool names routed by [`handle`].
pub const HANDLED: &[&str] = &["list_projects", "get_project", "list_teams"];

pub async fn handle(client: &dyn DevOpsClient, name: &str, args: Value) -> Result<Value> {
    match name {
        "list_projects" => {
            let params: ListProjectsParams = parse_args(args)?;
            let projects = client.list_projects(params.top).await?;
            list_json("projects", &projects)
        }
        "get_project" => {
            let params: ProjectParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            to_json(&client.get_project(&project).await?)
        }
        "list_teams" => {
            let params: ProjectParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            let teams = client.list_teams(&project).await?;
            list_json("teams", &teams)
        }
        _ => Err(Error::UnknownTool(name.to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct ListProjectsParams {
    #[serde(default = "default_project_top")]
    top: u32,
}

fn default_project_top() -> u32 {
    100
}

#[derive(Debug, Deserialize)]
struct ProjectParams {
    project: Option<String>,
}
