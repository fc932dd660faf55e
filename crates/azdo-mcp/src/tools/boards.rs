//! Board and iteration tools. Both are scoped to a team.

use azdo_core::{DevOpsClient, Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{list_json, project_property, to_json};
use crate::params::parse_args;
use crate::protocol::ToolDefinition;

fn team_property() -> Value {
    json!({ "type": "string", "description": "Team name (default: \"<project> Team\")" })
}

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "list_boards",
            "List the boards of a team",
            json!({
                "type": "object",
                "properties": {
                    "team": team_property(),
                    "project": project_property()
                }
            }),
        ),
        ToolDefinition::new(
            "get_board",
            "Get a board with its columns and swimlanes",
            json!({
                "type": "object",
                "properties": {
                    "board": { "type": "string", "minLength": 1, "description": "Board name or id, e.g. Stories" },
                    "team": team_property(),
                    "project": project_property()
                },
                "required": ["board"]
            }),
        ),
        ToolDefinition::new(
            "list_iterations",
            "List the iterations (sprints) of a team",
            json!({
                "type": "object",
                "properties": {
                    "team": team_property(),
                    "timeframe": { "type": "string", "enum": ["current", "past", "future"] },
                    "project": project_property()
                }
            }),
        ),
    ]
}

/// Tool names routed by [`handle`].
pub const HANDLED: &[&str] = &["list_boards", "get_board", "list_iterations"];

pub async fn handle(client: &dyn DevOpsClient, name: &str, args: Value) -> Result<Value> {
    match name {
        "list_boards" => {
            let params: TeamParams = parse_args(args)?;
            let (project, team) = scope(client, params.project, params.team)?;
            list_json("boards", &client.list_boards(&project, &team).await?)
        }
        "get_board" => {
            let params: GetBoardParams = parse_args(args)?;
            let (project, team) = scope(client, params.project, params.team)?;
            to_json(&client.get_board(&project, &team, &params.board).await?)
        }
        "list_iterations" => {
            let params: IterationsParams = parse_args(args)?;
            let (project, team) = scope(client, params.project, params.team)?;
            let iterations = client
                .list_iterations(&project, &team, params.timeframe.as_deref())
                .await?;
            list_json("iterations", &iterations)
        }
        _ => Err(Error::UnknownTool(name.to_string())),
    }
}

/// Project and team, defaulting the team to the project's default team name.
fn scope(
    client: &dyn DevOpsClient,
    project: Option<String>,
    team: Option<String>,
) -> Result<(String, String)> {
    let project = client.resolve_project(project.as_deref())?;
    let team = team
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("{} Team", project));
    Ok((project, team))
}

#[derive(Debug, Deserialize)]
struct TeamParams {
    team: Option<String>,
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetBoardParams {
    board: String,
    team: Option<String>,
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IterationsParams {
    team: Option<String>,
    timeframe: Option<String>,
    project: Option<String>,
}
