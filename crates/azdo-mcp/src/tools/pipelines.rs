//! Pipeline and build tools.

use std::collections::BTreeMap;

use azdo_core::{BuildFilter, DevOpsClient, Error, Result, RunPipelineInput};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{list_json, project_property, to_json, top_property};
use crate::params::parse_args;
use crate::protocol::ToolDefinition;

fn build_id_property() -> Value {
    json!({ "type": "integer", "minimum": 1, "description": "Build (run) id" })
}

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "list_pipelines",
            "List pipelines in a project",
            json!({
                "type": "object",
                "properties": {
                    "top": top_property(50, 1000),
                    "project": project_property()
                }
            }),
        ),
        ToolDefinition::new(
            "list_builds",
            "List builds, newest first",
            json!({
                "type": "object",
                "properties": {
                    "definition_id": { "type": "integer", "minimum": 1, "description": "Pipeline (build definition) id" },
                    "branch": { "type": "string", "description": "Source branch, short name or full ref" },
                    "status": {
                        "type": "string",
                        "enum": ["inProgress", "completed", "cancelling", "postponed", "notStarted", "all"]
                    },
                    "top": top_property(20, 1000),
                    "project": project_property()
                }
            }),
        ),
        ToolDefinition::new(
            "get_build",
            "Get a build",
            json!({
                "type": "object",
                "properties": {
                    "build_id": build_id_property(),
                    "project": project_property()
                },
                "required": ["build_id"]
            }),
        ),
        ToolDefinition::new(
            "run_pipeline",
            "Queue a pipeline run",
            json!({
                "type": "object",
                "properties": {
                    "pipeline_id": { "type": "integer", "minimum": 1 },
                    "branch": { "type": "string", "description": "Branch to run (default: the pipeline's default branch)" },
                    "variables": {
                        "type": "object",
                        "additionalProperties": { "type": "string" },
                        "description": "Pipeline variables"
                    },
                    "template_parameters": {
                        "type": "object",
                        "additionalProperties": { "type": "string" },
                        "description": "Runtime template parameters"
                    },
                    "project": project_property()
                },
                "required": ["pipeline_id"]
            }),
        ),
        ToolDefinition::new(
            "list_build_logs",
            "List the logs of a build",
            json!({
                "type": "object",
                "properties": {
                    "build_id": build_id_property(),
                    "project": project_property()
                },
                "required": ["build_id"]
            }),
        ),
        ToolDefinition::new(
            "get_build_log",
            "Get the text of one build log",
            json!({
                "type": "object",
                "properties": {
                    "build_id": build_id_property(),
                    "log_id": { "type": "integer", "minimum": 1 },
                    "tail": {
                        "type": "integer",
                        "minimum": 0,
                        "maximum": 100000,
                        "description": "Return only the last N lines (default: 0, the whole log)"
                    },
                    "project": project_property()
                },
                "required": ["build_id", "log_id"]
            }),
        ),
    ]
}

/// Tool names routed by [`handle`].
pub const HANDLED: &[&str] = &[
    "list_pipelines",
    "list_builds",
    "get_build",
    "run_pipeline",
    "list_build_logs",
    "get_build_log",
];

pub async fn handle(client: &dyn DevOpsClient, name: &str, args: Value) -> Result<Value> {
    match name {
        "list_pipelines" => {
            let params: ListPipelinesParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            list_json("pipelines", &client.list_pipelines(&project, params.top).await?)
        }
        "list_builds" => {
            let params: ListBuildsParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            let filter = BuildFilter {
                definition_id: params.definition_id,
                branch: params.branch,
                status: params.status,
                top: params.top,
            };
            list_json("builds", &client.list_builds(&project, &filter).await?)
        }
        "get_build" => {
            let params: BuildParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            to_json(&client.get_build(&project, params.build_id).await?)
        }
        "run_pipeline" => {
            let params: RunPipelineParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            let input = RunPipelineInput {
                branch: params.branch,
                variables: params.variables,
                template_parameters: params.template_parameters,
            };
            to_json(
                &client
                    .run_pipeline(&project, params.pipeline_id, &input)
                    .await?,
            )
        }
        "list_build_logs" => {
            let params: BuildParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            list_json("logs", &client.list_build_logs(&project, params.build_id).await?)
        }
        "get_build_log" => {
            let params: BuildLogParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            let text = client
                .get_build_log(&project, params.build_id, params.log_id)
                .await?;
            let (content, line_count, truncated) = tail_lines(&text, params.tail);
            Ok(json!({
                "build_id": params.build_id,
                "log_id": params.log_id,
                "line_count": line_count,
                "truncated": truncated,
                "content": content,
            }))
        }
        _ => Err(Error::UnknownTool(name.to_string())),
    }
}

/// Last `tail` lines of `text` (all of it when `tail` is 0), the total line
/// count, and whether anything was cut.
fn tail_lines(text: &str, tail: usize) -> (String, usize, bool) {
    let lines: Vec<&str> = text.lines().collect();
    let total = lines.len();
    if tail == 0 || total <= tail {
        return (text.to_string(), total, false);
    }
    (lines[total - tail..].join("\n"), total, true)
}

// ===== Params =====

#[derive(Debug, Deserialize)]
struct ListPipelinesParams {
    #[serde(default = "default_pipelines_top")]
    top: u32,
    project: Option<String>,
}

fn default_pipelines_top() -> u32 {
    50
}

#[derive(Debug, Deserialize)]
struct ListBuildsParams {
    definition_id: Option<u64>,
    branch: Option<String>,
    status: Option<String>,
    #[serde(default = "default_builds_top")]
    top: u32,
    project: Option<String>,
}

fn default_builds_top() -> u32 {
    20
}

#[derive(Debug, Deserialize)]
struct BuildParams {
    build_id: u64,
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunPipelineParams {
    pipeline_id: u64,
    branch: Option<String>,
    #[serde(default)]
    variables: BTreeMap<String, String>,
    #[serde(default)]
    template_parameters: BTreeMap<String, String>,
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BuildLogParams {
    build_id: u64,
    log_id: u64,
    #[serde(default)]
    tail: usize,
    project: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockClient;

    #[test]
    fn test_tail_lines() {
        assert_eq!(tail_lines("a\nb\nc\n", 0), ("a\nb\nc\n".to_string(), 3, false));
        assert_eq!(tail_lines("a\nb\nc\n", 5), ("a\nb\nc\n".to_string(), 3, false));
        assert_eq!(tail_lines("a\nb\nc\n", 2), ("b\nc".to_string(), 3, true));
        assert_eq!(tail_lines("", 3), (String::new(), 0, false));
    }

    #[tokio::test]
    async fn test_get_build_log_tail() {
        let client = MockClient::new();
        let value = handle(
            &client,
            "get_build_log",
            json!({"build_id": 100, "log_id": 3, "tail": 2}),
        )
        .await
        .unwrap();

        assert_eq!(value["content"], "line 4\nline 5");
        assert_eq!(value["line_count"], 5);
        assert_eq!(value["truncated"], true);
        assert_eq!(client.calls(), vec!["get_build_log(Fabrikam, 100, 3)"]);
    }

    #[tokio::test]
    async fn test_run_pipeline_variables_must_be_strings() {
        let client = MockClient::new();
        let err = handle(
            &client,
            "run_pipeline",
            json!({"pipeline_id": 12, "variables": {"retries": 3}}),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_run_pipeline() {
        let client = MockClient::new();
        let value = handle(
            &client,
            "run_pipeline",
            json!({"pipeline_id": 12, "branch": "release/1.0", "variables": {"env": "staging"}}),
        )
        .await
        .unwrap();

        assert_eq!(value["id"], 300);
        assert_eq!(value["pipeline_id"], 12);
        assert_eq!(client.calls(), vec!["run_pipeline(Fabrikam, 12, release/1.0)"]);
    }

    #[tokio::test]
    async fn test_list_builds_passes_filter() {
        let client = MockClient::new();
        let value = handle(&client, "list_builds", json!({"status": "completed", "top": 2}))
            .await
            .unwrap();

        assert_eq!(value["count"], 2);
        assert_eq!(client.calls(), vec!["list_builds(Fabrikam, completed, 2)"]);
    }
}
