//! Git repository and pull request tools.

use azdo_core::{
    CreatePullRequestInput, CreateThreadInput, DevOpsClient, Error, PullRequestFilter, Result,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{list_json, project_property, to_json, top_property};
use crate::params::{ensure, parse_args};
use crate::protocol::ToolDefinition;

fn repository_property() -> Value {
    json!({ "type": "string", "minLength": 1, "description": "Repository name or id" })
}

fn pull_request_property() -> Value {
    json!({ "type": "integer", "minimum": 1, "description": "Pull request id" })
}

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "list_repositories",
            "List Git repositories in a project",
            json!({
                "type": "object",
                "properties": { "project": project_property() }
            }),
        ),
        ToolDefinition::new(
            "get_repository",
            "Get details of a Git repository",
            json!({
                "type": "object",
                "properties": {
                    "repository": repository_property(),
                    "project": project_property()
                },
                "required": ["repository"]
            }),
        ),
        ToolDefinition::new(
            "list_branches",
            "List branches of a Git repository",
            json!({
                "type": "object",
                "properties": {
                    "repository": repository_property(),
                    "project": project_property()
                },
                "required": ["repository"]
            }),
        ),
        ToolDefinition::new(
            "get_file_content",
            "Get the content of a file in a Git repository",
            json!({
                "type": "object",
                "properties": {
                    "repository": repository_property(),
                    "path": { "type": "string", "minLength": 1, "description": "File path, e.g. /src/main.rs" },
                    "branch": { "type": "string", "description": "Branch name (default: the default branch)" },
                    "project": project_property()
                },
                "required": ["repository", "path"]
            }),
        ),
        ToolDefinition::new(
            "list_commits",
            "List recent commits of a Git repository",
            json!({
                "type": "object",
                "properties": {
                    "repository": repository_property(),
                    "branch": { "type": "string" },
                    "top": top_property(20, 1000),
                    "project": project_property()
                },
                "required": ["repository"]
            }),
        ),
        ToolDefinition::new(
            "list_pull_requests",
            "List pull requests of a Git repository",
            json!({
                "type": "object",
                "properties": {
                    "repository": repository_property(),
                    "status": {
                        "type": "string",
                        "enum": ["active", "abandoned", "completed", "all"],
                        "description": "Pull request status (default: active)"
                    },
                    "creator_id": { "type": "string", "description": "Identity id of the author" },
                    "reviewer_id": { "type": "string", "description": "Identity id of a reviewer" },
                    "source_branch": { "type": "string" },
                    "target_branch": { "type": "string" },
                    "top": top_property(20, 1000),
                    "project": project_property()
                },
                "required": ["repository"]
            }),
        ),
        ToolDefinition::new(
            "get_pull_request",
            "Get a pull request",
            json!({
                "type": "object",
                "properties": {
                    "repository": repository_property(),
                    "pull_request_id": pull_request_property(),
                    "project": project_property()
                },
                "required": ["repository", "pull_request_id"]
            }),
        ),
        ToolDefinition::new(
            "create_pull_request",
            "Create a pull request",
            json!({
                "type": "object",
                "properties": {
                    "repository": repository_property(),
                    "source_branch": { "type": "string", "minLength": 1 },
                    "target_branch": { "type": "string", "minLength": 1 },
                    "title": { "type": "string", "minLength": 1 },
                    "description": { "type": "string" },
                    "is_draft": { "type": "boolean", "description": "Create as draft (default: false)" },
                    "reviewers": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Reviewer identity ids"
                    },
                    "project": project_property()
                },
                "required": ["repository", "source_branch", "target_branch", "title"]
            }),
        ),
        ToolDefinition::new(
            "list_pull_request_comments",
            "List comment threads of a pull request",
            json!({
                "type": "object",
                "properties": {
                    "repository": repository_property(),
                    "pull_request_id": pull_request_property(),
                    "project": project_property()
                },
                "required": ["repository", "pull_request_id"]
            }),
        ),
        ToolDefinition::new(
            "add_pull_request_comment",
            "Start a comment thread on a pull request, optionally on a file line",
            json!({
                "type": "object",
                "properties": {
                    "repository": repository_property(),
                    "pull_request_id": pull_request_property(),
                    "content": { "type": "string", "minLength": 1 },
                    "file_path": { "type": "string", "description": "File to comment on" },
                    "line": { "type": "integer", "minimum": 1, "description": "Line in the new version of the file" },
                    "project": project_property()
                },
                "required": ["repository", "pull_request_id", "content"]
            }),
        ),
    ]
}

/// Tool names routed by [`handle`].
pub const HANDLED: &[&str] = &[
    "list_repositories",
    "get_repository",
    "list_branches",
    "get_file_content",
    "list_commits",
    "list_pull_requests",
    "get_pull_request",
    "create_pull_request",
    "list_pull_request_comments",
    "add_pull_request_comment",
];

pub async fn handle(client: &dyn DevOpsClient, name: &str, args: Value) -> Result<Value> {
    match name {
        "list_repositories" => {
            let params: ProjectParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            list_json("repositories", &client.list_repositories(&project).await?)
        }
        "get_repository" => {
            let params: RepositoryParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            to_json(&client.get_repository(&project, &params.repository).await?)
        }
        "list_branches" => {
            let params: RepositoryParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            list_json(
                "branches",
                &client.list_branches(&project, &params.repository).await?,
            )
        }
        "get_file_content" => get_file_content(client, parse_args(args)?).await,
        "list_commits" => {
            let params: ListCommitsParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            let commits = client
                .list_commits(
                    &project,
                    &params.repository,
                    params.branch.as_deref(),
                    params.top,
                )
                .await?;
            list_json("commits", &commits)
        }
        "list_pull_requests" => {
            let params: ListPullRequestsParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            let filter = PullRequestFilter {
                status: Some(params.status),
                creator_id: params.creator_id,
                reviewer_id: params.reviewer_id,
                source_branch: params.source_branch,
                target_branch: params.target_branch,
                top: params.top,
            };
            let pull_requests = client
                .list_pull_requests(&project, &params.repository, &filter)
                .await?;
            list_json("pull_requests", &pull_requests)
        }
        "get_pull_request" => {
            let params: PullRequestParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            to_json(
                &client
                    .get_pull_request(&project, &params.repository, params.pull_request_id)
                    .await?,
            )
        }
        "create_pull_request" => create_pull_request(client, parse_args(args)?).await,
        "list_pull_request_comments" => {
            let params: PullRequestParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            let threads = client
                .list_pull_request_threads(&project, &params.repository, params.pull_request_id)
                .await?;
            list_json("threads", &threads)
        }
        "add_pull_request_comment" => add_pull_request_comment(client, parse_args(args)?).await,
        _ => Err(Error::UnknownTool(name.to_string())),
    }
}

async fn get_file_content(client: &dyn DevOpsClient, params: FileContentParams) -> Result<Value> {
    let project = client.resolve_project(params.project.as_deref())?;
    let bytes = client
        .get_file_bytes(
            &project,
            &params.repository,
            &params.path,
            params.branch.as_deref(),
        )
        .await?;
    let size = bytes.len();

    let (encoding, content) = match String::from_utf8(bytes) {
        Ok(text) => ("utf-8", text),
        Err(e) => ("base64", STANDARD.encode(e.into_bytes())),
    };

    let mut body = json!({
        "repository": params.repository,
        "path": params.path,
        "encoding": encoding,
        "size": size,
        "content": content,
    });
    if let Some(branch) = params.branch {
        body["branch"] = json!(branch);
    }
    Ok(body)
}

async fn create_pull_request(
    client: &dyn DevOpsClient,
    params: CreatePullRequestParams,
) -> Result<Value> {
    let project = client.resolve_project(params.project.as_deref())?;
    ensure(
        params.source_branch.trim() != params.target_branch.trim(),
        || "field `target_branch` must differ from `source_branch`".to_string(),
    )?;

    let input = CreatePullRequestInput {
        source_branch: params.source_branch,
        target_branch: params.target_branch,
        title: params.title,
        description: params.description,
        is_draft: params.is_draft,
        reviewers: params.reviewers,
    };
    to_json(
        &client
            .create_pull_request(&project, &params.repository, &input)
            .await?,
    )
}

async fn add_pull_request_comment(
    client: &dyn DevOpsClient,
    params: AddCommentParams,
) -> Result<Value> {
    let project = client.resolve_project(params.project.as_deref())?;
    ensure(params.line.is_none() || params.file_path.is_some(), || {
        "field `line` requires `file_path`".to_string()
    })?;

    let input = CreateThreadInput {
        content: params.content,
        file_path: params.file_path.map(|p| {
            if p.starts_with('/') {
                p
            } else {
                format!("/{}", p)
            }
        }),
        line: params.line,
    };
    to_json(
        &client
            .create_pull_request_thread(
                &project,
                &params.repository,
                params.pull_request_id,
                &input,
            )
            .await?,
    )
}

// ===== Params =====

#[derive(Debug, Deserialize)]
struct ProjectParams {
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepositoryParams {
    repository: String,
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileContentParams {
    repository: String,
    path: String,
    branch: Option<String>,
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListCommitsParams {
    repository: String,
    branch: Option<String>,
    #[serde(default = "default_top")]
    top: u32,
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListPullRequestsParams {
    repository: String,
    #[serde(default = "default_status")]
    status: String,
    creator_id: Option<String>,
    reviewer_id: Option<String>,
    source_branch: Option<String>,
    target_branch: Option<String>,
    #[serde(default = "default_top")]
    top: u32,
    project: Option<String>,
}

fn default_status() -> String {
    "active".to_string()
}

fn default_top() -> u32 {
    20
}

#[derive(Debug, Deserialize)]
struct PullRequestParams {
    repository: String,
    pull_request_id: u64,
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatePullRequestParams {
    repository: String,
    source_branch: String,
    target_branch: String,
    title: String,
    description: Option<String>,
    #[serde(default)]
    is_draft: bool,
    #[serde(default)]
    reviewers: Vec<String>,
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddCommentParams {
    repository: String,
    pull_request_id: u64,
    content: String,
    file_path: Option<String>,
    line: Option<u64>,
    project: Option<String>,
}
