//! Wiki tools.

use azdo_core::{DevOpsClient, Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{list_json, project_property, to_json};
use crate::params::{default_true, parse_args};
use crate::protocol::ToolDefinition;

fn wiki_property() -> Value {
    json!({ "type": "string", "minLength": 1, "description": "Wiki name or id, e.g. Fabrikam.wiki" })
}

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "list_wikis",
            "List wikis in a project",
            json!({
                "type": "object",
                "properties": { "project": project_property() }
            }),
        ),
        ToolDefinition::new(
            "list_wiki_pages",
            "List the pages below a wiki path",
            json!({
                "type": "object",
                "properties": {
                    "wiki": wiki_property(),
                    "path": { "type": "string", "description": "Page path to start from (default: /)" },
                    "project": project_property()
                },
                "required": ["wiki"]
            }),
        ),
        ToolDefinition::new(
            "get_wiki_page",
            "Get a wiki page",
            json!({
                "type": "object",
                "properties": {
                    "wiki": wiki_property(),
                    "path": { "type": "string", "minLength": 1, "description": "Page path, e.g. /Guides/Setup" },
                    "include_content": { "type": "boolean", "description": "Return the Markdown content (default: true)" },
                    "project": project_property()
                },
                "required": ["wiki", "path"]
            }),
        ),
        ToolDefinition::new(
            "upsert_wiki_page",
            "Create a wiki page, or replace the content of an existing one",
            json!({
                "type": "object",
                "properties": {
                    "wiki": wiki_property(),
                    "path": { "type": "string", "minLength": 1 },
                    "content": { "type": "string", "description": "Markdown content" },
                    "project": project_property()
                },
                "required": ["wiki", "path", "content"]
            }),
        ),
    ]
}

/// Tool names routed by [`handle`].
pub const HANDLED: &[&str] = &[
    "list_wikis",
    "list_wiki_pages",
    "get_wiki_page",
    "upsert_wiki_page",
];

pub async fn handle(client: &dyn DevOpsClient, name: &str, args: Value) -> Result<Value> {
    match name {
        "list_wikis" => {
            let params: ProjectParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            list_json("wikis", &client.list_wikis(&project).await?)
        }
        "list_wiki_pages" => {
            let params: ListPagesParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            let path = page_path(params.path.as_deref().unwrap_or("/"));
            list_json(
                "pages",
                &client.list_wiki_pages(&project, &params.wiki, &path).await?,
            )
        }
        "get_wiki_page" => {
            let params: GetPageParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            let page = client
                .get_wiki_page(
                    &project,
                    &params.wiki,
                    &page_path(&params.path),
                    params.include_content,
                )
                .await?;
            to_json(&page)
        }
        "upsert_wiki_page" => upsert_wiki_page(client, parse_args(args)?).await,
        _ => Err(Error::UnknownTool(name.to_string())),
    }
}

/// Read the current page for its version, then create or replace it.
async fn upsert_wiki_page(client: &dyn DevOpsClient, params: UpsertPageParams) -> Result<Value> {
    let project = client.resolve_project(params.project.as_deref())?;
    let path = page_path(&params.path);

    let etag = match client
        .get_wiki_page(&project, &params.wiki, &path, false)
        .await
    {
        Ok(existing) => existing.etag,
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e),
    };
    let created = etag.is_none();

    let page = client
        .put_wiki_page(
            &project,
            &params.wiki,
            &path,
            &params.content,
            etag.as_deref(),
        )
        .await?;

    Ok(json!({
        "created": created,
        "path": page.path,
        "id": page.id,
        "etag": page.etag,
    }))
}

/// Wiki paths are rooted at `/`.
fn page_path(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

#[derive(Debug, Deserialize)]
struct ProjectParams {
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListPagesParams {
    wiki: String,
    path: Option<String>,
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetPageParams {
    wiki: String,
    path: String,
    #[serde(default = "default_true")]
    include_content: bool,
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpsertPageParams {
    wiki: String,
    path: String,
    content: String,
    project: Option<String>,
}
