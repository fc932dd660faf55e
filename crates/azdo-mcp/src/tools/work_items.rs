//! Work item tools.
//!
//! Rich-text fields (description, acceptance criteria, repro steps, comment
//! and revision text) come back from Azure DevOps as HTML and are converted
//! to plain text here before being returned.

use std::collections::BTreeMap;

use azdo_core::provider::work_item_api_url;
use azdo_core::{
    CreateWorkItemInput, DevOpsClient, Error, NewRelation, Result, UpdateWorkItemInput, WorkItem,
    WorkItemComment, WorkItemRevision,
};
use azdo_text::normalize_field;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{list_json, project_property, to_json, top_property};
use crate::params::{ensure, parse_args};
use crate::protocol::ToolDefinition;

/// Page size used when `get_work_item` also fetches comments.
const EMBEDDED_COMMENTS: u32 = 100;

/// Relation type of a file attached to a work item.
const ATTACHED_FILE: &str = "AttachedFile";

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "get_work_item",
            "Get a work item by id, optionally with its comments and linked work items",
            json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer", "minimum": 1, "description": "Work item id" },
                    "project": project_property(),
                    "include_comments": {
                        "type": "boolean",
                        "description": "Also return the discussion comments (default: false)"
                    },
                    "include_related": {
                        "type": "boolean",
                        "description": "Also return work items linked to this one (default: false)"
                    }
                },
                "required": ["id"]
            }),
        ),
        ToolDefinition::new(
            "query_work_items",
            "Run a WIQL query and return the matching work items",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "minLength": 1,
                        "description": "WIQL query, e.g. SELECT [System.Id] FROM WorkItems WHERE [System.State] = 'Active'"
                    },
                    "project": project_property(),
                    "top": top_property(50, 200)
                },
                "required": ["query"]
            }),
        ),
        ToolDefinition::new(
            "create_work_item",
            "Create a work item",
            json!({
                "type": "object",
                "properties": {
                    "work_item_type": {
                        "type": "string",
                        "minLength": 1,
                        "description": "Work item type, e.g. Bug, Task, User Story"
                    },
                    "title": { "type": "string", "minLength": 1 },
                    "description": { "type": "string", "description": "HTML or plain text" },
                    "assigned_to": { "type": "string", "description": "Display name or email" },
                    "area_path": { "type": "string" },
                    "iteration_path": { "type": "string" },
                    "priority": { "type": "integer", "minimum": 1, "maximum": 4 },
                    "tags": { "type": "array", "items": { "type": "string" } },
                    "parent_id": { "type": "integer", "minimum": 1, "description": "Parent work item id" },
                    "fields": {
                        "type": "object",
                        "description": "Additional fields by reference name, e.g. {\"Microsoft.VSTS.Scheduling.StoryPoints\": 3}"
                    },
                    "project": project_property()
                },
                "required": ["work_item_type", "title"]
            }),
        ),
        ToolDefinition::new(
            "update_work_item",
            "Update fields of a work item",
            json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer", "minimum": 1 },
                    "title": { "type": "string", "minLength": 1 },
                    "description": { "type": "string" },
                    "state": { "type": "string", "description": "New state, e.g. Active, Resolved, Closed" },
                    "assigned_to": { "type": "string", "description": "Display name or email, empty to unassign" },
                    "area_path": { "type": "string" },
                    "iteration_path": { "type": "string" },
                    "priority": { "type": "integer", "minimum": 1, "maximum": 4 },
                    "tags": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Replaces the existing tags"
                    },
                    "fields": { "type": "object", "description": "Additional fields by reference name" },
                    "project": project_property()
                },
                "required": ["id"]
            }),
        ),
        ToolDefinition::new(
            "delete_work_item",
            "Delete a work item (moves it to the recycle bin unless destroy is set)",
            json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer", "minimum": 1 },
                    "destroy": {
                        "type": "boolean",
                        "description": "Permanently delete instead of recycling (default: false)"
                    },
                    "project": project_property()
                },
                "required": ["id"]
            }),
        ),
        ToolDefinition::new(
            "list_work_item_comments",
            "List discussion comments on a work item",
            json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer", "minimum": 1 },
                    "top": top_property(100, 200),
                    "project": project_property()
                },
                "required": ["id"]
            }),
        ),
        ToolDefinition::new(
            "add_work_item_comment",
            "Add a discussion comment to a work item",
            json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer", "minimum": 1 },
                    "text": { "type": "string", "minLength": 1, "description": "Comment text (HTML allowed)" },
                    "project": project_property()
                },
                "required": ["id", "text"]
            }),
        ),
        ToolDefinition::new(
            "link_work_items",
            "Link two work items",
            json!({
                "type": "object",
                "properties": {
                    "source_id": { "type": "integer", "minimum": 1 },
                    "target_id": { "type": "integer", "minimum": 1 },
                    "link_type": {
                        "type": "string",
                        "enum": ["related", "parent", "child", "predecessor", "successor", "duplicate", "duplicate-of"],
                        "description": "Role of the target relative to the source (default: related)"
                    },
                    "comment": { "type": "string" },
                    "project": project_property()
                },
                "required": ["source_id", "target_id"]
            }),
        ),
        ToolDefinition::new(
            "attach_file_to_work_item",
            "Upload a file and attach it to a work item",
            json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer", "minimum": 1 },
                    "file_name": { "type": "string", "minLength": 1 },
                    "content": { "type": "string", "description": "File content, as text or base64" },
                    "encoding": {
                        "type": "string",
                        "enum": ["utf-8", "base64"],
                        "description": "Encoding of content (default: utf-8)"
                    },
                    "comment": { "type": "string" },
                    "project": project_property()
                },
                "required": ["id", "file_name", "content"]
            }),
        ),
        ToolDefinition::new(
            "get_work_item_revisions",
            "List the revision history of a work item",
            json!({
                "type": "object",
                "properties": {
                    "id": { "type": "integer", "minimum": 1 },
                    "top": top_property(20, 200),
                    "project": project_property()
                },
                "required": ["id"]
            }),
        ),
    ]
}

/// Tool names routed by [`handle`].
pub const HANDLED: &[&str] = &[
    "get_work_item",
    "query_work_items",
    "create_work_item",
    "update_work_item",
    "delete_work_item",
    "list_work_item_comments",
    "add_work_item_comment",
    "link_work_items",
    "attach_file_to_work_item",
    "get_work_item_revisions",
];

pub async fn handle(client: &dyn DevOpsClient, name: &str, args: Value) -> Result<Value> {
    match name {
        "get_work_item" => get_work_item(client, parse_args(args)?).await,
        "query_work_items" => query_work_items(client, parse_args(args)?).await,
        "create_work_item" => create_work_item(client, parse_args(args)?).await,
        "update_work_item" => update_work_item(client, parse_args(args)?).await,
        "delete_work_item" => {
            let params: DeleteParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            to_json(&client.delete_work_item(&project, params.id, params.destroy).await?)
        }
        "list_work_item_comments" => {
            let params: ListCommentsParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            let comments = client
                .get_work_item_comments(&project, params.id, params.top)
                .await?;
            let comments: Vec<WorkItemComment> =
                comments.into_iter().map(normalize_comment).collect();
            let mut body = list_json("comments", &comments)?;
            body["work_item_id"] = json!(params.id);
            Ok(body)
        }
        "add_work_item_comment" => {
            let params: AddCommentParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            let comment = client
                .add_work_item_comment(&project, params.id, &params.text)
                .await?;
            to_json(&normalize_comment(comment))
        }
        "link_work_items" => link_work_items(client, parse_args(args)?).await,
        "attach_file_to_work_item" => attach_file(client, parse_args(args)?).await,
        "get_work_item_revisions" => {
            let params: RevisionsParams = parse_args(args)?;
            let project = client.resolve_project(params.project.as_deref())?;
            let revisions = client
                .get_work_item_revisions(&project, params.id, params.top)
                .await?;
            let revisions: Vec<WorkItemRevision> = revisions
                .into_iter()
                .map(|mut r| {
                    r.description = normalize_field(r.description.take());
                    r
                })
                .collect();
            let mut body = list_json("revisions", &revisions)?;
            body["work_item_id"] = json!(params.id);
            Ok(body)
        }
        _ => Err(Error::UnknownTool(name.to_string())),
    }
}

// ===== Handlers =====

async fn get_work_item(client: &dyn DevOpsClient, params: GetWorkItemParams) -> Result<Value> {
    let project = client.resolve_project(params.project.as_deref())?;
    let item = normalize_work_item(client.get_work_item(&project, params.id).await?);
    let related_ids = related_ids(&item);

    let mut body = to_json(&item)?;

    if params.include_comments {
        let comments: Vec<WorkItemComment> = client
            .get_work_item_comments(&project, params.id, EMBEDDED_COMMENTS)
            .await?
            .into_iter()
            .map(normalize_comment)
            .collect();
        body["comments"] = to_json(&comments)?;
    }

    if params.include_related {
        let related: Vec<WorkItem> = if related_ids.is_empty() {
            Vec::new()
        } else {
            client
                .get_work_items(&project, &related_ids)
                .await?
                .into_iter()
                .map(normalize_work_item)
                .collect()
        };
        body["related"] = to_json(&related)?;
    }

    Ok(body)
}

async fn query_work_items(client: &dyn DevOpsClient, params: QueryParams) -> Result<Value> {
    let project = client.resolve_project(params.project.as_deref())?;
    let ids = client
        .query_work_items(&project, &params.query, params.top)
        .await?;

    let items: Vec<WorkItem> = if ids.is_empty() {
        Vec::new()
    } else {
        client
            .get_work_items(&project, &ids)
            .await?
            .into_iter()
            .map(normalize_work_item)
            .collect()
    };
    list_json("work_items", &items)
}

async fn create_work_item(client: &dyn DevOpsClient, params: CreateParams) -> Result<Value> {
    let project = client.resolve_project(params.project.as_deref())?;
    let input = CreateWorkItemInput {
        work_item_type: params.work_item_type.trim().to_string(),
        title: params.title,
        description: params.description,
        assigned_to: params.assigned_to,
        area_path: params.area_path,
        iteration_path: params.iteration_path,
        priority: params.priority,
        tags: params.tags,
        parent_id: params.parent_id,
        fields: params.fields,
    };
    let item = client.create_work_item(&project, &input).await?;
    to_json(&normalize_work_item(item))
}

async fn update_work_item(client: &dyn DevOpsClient, params: UpdateParams) -> Result<Value> {
    let project = client.resolve_project(params.project.as_deref())?;
    let input = UpdateWorkItemInput {
        title: params.title,
        description: params.description,
        state: params.state,
        assigned_to: params.assigned_to,
        area_path: params.area_path,
        iteration_path: params.iteration_path,
        priority: params.priority,
        tags: params.tags,
        fields: params.fields,
    };
    ensure(!input.is_empty(), || {
        "at least one field to update must be provided".to_string()
    })?;

    let item = client.update_work_item(&project, params.id, &input).await?;
    to_json(&normalize_work_item(item))
}

async fn link_work_items(client: &dyn DevOpsClient, params: LinkParams) -> Result<Value> {
    let project = client.resolve_project(params.project.as_deref())?;
    ensure(params.source_id != params.target_id, || {
        "field `target_id` must differ from `source_id`".to_string()
    })?;

    let relation = NewRelation {
        rel: params.link_type.relation().to_string(),
        url: work_item_api_url(client.organization_url(), params.target_id),
        comment: params.comment,
    };
    let item = client
        .add_work_item_relation(&project, params.source_id, &relation)
        .await?;

    Ok(json!({
        "source_id": params.source_id,
        "target_id": params.target_id,
        "link_type": params.link_type,
        "relation": relation.rel,
        "rev": item.rev,
        "url": item.url,
    }))
}

async fn attach_file(client: &dyn DevOpsClient, params: AttachParams) -> Result<Value> {
    let project = client.resolve_project(params.project.as_deref())?;
    let bytes = match params.encoding {
        ContentEncoding::Utf8 => params.content.into_bytes(),
        ContentEncoding::Base64 => STANDARD.decode(params.content.trim()).map_err(|e| {
            Error::Validation(format!("field `content` is not valid base64: {}", e))
        })?,
    };
    let size = bytes.len();

    // Not rolled back if linking fails: the upload stays in the attachment store.
    let attachment = client
        .upload_attachment(&project, &params.file_name, bytes)
        .await?;
    let relation = NewRelation {
        rel: ATTACHED_FILE.to_string(),
        url: attachment.url.clone(),
        comment: params.comment,
    };
    let item = client
        .add_work_item_relation(&project, params.id, &relation)
        .await?;

    Ok(json!({
        "work_item_id": params.id,
        "attachment_id": attachment.id,
        "attachment_url": attachment.url,
        "file_name": params.file_name,
        "size": size,
        "rev": item.rev,
    }))
}

// ===== Mapping functions =====

fn normalize_work_item(mut item: WorkItem) -> WorkItem {
    item.description = normalize_field(item.description.take());
    item.acceptance_criteria = normalize_field(item.acceptance_criteria.take());
    item.repro_steps = normalize_field(item.repro_steps.take());
    item
}

fn normalize_comment(mut comment: WorkItemComment) -> WorkItemComment {
    comment.text = normalize_field(comment.text.take());
    comment
}

/// Ids of linked work items, first occurrence order, without duplicates.
fn related_ids(item: &WorkItem) -> Vec<u64> {
    let mut ids = Vec::new();
    for id in item.relations.iter().filter_map(|r| r.target_id) {
        if id != item.id && !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

// ===== Params =====

#[derive(Debug, Deserialize)]
struct GetWorkItemParams {
    id: u64,
    project: Option<String>,
    #[serde(default)]
    include_comments: bool,
    #[serde(default)]
    include_related: bool,
}

#[derive(Debug, Deserialize)]
struct QueryParams {
    query: String,
    project: Option<String>,
    #[serde(default = "default_query_top")]
    top: u32,
}

fn default_query_top() -> u32 {
    50
}

#[derive(Debug, Deserialize)]
struct CreateParams {
    work_item_type: String,
    title: String,
    description: Option<String>,
    assigned_to: Option<String>,
    area_path: Option<String>,
    iteration_path: Option<String>,
    priority: Option<i64>,
    #[serde(default)]
    tags: Vec<String>,
    parent_id: Option<u64>,
    #[serde(default)]
    fields: BTreeMap<String, Value>,
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateParams {
    id: u64,
    title: Option<String>,
    description: Option<String>,
    state: Option<String>,
    assigned_to: Option<String>,
    area_path: Option<String>,
    iteration_path: Option<String>,
    priority: Option<i64>,
    tags: Option<Vec<String>>,
    #[serde(default)]
    fields: BTreeMap<String, Value>,
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeleteParams {
    id: u64,
    #[serde(default)]
    destroy: bool,
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListCommentsParams {
    id: u64,
    #[serde(default = "default_comments_top")]
    top: u32,
    project: Option<String>,
}

fn default_comments_top() -> u32 {
    100
}

#[derive(Debug, Deserialize)]
struct AddCommentParams {
    id: u64,
    text: String,
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinkParams {
    source_id: u64,
    target_id: u64,
    #[serde(default)]
    link_type: LinkType,
    comment: Option<String>,
    project: Option<String>,
}

/// Role of the link target relative to the source work item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
enum LinkType {
    #[default]
    Related,
    Parent,
    Child,
    Predecessor,
    Successor,
    Duplicate,
    DuplicateOf,
}

impl LinkType {
    fn relation(&self) -> &'static str {
        match self {
            LinkType::Related => "System.LinkTypes.Related",
            LinkType::Parent => "System.LinkTypes.Hierarchy-Reverse",
            LinkType::Child => "System.LinkTypes.Hierarchy-Forward",
            LinkType::Predecessor => "System.LinkTypes.Dependency-Reverse",
            LinkType::Successor => "System.LinkTypes.Dependency-Forward",
            LinkType::Duplicate => "System.LinkTypes.Duplicate-Forward",
            LinkType::DuplicateOf => "System.LinkTypes.Duplicate-Reverse",
        }
    }
}

#[derive(Debug, Deserialize)]
struct AttachParams {
    id: u64,
    file_name: String,
    content: String,
    #[serde(default)]
    encoding: ContentEncoding,
    comment: Option<String>,
    project: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
enum ContentEncoding {
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "base64")]
    Base64,
}

#[derive(Debug, Deserialize)]
struct RevisionsParams {
    id: u64,
    #[serde(default = "default_revisions_top")]
    top: u32,
    project: Option<String>,
}

fn default_revisions_top() -> u32 {
    20
}
