//! Azure DevOps REST response and request types.
//!
//! These types represent the raw JSON of the Azure DevOps REST API 7.1.
//! They are deserialized and then mapped to the flattened azdo-core types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Standard collection envelope: `{ "count": n, "value": [...] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

// =============================================================================
// Identity
// =============================================================================

/// Identity reference embedded in most resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzIdentityRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub unique_name: Option<String>,
    #[serde(default)]
    pub is_container: Option<bool>,
}

/// Response of `_apis/connectionData`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzConnectionData {
    pub authenticated_user: AzIdentity,
}

/// Full identity record from the identities service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzIdentity {
    pub id: String,
    #[serde(default)]
    pub provider_display_name: Option<String>,
    #[serde(default)]
    pub custom_display_name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    /// Property bag; values are wrapped as `{ "$type": .., "$value": .. }`.
    #[serde(default)]
    pub properties: Option<Value>,
}

// =============================================================================
// Projects
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzProject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub last_update_time: Option<String>,
    #[serde(default)]
    pub default_team: Option<AzNamedRef>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Any `{ id, name }` reference.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzNamedRef {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
}

impl AzNamedRef {
    /// The id as a number. Ids arrive as numbers or numeric strings.
    pub fn numeric_id(&self) -> Option<u64> {
        match &self.id {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzTeam {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// Work items
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzWorkItem {
    pub id: u64,
    #[serde(default)]
    pub rev: u64,
    #[serde(default)]
    pub fields: serde_json::Map<String, Value>,
    #[serde(default)]
    pub relations: Option<Vec<AzRelation>>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzRelation {
    pub rel: String,
    pub url: String,
    #[serde(default)]
    pub attributes: Option<serde_json::Map<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzWiqlResult {
    #[serde(default)]
    pub work_items: Vec<AzWorkItemRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzWorkItemRef {
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzCommentList {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub comments: Vec<AzComment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzComment {
    pub id: u64,
    #[serde(default)]
    pub work_item_id: u64,
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub created_by: Option<AzIdentityRef>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub modified_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzWorkItemDelete {
    pub id: u64,
    #[serde(default)]
    pub deleted_date: Option<String>,
    #[serde(default)]
    pub deleted_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzAttachmentRef {
    pub id: String,
    pub url: String,
}

// =============================================================================
// Git
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzRepository {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub project: Option<AzNamedRef>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub is_disabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzRef {
    pub name: String,
    pub object_id: String,
    #[serde(default)]
    pub creator: Option<AzIdentityRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzCommit {
    pub commit_id: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub author: Option<AzGitUserDate>,
    #[serde(default)]
    pub remote_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzGitUserDate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzPullRequest {
    pub pull_request_id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: String,
    pub source_ref_name: String,
    pub target_ref_name: String,
    #[serde(default)]
    pub created_by: Option<AzIdentityRef>,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub closed_date: Option<String>,
    #[serde(default)]
    pub is_draft: Option<bool>,
    #[serde(default)]
    pub merge_status: Option<String>,
    #[serde(default)]
    pub reviewers: Vec<AzReviewer>,
    #[serde(default)]
    pub repository: Option<AzNamedRef>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzReviewer {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub unique_name: Option<String>,
    #[serde(default)]
    pub vote: i32,
    #[serde(default)]
    pub is_required: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePullRequestRequest {
    pub source_ref_name: String,
    pub target_ref_name: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_draft: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reviewers: Vec<ReviewerId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewerId {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzThread {
    pub id: u64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub thread_context: Option<AzThreadContext>,
    #[serde(default)]
    pub comments: Vec<AzThreadComment>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub is_deleted: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzThreadContext {
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_file_start: Option<AzFilePosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_file_end: Option<AzFilePosition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzFilePosition {
    pub line: u64,
    #[serde(default = "first_offset")]
    pub offset: u64,
}

fn first_offset() -> u64 {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzThreadComment {
    pub id: u64,
    #[serde(default)]
    pub author: Option<AzIdentityRef>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub comment_type: Option<String>,
    #[serde(default)]
    pub is_deleted: Option<bool>,
}

// =============================================================================
// Pipelines & builds
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AzPipeline {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub revision: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzPipelineRun {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub state: String,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub pipeline: Option<AzNamedRef>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub finished_date: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzBuild {
    pub id: u64,
    #[serde(default)]
    pub build_number: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub definition: Option<AzNamedRef>,
    #[serde(default)]
    pub source_branch: Option<String>,
    #[serde(default)]
    pub source_version: Option<String>,
    #[serde(default)]
    pub requested_for: Option<AzIdentityRef>,
    #[serde(default)]
    pub queue_time: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub finish_time: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzBuildLog {
    pub id: u64,
    #[serde(default)]
    pub line_count: Option<u64>,
    #[serde(default)]
    pub created_on: Option<String>,
    #[serde(default)]
    pub last_changed_on: Option<String>,
}

// =============================================================================
// Releases
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzReleaseDefinition {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub release_name_format: Option<String>,
    #[serde(default)]
    pub modified_on: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzRelease {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub release_definition: Option<AzNamedRef>,
    #[serde(default)]
    pub created_by: Option<AzIdentityRef>,
    #[serde(default)]
    pub created_on: Option<String>,
    #[serde(default)]
    pub environments: Vec<AzReleaseEnvironment>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzReleaseEnvironment {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReleaseRequest {
    pub definition_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_draft: bool,
}

// =============================================================================
// Wiki
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzWiki {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub wiki_type: Option<String>,
    #[serde(default)]
    pub mapped_path: Option<String>,
    #[serde(default)]
    pub remote_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzWikiPage {
    pub path: String,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub git_item_path: Option<String>,
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub is_parent_page: Option<bool>,
    #[serde(default)]
    pub sub_pages: Vec<AzWikiPage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WikiPageContent<'a> {
    pub content: &'a str,
}

// =============================================================================
// Boards & iterations
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AzBoardRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzBoard {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub columns: Vec<AzBoardColumn>,
    #[serde(default)]
    pub rows: Vec<AzBoardRow>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzBoardColumn {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub column_type: Option<String>,
    #[serde(default)]
    pub item_limit: Option<u64>,
    #[serde(default)]
    pub is_split: Option<bool>,
    #[serde(default)]
    pub state_mappings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzBoardRow {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AzIteration {
    pub id: String,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub attributes: Option<AzIterationAttributes>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzIterationAttributes {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub finish_date: Option<String>,
    #[serde(default)]
    pub time_frame: Option<String>,
}
