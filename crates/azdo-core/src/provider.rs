//! Domain client traits for Azure DevOps.
//!
//! Each functional area of Azure DevOps gets its own trait. [`DevOpsClient`]
//! ties them together with the organization-level context every tool needs:
//! the organization URL and the default project.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::*;

/// Projects and teams.
#[async_trait]
pub trait ProjectProvider: Send + Sync {
    /// List projects in the organization.
    async fn list_projects(&self, top: u32) -> Result<Vec<Project>>;

    /// Get a single project by name or id.
    async fn get_project(&self, project: &str) -> Result<Project>;

    /// List teams in a project.
    async fn list_teams(&self, project: &str) -> Result<Vec<Team>>;
}

/// Work item tracking.
#[async_trait]
pub trait WorkItemProvider: Send + Sync {
    async fn get_work_item(&self, project: &str, id: u64) -> Result<WorkItem>;

    /// Fetch several work items at once. Order follows `ids`.
    async fn get_work_items(&self, project: &str, ids: &[u64]) -> Result<Vec<WorkItem>>;

    /// Run a WIQL query and return the matching ids.
    async fn query_work_items(&self, project: &str, wiql: &str, top: u32) -> Result<Vec<u64>>;

    async fn create_work_item(
        &self,
        project: &str,
        input: &CreateWorkItemInput,
    ) -> Result<WorkItem>;

    async fn update_work_item(
        &self,
        project: &str,
        id: u64,
        input: &UpdateWorkItemInput,
    ) -> Result<WorkItem>;

    async fn delete_work_item(&self, project: &str, id: u64, destroy: bool)
        -> Result<DeletedWorkItem>;

    async fn get_work_item_comments(
        &self,
        project: &str,
        id: u64,
        top: u32,
    ) -> Result<Vec<WorkItemComment>>;

    async fn add_work_item_comment(
        &self,
        project: &str,
        id: u64,
        text: &str,
    ) -> Result<WorkItemComment>;

    /// Append a relation (link or attachment) to a work item.
    async fn add_work_item_relation(
        &self,
        project: &str,
        id: u64,
        relation: &NewRelation,
    ) -> Result<WorkItem>;

    /// Upload a file to the attachment store. The result is not linked yet.
    async fn upload_attachment(
        &self,
        project: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<AttachmentRef>;

    async fn get_work_item_revisions(
        &self,
        project: &str,
        id: u64,
        top: u32,
    ) -> Result<Vec<WorkItemRevision>>;
}

/// Git repositories and pull requests.
#[async_trait]
pub trait GitProvider: Send + Sync {
    async fn list_repositories(&self, project: &str) -> Result<Vec<Repository>>;

    async fn get_repository(&self, project: &str, repository: &str) -> Result<Repository>;

    async fn list_branches(&self, project: &str, repository: &str) -> Result<Vec<Branch>>;

    /// Raw bytes of a file at a branch (default branch when `branch` is `None`).
    async fn get_file_bytes(
        &self,
        project: &str,
        repository: &str,
        path: &str,
        branch: Option<&str>,
    ) -> Result<Vec<u8>>;

    async fn list_commits(
        &self,
        project: &str,
        repository: &str,
        branch: Option<&str>,
        top: u32,
    ) -> Result<Vec<Commit>>;

    async fn list_pull_requests(
        &self,
        project: &str,
        repository: &str,
        filter: &PullRequestFilter,
    ) -> Result<Vec<PullRequest>>;

    async fn get_pull_request(
        &self,
        project: &str,
        repository: &str,
        id: u64,
    ) -> Result<PullRequest>;

    async fn create_pull_request(
        &self,
        project: &str,
        repository: &str,
        input: &CreatePullRequestInput,
    ) -> Result<PullRequest>;

    async fn list_pull_request_threads(
        &self,
        project: &str,
        repository: &str,
        id: u64,
    ) -> Result<Vec<PullRequestThread>>;

    async fn create_pull_request_thread(
        &self,
        project: &str,
        repository: &str,
        id: u64,
        input: &CreateThreadInput,
    ) -> Result<PullRequestThread>;
}

/// Pipelines, builds, and build logs.
#[async_trait]
pub trait PipelineProvider: Send + Sync {
    async fn list_pipelines(&self, project: &str, top: u32) -> Result<Vec<Pipeline>>;

    async fn list_builds(&self, project: &str, filter: &BuildFilter) -> Result<Vec<Build>>;

    async fn get_build(&self, project: &str, build_id: u64) -> Result<Build>;

    async fn run_pipeline(
        &self,
        project: &str,
        pipeline_id: u64,
        input: &RunPipelineInput,
    ) -> Result<PipelineRun>;

    async fn list_build_logs(&self, project: &str, build_id: u64) -> Result<Vec<BuildLog>>;

    /// Plain text of one build log.
    async fn get_build_log(&self, project: &str, build_id: u64, log_id: u64) -> Result<String>;
}

/// Classic release management.
#[async_trait]
pub trait ReleaseProvider: Send + Sync {
    async fn list_release_definitions(&self, project: &str) -> Result<Vec<ReleaseDefinition>>;

    async fn list_releases(
        &self,
        project: &str,
        definition_id: Option<u64>,
        top: u32,
    ) -> Result<Vec<Release>>;

    async fn get_release(&self, project: &str, release_id: u64) -> Result<Release>;

    async fn create_release(&self, project: &str, input: &CreateReleaseInput) -> Result<Release>;
}

/// Project and code wikis.
#[async_trait]
pub trait WikiProvider: Send + Sync {
    async fn list_wikis(&self, project: &str) -> Result<Vec<Wiki>>;

    /// Every page below `path`, flattened depth-first.
    async fn list_wiki_pages(
        &self,
        project: &str,
        wiki: &str,
        path: &str,
    ) -> Result<Vec<WikiPageSummary>>;

    async fn get_wiki_page(
        &self,
        project: &str,
        wiki: &str,
        path: &str,
        include_content: bool,
    ) -> Result<WikiPage>;

    /// Create a page (`etag` is `None`) or replace one at the given version.
    async fn put_wiki_page(
        &self,
        project: &str,
        wiki: &str,
        path: &str,
        content: &str,
        etag: Option<&str>,
    ) -> Result<WikiPage>;
}

/// Team boards and iterations.
#[async_trait]
pub trait BoardProvider: Send + Sync {
    async fn list_boards(&self, project: &str, team: &str) -> Result<Vec<Board>>;

    async fn get_board(&self, project: &str, team: &str, board: &str) -> Result<Board>;

    async fn list_iterations(
        &self,
        project: &str,
        team: &str,
        timeframe: Option<&str>,
    ) -> Result<Vec<Iteration>>;
}

/// Users and identities.
#[async_trait]
pub trait UserProvider: Send + Sync {
    /// The identity the credential authenticates as.
    async fn get_current_user(&self) -> Result<User>;

    async fn search_users(&self, query: &str, top: u32) -> Result<Vec<User>>;
}

/// Authenticated access to one Azure DevOps organization.
#[async_trait]
pub trait DevOpsClient:
    ProjectProvider
    + WorkItemProvider
    + GitProvider
    + PipelineProvider
    + ReleaseProvider
    + WikiProvider
    + BoardProvider
    + UserProvider
{
    /// Organization base URL, e.g. `https://dev.azure.com/contoso`.
    fn organization_url(&self) -> &str;

    /// Project used when a tool call does not name one.
    fn default_project(&self) -> Option<&str>;

    /// Pick the explicit project if given, else the configured default.
    fn resolve_project(&self, project: Option<&str>) -> Result<String> {
        match project.map(str::trim).filter(|p| !p.is_empty()) {
            Some(project) => Ok(project.to_string()),
            None => self.default_project().map(str::to_string).ok_or_else(|| {
                Error::Validation(
                    "field `project` is required: no default project is configured".to_string(),
                )
            }),
        }
    }

    /// Check that the organization is reachable and the credential works.
    async fn validate_connection(&self) -> Result<User> {
        self.get_current_user().await
    }
}

/// Build the browser URL of a work item.
pub fn work_item_web_url(organization_url: &str, project: &str, id: u64) -> String {
    format!(
        "{}/{}/_workitems/edit/{}",
        organization_url.trim_end_matches('/'),
        project,
        id
    )
}

/// Build the REST URL of a work item, as used in relation targets.
pub fn work_item_api_url(organization_url: &str, id: u64) -> String {
    format!(
        "{}/_apis/wit/workItems/{}",
        organization_url.trim_end_matches('/'),
        id
    )
}

/// Extract the work item id from a relation target URL.
pub fn work_item_id_from_url(url: &str) -> Option<u64> {
    let (prefix, id) = url.trim_end_matches('/').rsplit_once('/')?;
    if !prefix.to_ascii_lowercase().ends_with("/_apis/wit/workitems") {
        return None;
    }
    id.parse().ok()
}

/// Well-known work item fields lifted out of the raw field map.
pub const STANDARD_FIELDS: &[&str] = &[
    "System.Id",
    "System.Rev",
    "System.Title",
    "System.WorkItemType",
    "System.State",
    "System.Reason",
    "System.AssignedTo",
    "System.CreatedBy",
    "System.CreatedDate",
    "System.ChangedDate",
    "System.AreaPath",
    "System.IterationPath",
    "System.Tags",
    "System.Description",
    "System.Parent",
    "System.TeamProject",
    "Microsoft.VSTS.Common.Priority",
    "Microsoft.VSTS.Common.AcceptanceCriteria",
    "Microsoft.VSTS.TCM.ReproSteps",
];

/// Split the `System.Tags` value (`"a; b"`) into tags.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join tags into the `System.Tags` representation.
pub fn join_tags(tags: &[String]) -> String {
    tags.join("; ")
}

/// Keep only fields that are not already lifted into [`WorkItem`].
pub fn custom_fields(
    fields: &serde_json::Map<String, serde_json::Value>,
) -> BTreeMap<String, serde_json::Value> {
    fields
        .iter()
        .filter(|(k, _)| !STANDARD_FIELDS.contains(&k.as_str()) && !k.starts_with("System."))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_and_join_tags() {
        assert_eq!(split_tags("ui; backend ;; "), vec!["ui", "backend"]);
        assert!(split_tags("").is_empty());
        assert_eq!(
            join_tags(&["a".to_string(), "b".to_string()]),
            "a; b".to_string()
        );
    }

    #[test]
    fn test_work_item_web_url() {
        assert_eq!(
            work_item_web_url("https://dev.azure.com/contoso/", "Fabrikam", 42),
            "https://dev.azure.com/contoso/Fabrikam/_workitems/edit/42"
        );
    }

    #[test]
    fn test_work_item_api_url_round_trips_id() {
        let url = work_item_api_url("https://dev.azure.com/contoso", 7);
        assert_eq!(url, "https://dev.azure.com/contoso/_apis/wit/workItems/7");
        assert_eq!(work_item_id_from_url(&url), Some(7));
        assert_eq!(
            work_item_id_from_url("https://dev.azure.com/contoso/_apis/wit/attachments/abc"),
            None
        );
    }

    #[test]
    fn test_custom_fields_filters_standard_and_system() {
        let fields = serde_json::json!({
            "System.Title": "x",
            "System.BoardColumn": "Doing",
            "Microsoft.VSTS.Common.Priority": 2,
            "Microsoft.VSTS.Scheduling.StoryPoints": 5,
            "Custom.Team": "Blue"
        });
        let custom = custom_fields(fields.as_object().unwrap());
        assert_eq!(custom.len(), 2);
        assert!(custom.contains_key("Microsoft.VSTS.Scheduling.StoryPoints"));
        assert!(custom.contains_key("Custom.Team"));
    }
}
