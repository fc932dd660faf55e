//! In-memory `DevOpsClient` that records every call, for dispatcher and tool tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use azdo_core::provider::{work_item_api_url, work_item_web_url};
use azdo_core::*;

pub const ORG_URL: &str = "https://dev.azure.com/contoso";
pub const PROJECT: &str = "Fabrikam";

/// Behaviour forced onto one client method.
#[derive(Debug, Clone)]
pub enum Scripted {
    NotFound(&'static str),
    Api(u16, &'static str),
    Panic(&'static str),
    PanicOwned(String),
    PanicOther,
}

pub struct MockClient {
    default_project: Option<String>,
    calls: Mutex<Vec<String>>,
    scripts: HashMap<&'static str, Scripted>,
    query_ids: Vec<u64>,
    file_bytes: Vec<u8>,
    build_log: String,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            default_project: Some(PROJECT.to_string()),
            calls: Mutex::new(Vec::new()),
            scripts: HashMap::new(),
            query_ids: vec![3, 1, 2],
            file_bytes: b"fn main() {}\n".to_vec(),
            build_log: (1..=5).map(|i| format!("line {i}\n")).collect(),
        }
    }

    pub fn without_default_project(mut self) -> Self {
        self.default_project = None;
        self
    }

    pub fn script(mut self, method: &'static str, behaviour: Scripted) -> Self {
        self.scripts.insert(method, behaviour);
        self
    }

    pub fn with_query_ids(mut self, ids: Vec<u64>) -> Self {
        self.query_ids = ids;
        self
    }

    pub fn with_file_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.file_bytes = bytes;
        self
    }

    /// Recorded calls as `method(arg, ..)`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded method names only.
    pub fn methods(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|c| c.split('(').next().unwrap_or_default().to_string())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, method: &'static str, args: String) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{method}({args})"));
        match self.scripts.get(method).cloned() {
            None => Ok(()),
            Some(Scripted::NotFound(message)) => Err(Error::NotFound(message.to_string())),
            Some(Scripted::Api(status, message)) => Err(Error::from_status(status, message)),
            Some(Scripted::Panic(message)) => panic!("{}", message),
            Some(Scripted::PanicOwned(message)) => std::panic::panic_any(message),
            Some(Scripted::PanicOther) => std::panic::panic_any(42_u32),
        }
    }
}

pub fn sample_work_item(project: &str, id: u64) -> WorkItem {
    WorkItem {
        id,
        rev: 3,
        title: format!("Work item {id}"),
        work_item_type: "Bug".to_string(),
        state: "Active".to_string(),
        description: Some("<p>Steps&nbsp;to <b>reproduce</b></p><ul><li>Open</li><li>Click</li></ul>".to_string()),
        acceptance_criteria: Some("<div>Works &amp; passes</div>".to_string()),
        repro_steps: Some("plain repro".to_string()),
        tags: vec!["ui".to_string()],
        relations: vec![
            WorkItemRelation {
                rel: "System.LinkTypes.Related".to_string(),
                url: work_item_api_url(ORG_URL, id + 100),
                target_id: Some(id + 100),
                ..Default::default()
            },
            WorkItemRelation {
                rel: "AttachedFile".to_string(),
                url: format!("{ORG_URL}/_apis/wit/attachments/abc"),
                name: Some("log.txt".to_string()),
                ..Default::default()
            },
        ],
        url: Some(work_item_web_url(ORG_URL, project, id)),
        ..Default::default()
    }
}

fn sample_comment(work_item_id: u64, id: u64, text: &str) -> WorkItemComment {
    WorkItemComment {
        id,
        work_item_id,
        version: Some(1),
        text: Some(text.to_string()),
        ..Default::default()
    }
}

fn sample_pull_request(id: u64, title: &str) -> PullRequest {
    PullRequest {
        id,
        title: title.to_string(),
        status: "active".to_string(),
        source_branch: "feature/login".to_string(),
        target_branch: "main".to_string(),
        ..Default::default()
    }
}

fn sample_build(id: u64) -> Build {
    Build {
        id,
        build_number: format!("2024.{id}"),
        status: "completed".to_string(),
        result: Some("succeeded".to_string()),
        ..Default::default()
    }
}

fn sample_release(id: u64) -> Release {
    Release {
        id,
        name: format!("Release-{id}"),
        status: "active".to_string(),
        ..Default::default()
    }
}

fn sample_user(id: &str, name: &str) -> User {
    User {
        id: id.to_string(),
        display_name: name.to_string(),
        ..Default::default()
    }
}

#[async_trait]
impl ProjectProvider for MockClient {
    async fn list_projects(&self, top: u32) -> Result<Vec<Project>> {
        self.record("list_projects", format!("{top}"))?;
        Ok(vec![Project {
            id: "p1".to_string(),
            name: PROJECT.to_string(),
            ..Default::default()
        }])
    }

    async fn get_project(&self, project: &str) -> Result<Project> {
        self.record("get_project", project.to_string())?;
        Ok(Project {
            id: "p1".to_string(),
            name: project.to_string(),
            ..Default::default()
        })
    }

    async fn list_teams(&self, project: &str) -> Result<Vec<Team>> {
        self.record("list_teams", project.to_string())?;
        Ok(vec![Team {
            id: "t1".to_string(),
            name: format!("{project} Team"),
            description: None,
        }])
    }
}

#[async_trait]
impl WorkItemProvider for MockClient {
    async fn get_work_item(&self, project: &str, id: u64) -> Result<WorkItem> {
        self.record("get_work_item", format!("{project}, {id}"))?;
        Ok(sample_work_item(project, id))
    }

    async fn get_work_items(&self, project: &str, ids: &[u64]) -> Result<Vec<WorkItem>> {
        let joined: Vec<String> = ids.iter().map(u64::to_string).collect();
        self.record("get_work_items", format!("{project}, [{}]", joined.join(",")))?;
        Ok(ids.iter().map(|id| sample_work_item(project, *id)).collect())
    }

    async fn query_work_items(&self, project: &str, wiql: &str, top: u32) -> Result<Vec<u64>> {
        self.record("query_work_items", format!("{project}, {wiql}, {top}"))?;
        Ok(self.query_ids.iter().take(top as usize).copied().collect())
    }

    async fn create_work_item(
        &self,
        project: &str,
        input: &CreateWorkItemInput,
    ) -> Result<WorkItem> {
        self.record(
            "create_work_item",
            format!("{project}, {}, {}", input.work_item_type, input.title),
        )?;
        Ok(WorkItem {
            id: 500,
            rev: 1,
            title: input.title.clone(),
            work_item_type: input.work_item_type.clone(),
            state: "New".to_string(),
            description: input.description.clone(),
            parent_id: input.parent_id,
            tags: input.tags.clone(),
            url: Some(work_item_web_url(ORG_URL, project, 500)),
            ..Default::default()
        })
    }

    async fn update_work_item(
        &self,
        project: &str,
        id: u64,
        input: &UpdateWorkItemInput,
    ) -> Result<WorkItem> {
        self.record("update_work_item", format!("{project}, {id}"))?;
        let mut item = sample_work_item(project, id);
        item.rev += 1;
        if let Some(title) = &input.title {
            item.title = title.clone();
        }
        if let Some(state) = &input.state {
            item.state = state.clone();
        }
        Ok(item)
    }

    async fn delete_work_item(
        &self,
        project: &str,
        id: u64,
        destroy: bool,
    ) -> Result<DeletedWorkItem> {
        self.record("delete_work_item", format!("{project}, {id}, {destroy}"))?;
        Ok(DeletedWorkItem {
            id,
            destroyed: destroy,
            ..Default::default()
        })
    }

    async fn get_work_item_comments(
        &self,
        project: &str,
        id: u64,
        top: u32,
    ) -> Result<Vec<WorkItemComment>> {
        self.record("get_work_item_comments", format!("{project}, {id}, {top}"))?;
        Ok(vec![
            sample_comment(id, 1, "<p>First &amp; foremost</p>"),
            sample_comment(id, 2, "Looks good"),
        ])
    }

    async fn add_work_item_comment(
        &self,
        project: &str,
        id: u64,
        text: &str,
    ) -> Result<WorkItemComment> {
        self.record("add_work_item_comment", format!("{project}, {id}"))?;
        Ok(sample_comment(id, 9, text))
    }

    async fn add_work_item_relation(
        &self,
        project: &str,
        id: u64,
        relation: &NewRelation,
    ) -> Result<WorkItem> {
        self.record(
            "add_work_item_relation",
            format!("{project}, {id}, {}, {}", relation.rel, relation.url),
        )?;
        let mut item = sample_work_item(project, id);
        item.rev += 1;
        Ok(item)
    }

    async fn upload_attachment(
        &self,
        project: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<AttachmentRef> {
        self.record(
            "upload_attachment",
            format!("{project}, {file_name}, {} bytes", content.len()),
        )?;
        Ok(AttachmentRef {
            id: "att-1".to_string(),
            url: format!("{ORG_URL}/_apis/wit/attachments/att-1"),
        })
    }

    async fn get_work_item_revisions(
        &self,
        project: &str,
        id: u64,
        top: u32,
    ) -> Result<Vec<WorkItemRevision>> {
        self.record("get_work_item_revisions", format!("{project}, {id}, {top}"))?;
        Ok(vec![
            WorkItemRevision {
                rev: 1,
                title: Some("Draft".to_string()),
                description: Some("<p>v1</p>".to_string()),
                ..Default::default()
            },
            WorkItemRevision {
                rev: 2,
                title: Some("Final".to_string()),
                description: None,
                ..Default::default()
            },
        ])
    }
}

#[async_trait]
impl GitProvider for MockClient {
    async fn list_repositories(&self, project: &str) -> Result<Vec<Repository>> {
        self.record("list_repositories", project.to_string())?;
        Ok(vec![Repository {
            id: "r1".to_string(),
            name: "web".to_string(),
            default_branch: Some("main".to_string()),
            ..Default::default()
        }])
    }

    async fn get_repository(&self, project: &str, repository: &str) -> Result<Repository> {
        self.record("get_repository", format!("{project}, {repository}"))?;
        Ok(Repository {
            id: "r1".to_string(),
            name: repository.to_string(),
            ..Default::default()
        })
    }

    async fn list_branches(&self, project: &str, repository: &str) -> Result<Vec<Branch>> {
        self.record("list_branches", format!("{project}, {repository}"))?;
        Ok(vec![Branch {
            name: "main".to_string(),
            object_id: "abc".to_string(),
            creator: None,
        }])
    }

    async fn get_file_bytes(
        &self,
        project: &str,
        repository: &str,
        path: &str,
        branch: Option<&str>,
    ) -> Result<Vec<u8>> {
        self.record(
            "get_file_bytes",
            format!("{project}, {repository}, {path}, {}", branch.unwrap_or("-")),
        )?;
        Ok(self.file_bytes.clone())
    }

    async fn list_commits(
        &self,
        project: &str,
        repository: &str,
        branch: Option<&str>,
        top: u32,
    ) -> Result<Vec<Commit>> {
        self.record(
            "list_commits",
            format!("{project}, {repository}, {}, {top}", branch.unwrap_or("-")),
        )?;
        Ok(vec![Commit {
            commit_id: "abc123".to_string(),
            comment: "Initial commit".to_string(),
            ..Default::default()
        }])
    }

    async fn list_pull_requests(
        &self,
        project: &str,
        repository: &str,
        filter: &PullRequestFilter,
    ) -> Result<Vec<PullRequest>> {
        self.record(
            "list_pull_requests",
            format!(
                "{project}, {repository}, {}, {}",
                filter.status.as_deref().unwrap_or("-"),
                filter.top
            ),
        )?;
        Ok(vec![sample_pull_request(1, "Add login")])
    }

    async fn get_pull_request(
        &self,
        project: &str,
        repository: &str,
        id: u64,
    ) -> Result<PullRequest> {
        self.record("get_pull_request", format!("{project}, {repository}, {id}"))?;
        Ok(sample_pull_request(id, "Add login"))
    }

    async fn create_pull_request(
        &self,
        project: &str,
        repository: &str,
        input: &CreatePullRequestInput,
    ) -> Result<PullRequest> {
        self.record(
            "create_pull_request",
            format!(
                "{project}, {repository}, {} -> {}",
                input.source_branch, input.target_branch
            ),
        )?;
        let mut pr = sample_pull_request(77, &input.title);
        pr.is_draft = input.is_draft;
        Ok(pr)
    }

    async fn list_pull_request_threads(
        &self,
        project: &str,
        repository: &str,
        id: u64,
    ) -> Result<Vec<PullRequestThread>> {
        self.record(
            "list_pull_request_threads",
            format!("{project}, {repository}, {id}"),
        )?;
        Ok(vec![PullRequestThread {
            id: 5,
            status: Some("active".to_string()),
            comments: vec![ThreadComment {
                id: 1,
                content: Some("Nit".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }])
    }

    async fn create_pull_request_thread(
        &self,
        project: &str,
        repository: &str,
        id: u64,
        input: &CreateThreadInput,
    ) -> Result<PullRequestThread> {
        self.record(
            "create_pull_request_thread",
            format!(
                "{project}, {repository}, {id}, {}:{}",
                input.file_path.as_deref().unwrap_or("-"),
                input.line.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string())
            ),
        )?;
        Ok(PullRequestThread {
            id: 6,
            file_path: input.file_path.clone(),
            line: input.line,
            comments: vec![ThreadComment {
                id: 1,
                content: Some(input.content.clone()),
                ..Default::default()
            }],
            ..Default::default()
        })
    }
}

#[async_trait]
impl PipelineProvider for MockClient {
    async fn list_pipelines(&self, project: &str, top: u32) -> Result<Vec<Pipeline>> {
        self.record("list_pipelines", format!("{project}, {top}"))?;
        Ok(vec![Pipeline {
            id: 12,
            name: "web-ci".to_string(),
            ..Default::default()
        }])
    }

    async fn list_builds(&self, project: &str, filter: &BuildFilter) -> Result<Vec<Build>> {
        self.record(
            "list_builds",
            format!(
                "{project}, {}, {}",
                filter.status.as_deref().unwrap_or("-"),
                filter.top
            ),
        )?;
        Ok(vec![sample_build(100), sample_build(99)])
    }

    async fn get_build(&self, project: &str, build_id: u64) -> Result<Build> {
        self.record("get_build", format!("{project}, {build_id}"))?;
        Ok(sample_build(build_id))
    }

    async fn run_pipeline(
        &self,
        project: &str,
        pipeline_id: u64,
        input: &RunPipelineInput,
    ) -> Result<PipelineRun> {
        self.record(
            "run_pipeline",
            format!(
                "{project}, {pipeline_id}, {}",
                input.branch.as_deref().unwrap_or("-")
            ),
        )?;
        Ok(PipelineRun {
            id: 300,
            name: "20240101.1".to_string(),
            state: "inProgress".to_string(),
            pipeline_id: Some(pipeline_id),
            ..Default::default()
        })
    }

    async fn list_build_logs(&self, project: &str, build_id: u64) -> Result<Vec<BuildLog>> {
        self.record("list_build_logs", format!("{project}, {build_id}"))?;
        Ok(vec![BuildLog {
            id: 1,
            line_count: Some(5),
            ..Default::default()
        }])
    }

    async fn get_build_log(&self, project: &str, build_id: u64, log_id: u64) -> Result<String> {
        self.record("get_build_log", format!("{project}, {build_id}, {log_id}"))?;
        Ok(self.build_log.clone())
    }
}

#[async_trait]
impl ReleaseProvider for MockClient {
    async fn list_release_definitions(&self, project: &str) -> Result<Vec<ReleaseDefinition>> {
        self.record("list_release_definitions", project.to_string())?;
        Ok(vec![ReleaseDefinition {
            id: 4,
            name: "web-cd".to_string(),
            ..Default::default()
        }])
    }

    async fn list_releases(
        &self,
        project: &str,
        definition_id: Option<u64>,
        top: u32,
    ) -> Result<Vec<Release>> {
        self.record(
            "list_releases",
            format!(
                "{project}, {}, {top}",
                definition_id.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
            ),
        )?;
        Ok(vec![sample_release(31)])
    }

    async fn get_release(&self, project: &str, release_id: u64) -> Result<Release> {
        self.record("get_release", format!("{project}, {release_id}"))?;
        Ok(sample_release(release_id))
    }

    async fn create_release(&self, project: &str, input: &CreateReleaseInput) -> Result<Release> {
        self.record(
            "create_release",
            format!("{project}, {}, {}", input.definition_id, input.is_draft),
        )?;
        let mut release = sample_release(32);
        release.definition_id = Some(input.definition_id);
        release.description = input.description.clone();
        Ok(release)
    }
}

#[async_trait]
impl WikiProvider for MockClient {
    async fn list_wikis(&self, project: &str) -> Result<Vec<Wiki>> {
        self.record("list_wikis", project.to_string())?;
        Ok(vec![Wiki {
            id: "w1".to_string(),
            name: format!("{project}.wiki"),
            wiki_type: Some("projectWiki".to_string()),
            ..Default::default()
        }])
    }

    async fn list_wiki_pages(
        &self,
        project: &str,
        wiki: &str,
        path: &str,
    ) -> Result<Vec<WikiPageSummary>> {
        self.record("list_wiki_pages", format!("{project}, {wiki}, {path}"))?;
        Ok(vec![
            WikiPageSummary {
                path: "/".to_string(),
                id: None,
                is_parent_page: true,
            },
            WikiPageSummary {
                path: "/FAQ".to_string(),
                id: Some(4),
                is_parent_page: false,
            },
        ])
    }

    async fn get_wiki_page(
        &self,
        project: &str,
        wiki: &str,
        path: &str,
        include_content: bool,
    ) -> Result<WikiPage> {
        self.record(
            "get_wiki_page",
            format!("{project}, {wiki}, {path}, {include_content}"),
        )?;
        Ok(WikiPage {
            path: path.to_string(),
            id: Some(4),
            content: include_content.then(|| "# Existing".to_string()),
            etag: Some("\"v1\"".to_string()),
            ..Default::default()
        })
    }

    async fn put_wiki_page(
        &self,
        project: &str,
        wiki: &str,
        path: &str,
        content: &str,
        etag: Option<&str>,
    ) -> Result<WikiPage> {
        self.record(
            "put_wiki_page",
            format!("{project}, {wiki}, {path}, {}", etag.unwrap_or("-")),
        )?;
        Ok(WikiPage {
            path: path.to_string(),
            id: Some(4),
            content: Some(content.to_string()),
            etag: Some("\"v2\"".to_string()),
            ..Default::default()
        })
    }
}

#[async_trait]
impl BoardProvider for MockClient {
    async fn list_boards(&self, project: &str, team: &str) -> Result<Vec<Board>> {
        self.record("list_boards", format!("{project}, {team}"))?;
        Ok(vec![Board {
            id: "b1".to_string(),
            name: "Stories".to_string(),
            ..Default::default()
        }])
    }

    async fn get_board(&self, project: &str, team: &str, board: &str) -> Result<Board> {
        self.record("get_board", format!("{project}, {team}, {board}"))?;
        Ok(Board {
            id: "b1".to_string(),
            name: board.to_string(),
            columns: vec![BoardColumn {
                id: "c1".to_string(),
                name: "New".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        })
    }

    async fn list_iterations(
        &self,
        project: &str,
        team: &str,
        timeframe: Option<&str>,
    ) -> Result<Vec<Iteration>> {
        self.record(
            "list_iterations",
            format!("{project}, {team}, {}", timeframe.unwrap_or("-")),
        )?;
        Ok(vec![Iteration {
            id: "i1".to_string(),
            name: "Sprint 1".to_string(),
            path: format!("{project}\\Sprint 1"),
            time_frame: timeframe.map(str::to_string),
            ..Default::default()
        }])
    }
}

#[async_trait]
impl UserProvider for MockClient {
    async fn get_current_user(&self) -> Result<User> {
        self.record("get_current_user", String::new())?;
        Ok(sample_user("me", "Jane Doe"))
    }

    async fn search_users(&self, query: &str, top: u32) -> Result<Vec<User>> {
        self.record("search_users", format!("{query}, {top}"))?;
        Ok(vec![sample_user("u1", "Jane Doe"), sample_user("u2", "Janet Roe")])
    }
}

#[async_trait]
impl DevOpsClient for MockClient {
    fn organization_url(&self) -> &str {
        ORG_URL
    }

    fn default_project(&self) -> Option<&str> {
        self.default_project.as_deref()
    }
}
