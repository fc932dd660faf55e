//! Git repositories and pull requests (`_apis/git`).

use async_trait::async_trait;
use azdo_core::{
    Branch, Commit, CreatePullRequestInput, CreateThreadInput, GitProvider, PullRequest,
    PullRequestFilter, PullRequestThread, Repository, Result, Reviewer, ThreadComment,
};
use serde_json::json;

use crate::client::{full_ref, identity_name, iso_date, map_identity, short_ref, AzureDevOpsClient};
use crate::types::{
    AzCommit, AzFilePosition, AzPullRequest, AzRef, AzRepository, AzThread, AzThreadContext,
    CreatePullRequestRequest, ListResponse, ReviewerId,
};

#[async_trait]
impl GitProvider for AzureDevOpsClient {
    async fn list_repositories(&self, project: &str) -> Result<Vec<Repository>> {
        let url = self.api_url(&[project], &["git", "repositories"], &[])?;
        let list: ListResponse<AzRepository> = self.get(url).await?;
        Ok(list.value.iter().map(map_repository).collect())
    }

    async fn get_repository(&self, project: &str, repository: &str) -> Result<Repository> {
        let url = self.api_url(&[project], &["git", "repositories", repository], &[])?;
        let repo: AzRepository = self.get(url).await?;
        Ok(map_repository(&repo))
    }

    async fn list_branches(&self, project: &str, repository: &str) -> Result<Vec<Branch>> {
        let url = self.api_url(
            &[project],
            &["git", "repositories", repository, "refs"],
            &[("filter", "heads/")],
        )?;
        let list: ListResponse<AzRef> = self.get(url).await?;
        Ok(list.value.iter().map(map_branch).collect())
    }

    async fn get_file_bytes(
        &self,
        project: &str,
        repository: &str,
        path: &str,
        branch: Option<&str>,
    ) -> Result<Vec<u8>> {
        let version = branch.map(short_ref);
        let mut query = vec![("path", path), ("$format", "octetStream"), ("download", "false")];
        if let Some(version) = version.as_deref() {
            query.push(("versionDescriptor.version", version));
            query.push(("versionDescriptor.versionType", "branch"));
        }
        let url = self.api_url(&[project], &["git", "repositories", repository, "items"], &query)?;
        self.get_bytes(url).await
    }

    async fn list_commits(
        &self,
        project: &str,
        repository: &str,
        branch: Option<&str>,
        top: u32,
    ) -> Result<Vec<Commit>> {
        let top_param = top.to_string();
        let version = branch.map(short_ref);
        let mut query = vec![("searchCriteria.$top", top_param.as_str())];
        if let Some(version) = version.as_deref() {
            query.push(("searchCriteria.itemVersion.version", version));
            query.push(("searchCriteria.itemVersion.versionType", "branch"));
        }
        let url = self.api_url(
            &[project],
            &["git", "repositories", repository, "commits"],
            &query,
        )?;
        let list: ListResponse<AzCommit> = self.get(url).await?;
        Ok(list.value.iter().take(top as usize).map(map_commit).collect())
    }

    async fn list_pull_requests(
        &self,
        project: &str,
        repository: &str,
        filter: &PullRequestFilter,
    ) -> Result<Vec<PullRequest>> {
        let top_param = filter.top.to_string();
        let source = filter.source_branch.as_deref().map(full_ref);
        let target = filter.target_branch.as_deref().map(full_ref);

        let mut query = vec![
            (
                "searchCriteria.status",
                filter.status.as_deref().unwrap_or("active"),
            ),
            ("$top", top_param.as_str()),
        ];
        if let Some(creator) = filter.creator_id.as_deref() {
            query.push(("searchCriteria.creatorId", creator));
        }
        if let Some(reviewer) = filter.reviewer_id.as_deref() {
            query.push(("searchCriteria.reviewerId", reviewer));
        }
        if let Some(source) = source.as_deref() {
            query.push(("searchCriteria.sourceRefName", source));
        }
        if let Some(target) = target.as_deref() {
            query.push(("searchCriteria.targetRefName", target));
        }

        let url = self.api_url(
            &[project],
            &["git", "repositories", repository, "pullrequests"],
            &query,
        )?;
        let list: ListResponse<AzPullRequest> = self.get(url).await?;
        Ok(list
            .value
            .iter()
            .take(filter.top as usize)
            .map(map_pull_request)
            .collect())
    }

    async fn get_pull_request(
        &self,
        project: &str,
        repository: &str,
        id: u64,
    ) -> Result<PullRequest> {
        let id = id.to_string();
        let url = self.api_url(
            &[project],
            &["git", "repositories", repository, "pullrequests", id.as_str()],
            &[],
        )?;
        let pr: AzPullRequest = self.get(url).await?;
        Ok(map_pull_request(&pr))
    }

    async fn create_pull_request(
        &self,
        project: &str,
        repository: &str,
        input: &CreatePullRequestInput,
    ) -> Result<PullRequest> {
        let url = self.api_url(
            &[project],
            &["git", "repositories", repository, "pullrequests"],
            &[],
        )?;
        let body = CreatePullRequestRequest {
            source_ref_name: full_ref(&input.source_branch),
            target_ref_name: full_ref(&input.target_branch),
            title: input.title.clone(),
            description: input.description.clone(),
            is_draft: input.is_draft,
            reviewers: input
                .reviewers
                .iter()
                .map(|id| ReviewerId { id: id.clone() })
                .collect(),
        };
        let pr: AzPullRequest = self.post(url, &body).await?;
        Ok(map_pull_request(&pr))
    }

    async fn list_pull_request_threads(
        &self,
        project: &str,
        repository: &str,
        id: u64,
    ) -> Result<Vec<PullRequestThread>> {
        let id = id.to_string();
        let url = self.api_url(
            &[project],
            &["git", "repositories", repository, "pullRequests", id.as_str(), "threads"],
            &[],
        )?;
        let list: ListResponse<AzThread> = self.get(url).await?;
        Ok(list
            .value
            .iter()
            .filter(|t| !t.is_deleted.unwrap_or(false))
            .map(map_thread)
            .filter(|t| !t.comments.is_empty())
            .collect())
    }

    async fn create_pull_request_thread(
        &self,
        project: &str,
        repository: &str,
        id: u64,
        input: &CreateThreadInput,
    ) -> Result<PullRequestThread> {
        let id = id.to_string();
        let url = self.api_url(
            &[project],
            &["git", "repositories", repository, "pullRequests", id.as_str(), "threads"],
            &[],
        )?;

        let mut body = json!({
            "comments": [{ "parentCommentId": 0, "content": input.content, "commentType": 1 }],
            "status": 1
        });
        if let Some(file_path) = &input.file_path {
            let position = input.line.map(|line| AzFilePosition { line, offset: 1 });
            let context = AzThreadContext {
                file_path: Some(file_path.clone()),
                right_file_start: position.clone(),
                right_file_end: position,
            };
            body["threadContext"] = serde_json::to_value(context)?;
        }

        let thread: AzThread = self.post(url, &body).await?;
        Ok(map_thread(&thread))
    }
}

// =============================================================================
// Mapping functions
// =============================================================================

fn map_repository(repo: &AzRepository) -> Repository {
    Repository {
        id: repo.id.clone(),
        name: repo.name.clone(),
        project: repo.project.as_ref().and_then(|p| p.name.clone()),
        default_branch: repo.default_branch.as_deref().map(short_ref),
        size: repo.size,
        remote_url: repo.remote_url.clone(),
        web_url: repo.web_url.clone(),
        is_disabled: repo.is_disabled,
    }
}

fn map_branch(reference: &AzRef) -> Branch {
    Branch {
        name: short_ref(&reference.name),
        object_id: reference.object_id.clone(),
        creator: identity_name(reference.creator.as_ref()),
    }
}

fn map_commit(commit: &AzCommit) -> Commit {
    let author = commit.author.as_ref();
    Commit {
        commit_id: commit.commit_id.clone(),
        comment: commit.comment.clone(),
        author: author.and_then(|a| a.name.clone()),
        author_email: author.and_then(|a| a.email.clone()),
        author_date: iso_date(author.and_then(|a| a.date.as_deref())),
        url: commit.remote_url.clone(),
    }
}

fn map_pull_request(pr: &AzPullRequest) -> PullRequest {
    PullRequest {
        id: pr.pull_request_id,
        title: pr.title.clone(),
        description: pr.description.clone(),
        status: pr.status.clone(),
        source_branch: short_ref(&pr.source_ref_name),
        target_branch: short_ref(&pr.target_ref_name),
        created_by: pr.created_by.as_ref().and_then(map_identity),
        creation_date: iso_date(pr.creation_date.as_deref()),
        closed_date: iso_date(pr.closed_date.as_deref()),
        is_draft: pr.is_draft.unwrap_or(false),
        merge_status: pr.merge_status.clone(),
        reviewers: pr
            .reviewers
            .iter()
            .map(|r| Reviewer {
                display_name: r.display_name.clone(),
                unique_name: r.unique_name.clone(),
                vote: r.vote,
                is_required: r.is_required,
            })
            .collect(),
        repository: pr.repository.as_ref().and_then(|r| r.name.clone()),
        url: pr.url.clone(),
    }
}

fn map_thread(thread: &AzThread) -> PullRequestThread {
    let context = thread.thread_context.as_ref();
    PullRequestThread {
        id: thread.id,
        status: thread.status.clone(),
        file_path: context.and_then(|c| c.file_path.clone()),
        line: context
            .and_then(|c| c.right_file_start.as_ref())
            .map(|p| p.line),
        comments: thread
            .comments
            .iter()
            .filter(|c| c.comment_type.as_deref() != Some("system"))
            .filter(|c| !c.is_deleted.unwrap_or(false))
            .map(|c| ThreadComment {
                id: c.id,
                author: identity_name(c.author.as_ref()),
                content: c.content.clone(),
                published_date: iso_date(c.published_date.as_deref()),
            })
            .collect(),
        published_date: iso_date(thread.published_date.as_deref()),
    }
}
