//! Pipelines, builds, and build logs (`_apis/pipelines`, `_apis/build`).

use async_trait::async_trait;
use azdo_core::{
    Build, BuildFilter, BuildLog, Pipeline, PipelineProvider, PipelineRun, Result,
    RunPipelineInput,
};
use serde_json::{json, Map, Value};

use crate::client::{full_ref, identity_name, iso_date, short_ref, AzureDevOpsClient};
use crate::types::{AzBuild, AzBuildLog, AzPipeline, AzPipelineRun, ListResponse};

#[async_trait]
impl PipelineProvider for AzureDevOpsClient {
    async fn list_pipelines(&self, project: &str, top: u32) -> Result<Vec<Pipeline>> {
        let top_param = top.to_string();
        let url = self.api_url(&[project], &["pipelines"], &[("$top", top_param.as_str())])?;
        let list: ListResponse<AzPipeline> = self.get(url).await?;
        Ok(list
            .value
            .into_iter()
            .take(top as usize)
            .map(|p| Pipeline {
                id: p.id,
                name: p.name,
                folder: p.folder,
                revision: p.revision,
                url: p.url,
            })
            .collect())
    }

    async fn list_builds(&self, project: &str, filter: &BuildFilter) -> Result<Vec<Build>> {
        let top_param = filter.top.to_string();
        let definition = filter.definition_id.map(|id| id.to_string());
        let branch = filter.branch.as_deref().map(full_ref);

        let mut query = vec![
            ("$top", top_param.as_str()),
            ("queryOrder", "queueTimeDescending"),
        ];
        if let Some(definition) = definition.as_deref() {
            query.push(("definitions", definition));
        }
        if let Some(branch) = branch.as_deref() {
            query.push(("branchName", branch));
        }
        if let Some(status) = filter.status.as_deref() {
            query.push(("statusFilter", status));
        }

        let url = self.api_url(&[project], &["build", "builds"], &query)?;
        let list: ListResponse<AzBuild> = self.get(url).await?;
        Ok(list
            .value
            .iter()
            .take(filter.top as usize)
            .map(map_build)
            .collect())
    }

    async fn get_build(&self, project: &str, build_id: u64) -> Result<Build> {
        let build_id = build_id.to_string();
        let url = self.api_url(&[project], &["build", "builds", build_id.as_str()], &[])?;
        let build: AzBuild = self.get(url).await?;
        Ok(map_build(&build))
    }

    async fn run_pipeline(
        &self,
        project: &str,
        pipeline_id: u64,
        input: &RunPipelineInput,
    ) -> Result<PipelineRun> {
        let pipeline_id = pipeline_id.to_string();
        let url = self.api_url(
            &[project],
            &["pipelines", pipeline_id.as_str(), "runs"],
            &[],
        )?;
        let run: AzPipelineRun = self.post(url, &run_request(input)).await?;
        Ok(PipelineRun {
            id: run.id,
            name: run.name,
            state: run.state,
            result: run.result,
            pipeline_id: run.pipeline.as_ref().and_then(|p| p.numeric_id()),
            created_date: iso_date(run.created_date.as_deref()),
            finished_date: iso_date(run.finished_date.as_deref()),
            url: run.url,
        })
    }

    async fn list_build_logs(&self, project: &str, build_id: u64) -> Result<Vec<BuildLog>> {
        let build_id = build_id.to_string();
        let url = self.api_url(
            &[project],
            &["build", "builds", build_id.as_str(), "logs"],
            &[],
        )?;
        let list: ListResponse<AzBuildLog> = self.get(url).await?;
        Ok(list
            .value
            .into_iter()
            .map(|log| BuildLog {
                id: log.id,
                line_count: log.line_count,
                created_on: iso_date(log.created_on.as_deref()),
                last_changed_on: iso_date(log.last_changed_on.as_deref()),
            })
            .collect())
    }

    async fn get_build_log(&self, project: &str, build_id: u64, log_id: u64) -> Result<String> {
        let build_id = build_id.to_string();
        let log_id = log_id.to_string();
        let url = self.api_url(
            &[project],
            &["build", "builds", build_id.as_str(), "logs", log_id.as_str()],
            &[],
        )?;
        self.get_text(url).await
    }
}

fn run_request(input: &RunPipelineInput) -> Value {
    let mut body = Map::new();

    if let Some(branch) = &input.branch {
        body.insert(
            "resources".to_string(),
            json!({ "repositories": { "self": { "refName": full_ref(branch) } } }),
        );
    }
    if !input.variables.is_empty() {
        let variables: Map<String, Value> = input
            .variables
            .iter()
            .map(|(name, value)| (name.clone(), json!({ "value": value })))
            .collect();
        body.insert("variables".to_string(), Value::Object(variables));
    }
    if !input.template_parameters.is_empty() {
        body.insert(
            "templateParameters".to_string(),
            json!(input.template_parameters),
        );
    }

    Value::Object(body)
}

fn map_build(build: &AzBuild) -> Build {
    Build {
        id: build.id,
        build_number: build.build_number.clone(),
        status: build.status.clone().unwrap_or_default(),
        result: build.result.clone(),
        definition_id: build.definition.as_ref().and_then(|d| d.numeric_id()),
        definition_name: build.definition.as_ref().and_then(|d| d.name.clone()),
        source_branch: build.source_branch.as_deref().map(short_ref),
        source_version: build.source_version.clone(),
        requested_for: identity_name(build.requested_for.as_ref()),
        queue_time: iso_date(build.queue_time.as_deref()),
        start_time: iso_date(build.start_time.as_deref()),
        finish_time: iso_date(build.finish_time.as_deref()),
        url: build.url.clone(),
    }
}
