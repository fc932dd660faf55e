//! Classic release management (`vsrm` host, `_apis/release`).

use async_trait::async_trait;
use azdo_core::{
    CreateReleaseInput, Release, ReleaseDefinition, ReleaseEnvironment, ReleaseProvider, Result,
};

use crate::client::{identity_name, iso_date, AzureDevOpsClient};
use crate::types::{AzRelease, AzReleaseDefinition, CreateReleaseRequest, ListResponse};

#[async_trait]
impl ReleaseProvider for AzureDevOpsClient {
    async fn list_release_definitions(&self, project: &str) -> Result<Vec<ReleaseDefinition>> {
        let url = self.release_url(&[project], &["release", "definitions"], &[])?;
        let list: ListResponse<AzReleaseDefinition> = self.get(url).await?;
        Ok(list
            .value
            .into_iter()
            .map(|d| ReleaseDefinition {
                id: d.id,
                name: d.name,
                path: d.path,
                release_name_format: d.release_name_format,
                modified_on: iso_date(d.modified_on.as_deref()),
                url: d.url,
            })
            .collect())
    }

    async fn list_releases(
        &self,
        project: &str,
        definition_id: Option<u64>,
        top: u32,
    ) -> Result<Vec<Release>> {
        let top_param = top.to_string();
        let definition = definition_id.map(|id| id.to_string());
        let mut query = vec![("$top", top_param.as_str())];
        if let Some(definition) = definition.as_deref() {
            query.push(("definitionId", definition));
        }
        let url = self.release_url(&[project], &["release", "releases"], &query)?;
        let list: ListResponse<AzRelease> = self.get(url).await?;
        Ok(list
            .value
            .iter()
            .take(top as usize)
            .map(map_release)
            .collect())
    }

    async fn get_release(&self, project: &str, release_id: u64) -> Result<Release> {
        let release_id = release_id.to_string();
        let url = self.release_url(
            &[project],
            &["release", "releases", release_id.as_str()],
            &[],
        )?;
        let release: AzRelease = self.get(url).await?;
        Ok(map_release(&release))
    }

    async fn create_release(&self, project: &str, input: &CreateReleaseInput) -> Result<Release> {
        let url = self.release_url(&[project], &["release", "releases"], &[])?;
        let body = CreateReleaseRequest {
            definition_id: input.definition_id,
            description: input.description.clone(),
            is_draft: input.is_draft,
        };
        let release: AzRelease = self.post(url, &body).await?;
        Ok(map_release(&release))
    }
}

fn map_release(release: &AzRelease) -> Release {
    Release {
        id: release.id,
        name: release.name.clone(),
        status: release.status.clone(),
        description: release.description.clone().filter(|d| !d.is_empty()),
        reason: release.reason.clone(),
        definition_id: release
            .release_definition
            .as_ref()
            .and_then(|d| d.numeric_id()),
        definition_name: release
            .release_definition
            .as_ref()
            .and_then(|d| d.name.clone()),
        created_by: identity_name(release.created_by.as_ref()),
        created_on: iso_date(release.created_on.as_deref()),
        environments: release
            .environments
            .iter()
            .map(|e| ReleaseEnvironment {
                id: e.id,
                name: e.name.clone(),
                status: e.status.clone(),
            })
            .collect(),
        url: release.url.clone(),
    }
}
