//! Projects and teams (`_apis/projects`).

use async_trait::async_trait;
use azdo_core::{Project, ProjectProvider, Result, Team};

use crate::client::{iso_date, AzureDevOpsClient};
use crate::types::{AzProject, AzTeam, ListResponse};

#[async_trait]
impl ProjectProvider for AzureDevOpsClient {
    async fn list_projects(&self, top: u32) -> Result<Vec<Project>> {
        let top_param = top.to_string();
        let url = self.api_url(&[], &["projects"], &[("$top", top_param.as_str())])?;
        let list: ListResponse<AzProject> = self.get(url).await?;
        Ok(list.value.iter().map(map_project).collect())
    }

    async fn get_project(&self, project: &str) -> Result<Project> {
        let url = self.api_url(&[], &["projects", project], &[])?;
        let project: AzProject = self.get(url).await?;
        Ok(map_project(&project))
    }

    async fn list_teams(&self, project: &str) -> Result<Vec<Team>> {
        let url = self.api_url(&[], &["projects", project, "teams"], &[])?;
        let list: ListResponse<AzTeam> = self.get(url).await?;
        Ok(list.value.into_iter().map(map_team).collect())
    }
}

// =============================================================================
// Mapping functions
// =============================================================================

fn map_project(project: &AzProject) -> Project {
    Project {
        id: project.id.clone(),
        name: project.name.clone(),
        description: project.description.clone().filter(|d| !d.is_empty()),
        state: project.state.clone(),
        visibility: project.visibility.clone(),
        last_update_time: iso_date(project.last_update_time.as_deref()),
        default_team: project.default_team.as_ref().and_then(|t| t.name.clone()),
        url: project.url.clone(),
    }
}

fn map_team(team: AzTeam) -> Team {
    Team {
        id: team.id,
        name: team.name,
        description: team.description.filter(|d| !d.is_empty()),
    }
}
