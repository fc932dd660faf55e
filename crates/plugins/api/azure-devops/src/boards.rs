//! Team boards and iterations (`{project}/{team}/_apis/work`).

use async_trait::async_trait;
use azdo_core::{Board, BoardColumn, BoardProvider, BoardRow, Iteration, Result};

use crate::client::{iso_date, AzureDevOpsClient};
use crate::types::{AzBoard, AzBoardRef, AzIteration, ListResponse};

#[async_trait]
impl BoardProvider for AzureDevOpsClient {
    async fn list_boards(&self, project: &str, team: &str) -> Result<Vec<Board>> {
        let url = self.api_url(&[project, team], &["work", "boards"], &[])?;
        let list: ListResponse<AzBoardRef> = self.get(url).await?;
        Ok(list
            .value
            .into_iter()
            .map(|b| Board {
                id: b.id,
                name: b.name,
                url: b.url,
                ..Default::default()
            })
            .collect())
    }

    async fn get_board(&self, project: &str, team: &str, board: &str) -> Result<Board> {
        let url = self.api_url(&[project, team], &["work", "boards", board], &[])?;
        let board: AzBoard = self.get(url).await?;
        Ok(map_board(board))
    }

    async fn list_iterations(
        &self,
        project: &str,
        team: &str,
        timeframe: Option<&str>,
    ) -> Result<Vec<Iteration>> {
        let query: Vec<(&str, &str)> = timeframe.map(|t| ("$timeframe", t)).into_iter().collect();
        let url = self.api_url(
            &[project, team],
            &["work", "teamsettings", "iterations"],
            &query,
        )?;
        let list: ListResponse<AzIteration> = self.get(url).await?;
        Ok(list.value.into_iter().map(map_iteration).collect())
    }
}

fn map_board(board: AzBoard) -> Board {
    Board {
        id: board.id,
        name: board.name,
        columns: board
            .columns
            .into_iter()
            .map(|c| BoardColumn {
                id: c.id,
                name: c.name,
                column_type: c.column_type,
                item_limit: c.item_limit,
                is_split: c.is_split,
                state_mappings: c.state_mappings,
            })
            .collect(),
        rows: board
            .rows
            .into_iter()
            .map(|r| BoardRow {
                id: r.id,
                name: r.name.filter(|n| !n.is_empty()),
            })
            .collect(),
        url: board.url,
    }
}

fn map_iteration(iteration: AzIteration) -> Iteration {
    let attributes = iteration.attributes.as_ref();
    Iteration {
        start_date: iso_date(attributes.and_then(|a| a.start_date.as_deref())),
        finish_date: iso_date(attributes.and_then(|a| a.finish_date.as_deref())),
        time_frame: attributes.and_then(|a| a.time_frame.clone()),
        id: iteration.id,
        name: iteration.name,
        path: iteration.path,
    }
}
