//! Project and code wikis (`_apis/wiki`).

use async_trait::async_trait;
use azdo_core::{Result, Wiki, WikiPage, WikiPageSummary, WikiProvider};

use crate::client::AzureDevOpsClient;
use crate::types::{AzWiki, AzWikiPage, ListResponse, WikiPageContent};

#[async_trait]
impl WikiProvider for AzureDevOpsClient {
    async fn list_wikis(&self, project: &str) -> Result<Vec<Wiki>> {
        let url = self.api_url(&[project], &["wiki", "wikis"], &[])?;
        let list: ListResponse<AzWiki> = self.get(url).await?;
        Ok(list
            .value
            .into_iter()
            .map(|w| Wiki {
                id: w.id,
                name: w.name,
                wiki_type: w.wiki_type,
                mapped_path: w.mapped_path,
                remote_url: w.remote_url,
            })
            .collect())
    }

    async fn list_wiki_pages(
        &self,
        project: &str,
        wiki: &str,
        path: &str,
    ) -> Result<Vec<WikiPageSummary>> {
        let url = self.api_url(
            &[project],
            &["wiki", "wikis", wiki, "pages"],
            &[("path", path), ("recursionLevel", "full")],
        )?;
        let root: AzWikiPage = self.get(url).await?;
        let mut pages = Vec::new();
        flatten_pages(&root, &mut pages);
        Ok(pages)
    }

    async fn get_wiki_page(
        &self,
        project: &str,
        wiki: &str,
        path: &str,
        include_content: bool,
    ) -> Result<WikiPage> {
        let include = include_content.to_string();
        let url = self.api_url(
            &[project],
            &["wiki", "wikis", wiki, "pages"],
            &[("path", path), ("includeContent", include.as_str())],
        )?;
        let (page, etag): (AzWikiPage, _) = self.get_with_etag(url).await?;
        Ok(map_page(page, etag))
    }

    async fn put_wiki_page(
        &self,
        project: &str,
        wiki: &str,
        path: &str,
        content: &str,
        etag: Option<&str>,
    ) -> Result<WikiPage> {
        let url = self.api_url(
            &[project],
            &["wiki", "wikis", wiki, "pages"],
            &[("path", path)],
        )?;
        let (page, new_etag): (AzWikiPage, _) = self
            .put_with_etag(url, &WikiPageContent { content }, etag)
            .await?;
        Ok(map_page(page, new_etag))
    }
}

fn map_page(page: AzWikiPage, etag: Option<String>) -> WikiPage {
    WikiPage {
        path: page.path,
        id: page.id,
        content: page.content,
        etag,
        git_item_path: page.git_item_path,
        remote_url: page.remote_url,
    }
}

/// Depth-first flattening of a page tree.
fn flatten_pages(page: &AzWikiPage, out: &mut Vec<WikiPageSummary>) {
    out.push(WikiPageSummary {
        path: page.path.clone(),
        id: page.id,
        is_parent_page: page.is_parent_page.unwrap_or(!page.sub_pages.is_empty()),
    });
    for child in &page.sub_pages {
        flatten_pages(child, out);
    }
}
