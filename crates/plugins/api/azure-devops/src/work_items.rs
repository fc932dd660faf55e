//! Work item tracking (`_apis/wit`).

use std::collections::HashMap;

use async_trait::async_trait;
use azdo_core::provider::{
    custom_fields, join_tags, split_tags, work_item_api_url, work_item_id_from_url,
    work_item_web_url,
};
use azdo_core::{
    AttachmentRef, DevOpsClient, CreateWorkItemInput, DeletedWorkItem, Error, NewRelation, Result,
    UpdateWorkItemInput, User, WorkItem, WorkItemComment, WorkItemProvider, WorkItemRelation,
    WorkItemRevision,
};
use serde_json::{json, Map, Value};

use crate::client::{iso_date, map_identity, AzureDevOpsClient};
use crate::types::{
    AzAttachmentRef, AzComment, AzCommentList, AzRelation, AzWiqlResult, AzWorkItem,
    AzWorkItemDelete, ListResponse,
};
use crate::{COMMENTS_API_VERSION, MAX_WORK_ITEM_BATCH};

const PARENT_LINK: &str = "System.LinkTypes.Hierarchy-Reverse";

#[async_trait]
impl WorkItemProvider for AzureDevOpsClient {
    async fn get_work_item(&self, project: &str, id: u64) -> Result<WorkItem> {
        let id = id.to_string();
        let url = self.api_url(
            &[project],
            &["wit", "workitems", id.as_str()],
            &[("$expand", "relations")],
        )?;
        let item: AzWorkItem = self.get(url).await?;
        Ok(map_work_item(self.organization_url(), project, &item))
    }

    async fn get_work_items(&self, project: &str, ids: &[u64]) -> Result<Vec<WorkItem>> {
        let mut found: HashMap<u64, WorkItem> = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_WORK_ITEM_BATCH) {
            let joined = chunk
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            let url = self.api_url(
                &[project],
                &["wit", "workitems"],
                &[
                    ("ids", joined.as_str()),
                    ("$expand", "relations"),
                    ("errorPolicy", "omit"),
                ],
            )?;
            // Omitted (deleted or inaccessible) items come back as nulls.
            let page: ListResponse<Option<AzWorkItem>> = self.get(url).await?;
            for item in page.value.into_iter().flatten() {
                found.insert(item.id, map_work_item(self.organization_url(), project, &item));
            }
        }

        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    async fn query_work_items(&self, project: &str, wiql: &str, top: u32) -> Result<Vec<u64>> {
        let top_param = top.to_string();
        let url = self.api_url(&[project], &["wit", "wiql"], &[("$top", top_param.as_str())])?;
        let result: AzWiqlResult = self.post(url, &json!({ "query": wiql })).await?;
        Ok(result
            .work_items
            .into_iter()
            .map(|r| r.id)
            .take(top as usize)
            .collect())
    }

    async fn create_work_item(
        &self,
        project: &str,
        input: &CreateWorkItemInput,
    ) -> Result<WorkItem> {
        let type_segment = format!("${}", input.work_item_type);
        let url = self.api_url(&[project], &["wit", "workitems", type_segment.as_str()], &[])?;
        let ops = create_patch(self.organization_url(), input);
        let item: AzWorkItem = self.post_patch(url, &ops).await?;
        Ok(map_work_item(self.organization_url(), project, &item))
    }

    async fn update_work_item(
        &self,
        project: &str,
        id: u64,
        input: &UpdateWorkItemInput,
    ) -> Result<WorkItem> {
        if input.is_empty() {
            return Err(Error::Validation(
                "at least one field to update is required".to_string(),
            ));
        }
        let id = id.to_string();
        let url = self.api_url(&[project], &["wit", "workitems", id.as_str()], &[])?;
        let item: AzWorkItem = self.patch(url, &update_patch(input)).await?;
        Ok(map_work_item(self.organization_url(), project, &item))
    }

    async fn delete_work_item(
        &self,
        project: &str,
        id: u64,
        destroy: bool,
    ) -> Result<DeletedWorkItem> {
        let id_param = id.to_string();
        let destroy_param = destroy.to_string();
        let url = self.api_url(
            &[project],
            &["wit", "workitems", id_param.as_str()],
            &[("destroy", destroy_param.as_str())],
        )?;
        let deleted: Option<AzWorkItemDelete> = self.delete(url).await?;
        Ok(match deleted {
            Some(d) => DeletedWorkItem {
                id: d.id,
                destroyed: destroy,
                deleted_date: iso_date(d.deleted_date.as_deref()),
                deleted_by: d.deleted_by,
            },
            None => DeletedWorkItem {
                id,
                destroyed: destroy,
                ..Default::default()
            },
        })
    }

    async fn get_work_item_comments(
        &self,
        project: &str,
        id: u64,
        top: u32,
    ) -> Result<Vec<WorkItemComment>> {
        let id_param = id.to_string();
        let top_param = top.to_string();
        let url = self.api_url(
            &[project],
            &["wit", "workItems", id_param.as_str(), "comments"],
            &[
                ("$top", top_param.as_str()),
                ("api-version", COMMENTS_API_VERSION),
            ],
        )?;
        let list: AzCommentList = self.get(url).await?;
        Ok(list
            .comments
            .iter()
            .take(top as usize)
            .map(|c| map_comment(id, c))
            .collect())
    }

    async fn add_work_item_comment(
        &self,
        project: &str,
        id: u64,
        text: &str,
    ) -> Result<WorkItemComment> {
        let id_param = id.to_string();
        let url = self.api_url(
            &[project],
            &["wit", "workItems", id_param.as_str(), "comments"],
            &[("api-version", COMMENTS_API_VERSION)],
        )?;
        let comment: AzComment = self.post(url, &json!({ "text": text })).await?;
        Ok(map_comment(id, &comment))
    }

    async fn add_work_item_relation(
        &self,
        project: &str,
        id: u64,
        relation: &NewRelation,
    ) -> Result<WorkItem> {
        let id = id.to_string();
        let url = self.api_url(&[project], &["wit", "workitems", id.as_str()], &[])?;
        let item: AzWorkItem = self.patch(url, &json!([relation_op(relation)])).await?;
        Ok(map_work_item(self.organization_url(), project, &item))
    }

    async fn upload_attachment(
        &self,
        project: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<AttachmentRef> {
        let url = self.api_url(&[project], &["wit", "attachments"], &[("fileName", file_name)])?;
        let attachment: AzAttachmentRef = self.post_bytes(url, content).await?;
        Ok(AttachmentRef {
            id: attachment.id,
            url: attachment.url,
        })
    }

    async fn get_work_item_revisions(
        &self,
        project: &str,
        id: u64,
        top: u32,
    ) -> Result<Vec<WorkItemRevision>> {
        let id_param = id.to_string();
        let top_param = top.to_string();
        let url = self.api_url(
            &[project],
            &["wit", "workItems", id_param.as_str(), "revisions"],
            &[("$top", top_param.as_str())],
        )?;
        let list: ListResponse<AzWorkItem> = self.get(url).await?;
        Ok(list
            .value
            .iter()
            .take(top as usize)
            .map(map_revision)
            .collect())
    }
}

// =============================================================================
// JSON Patch builders
// =============================================================================

fn field_op(field: &str, value: Value) -> Value {
    json!({ "op": "add", "path": format!("/fields/{}", field), "value": value })
}

fn relation_op(relation: &NewRelation) -> Value {
    let mut value = json!({ "rel": relation.rel, "url": relation.url });
    if let Some(comment) = &relation.comment {
        value["attributes"] = json!({ "comment": comment });
    }
    json!({ "op": "add", "path": "/relations/-", "value": value })
}

fn create_patch(organization_url: &str, input: &CreateWorkItemInput) -> Value {
    let mut ops = vec![field_op("System.Title", json!(input.title))];

    if let Some(description) = &input.description {
        ops.push(field_op("System.Description", json!(description)));
    }
    if let Some(assigned_to) = &input.assigned_to {
        ops.push(field_op("System.AssignedTo", json!(assigned_to)));
    }
    if let Some(area_path) = &input.area_path {
        ops.push(field_op("System.AreaPath", json!(area_path)));
    }
    if let Some(iteration_path) = &input.iteration_path {
        ops.push(field_op("System.IterationPath", json!(iteration_path)));
    }
    if let Some(priority) = input.priority {
        ops.push(field_op("Microsoft.VSTS.Common.Priority", json!(priority)));
    }
    if !input.tags.is_empty() {
        ops.push(field_op("System.Tags", json!(join_tags(&input.tags))));
    }
    for (name, value) in &input.fields {
        ops.push(field_op(name, value.clone()));
    }
    if let Some(parent_id) = input.parent_id {
        ops.push(relation_op(&NewRelation {
            rel: PARENT_LINK.to_string(),
            url: work_item_api_url(organization_url, parent_id),
            comment: None,
        }));
    }

    Value::Array(ops)
}

fn update_patch(input: &UpdateWorkItemInput) -> Value {
    let mut ops = Vec::new();

    if let Some(title) = &input.title {
        ops.push(field_op("System.Title", json!(title)));
    }
    if let Some(description) = &input.description {
        ops.push(field_op("System.Description", json!(description)));
    }
    if let Some(state) = &input.state {
        ops.push(field_op("System.State", json!(state)));
    }
    if let Some(assigned_to) = &input.assigned_to {
        ops.push(field_op("System.AssignedTo", json!(assigned_to)));
    }
    if let Some(area_path) = &input.area_path {
        ops.push(field_op("System.AreaPath", json!(area_path)));
    }
    if let Some(iteration_path) = &input.iteration_path {
        ops.push(field_op("System.IterationPath", json!(iteration_path)));
    }
    if let Some(priority) = input.priority {
        ops.push(field_op("Microsoft.VSTS.Common.Priority", json!(priority)));
    }
    if let Some(tags) = &input.tags {
        ops.push(field_op("System.Tags", json!(join_tags(tags))));
    }
    for (name, value) in &input.fields {
        ops.push(field_op(name, value.clone()));
    }

    Value::Array(ops)
}

// =============================================================================
// Mapping functions: Azure DevOps types -> Unified types
// =============================================================================

fn str_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields.get(name).and_then(Value::as_str).map(str::to_string)
}

fn date_field(fields: &Map<String, Value>, name: &str) -> Option<String> {
    iso_date(fields.get(name).and_then(Value::as_str))
}

/// Identity fields are objects in 7.x, or `"Name <email>"` strings in older payloads.
fn identity_field(fields: &Map<String, Value>, name: &str) -> Option<User> {
    match fields.get(name)? {
        Value::Object(_) => {
            let identity = serde_json::from_value(fields[name].clone()).ok()?;
            map_identity(&identity)
        }
        Value::String(raw) => Some(parse_identity_string(raw)),
        _ => None,
    }
}

fn parse_identity_string(raw: &str) -> User {
    match raw.rsplit_once('<') {
        Some((name, rest)) if rest.ends_with('>') => {
            let email = rest.trim_end_matches('>').trim().to_string();
            User {
                id: String::new(),
                display_name: name.trim().to_string(),
                unique_name: Some(email.clone()),
                email: Some(email),
                is_active: None,
            }
        }
        _ => User {
            display_name: raw.trim().to_string(),
            ..Default::default()
        },
    }
}

fn map_relation(relation: &AzRelation) -> WorkItemRelation {
    let attribute = |key: &str| {
        relation
            .attributes
            .as_ref()
            .and_then(|a| a.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    WorkItemRelation {
        rel: relation.rel.clone(),
        url: relation.url.clone(),
        target_id: work_item_id_from_url(&relation.url),
        name: attribute("name"),
        comment: attribute("comment"),
    }
}

pub(crate) fn map_work_item(organization_url: &str, project: &str, item: &AzWorkItem) -> WorkItem {
    let fields = &item.fields;
    let relations: Vec<WorkItemRelation> = item
        .relations
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(map_relation)
        .collect();

    let parent_id = fields
        .get("System.Parent")
        .and_then(Value::as_u64)
        .or_else(|| {
            relations
                .iter()
                .find(|r| r.rel == PARENT_LINK)
                .and_then(|r| r.target_id)
        });

    let item_project = str_field(fields, "System.TeamProject").unwrap_or_else(|| project.to_string());

    WorkItem {
        id: item.id,
        rev: fields
            .get("System.Rev")
            .and_then(Value::as_u64)
            .unwrap_or(item.rev),
        title: str_field(fields, "System.Title").unwrap_or_default(),
        work_item_type: str_field(fields, "System.WorkItemType").unwrap_or_default(),
        state: str_field(fields, "System.State").unwrap_or_default(),
        reason: str_field(fields, "System.Reason"),
        assigned_to: identity_field(fields, "System.AssignedTo"),
        created_by: identity_field(fields, "System.CreatedBy"),
        created_date: date_field(fields, "System.CreatedDate"),
        changed_date: date_field(fields, "System.ChangedDate"),
        area_path: str_field(fields, "System.AreaPath"),
        iteration_path: str_field(fields, "System.IterationPath"),
        priority: fields
            .get("Microsoft.VSTS.Common.Priority")
            .and_then(Value::as_i64),
        tags: str_field(fields, "System.Tags")
            .map(|t| split_tags(&t))
            .unwrap_or_default(),
        description: str_field(fields, "System.Description"),
        acceptance_criteria: str_field(fields, "Microsoft.VSTS.Common.AcceptanceCriteria"),
        repro_steps: str_field(fields, "Microsoft.VSTS.TCM.ReproSteps"),
        parent_id,
        relations,
        custom_fields: custom_fields(fields),
        url: Some(work_item_web_url(organization_url, &item_project, item.id)),
    }
}

fn map_comment(work_item_id: u64, comment: &AzComment) -> WorkItemComment {
    WorkItemComment {
        id: comment.id,
        work_item_id: if comment.work_item_id == 0 {
            work_item_id
        } else {
            comment.work_item_id
        },
        version: comment.version,
        text: comment.text.clone(),
        created_by: comment.created_by.as_ref().and_then(map_identity),
        created_date: iso_date(comment.created_date.as_deref()),
        modified_date: iso_date(comment.modified_date.as_deref()),
    }
}

fn map_revision(revision: &AzWorkItem) -> WorkItemRevision {
    let fields = &revision.fields;
    WorkItemRevision {
        rev: fields
            .get("System.Rev")
            .and_then(Value::as_u64)
            .unwrap_or(revision.rev),
        changed_by: identity_field(fields, "System.ChangedBy"),
        changed_date: date_field(fields, "System.ChangedDate"),
        state: str_field(fields, "System.State"),
        title: str_field(fields, "System.Title"),
        assigned_to: identity_field(fields, "System.AssignedTo"),
        description: str_field(fields, "System.Description"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample_work_item_json() -> Value {
        json!({
            "id": 42,
            "rev": 3,
            "fields": {
                "System.Id": 42,
                "System.Rev": 3,
                "System.TeamProject": "Fabrikam",
                "System.WorkItemType": "Bug",
                "System.State": "Active",
                "System.Reason": "New",
                "System.Title": "Login fails",
                "System.AssignedTo": {
                    "id": "u1",
                    "displayName": "Jane Doe",
                    "uniqueName": "jane@contoso.com"
                },
                "System.CreatedDate": "2024-01-01T10:00:00Z",
                "System.ChangedDate": "2024-01-02T11:30:00.57Z",
                "System.AreaPath": "Fabrikam\\Web",
                "System.IterationPath": "Fabrikam\\Sprint 1",
                "System.Tags": "auth; ui",
                "System.Description": "<p>Broken</p>",
                "Microsoft.VSTS.TCM.ReproSteps": "<ol><li>open</li></ol>",
                "Microsoft.VSTS.Common.Priority": 2,
                "Microsoft.VSTS.Scheduling.StoryPoints": 3
            },
            "relations": [
                {
                    "rel": "System.LinkTypes.Hierarchy-Reverse",
                    "url": "https://dev.azure.com/contoso/_apis/wit/workItems/7",
                    "attributes": {"name": "Parent", "isLocked": false}
                },
                {
                    "rel": "AttachedFile",
                    "url": "https://dev.azure.com/contoso/_apis/wit/attachments/abc",
                    "attributes": {"name": "log.txt", "comment": "crash log"}
                }
            ]
        })
    }

    fn sample_work_item() -> AzWorkItem {
        serde_json::from_value(sample_work_item_json()).unwrap()
    }

    #[test]
    fn test_map_work_item() {
        let item = map_work_item("https://dev.azure.com/contoso", "Other", &sample_work_item());

        assert_eq!(item.id, 42);
        assert_eq!(item.rev, 3);
        assert_eq!(item.title, "Login fails");
        assert_eq!(item.work_item_type, "Bug");
        assert_eq!(item.state, "Active");
        assert_eq!(item.assigned_to.as_ref().unwrap().display_name, "Jane Doe");
        assert_eq!(item.created_date.as_deref(), Some("2024-01-01T10:00:00.000Z"));
        assert_eq!(item.changed_date.as_deref(), Some("2024-01-02T11:30:00.570Z"));
        assert_eq!(item.tags, vec!["auth", "ui"]);
        assert_eq!(item.priority, Some(2));
        assert_eq!(item.parent_id, Some(7));
        assert_eq!(item.description.as_deref(), Some("<p>Broken</p>"));
        assert_eq!(item.relations.len(), 2);
        assert_eq!(item.relations[0].target_id, Some(7));
        assert_eq!(item.relations[1].target_id, None);
        assert_eq!(item.relations[1].comment.as_deref(), Some("crash log"));
        assert_eq!(
            item.custom_fields.get("Microsoft.VSTS.Scheduling.StoryPoints"),
            Some(&json!(3))
        );
        assert_eq!(
            item.url.as_deref(),
            Some("https://dev.azure.com/contoso/Fabrikam/_workitems/edit/42")
        );
    }

    #[test]
    fn test_map_work_item_minimal() {
        let item: AzWorkItem = serde_json::from_value(json!({"id": 1, "fields": {}})).unwrap();
        let mapped = map_work_item("https://dev.azure.com/contoso", "Fabrikam", &item);
        assert_eq!(mapped.title, "");
        assert!(mapped.relations.is_empty());
        assert!(mapped.parent_id.is_none());
        assert_eq!(
            mapped.url.as_deref(),
            Some("https://dev.azure.com/contoso/Fabrikam/_workitems/edit/1")
        );
    }

    #[test]
    fn test_parse_identity_string() {
        let user = parse_identity_string("Jane Doe <jane@contoso.com>");
        assert_eq!(user.display_name, "Jane Doe");
        assert_eq!(user.email.as_deref(), Some("jane@contoso.com"));

        let user = parse_identity_string("Build Service");
        assert_eq!(user.display_name, "Build Service");
        assert!(user.email.is_none());
    }

    #[test]
    fn test_create_patch() {
        let mut fields = BTreeMap::new();
        fields.insert("Custom.Team".to_string(), json!("Blue"));
        let input = CreateWorkItemInput {
            work_item_type: "Task".to_string(),
            title: "Write docs".to_string(),
            description: Some("<p>all of them</p>".to_string()),
            priority: Some(1),
            tags: vec!["docs".to_string(), "q1".to_string()],
            parent_id: Some(7),
            fields,
            ..Default::default()
        };

        let ops = create_patch("https://dev.azure.com/contoso", &input);
        let ops = ops.as_array().unwrap();

        assert_eq!(ops[0]["path"], "/fields/System.Title");
        assert_eq!(ops[0]["value"], "Write docs");
        assert!(ops
            .iter()
            .any(|op| op["path"] == "/fields/System.Tags" && op["value"] == "docs; q1"));
        assert!(ops
            .iter()
            .any(|op| op["path"] == "/fields/Custom.Team" && op["value"] == "Blue"));
        let parent = ops.last().unwrap();
        assert_eq!(parent["path"], "/relations/-");
        assert_eq!(parent["value"]["rel"], PARENT_LINK);
        assert_eq!(
            parent["value"]["url"],
            "https://dev.azure.com/contoso/_apis/wit/workItems/7"
        );
    }

    #[test]
    fn test_update_patch_only_touches_given_fields() {
        let input = UpdateWorkItemInput {
            state: Some("Closed".to_string()),
            tags: Some(vec![]),
            ..Default::default()
        };
        let ops = update_patch(&input);
        let ops = ops.as_array().unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0]["path"], "/fields/System.State");
        assert_eq!(ops[1]["path"], "/fields/System.Tags");
        assert_eq!(ops[1]["value"], "");
    }

    #[test]
    fn test_relation_op_with_comment() {
        let op = relation_op(&NewRelation {
            rel: "System.LinkTypes.Related".to_string(),
            url: "https://dev.azure.com/contoso/_apis/wit/workItems/9".to_string(),
            comment: Some("see also".to_string()),
        });
        assert_eq!(op["op"], "add");
        assert_eq!(op["value"]["attributes"]["comment"], "see also");
    }

    mod integration {
        use super::*;
        use httpmock::prelude::*;

        fn create_test_client(server: &MockServer) -> AzureDevOpsClient {
            AzureDevOpsClient::with_base_url(server.base_url(), "test-pat", None).unwrap()
        }

        #[tokio::test]
        async fn test_get_work_item() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(GET).path("/Fabrikam/_apis/wit/workitems/42");
                then.status(200).json_body(sample_work_item_json());
            });

            let client = create_test_client(&server);
            let item = client.get_work_item("Fabrikam", 42).await.unwrap();

            mock.assert();
            assert_eq!(item.title, "Login fails");
            assert_eq!(
                item.url.as_deref(),
                Some(format!("{}/Fabrikam/_workitems/edit/42", server.base_url()).as_str())
            );
        }

        #[tokio::test]
        async fn test_get_work_item_not_found() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/Fabrikam/_apis/wit/workitems/999");
                then.status(404).json_body(
                    json!({"message": "TF401232: Work item 999 does not exist."}),
                );
            });

            let client = create_test_client(&server);
            let err = client.get_work_item("Fabrikam", 999).await.unwrap_err();
            assert!(err.is_not_found());
            assert!(err.to_string().contains("TF401232"));
        }

        #[tokio::test]
        async fn test_get_work_items_preserves_order_and_skips_missing() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET)
                    .path("/Fabrikam/_apis/wit/workitems")
                    .query_param("ids", "3,1,2")
                    .query_param("errorPolicy", "omit");
                then.status(200).json_body(json!({
                    "count": 3,
                    "value": [
                        {"id": 1, "fields": {"System.Title": "one"}},
                        null,
                        {"id": 3, "fields": {"System.Title": "three"}}
                    ]
                }));
            });

            let client = create_test_client(&server);
            let items = client.get_work_items("Fabrikam", &[3, 1, 2]).await.unwrap();

            let ids: Vec<u64> = items.iter().map(|i| i.id).collect();
            assert_eq!(ids, vec![3, 1]);
        }

        #[tokio::test]
        async fn test_get_work_items_empty_ids_makes_no_request() {
            let server = MockServer::start();
            let client = create_test_client(&server);
            let items = client.get_work_items("Fabrikam", &[]).await.unwrap();
            assert!(items.is_empty());
        }

        #[tokio::test]
        async fn test_query_work_items() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/Fabrikam/_apis/wit/wiql")
                    .json_body(json!({"query": "SELECT [System.Id] FROM WorkItems"}));
                then.status(200).json_body(json!({
                    "queryType": "flat",
                    "workItems": [{"id": 5, "url": "x"}, {"id": 6, "url": "y"}, {"id": 7, "url": "z"}]
                }));
            });

            let client = create_test_client(&server);
            let ids = client
                .query_work_items("Fabrikam", "SELECT [System.Id] FROM WorkItems", 2)
                .await
                .unwrap();

            mock.assert();
            assert_eq!(ids, vec![5, 6]);
        }

        #[tokio::test]
        async fn test_create_work_item_sends_json_patch() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/Fabrikam/_apis/wit/workitems/$Task")
                    .header("content-type", "application/json-patch+json");
                then.status(200).json_body(json!({
                    "id": 100,
                    "rev": 1,
                    "fields": {"System.Title": "New task", "System.WorkItemType": "Task", "System.State": "New"}
                }));
            });

            let client = create_test_client(&server);
            let item = client
                .create_work_item(
                    "Fabrikam",
                    &CreateWorkItemInput {
                        work_item_type: "Task".to_string(),
                        title: "New task".to_string(),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();

            mock.assert();
            assert_eq!(item.id, 100);
            assert_eq!(item.rev, 1);
        }

        #[tokio::test]
        async fn test_update_work_item_rejects_empty_input() {
            let server = MockServer::start();
            let client = create_test_client(&server);
            let err = client
                .update_work_item("Fabrikam", 1, &UpdateWorkItemInput::default())
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }

        #[tokio::test]
        async fn test_delete_work_item() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(DELETE)
                    .path("/Fabrikam/_apis/wit/workitems/8")
                    .query_param("destroy", "false");
                then.status(200).json_body(json!({
                    "id": 8,
                    "deletedDate": "2024-05-01T08:00:00Z",
                    "deletedBy": "Jane Doe <jane@contoso.com>"
                }));
            });

            let client = create_test_client(&server);
            let deleted = client.delete_work_item("Fabrikam", 8, false).await.unwrap();
            assert_eq!(deleted.id, 8);
            assert!(!deleted.destroyed);
            assert_eq!(deleted.deleted_date.as_deref(), Some("2024-05-01T08:00:00.000Z"));
        }

        #[tokio::test]
        async fn test_comments_use_preview_api_version() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(GET)
                    .path("/Fabrikam/_apis/wit/workItems/42/comments")
                    .query_param("api-version", "7.1-preview.4");
                then.status(200).json_body(json!({
                    "totalCount": 1,
                    "comments": [{
                        "id": 11,
                        "workItemId": 42,
                        "version": 1,
                        "text": "<div>Looks good</div>",
                        "createdBy": {"id": "u1", "displayName": "Jane Doe"},
                        "createdDate": "2024-01-03T09:00:00Z"
                    }]
                }));
            });

            let client = create_test_client(&server);
            let comments = client
                .get_work_item_comments("Fabrikam", 42, 10)
                .await
                .unwrap();

            mock.assert();
            assert_eq!(comments.len(), 1);
            assert_eq!(comments[0].work_item_id, 42);
            assert_eq!(comments[0].created_by.as_ref().unwrap().display_name, "Jane Doe");
        }

        #[tokio::test]
        async fn test_upload_attachment() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(POST)
                    .path("/Fabrikam/_apis/wit/attachments")
                    .query_param("fileName", "log.txt")
                    .header("content-type", "application/octet-stream")
                    .body("hello");
                then.status(201).json_body(json!({
                    "id": "a1",
                    "url": "https://dev.azure.com/contoso/_apis/wit/attachments/a1"
                }));
            });

            let client = create_test_client(&server);
            let attachment = client
                .upload_attachment("Fabrikam", "log.txt", b"hello".to_vec())
                .await
                .unwrap();

            mock.assert();
            assert_eq!(attachment.id, "a1");
        }

        #[tokio::test]
        async fn test_get_revisions() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET)
                    .path("/Fabrikam/_apis/wit/workItems/42/revisions");
                then.status(200).json_body(json!({
                    "count": 2,
                    "value": [
                        {"id": 42, "rev": 1, "fields": {"System.State": "New", "System.ChangedBy": "Jane Doe <jane@contoso.com>"}},
                        {"id": 42, "rev": 2, "fields": {"System.State": "Active"}}
                    ]
                }));
            });

            let client = create_test_client(&server);
            let revisions = client
                .get_work_item_revisions("Fabrikam", 42, 20)
                .await
                .unwrap();

            assert_eq!(revisions.len(), 2);
            assert_eq!(revisions[0].rev, 1);
            assert_eq!(
                revisions[0].changed_by.as_ref().unwrap().display_name,
                "Jane Doe"
            );
            assert_eq!(revisions[1].state.as_deref(), Some("Active"));
        }
    }
}
