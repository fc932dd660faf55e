//! Users and identities (`connectionData`, `vssps` identities).

use async_trait::async_trait;
use azdo_core::{Result, User, UserProvider};
use serde_json::Value;

use crate::client::AzureDevOpsClient;
use crate::types::{AzConnectionData, AzIdentity, ListResponse};
use crate::CONNECTION_DATA_API_VERSION;

#[async_trait]
impl UserProvider for AzureDevOpsClient {
    async fn get_current_user(&self) -> Result<User> {
        let url = self.api_url(
            &[],
            &["connectionData"],
            &[("api-version", CONNECTION_DATA_API_VERSION)],
        )?;
        let data: AzConnectionData = self.get(url).await?;
        Ok(map_identity_record(&data.authenticated_user))
    }

    async fn search_users(&self, query: &str, top: u32) -> Result<Vec<User>> {
        let url = self.identity_url(
            &["identities"],
            &[
                ("searchFilter", "General"),
                ("filterValue", query),
                ("queryMembership", "None"),
            ],
        )?;
        let list: ListResponse<AzIdentity> = self.get(url).await?;
        Ok(list
            .value
            .iter()
            .take(top as usize)
            .map(map_identity_record)
            .collect())
    }
}

/// Read a `{ "$value": .. }` entry from an identity property bag.
fn property(identity: &AzIdentity, name: &str) -> Option<String> {
    identity
        .properties
        .as_ref()?
        .get(name)?
        .get("$value")
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|v| !v.is_empty())
}

fn map_identity_record(identity: &AzIdentity) -> User {
    let account = property(identity, "Account");
    User {
        id: identity.id.clone(),
        display_name: identity
            .custom_display_name
            .clone()
            .or_else(|| identity.provider_display_name.clone())
            .or_else(|| account.clone())
            .unwrap_or_default(),
        email: property(identity, "Mail")
            .or_else(|| account.clone().filter(|a| a.contains('@'))),
        unique_name: account,
        is_active: identity.is_active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_identity_record() {
        let raw: AzIdentity = serde_json::from_value(json!({
            "id": "u1",
            "providerDisplayName": "Jane Doe",
            "isActive": true,
            "properties": {
                "Account": {"$type": "System.String", "$value": "jane@contoso.com"},
                "Mail": {"$type": "System.String", "$value": "jane.doe@contoso.com"}
            }
        }))
        .unwrap();

        let user = map_identity_record(&raw);
        assert_eq!(user.display_name, "Jane Doe");
        assert_eq!(user.unique_name.as_deref(), Some("jane@contoso.com"));
        assert_eq!(user.email.as_deref(), Some("jane.doe@contoso.com"));
        assert_eq!(user.is_active, Some(true));
    }

    mod integration {
        use super::*;
        use azdo_core::DevOpsClient;
        use httpmock::prelude::*;

        fn create_test_client(server: &MockServer) -> AzureDevOpsClient {
            AzureDevOpsClient::with_base_url(server.base_url(), "test-pat", None).unwrap()
        }

        #[tokio::test]
        async fn test_validate_connection_uses_connection_data() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(GET)
                    .path("/_apis/connectionData")
                    .query_param("api-version", "7.1-preview.1");
                then.status(200).json_body(json!({
                    "authenticatedUser": {
                        "id": "u1",
                        "providerDisplayName": "Jane Doe",
                        "properties": {"Account": {"$value": "jane@contoso.com"}}
                    }
                }));
            });

            let client = create_test_client(&server);
            let user = client.validate_connection().await.unwrap();

            mock.assert();
            assert_eq!(user.display_name, "Jane Doe");
        }

        #[tokio::test]
        async fn test_validate_connection_bad_token() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/_apis/connectionData");
                then.status(401).body("");
            });

            let client = create_test_client(&server);
            let err = client.validate_connection().await.unwrap_err();
            assert!(matches!(err, azdo_core::Error::Auth(_)));
        }

        #[tokio::test]
        async fn test_search_users() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(GET)
                    .path("/_apis/identities")
                    .query_param("searchFilter", "General")
                    .query_param("filterValue", "jane");
                then.status(200).json_body(json!({
                    "count": 2,
                    "value": [
                        {"id": "u1", "providerDisplayName": "Jane Doe"},
                        {"id": "u2", "providerDisplayName": "Janet Roe"}
                    ]
                }));
            });

            let client = create_test_client(&server);
            let users = client.search_users("jane", 1).await.unwrap();

            mock.assert();
            assert_eq!(users.len(), 1);
            assert_eq!(users[0].id, "u1");
        }
    }
}
