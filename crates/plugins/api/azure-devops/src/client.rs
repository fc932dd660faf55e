//! Azure DevOps API client core: hosts, authentication, and request helpers.
//!
//! The trait implementations for each area live in sibling modules
//! (`work_items`, `git`, ...) as further `impl` blocks on
//! [`AzureDevOpsClient`].

use async_trait::async_trait;
use azdo_core::{DevOpsClient, Error, Result, User};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ETAG, IF_MATCH};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::AzIdentityRef;
use crate::API_VERSION;

const USER_AGENT: &str = concat!("azdo-tools/", env!("CARGO_PKG_VERSION"));
const JSON: &str = "application/json";
const JSON_PATCH: &str = "application/json-patch+json";
const OCTET_STREAM: &str = "application/octet-stream";

/// Azure DevOps API client.
pub struct AzureDevOpsClient {
    org_url: String,
    core_base: String,
    release_base: String,
    identity_base: String,
    default_project: Option<String>,
    auth_header: String,
    client: reqwest::Client,
}

impl AzureDevOpsClient {
    /// Create a client for an organization URL such as
    /// `https://dev.azure.com/contoso` or `https://contoso.visualstudio.com`.
    pub fn new(
        org_url: impl Into<String>,
        pat: impl AsRef<str>,
        default_project: Option<String>,
    ) -> Result<Self> {
        let org_url = org_url.into().trim_end_matches('/').to_string();
        let release_base = service_host(&org_url, "vsrm");
        let identity_base = service_host(&org_url, "vssps");
        Self::build(
            org_url.clone(),
            org_url,
            release_base,
            identity_base,
            pat.as_ref(),
            default_project,
        )
    }

    /// Create a client whose every host is `base_url` (for testing with httpmock).
    pub fn with_base_url(
        base_url: impl Into<String>,
        pat: impl AsRef<str>,
        default_project: Option<String>,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self::build(
            base_url.clone(),
            base_url.clone(),
            base_url.clone(),
            base_url,
            pat.as_ref(),
            default_project,
        )
    }

    fn build(
        org_url: String,
        core_base: String,
        release_base: String,
        identity_base: String,
        pat: &str,
        default_project: Option<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            org_url,
            core_base,
            release_base,
            identity_base,
            default_project: default_project
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            auth_header: basic_auth(pat),
            client,
        })
    }

    // =========================================================================
    // URL builders
    // =========================================================================

    /// Organization-host API URL: `{org}/{scope..}/_apis/{path..}?{query}&api-version=..`.
    pub(crate) fn api_url(
        &self,
        scope: &[&str],
        path: &[&str],
        query: &[(&str, &str)],
    ) -> Result<Url> {
        endpoint(&self.core_base, scope, path, query)
    }

    /// Release management host API URL.
    pub(crate) fn release_url(
        &self,
        scope: &[&str],
        path: &[&str],
        query: &[(&str, &str)],
    ) -> Result<Url> {
        endpoint(&self.release_base, scope, path, query)
    }

    /// Identity service host API URL.
    pub(crate) fn identity_url(&self, path: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        endpoint(&self.identity_base, &[], path, query)
    }

    // =========================================================================
    // Request helpers
    // =========================================================================

    /// Build request with auth and accept headers.
    fn request(&self, method: Method, url: Url, accept: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(AUTHORIZATION, &self.auth_header)
            .header(ACCEPT, accept)
    }

    /// Send a request and turn error statuses into errors.
    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body, status.canonical_reason());
            warn!(
                status = status_code,
                message = message,
                "Azure DevOps API error response"
            );
            return Err(Error::from_status(status_code, message));
        }

        Ok(response)
    }

    /// Make an authenticated GET request.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(url = %url, "Azure DevOps GET request");
        let response = self.send(self.request(Method::GET, url, JSON)).await?;
        parse_json(response).await
    }

    /// GET that also returns the `ETag` response header.
    pub(crate) async fn get_with_etag<T: DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<(T, Option<String>)> {
        debug!(url = %url, "Azure DevOps GET request");
        let response = self.send(self.request(Method::GET, url, JSON)).await?;
        let etag = etag_of(&response);
        Ok((parse_json(response).await?, etag))
    }

    /// Make an authenticated POST request with a JSON body.
    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T> {
        debug!(url = %url, "Azure DevOps POST request");
        let response = self
            .send(self.request(Method::POST, url, JSON).json(body))
            .await?;
        parse_json(response).await
    }

    /// POST a JSON Patch document (work item create).
    pub(crate) async fn post_patch<T: DeserializeOwned>(&self, url: Url, ops: &Value) -> Result<T> {
        debug!(url = %url, "Azure DevOps POST (json-patch) request");
        let response = self
            .send(
                self.request(Method::POST, url, JSON)
                    .header(CONTENT_TYPE, JSON_PATCH)
                    .body(ops.to_string()),
            )
            .await?;
        parse_json(response).await
    }

    /// PATCH with a JSON Patch document (work item update).
    pub(crate) async fn patch<T: DeserializeOwned>(&self, url: Url, ops: &Value) -> Result<T> {
        debug!(url = %url, "Azure DevOps PATCH request");
        let response = self
            .send(
                self.request(Method::PATCH, url, JSON)
                    .header(CONTENT_TYPE, JSON_PATCH)
                    .body(ops.to_string()),
            )
            .await?;
        parse_json(response).await
    }

    /// PUT a JSON body, optionally guarded by `If-Match`. Returns the new `ETag`.
    pub(crate) async fn put_with_etag<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
        if_match: Option<&str>,
    ) -> Result<(T, Option<String>)> {
        debug!(url = %url, "Azure DevOps PUT request");
        let mut builder = self.request(Method::PUT, url, JSON).json(body);
        if let Some(etag) = if_match {
            builder = builder.header(IF_MATCH, etag);
        }
        let response = self.send(builder).await?;
        let etag = etag_of(&response);
        Ok((parse_json(response).await?, etag))
    }

    /// DELETE; an empty response body yields `None`.
    pub(crate) async fn delete<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
        debug!(url = %url, "Azure DevOps DELETE request");
        let response = self.send(self.request(Method::DELETE, url, JSON)).await?;
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
    }

    /// Upload raw bytes.
    pub(crate) async fn post_bytes<T: DeserializeOwned>(
        &self,
        url: Url,
        content: Vec<u8>,
    ) -> Result<T> {
        debug!(url = %url, bytes = content.len(), "Azure DevOps POST (octet-stream) request");
        let response = self
            .send(
                self.request(Method::POST, url, JSON)
                    .header(CONTENT_TYPE, OCTET_STREAM)
                    .body(content),
            )
            .await?;
        parse_json(response).await
    }

    /// GET raw bytes.
    pub(crate) async fn get_bytes(&self, url: Url) -> Result<Vec<u8>> {
        debug!(url = %url, "Azure DevOps GET (bytes) request");
        let response = self
            .send(self.request(Method::GET, url, OCTET_STREAM))
            .await?;
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| Error::Http(e.to_string()))
    }

    /// GET a plain text body.
    pub(crate) async fn get_text(&self, url: Url) -> Result<String> {
        debug!(url = %url, "Azure DevOps GET (text) request");
        let response = self
            .send(self.request(Method::GET, url, "text/plain"))
            .await?;
        response.text().await.map_err(|e| Error::Http(e.to_string()))
    }
}

#[async_trait]
impl DevOpsClient for AzureDevOpsClient {
    fn organization_url(&self) -> &str {
        &self.org_url
    }

    fn default_project(&self) -> Option<&str> {
        self.default_project.as_deref()
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn basic_auth(pat: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!(":{}", pat.trim())))
}

/// Derive a service host (`vsrm`, `vssps`) from the organization URL.
///
/// Hosts that match neither cloud pattern (on-premises servers) are kept.
fn service_host(org_url: &str, service: &str) -> String {
    if let Some((scheme, rest)) = org_url.split_once("://dev.azure.com") {
        return format!("{}://{}.dev.azure.com{}", scheme, service, rest);
    }

    if let Ok(mut url) = Url::parse(org_url) {
        let host = url.host_str().map(str::to_string);
        if let Some(org) = host.as_deref().and_then(|h| h.strip_suffix(".visualstudio.com")) {
            let new_host = format!("{}.{}.visualstudio.com", org, service);
            if url.set_host(Some(&new_host)).is_ok() {
                return url.to_string().trim_end_matches('/').to_string();
            }
        }
    }

    org_url.to_string()
}

fn endpoint(base: &str, scope: &[&str], path: &[&str], query: &[(&str, &str)]) -> Result<Url> {
    let mut url =
        Url::parse(base).map_err(|e| Error::Config(format!("Invalid URL '{}': {}", base, e)))?;

    url.path_segments_mut()
        .map_err(|_| Error::Config(format!("URL cannot be a base: {}", base)))?
        .pop_if_empty()
        .extend(scope)
        .push("_apis")
        .extend(path);

    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
        if !query.iter().any(|(key, _)| *key == "api-version") {
            pairs.append_pair("api-version", API_VERSION);
        }
    }

    Ok(url)
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
}

fn etag_of(response: &Response) -> Option<String> {
    response
        .headers()
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Azure DevOps errors are JSON with a `message` field; anything else is kept raw.
fn error_message(body: &str, reason: Option<&str>) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    match from_json {
        Some(message) => message,
        None if body.trim().is_empty() => reason.unwrap_or("request failed").to_string(),
        None => body.trim().to_string(),
    }
}

/// Normalize a timestamp to ISO 8601 UTC with millisecond precision.
///
/// Unparseable input is passed through untouched.
pub(crate) fn iso_date(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.and_utc())
        });

    Some(match parsed {
        Ok(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        Err(_) => raw.to_string(),
    })
}

/// Map an embedded identity reference to a [`User`].
pub(crate) fn map_identity(identity: &AzIdentityRef) -> Option<User> {
    let display_name = identity
        .display_name
        .clone()
        .or_else(|| identity.unique_name.clone())?;
    Some(User {
        id: identity.id.clone().unwrap_or_default(),
        display_name,
        unique_name: identity.unique_name.clone(),
        email: identity
            .unique_name
            .clone()
            .filter(|name| name.contains('@')),
        is_active: None,
    })
}

/// Display name of an optional identity reference.
pub(crate) fn identity_name(identity: Option<&AzIdentityRef>) -> Option<String> {
    identity.and_then(|i| i.display_name.clone().or_else(|| i.unique_name.clone()))
}

/// Strip the `refs/heads/` prefix from a branch ref.
pub(crate) fn short_ref(name: &str) -> String {
    name.strip_prefix("refs/heads/").unwrap_or(name).to_string()
}

/// Qualify a branch name as `refs/heads/<name>`.
pub(crate) fn full_ref(branch: &str) -> String {
    if branch.starts_with("refs/") {
        branch.to_string()
    } else {
        format!("refs/heads/{}", branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_host_dev_azure_com() {
        assert_eq!(
            service_host("https://dev.azure.com/contoso", "vsrm"),
            "https://vsrm.dev.azure.com/contoso"
        );
        assert_eq!(
            service_host("https://dev.azure.com/contoso", "vssps"),
            "https://vssps.dev.azure.com/contoso"
        );
    }

    #[test]
    fn test_service_host_visualstudio_com() {
        assert_eq!(
            service_host("https://contoso.visualstudio.com", "vsrm"),
            "https://contoso.vsrm.visualstudio.com"
        );
    }

    #[test]
    fn test_service_host_on_premises_is_unchanged() {
        assert_eq!(
            service_host("https://tfs.example.com/tfs/DefaultCollection", "vsrm"),
            "https://tfs.example.com/tfs/DefaultCollection"
        );
    }

    #[test]
    fn test_basic_auth_uses_empty_user() {
        assert_eq!(basic_auth("pat-123"), "Basic OnBhdC0xMjM=");
        assert_eq!(basic_auth(" pat-123\n"), "Basic OnBhdC0xMjM=");
    }

    #[test]
    fn test_endpoint_builds_scoped_url_with_api_version() {
        let url = endpoint(
            "https://dev.azure.com/contoso",
            &["My Project"],
            &["wit", "workitems", "42"],
            &[("$expand", "relations")],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://dev.azure.com/contoso/My%20Project/_apis/wit/workitems/42?%24expand=relations&api-version=7.1"
        );
    }

    #[test]
    fn test_endpoint_keeps_explicit_api_version() {
        let url = endpoint(
            "https://dev.azure.com/contoso/",
            &[],
            &["connectionData"],
            &[("api-version", "7.1-preview.1")],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://dev.azure.com/contoso/_apis/connectionData?api-version=7.1-preview.1"
        );
    }

    #[test]
    fn test_endpoint_rejects_invalid_base() {
        let err = endpoint("not a url", &[], &["projects"], &[]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_iso_date_normalization() {
        assert_eq!(
            iso_date(Some("2024-01-01T10:00:00Z")),
            Some("2024-01-01T10:00:00.000Z".to_string())
        );
        assert_eq!(
            iso_date(Some("2024-01-15T10:30:00.1234567Z")),
            Some("2024-01-15T10:30:00.123Z".to_string())
        );
        assert_eq!(
            iso_date(Some("2024-01-01T12:00:00+02:00")),
            Some("2024-01-01T10:00:00.000Z".to_string())
        );
        assert_eq!(
            iso_date(Some("2024-03-04T05:06:07")),
            Some("2024-03-04T05:06:07.000Z".to_string())
        );
        assert_eq!(iso_date(Some("yesterday")), Some("yesterday".to_string()));
        assert_eq!(iso_date(Some("")), None);
        assert_eq!(iso_date(None), None);
    }

    #[test]
    fn test_error_message_prefers_json_message() {
        assert_eq!(
            error_message(r#"{"$id":"1","message":"TF401232: Work item 9 does not exist."}"#, None),
            "TF401232: Work item 9 does not exist."
        );
        assert_eq!(error_message("plain failure", None), "plain failure");
        assert_eq!(error_message("", Some("Not Found")), "Not Found");
    }

    #[test]
    fn test_refs() {
        assert_eq!(short_ref("refs/heads/main"), "main");
        assert_eq!(short_ref("main"), "main");
        assert_eq!(full_ref("main"), "refs/heads/main");
        assert_eq!(full_ref("refs/heads/main"), "refs/heads/main");
    }

    #[test]
    fn test_map_identity() {
        let user = map_identity(&AzIdentityRef {
            id: Some("u1".to_string()),
            display_name: Some("Jane Doe".to_string()),
            unique_name: Some("jane@contoso.com".to_string()),
            is_container: None,
        })
        .unwrap();
        assert_eq!(user.display_name, "Jane Doe");
        assert_eq!(user.email.as_deref(), Some("jane@contoso.com"));

        assert!(map_identity(&AzIdentityRef::default()).is_none());
    }

    #[test]
    fn test_default_project_blank_is_none() {
        let client =
            AzureDevOpsClient::with_base_url("http://localhost", "pat", Some("  ".to_string()))
                .unwrap();
        assert_eq!(client.default_project(), None);
        assert!(client.resolve_project(None).is_err());
        assert_eq!(client.resolve_project(Some("Other")).unwrap(), "Other");
    }

    #[test]
    fn test_new_derives_service_hosts() {
        let client =
            AzureDevOpsClient::new("https://dev.azure.com/contoso/", "pat", None).unwrap();
        assert_eq!(client.organization_url(), "https://dev.azure.com/contoso");
        assert_eq!(client.release_base, "https://vsrm.dev.azure.com/contoso");
        assert_eq!(client.identity_base, "https://vssps.dev.azure.com/contoso");
    }

    mod integration {
        use super::*;
        use httpmock::prelude::*;

        #[tokio::test]
        async fn test_requests_carry_basic_auth() {
            let server = MockServer::start();
            let mock = server.mock(|when, then| {
                when.method(GET)
                    .path("/_apis/projects")
                    .header("authorization", "Basic OnRlc3QtcGF0")
                    .query_param("api-version", "7.1");
                then.status(200)
                    .json_body(serde_json::json!({"count": 0, "value": []}));
            });

            let client = AzureDevOpsClient::with_base_url(server.base_url(), "test-pat", None)
                .unwrap();
            let url = client.api_url(&[], &["projects"], &[]).unwrap();
            let body: Value = client.get(url).await.unwrap();

            mock.assert();
            assert_eq!(body["count"], 0);
        }

        #[tokio::test]
        async fn test_error_statuses_are_mapped() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/_apis/missing");
                then.status(404)
                    .json_body(serde_json::json!({"message": "VS800075: not here"}));
            });
            server.mock(|when, then| {
                when.method(GET).path("/_apis/secret");
                then.status(401).body("");
            });

            let client =
                AzureDevOpsClient::with_base_url(server.base_url(), "pat", None).unwrap();

            let err = client
                .get::<Value>(client.api_url(&[], &["missing"], &[]).unwrap())
                .await
                .unwrap_err();
            assert!(err.is_not_found());
            assert_eq!(err.to_string(), "Not found: VS800075: not here");

            let err = client
                .get::<Value>(client.api_url(&[], &["secret"], &[]).unwrap())
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Auth(_)));
        }

        #[tokio::test]
        async fn test_unparseable_body_is_invalid_data() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/_apis/garbled");
                then.status(200).body("<html>sign in</html>");
            });

            let client =
                AzureDevOpsClient::with_base_url(server.base_url(), "pat", None).unwrap();
            let err = client
                .get::<Value>(client.api_url(&[], &["garbled"], &[]).unwrap())
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidData(_)));
        }

        #[tokio::test]
        async fn test_delete_with_empty_body() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(DELETE).path("/_apis/things/1");
                then.status(204);
            });

            let client =
                AzureDevOpsClient::with_base_url(server.base_url(), "pat", None).unwrap();
            let result: Option<Value> = client
                .delete(client.api_url(&[], &["things", "1"], &[]).unwrap())
                .await
                .unwrap();
            assert!(result.is_none());
        }
    }
}
