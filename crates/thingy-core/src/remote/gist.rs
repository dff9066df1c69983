//! HTTP client for GitHub gists and compatible blob stores.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{
    Credential, RemoteContent, RemoteError, RemoteRecord, RemoteResult, RemoteStamp, RemoteStore,
};
use crate::config::SyncSettings;
use crate::util::compact_text;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const LIST_PAGE_SIZE: usize = 100;
const MAX_LIST_PAGES: usize = 50;

#[derive(Clone)]
pub struct GistClient {
    settings: SyncSettings,
    client: Client,
}

impl GistClient {
    pub fn new(settings: SyncSettings) -> RemoteResult<Self> {
        let mut builder = Client::builder().user_agent(settings.user_agent.clone());
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|error| RemoteError::InvalidConfiguration(error.to_string()))?;
        Ok(Self { settings, client })
    }

    fn request(&self, method: Method, url: &str, credential: &Credential) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(credential.expose())
            .header(ACCEPT, GITHUB_ACCEPT)
    }

    async fn send(request: RequestBuilder) -> RemoteResult<Response> {
        let response = request.send().await.map_err(transport_error)?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &headers, &body))
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> RemoteResult<T> {
        let response = Self::send(request).await?;
        let body = response.text().await.map_err(transport_error)?;
        parse_payload(&body)
    }

    async fn fetch_raw(&self, raw_url: &str) -> RemoteResult<String> {
        let response = Self::send(self.client.get(raw_url)).await?;
        response.text().await.map_err(transport_error)
    }
}

impl RemoteStore for GistClient {
    async fn find_by_label(
        &self,
        credential: &Credential,
        label: &str,
    ) -> RemoteResult<Option<RemoteRecord>> {
        let url = self.settings.collection_url();
        for page in 1..=MAX_LIST_PAGES {
            let request = self
                .request(Method::GET, &url, credential)
                .query(&[("per_page", LIST_PAGE_SIZE), ("page", page)]);
            let summaries: Vec<GistSummary> = Self::send_json(request).await?;
            let page_len = summaries.len();

            if let Some(record) = find_label(summaries, label) {
                tracing::debug!("Found remote resource {} for '{}'", record.id, label);
                return Ok(Some(record));
            }
            if page_len < LIST_PAGE_SIZE {
                return Ok(None);
            }
        }
        // Unseen pages may still hold the label; creating now could duplicate it
        Err(RemoteError::ListingTruncated {
            pages: MAX_LIST_PAGES,
        })
    }

    async fn create(
        &self,
        credential: &Credential,
        label: &str,
        file_name: &str,
        content: &str,
    ) -> RemoteResult<RemoteStamp> {
        let body = CreateGistRequest {
            description: label,
            public: false,
            files: file_payload(file_name, content),
        };
        let request = self
            .request(Method::POST, &self.settings.collection_url(), credential)
            .json(&body);
        let stamp: GistStamp = Self::send_json(request).await?;
        Ok(stamp.into())
    }

    async fn fetch(
        &self,
        credential: &Credential,
        id: &str,
        file_name: &str,
    ) -> RemoteResult<RemoteContent> {
        let request = self.request(Method::GET, &self.settings.resource_url(id), credential);
        let detail: GistDetail = Self::send_json(request).await?;
        let updated_at = detail.updated_at;

        let content = match detail.into_file(file_name) {
            Some(GistFile {
                truncated: true,
                raw_url: Some(raw_url),
                ..
            }) => {
                tracing::debug!("Remote file {} is truncated; fetching raw content", file_name);
                Some(self.fetch_raw(&raw_url).await?)
            }
            Some(file) => file.content,
            None => None,
        };

        Ok(RemoteContent {
            content,
            updated_at,
        })
    }

    async fn update(
        &self,
        credential: &Credential,
        id: &str,
        file_name: &str,
        content: &str,
    ) -> RemoteResult<RemoteStamp> {
        let body = UpdateGistRequest {
            files: file_payload(file_name, content),
        };
        let request = self
            .request(Method::PATCH, &self.settings.resource_url(id), credential)
            .json(&body);
        let stamp: GistStamp = Self::send_json(request).await?;
        Ok(stamp.into())
    }
}

#[derive(Debug, Deserialize)]
struct GistSummary {
    id: String,
    #[serde(default)]
    description: Option<String>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct GistDetail {
    updated_at: DateTime<Utc>,
    #[serde(default)]
    files: HashMap<String, Option<GistFile>>,
}

impl GistDetail {
    fn into_file(mut self, file_name: &str) -> Option<GistFile> {
        self.files.remove(file_name).flatten()
    }
}

#[derive(Debug, Deserialize)]
struct GistFile {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    raw_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GistStamp {
    id: String,
    updated_at: DateTime<Utc>,
}

impl From<GistStamp> for RemoteStamp {
    fn from(value: GistStamp) -> Self {
        Self {
            id: value.id,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct FileContent<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateGistRequest<'a> {
    description: &'a str,
    public: bool,
    files: BTreeMap<&'a str, FileContent<'a>>,
}

#[derive(Debug, Serialize)]
struct UpdateGistRequest<'a> {
    files: BTreeMap<&'a str, FileContent<'a>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

fn file_payload<'a>(file_name: &'a str, content: &'a str) -> BTreeMap<&'a str, FileContent<'a>> {
    BTreeMap::from([(file_name, FileContent { content })])
}

fn find_label(summaries: Vec<GistSummary>, label: &str) -> Option<RemoteRecord> {
    summaries
        .into_iter()
        .find(|summary| summary.description.as_deref() == Some(label))
        .map(|summary| RemoteRecord {
            id: summary.id,
            label: label.to_string(),
            updated_at: summary.updated_at,
        })
}

fn parse_payload<T: DeserializeOwned>(body: &str) -> RemoteResult<T> {
    serde_json::from_str(body).map_err(|error| RemoteError::InvalidPayload(error.to_string()))
}

fn transport_error(error: reqwest::Error) -> RemoteError {
    RemoteError::Network(error.to_string())
}

fn status_error(status: StatusCode, headers: &HeaderMap, body: &str) -> RemoteError {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
    };
    let retry_after = header_value("retry-after").and_then(|value| value.parse().ok());
    let quota_exhausted = header_value("x-ratelimit-remaining") == Some("0");

    match status {
        StatusCode::NOT_FOUND => RemoteError::NotFound,
        StatusCode::TOO_MANY_REQUESTS => RemoteError::RateLimited { retry_after },
        StatusCode::FORBIDDEN if quota_exhausted || retry_after.is_some() => {
            RemoteError::RateLimited { retry_after }
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Auth {
            status: status.as_u16(),
            message: error_message(status, body),
        },
        _ => RemoteError::Api {
            status: status.as_u16(),
            message: error_message(status, body),
        },
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message {
            return message.trim().to_string();
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteErrorKind;
    use httpmock::Method::{GET, PATCH, POST};
    use httpmock::MockServer;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    const LABEL: &str = "THINGY Todo Data";
    const STAMP: &str = "2026-01-02T03:04:05Z";

    fn client(server: &MockServer) -> GistClient {
        let settings = SyncSettings::default()
            .with_api_base_url(server.base_url())
            .unwrap();
        GistClient::new(settings).unwrap()
    }

    fn token() -> Credential {
        Credential::new("token-a").unwrap()
    }

    fn summaries(prefix: &str, count: usize) -> serde_json::Value {
        (0..count)
            .map(|index| {
                json!({
                    "id": format!("{prefix}-{index}"),
                    "description": format!("Unrelated {index}"),
                    "updated_at": STAMP,
                })
            })
            .collect()
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn status_mapping_covers_taxonomy() {
        let none = HeaderMap::new();
        assert_eq!(
            status_error(StatusCode::NOT_FOUND, &none, ""),
            RemoteError::NotFound
        );
        assert_eq!(
            status_error(
                StatusCode::UNAUTHORIZED,
                &none,
                r#"{"message":"Bad credentials"}"#
            ),
            RemoteError::Auth {
                status: 401,
                message: "Bad credentials".to_string()
            }
        );
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, &none, "nope"),
            RemoteError::Auth { status: 403, .. }
        ));
        assert_eq!(
            status_error(
                StatusCode::FORBIDDEN,
                &headers(&[("x-ratelimit-remaining", "0")]),
                ""
            ),
            RemoteError::RateLimited { retry_after: None }
        );
        assert_eq!(
            status_error(
                StatusCode::TOO_MANY_REQUESTS,
                &headers(&[("retry-after", "30")]),
                ""
            ),
            RemoteError::RateLimited {
                retry_after: Some(30)
            }
        );
        assert_eq!(
            status_error(StatusCode::BAD_GATEWAY, &none, ""),
            RemoteError::Api {
                status: 502,
                message: "HTTP 502".to_string()
            }
        );
    }

    #[test]
    fn find_label_requires_exact_match() {
        let summaries: Vec<GistSummary> = parse_payload(
            r#"[
                {"id":"a","description":"THINGY AI Chat Data (old)","updated_at":"2024-01-01T00:00:00Z"},
                {"id":"b","description":null,"updated_at":"2024-01-01T00:00:00Z"},
                {"id":"c","description":"THINGY AI Chat Data","updated_at":"2024-01-02T00:00:00Z"},
                {"id":"d","description":"THINGY AI Chat Data","updated_at":"2024-01-03T00:00:00Z"}
            ]"#,
        )
        .unwrap();
        let record = find_label(summaries, "THINGY AI Chat Data").unwrap();
        assert_eq!(record.id, "c");
        assert_eq!(record.label, "THINGY AI Chat Data");
    }

    #[test]
    fn detail_extracts_named_file() {
        let detail: GistDetail = parse_payload(
            r#"{
                "id":"c",
                "updated_at":"2024-01-02T00:00:00Z",
                "files":{
                    "todos.json":{"filename":"todos.json","content":"{\"todos\":[]}","truncated":false},
                    "other.json":{"content":"[]"}
                }
            }"#,
        )
        .unwrap();
        let file = detail.into_file("todos.json").unwrap();
        assert_eq!(file.content.as_deref(), Some(r#"{"todos":[]}"#));
        assert!(!file.truncated);
    }

    #[test]
    fn malformed_payload_is_reported() {
        assert!(matches!(
            parse_payload::<GistStamp>("<html>"),
            Err(RemoteError::InvalidPayload(_))
        ));
    }

    #[test]
    fn create_body_is_private_and_keyed_by_file_name() {
        let body = CreateGistRequest {
            description: "THINGY Todo Data",
            public: false,
            files: file_payload("todos.json", "{}"),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "description": "THINGY Todo Data",
                "public": false,
                "files": { "todos.json": { "content": "{}" } }
            })
        );
    }

    #[tokio::test]
    async fn listing_walks_pages_until_label_found() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/gists")
                    .query_param("per_page", "100")
                    .query_param("page", "1")
                    .header("authorization", "Bearer token-a");
                then.status(200).json_body(summaries("p1", LIST_PAGE_SIZE));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(GET).path("/gists").query_param("page", "2");
                then.status(200).json_body(json!([
                    { "id": "wanted", "description": LABEL, "updated_at": STAMP }
                ]));
            })
            .await;

        let record = client(&server)
            .find_by_label(&token(), LABEL)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.id, "wanted");
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn short_page_ends_listing() {
        let server = MockServer::start_async().await;
        let page = server
            .mock_async(|when, then| {
                when.method(GET).path("/gists");
                then.status(200).json_body(summaries("p1", 3));
            })
            .await;

        let found = client(&server).find_by_label(&token(), LABEL).await.unwrap();

        assert_eq!(found, None);
        page.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn listing_cap_is_an_error_not_a_miss() {
        let server = MockServer::start_async().await;
        let pages = server
            .mock_async(|when, then| {
                when.method(GET).path("/gists");
                then.status(200).json_body(summaries("full", LIST_PAGE_SIZE));
            })
            .await;

        let result = client(&server).find_by_label(&token(), LABEL).await;

        assert_eq!(
            result,
            Err(RemoteError::ListingTruncated {
                pages: MAX_LIST_PAGES
            })
        );
        pages.assert_hits_async(MAX_LIST_PAGES).await;
    }

    #[tokio::test]
    async fn truncated_file_is_read_from_raw_url() {
        let server = MockServer::start_async().await;
        let raw_url = server.url("/raw/todos.json");
        let detail = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/gists/abc")
                    .header("authorization", "Bearer token-a");
                then.status(200).json_body(json!({
                    "id": "abc",
                    "updated_at": STAMP,
                    "files": {
                        "todos.json": {
                            "content": "{\"todos\":[",
                            "truncated": true,
                            "raw_url": raw_url,
                        }
                    }
                }));
            })
            .await;
        let raw = server
            .mock_async(|when, then| {
                when.method(GET).path("/raw/todos.json");
                then.status(200).body(r#"{"todos":[]}"#);
            })
            .await;

        let fetched = client(&server)
            .fetch(&token(), "abc", "todos.json")
            .await
            .unwrap();

        assert_eq!(fetched.content.as_deref(), Some(r#"{"todos":[]}"#));
        assert_eq!(fetched.updated_at, STAMP.parse::<DateTime<Utc>>().unwrap());
        detail.assert_async().await;
        raw.assert_async().await;
    }

    #[tokio::test]
    async fn create_and_update_send_expected_bodies() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/gists")
                    .header("authorization", "Bearer token-a")
                    .json_body(json!({
                        "description": LABEL,
                        "public": false,
                        "files": { "todos.json": { "content": "{}" } }
                    }));
                then.status(201)
                    .json_body(json!({ "id": "new-id", "updated_at": STAMP }));
            })
            .await;
        let update = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/gists/new-id")
                    .header("authorization", "Bearer token-a")
                    .json_body(json!({
                        "files": { "todos.json": { "content": "{\"todos\":[]}" } }
                    }));
                then.status(200)
                    .json_body(json!({ "id": "new-id", "updated_at": STAMP }));
            })
            .await;
        let client = client(&server);

        let created = client
            .create(&token(), LABEL, "todos.json", "{}")
            .await
            .unwrap();
        let updated = client
            .update(&token(), &created.id, "todos.json", r#"{"todos":[]}"#)
            .await
            .unwrap();

        assert_eq!(created.id, "new-id");
        assert_eq!(updated.id, "new-id");
        create.assert_async().await;
        update.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_token_maps_to_auth_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gists/abc");
                then.status(401)
                    .json_body(json!({ "message": "Bad credentials" }));
            })
            .await;

        let error = client(&server)
            .fetch(&token(), "abc", "todos.json")
            .await
            .unwrap_err();

        assert_eq!(error.kind(), RemoteErrorKind::Auth);
    }
}
