//! JSON-over-HTTP backup service client.
//!
//! Routes, relative to the configured base URL:
//!
//! | call             | request                                 |
//! |------------------|-----------------------------------------|
//! | `fetch`          | `GET  /v1/backups/{sync_id}`            |
//! | `write`          | `PUT  /v1/backups/{sync_id}`            |
//! | `append_version` | `POST /v1/trips/{trip_id}/versions`     |
//! | `list_versions`  | `GET  /v1/trips/{trip_id}/versions`     |
//! | `search_versions`| `GET  /v1/versions?q={query}`           |

use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::Deserialize;

use super::usage::{StoreCall, UsageCounter};
use super::{parse_version_payloads, RemoteStore};
use crate::error::{Error, Result};
use crate::models::{Dataset, SyncId, TripId, TripVersion};
use crate::util::{compact_text, is_http_url, normalize_text_option};

const STORE_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Clone)]
pub struct HttpStore {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
    usage: UsageCounter,
}

impl std::fmt::Debug for HttpStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpStore")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpStore {
    pub fn new(base_url: &str, api_key: Option<String>, usage: UsageCounter) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(STORE_HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|error| Error::RemoteUnavailable(error.to_string()))?;
        Ok(Self {
            base_url,
            api_key: normalize_text_option(api_key),
            client,
            usage,
        })
    }

    fn backup_url(&self, sync_id: &SyncId) -> String {
        format!(
            "{}/v1/backups/{}",
            self.base_url,
            urlencoding::encode(sync_id.as_str())
        )
    }

    fn trip_versions_url(&self, trip_id: &TripId) -> String {
        format!(
            "{}/v1/trips/{}/versions",
            self.base_url,
            urlencoding::encode(trip_id.as_str())
        )
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/v1/versions?q={}",
            self.base_url,
            urlencoding::encode(query.trim())
        )
    }

    fn version_prefix_url(&self, prefix: &str) -> String {
        format!(
            "{}/v1/versions?id_prefix={}",
            self.base_url,
            urlencoding::encode(prefix.trim())
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.api_key {
            Some(api_key) => request.bearer_auth(api_key),
            None => request,
        }
    }

    async fn send(&self, call: StoreCall, request: reqwest::RequestBuilder) -> Result<Response> {
        self.usage.record(call);
        request
            .send()
            .await
            .map_err(|error| Error::RemoteUnavailable(format!("{call:?} request failed: {error}")))
    }

    async fn read_versions(&self, call: StoreCall, url: &str) -> Result<Vec<TripVersion>> {
        let response = self.send(call, self.request(reqwest::Method::GET, url)).await?;
        let response = ensure_success(response).await?;
        let payloads = response
            .json::<Vec<serde_json::Value>>()
            .await
            .map_err(|error| Error::RemoteUnavailable(format!("invalid version list: {error}")))?;
        Ok(parse_version_payloads(payloads))
    }
}

impl RemoteStore for HttpStore {
    async fn fetch(&self, sync_id: &SyncId) -> Result<Option<Dataset>> {
        let url = self.backup_url(sync_id);
        let response = self
            .send(StoreCall::Fetch, self.request(reqwest::Method::GET, &url))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("No remote backup stored for {}", sync_id);
            return Ok(None);
        }

        let body = ensure_success(response)
            .await?
            .text()
            .await
            .map_err(|error| Error::RemoteUnavailable(format!("failed to read backup: {error}")))?;
        Dataset::from_json(&body).map(Some)
    }

    async fn write(&self, sync_id: &SyncId, dataset: &Dataset) -> Result<()> {
        let url = self.backup_url(sync_id);
        let response = self
            .send(
                StoreCall::Write,
                self.request(reqwest::Method::PUT, &url).json(dataset),
            )
            .await?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED
        ) {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::WriteConflict(parse_api_error(status, &body)));
        }
        ensure_success(response).await?;
        Ok(())
    }

    async fn append_version(&self, trip_id: &TripId, version: &TripVersion) -> Result<()> {
        let url = self.trip_versions_url(trip_id);
        let response = self
            .send(
                StoreCall::AppendVersion,
                self.request(reqwest::Method::POST, &url).json(version),
            )
            .await?;
        if response.status() == StatusCode::CONFLICT {
            return Err(Error::InvalidInput(format!(
                "version {} already exists",
                version.id
            )));
        }
        ensure_success(response).await?;
        Ok(())
    }

    async fn list_versions(&self, trip_id: &TripId) -> Result<Vec<TripVersion>> {
        let url = self.trip_versions_url(trip_id);
        self.read_versions(StoreCall::ListVersions, &url).await
    }

    async fn search_versions(&self, query: &str) -> Result<Vec<TripVersion>> {
        let url = self.search_url(query);
        self.read_versions(StoreCall::SearchVersions, &url).await
    }

    async fn versions_by_id_prefix(&self, prefix: &str) -> Result<Vec<TripVersion>> {
        let url = self.version_prefix_url(prefix);
        self.read_versions(StoreCall::FindVersion, &url).await
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(Error::RemoteUnavailable(parse_api_error(status, &body)))
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let base_url = normalize_text_option(Some(raw.to_string())).ok_or_else(|| {
        Error::InvalidInput("backup store URL must not be empty".to_string())
    })?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "backup store URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> HttpStore {
        HttpStore::new(
            "https://backup.example.com/",
            Some("secret".to_string()),
            UsageCounter::default(),
        )
        .unwrap()
    }

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url("").is_err());
        assert!(normalize_base_url("backup.example.com").is_err());
        assert_eq!(
            normalize_base_url(" https://backup.example.com/ ").unwrap(),
            "https://backup.example.com"
        );
    }

    #[test]
    fn urls_are_built_from_base_and_encoded() {
        let store = store();
        let sync_id = SyncId::parse("FAMILY-2025").unwrap();
        assert_eq!(
            store.backup_url(&sync_id),
            "https://backup.example.com/v1/backups/FAMILY-2025"
        );
        assert_eq!(
            store.trip_versions_url(&"a b/c".into()),
            "https://backup.example.com/v1/trips/a%20b%2Fc/versions"
        );
        assert_eq!(
            store.search_url(" flight change "),
            "https://backup.example.com/v1/versions?q=flight%20change"
        );
        assert_eq!(
            store.version_prefix_url("0192a3b4"),
            "https://backup.example.com/v1/versions?id_prefix=0192a3b4"
        );
    }

    #[test]
    fn debug_redacts_api_key() {
        let debug = format!("{:?}", store());
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn parse_api_error_prefers_message_field() {
        assert_eq!(
            parse_api_error(StatusCode::CONFLICT, r#"{"message":" stale etag "}"#),
            "stale etag (409)"
        );
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, ""),
            "HTTP 502"
        );
        assert_eq!(
            parse_api_error(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            "boom (500)"
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_remote_unavailable_and_counted() {
        let usage = UsageCounter::default();
        let store = HttpStore::new("http://127.0.0.1:9", None, usage.clone()).unwrap();
        let sync_id = SyncId::parse("NET-0001").unwrap();

        let error = store.fetch(&sync_id).await.unwrap_err();

        assert!(matches!(error, Error::RemoteUnavailable(_)));
        assert_eq!(usage.snapshot().fetches, 1);
    }
}
