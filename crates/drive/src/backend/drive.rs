//! Google Drive v3 backend.
//!
//! Talks to the REST API directly with `reqwest`. Every request first takes a
//! permit from a semaphore, which bounds how many provider calls are in flight
//! across all concurrent users.

use crate::auth::ServiceAccount;
use crate::backend::{ChunkStream, LIST_PAGE_SIZE, SourceProvider};
use crate::error::{ErrorKind, Result};
use crate::models::{DownloadChunk, DownloadFormat, FileMetadata, RemoteEntry, WireFile, WireFileList};
use crate::query;
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::instrument;

pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/drive/v3";
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, size, parents)";
const METADATA_FIELDS: &str = "name, size, mimeType, webViewLink, modifiedTime, parents";

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// Google Drive storage backend.
///
/// # Examples
///
/// ```no_run
/// use drivebot_drive::auth::{READONLY_SCOPE, ServiceAccount, ServiceAccountKey};
/// use drivebot_drive::backend::DriveBackend;
/// use std::path::Path;
/// use std::time::Duration;
///
/// # async fn example() -> drivebot_drive::error::Result<()> {
/// let key = ServiceAccountKey::discover("GOOGLE_CREDENTIALS", Path::new("service_key.json")).await?;
/// let account = ServiceAccount::new(key, READONLY_SCOPE)?;
/// let backend = DriveBackend::new("drive", account, None::<String>, 8, Duration::from_secs(300))?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DriveBackend {
    name: String,
    http: reqwest::Client,
    api_url: String,
    account: Arc<ServiceAccount>,
    /// Rate limiter for concurrent provider requests.
    rate_limiter: Arc<Semaphore>,
}

impl DriveBackend {
    /// Create a new Drive backend.
    ///
    /// # Arguments
    /// * `name` - A name for this backend (used in logging)
    /// * `account` - Service account used to mint access tokens
    /// * `api_url` - Override of the API base URL (defaults to [`DEFAULT_API_URL`])
    /// * `max_concurrent` - Upper bound on requests in flight at once
    /// * `timeout` - Per-request timeout; downloads of large chunks can be slow
    pub fn new(
        name: impl Into<String>,
        account: ServiceAccount,
        api_url: Option<impl Into<String>>,
        max_concurrent: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .or_raise(|| ErrorKind::Network("failed to build HTTP client".to_string()))?;
        let api_url = api_url.map(Into::into).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Ok(Self {
            name: name.into(),
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            account: Arc::new(account),
            rate_limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
        })
    }

    /// Acquire a rate limiter permit before making an API call.
    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit> {
        self.rate_limiter
            .clone()
            .acquire_owned()
            .await
            .or_raise(|| ErrorKind::Network("request limiter closed".to_string()))
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/files/{}", self.api_url, file_id)
    }

    /// Attach credentials, send, and turn non-success statuses into errors.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.account.token(&self.http).await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .or_raise(|| ErrorKind::Network("request to provider failed".to_string()))?;
        Self::check(response).await
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.error.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        if status == StatusCode::NOT_FOUND {
            exn::bail!(ErrorKind::NotFound(message));
        }
        exn::bail!(ErrorKind::Api {
            status: status.as_u16(),
            message,
        });
    }

    async fn list(&self, q: String, limit: usize, order_by: Option<&str>) -> Result<Vec<RemoteEntry>> {
        let _permit = self.acquire_permit().await?;
        let mut params = vec![
            ("q", q),
            ("pageSize", limit.to_string()),
            ("fields", LIST_FIELDS.to_string()),
        ];
        if let Some(order) = order_by {
            params.push(("orderBy", order.to_string()));
        }
        let request = self.http.get(format!("{}/files", self.api_url)).query(&params);
        let list: WireFileList = self
            .send(request)
            .await?
            .json()
            .await
            .or_raise(|| ErrorKind::InvalidData("file list"))?;
        Ok(list.files.into_iter().map(RemoteEntry::from).collect())
    }

    /// Fetch one byte range. Returns the bytes and the total size declared by
    /// `Content-Range` (or the body length when the server ignored the range).
    async fn fetch_range(&self, file_id: &str, start: u64, end: u64) -> Result<(Vec<u8>, u64)> {
        let _permit = self.acquire_permit().await?;
        let token = self.account.token(&self.http).await?;
        let response = self
            .http
            .get(self.file_url(file_id))
            .query(&[("alt", "media")])
            .header(RANGE, format!("bytes={start}-{end}"))
            .bearer_auth(token)
            .send()
            .await
            .or_raise(|| ErrorKind::Network("chunk request failed".to_string()))?;
        // Ranged reads of an empty file are unsatisfiable; the file is complete.
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE && start == 0 {
            return Ok((Vec::new(), 0));
        }
        let response = Self::check(response).await?;
        let partial = response.status() == StatusCode::PARTIAL_CONTENT;
        let declared = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);
        let data = response
            .bytes()
            .await
            .or_raise(|| ErrorKind::Network("chunk body interrupted".to_string()))?
            .to_vec();
        let total = match (partial, declared) {
            (true, Some(total)) => total,
            // A full (200) response: the body is the whole file.
            _ => start + data.len() as u64,
        };
        Ok((data, total))
    }

    async fn export(&self, file_id: &str, mime: &str) -> Result<Vec<u8>> {
        let _permit = self.acquire_permit().await?;
        let request = self.http.get(format!("{}/export", self.file_url(file_id))).query(&[("mimeType", mime)]);
        let bytes = self
            .send(request)
            .await?
            .bytes()
            .await
            .or_raise(|| ErrorKind::Network("export body interrupted".to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Extracts the complete length from a `Content-Range` header value such as
/// `bytes 0-5242879/73400320`. An unknown length (`*`) yields `None`.
fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

#[async_trait]
impl SourceProvider for DriveBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(provider = %self.name))]
    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteEntry>> {
        self.list(query::children_of(folder_id), LIST_PAGE_SIZE as usize, None).await
    }

    #[instrument(skip(self), fields(provider = %self.name))]
    async fn metadata(&self, file_id: &str) -> Result<FileMetadata> {
        let _permit = self.acquire_permit().await?;
        let request = self.http.get(self.file_url(file_id)).query(&[("fields", METADATA_FIELDS)]);
        let file: WireFile = self
            .send(request)
            .await?
            .json()
            .await
            .or_raise(|| ErrorKind::InvalidData("file metadata"))?;
        Ok(file.into())
    }

    #[instrument(skip(self), fields(provider = %self.name))]
    async fn search(&self, needle: &str, limit: usize) -> Result<Vec<RemoteEntry>> {
        self.list(query::name_contains(needle), limit, Some("name")).await
    }

    fn download<'a>(&'a self, file_id: &'a str, format: DownloadFormat, chunk_size: u64) -> ChunkStream<'a> {
        let chunk_size = chunk_size.max(1);
        Box::pin(stream! {
            match format {
                DownloadFormat::Export(mime) => match self.export(file_id, mime).await {
                    Ok(data) => {
                        let received = data.len() as u64;
                        yield Ok(DownloadChunk { data, received, total: Some(received) });
                    },
                    Err(e) => yield Err(e),
                },
                DownloadFormat::Raw => {
                    let mut offset = 0u64;
                    loop {
                        let end = offset + chunk_size - 1;
                        let (data, total) = match self.fetch_range(file_id, offset, end).await {
                            Ok(piece) => piece,
                            Err(e) => {
                                yield Err(e);
                                break;
                            },
                        };
                        let length = data.len() as u64;
                        offset += length;
                        tracing::trace!(file_id, received = offset, total, "Downloaded chunk");
                        yield Ok(DownloadChunk { data, received: offset, total: Some(total) });
                        if length == 0 || offset >= total {
                            break;
                        }
                    }
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("bytes 0-5242879/73400320", Some(73_400_320))]
    #[case("bytes 0-9/10", Some(10))]
    #[case("bytes */0", Some(0))]
    #[case("bytes 0-9/*", None)]
    #[case("garbage", None)]
    fn test_parse_content_range_total(#[case] header: &str, #[case] expected: Option<u64>) {
        assert_eq!(parse_content_range_total(header), expected);
    }

    #[test]
    fn test_api_error_body_parses() {
        let body = r#"{"error": {"code": 404, "message": "File not found: xyz.", "errors": []}}"#;
        let parsed: ApiErrorBody = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message, "File not found: xyz.");
    }
}
