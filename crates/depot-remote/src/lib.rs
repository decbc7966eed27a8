//! # depot-remote — HTTP Upstream Client
//!
//! [`RemoteRepository`] implements the proxy store's [`Upstream`] trait
//! against a Maven-layout HTTP repository.
//!
//! ## Requests
//!
//! | Operation       | Request                                        |
//! |-----------------|------------------------------------------------|
//! | `last_modified` | `HEAD {base}/{repository path}`                |
//! | `fetch`         | `GET {base}/{repository path}` (streamed)      |
//! | `metadata`      | `GET {base}/{path}/maven-metadata.xml`         |
//! | `catalog`       | `GET {base}/archetype-catalog.xml`             |
//!
//! Timestamps come from the `Last-Modified` response header. Transport
//! errors are retried with backoff; HTTP statuses are not.

pub mod config;
pub mod error;
pub(crate) mod retry;

pub use config::{ConfigError, RemoteConfig};
pub use error::RemoteError;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use reqwest::header::{CONTENT_LENGTH, LAST_MODIFIED};
use reqwest::{Response, StatusCode};
use tokio_util::io::StreamReader;

use depot_core::{time, ArchetypeCatalog, Coordinate, Metadata, StoreResult, CATALOG_FILE, METADATA_FILE};
use depot_store::{ArtifactContent, Upstream};

/// Client for one upstream repository.
#[derive(Debug, Clone)]
pub struct RemoteRepository {
    http: reqwest::Client,
    config: RemoteConfig,
    endpoint: String,
}

impl RemoteRepository {
    /// Create a client from configuration.
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("depot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self {
            http,
            endpoint: config.base_url.to_string(),
            config,
        })
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    async fn send(&self, method: reqwest::Method, path: &str) -> Result<Response, RemoteError> {
        let endpoint = format!("{method} {path}");
        let url = self.config.url_for(path);
        let resp = retry::retry_send(self.config.max_retries, || {
            self.http.request(method.clone(), &url).send()
        })
        .await
        .map_err(|e| RemoteError::Http {
            endpoint: endpoint.clone(),
            source: e,
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            if status != StatusCode::NOT_FOUND {
                tracing::debug!(url = %url, status = status.as_u16(), "upstream request rejected");
            }
            return Err(RemoteError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }

    /// Fetch a small XML document as text.
    async fn document(&self, path: &str) -> Result<(String, DateTime<Utc>), RemoteError> {
        let resp = self.send(reqwest::Method::GET, path).await?;
        let modified = last_modified(&resp).unwrap_or_else(time::now);
        let text = resp.text().await.map_err(|e| RemoteError::Http {
            endpoint: format!("GET {path}"),
            source: e,
        })?;
        Ok((text, modified))
    }
}

/// `Last-Modified` of a response, if present and parseable.
fn last_modified(resp: &Response) -> Option<DateTime<Utc>> {
    resp.headers()
        .get(LAST_MODIFIED)?
        .to_str()
        .ok()
        .and_then(time::parse_http_date)
}

fn content_length(resp: &Response) -> Option<u64> {
    resp.headers()
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

#[async_trait]
impl Upstream for RemoteRepository {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn last_modified(&self, coordinate: &Coordinate) -> StoreResult<DateTime<Utc>> {
        let resp = self
            .send(reqwest::Method::HEAD, &coordinate.repository_path())
            .await?;
        // Without a header the copy we already hold is as good as any.
        Ok(last_modified(&resp).unwrap_or_default())
    }

    async fn fetch(&self, coordinate: &Coordinate) -> StoreResult<ArtifactContent> {
        let path = coordinate.repository_path();
        let resp = self.send(reqwest::Method::GET, &path).await?;
        let modified = last_modified(&resp).unwrap_or_else(time::now);

        match content_length(&resp) {
            Some(size) => {
                let stream = Box::pin(resp.bytes_stream().map_err(std::io::Error::other));
                Ok(ArtifactContent {
                    reader: Box::new(StreamReader::new(stream)),
                    size,
                    last_modified: modified,
                })
            }
            None => {
                let bytes = resp.bytes().await.map_err(|e| RemoteError::Http {
                    endpoint: format!("GET {path}"),
                    source: e,
                })?;
                Ok(ArtifactContent::from_bytes(bytes, modified))
            }
        }
    }

    async fn metadata(&self, path: &str) -> StoreResult<(Metadata, DateTime<Utc>)> {
        let document_path = format!("{}/{METADATA_FILE}", path.trim_matches('/'));
        let (text, modified) = self.document(&document_path).await?;
        let metadata = Metadata::from_xml(&text).map_err(|e| RemoteError::InvalidDocument {
            endpoint: format!("GET {document_path}"),
            reason: e.to_string(),
        })?;
        Ok((metadata, modified))
    }

    async fn catalog(&self) -> StoreResult<(ArchetypeCatalog, DateTime<Utc>)> {
        let (text, modified) = self.document(CATALOG_FILE).await?;
        let catalog = ArchetypeCatalog::from_xml(&text).map_err(|e| RemoteError::InvalidDocument {
            endpoint: format!("GET {CATALOG_FILE}"),
            reason: e.to_string(),
        })?;
        Ok((catalog, modified))
    }
}
