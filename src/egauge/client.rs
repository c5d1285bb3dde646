use async_trait::async_trait;
use chrono_tz::Tz;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::egauge::parse::parse_snapshot;
use crate::error::{AppError, FetchError};
use crate::models::{Project, Snapshot};

/// Instantaneous and total register values.
pub const SNAPSHOT_PATH: &str = "cgi-bin/egauge?inst&tot";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest response body read from a device. A snapshot is a few kilobytes.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Anything that can produce a device snapshot for a project.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, project: Arc<Project>) -> Result<Snapshot, FetchError>;
}

/// HTTP client for eGauge meters.
#[derive(Debug, Clone)]
pub struct SnapshotClient {
    http: Client,
    timezone: Tz,
}

impl SnapshotClient {
    pub fn new(timeout: Duration, timezone: Tz) -> Result<Self, AppError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, timezone })
    }

    /// `endpoint` is a device base URL ending with `/`, as stored by the
    /// project registry.
    pub async fn fetch_snapshot(
        &self,
        endpoint: &str,
        username: &str,
        password: &str,
    ) -> Result<Snapshot, FetchError> {
        let url = snapshot_url(endpoint);
        debug!(url = %url, "requesting snapshot");

        let mut response = self
            .http
            .get(&url)
            .basic_auth(username, Some(password))
            .send()
            .await
            .map_err(FetchError::Transport)?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Protocol(response.status()));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_BODY_BYTES as u64 {
                return Err(body_too_large());
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(FetchError::Transport)? {
            if body.len() + chunk.len() > MAX_BODY_BYTES {
                return Err(body_too_large());
            }
            body.extend_from_slice(&chunk);
        }

        parse_snapshot(&String::from_utf8_lossy(&body), self.timezone)
    }
}

#[async_trait]
impl SnapshotSource for SnapshotClient {
    async fn fetch(&self, project: Arc<Project>) -> Result<Snapshot, FetchError> {
        self.fetch_snapshot(&project.endpoint, &project.username, &project.password)
            .await
    }
}

fn body_too_large() -> FetchError {
    FetchError::Parse(format!("response body exceeds {} bytes", MAX_BODY_BYTES))
}

/// Snapshot URL under a normalized endpoint.
pub fn snapshot_url(endpoint: &str) -> String {
    format!("{}{}", endpoint, SNAPSHOT_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_url() {
        assert_eq!(
            snapshot_url("https://egauge82252.egaug.es/632E1/"),
            "https://egauge82252.egaug.es/632E1/cgi-bin/egauge?inst&tot"
        );
        assert_eq!(
            snapshot_url("http://10.0.0.5/"),
            "http://10.0.0.5/cgi-bin/egauge?inst&tot"
        );
    }

    #[tokio::test]
    async fn test_invalid_url_is_transport_error() {
        let client = SnapshotClient::new(DEFAULT_REQUEST_TIMEOUT, chrono_tz::UTC).unwrap();
        let err = client.fetch_snapshot("not a url", "", "").await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
