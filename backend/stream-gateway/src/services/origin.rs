//! Origin metadata lookup
//!
//! Resolves `(item_id, media_source_id)` to the file path the media server
//! stores it under. The gateway only needs the path; everything else in the
//! playback info response is ignored.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum OriginError {
    /// The origin answered but has no such item or media source
    #[error("media not found: {0}")]
    NotFound(String),

    #[error("origin request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection, HTTP status or decoding failure
    #[error("origin request failed: {0}")]
    Transport(String),
}

impl OriginError {
    pub fn kind(&self) -> &'static str {
        match self {
            OriginError::NotFound(_) => "not_found",
            OriginError::Timeout(_) => "timeout",
            OriginError::Transport(_) => "transport",
        }
    }
}

#[async_trait]
pub trait MediaPathResolver: Send + Sync {
    /// `auth_key` is forwarded to the origin as-is
    async fn get_media_path(
        &self,
        auth_key: &str,
        item_id: &str,
        media_source_id: &str,
    ) -> Result<String, OriginError>;
}

#[derive(Debug, Deserialize)]
struct PlaybackInfo {
    #[serde(rename = "MediaSources", default)]
    media_sources: Vec<MediaSource>,
}

#[derive(Debug, Deserialize)]
struct MediaSource {
    #[serde(rename = "Id", default)]
    id: String,
    #[serde(rename = "Path", default)]
    path: Option<String>,
}

/// Emby `PlaybackInfo` client
#[derive(Clone)]
pub struct EmbyClient {
    base_url: String,
    http_client: Client,
    timeout: Duration,
}

impl EmbyClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, OriginError> {
        Url::parse(base_url)
            .map_err(|e| OriginError::Transport(format!("invalid origin url {}: {}", base_url, e)))?;

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OriginError::Transport(format!("Failed to create HTTP client: {e}")))?;

        info!(origin = %base_url, timeout_secs = timeout.as_secs(), "Emby client initialized");

        Ok(Self {
            base_url: base_url.to_string(),
            http_client,
            timeout,
        })
    }

    fn playback_info_url(&self, item_id: &str) -> Result<Url, OriginError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| OriginError::Transport(format!("invalid origin url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| OriginError::Transport("origin url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["Items", item_id, "PlaybackInfo"]);
        Ok(url)
    }

    async fn fetch(
        &self,
        auth_key: &str,
        item_id: &str,
        media_source_id: &str,
    ) -> Result<String, OriginError> {
        let url = self.playback_info_url(item_id)?;
        info!(url = %url, media_source_id, "Fetching media path from Emby");

        let response = self
            .http_client
            .get(url)
            .query(&[("MediaSourceId", media_source_id), ("api_key", auth_key)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OriginError::Timeout(self.timeout)
                } else {
                    OriginError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(OriginError::NotFound(format!("item {}", item_id)));
        }
        if !status.is_success() {
            return Err(OriginError::Transport(format!(
                "non-200 response from Emby: {}",
                status.as_u16()
            )));
        }

        let info: PlaybackInfo = response.json().await.map_err(|e| {
            if e.is_timeout() {
                OriginError::Timeout(self.timeout)
            } else {
                OriginError::Transport(format!("Error parsing JSON response: {}", e))
            }
        })?;

        info.media_sources
            .into_iter()
            .find(|source| source.id == media_source_id)
            .and_then(|source| source.path)
            .filter(|path| !path.is_empty())
            .ok_or_else(|| {
                OriginError::NotFound(format!(
                    "media source {} of item {}",
                    media_source_id, item_id
                ))
            })
    }
}

#[async_trait]
impl MediaPathResolver for EmbyClient {
    async fn get_media_path(
        &self,
        auth_key: &str,
        item_id: &str,
        media_source_id: &str,
    ) -> Result<String, OriginError> {
        // Outer bound covers DNS and body reads the client timeout may not.
        let result = match tokio::time::timeout(
            self.timeout,
            self.fetch(auth_key, item_id, media_source_id),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(OriginError::Timeout(self.timeout)),
        };

        match &result {
            Ok(path) => debug!(item_id, media_source_id, path = %path, "Fetched original media path"),
            Err(e) if matches!(e, OriginError::NotFound(_)) => {
                warn!(item_id, media_source_id, error = %e, "Media not found on origin")
            }
            Err(e) => {
                error!(item_id, media_source_id, kind = e.kind(), error = %e, "Failed to fetch media path")
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_info_url() {
        let client = EmbyClient::new("http://127.0.0.1:8096", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.playback_info_url("100").unwrap().as_str(),
            "http://127.0.0.1:8096/Items/100/PlaybackInfo"
        );

        let prefixed = EmbyClient::new("http://emby.local/emby/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            prefixed.playback_info_url("a b").unwrap().as_str(),
            "http://emby.local/emby/Items/a%20b/PlaybackInfo"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(EmbyClient::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_playback_info_parsing() {
        let raw = r#"{"MediaSources":[{"Id":"a","Path":"/x"},{"Id":"b"}],"PlaySessionId":"s"}"#;
        let info: PlaybackInfo = serde_json::from_str(raw).unwrap();
        assert_eq!(info.media_sources.len(), 2);
        assert_eq!(info.media_sources[0].path.as_deref(), Some("/x"));
        assert_eq!(info.media_sources[1].path, None);

        let empty: PlaybackInfo = serde_json::from_str("{}").unwrap();
        assert!(empty.media_sources.is_empty());
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(OriginError::NotFound("x".into()).kind(), "not_found");
        assert_eq!(OriginError::Timeout(Duration::from_secs(1)).kind(), "timeout");
        assert_eq!(OriginError::Transport("x".into()).kind(), "transport");
    }
}
