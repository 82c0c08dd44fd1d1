//! Stream request orchestration
//!
//! Turns one playback request into a signed redirect:
//! parameters → override → cached URL → origin path (or fallback) → mint → cache.
//! The first branch that produces a redirect or an error ends the request.

use chrono::{DateTime, Utc};
use crypto_core::{SignedToken, TokenCodec};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{AppError, Result};
use crate::metrics;
use crate::services::backend::BackendRouter;
use crate::services::clock::{Clock, SystemClock};
use crate::services::origin::MediaPathResolver;
use crate::services::overrides::OverrideResolver;
use crate::services::url_cache::UrlCache;

pub const MISSING_API_KEY: &str = "Missing emby api key";
pub const MISSING_IDENTIFIERS: &str = "Missing itemID or MediaSourceId";

/// Raw inbound parameters, as taken from the path and query string
#[derive(Debug, Clone, Default)]
pub struct StreamParams {
    pub item_id: Option<String>,
    pub media_source_id: Option<String>,
    pub api_key: Option<String>,
}

/// A validated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub item_id: String,
    pub media_source_id: String,
    pub auth_key: String,
    /// Set only when an override replaced the requested media
    pub origin_path: Option<String>,
    pub is_override: bool,
}

/// Where the redirect came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectSource {
    Cache,
    Override,
    Origin,
    Fallback,
}

impl RedirectSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedirectSource::Cache => "cache",
            RedirectSource::Override => "override",
            RedirectSource::Origin => "origin",
            RedirectSource::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
    pub source: RedirectSource,
}

/// Media chosen for signing
#[derive(Debug)]
struct ServedMedia {
    item_id: String,
    media_source_id: String,
    path: String,
    /// Override and fallback paths are already relative to the default backend
    relative: bool,
    source: RedirectSource,
}

pub struct StreamOrchestrator {
    cache: Arc<UrlCache>,
    overrides: Arc<OverrideResolver>,
    origin: Arc<dyn MediaPathResolver>,
    codec: Arc<dyn TokenCodec>,
    backends: BackendRouter,
    max_alive_time: Duration,
    default_api_key: String,
    clock: Arc<dyn Clock>,
}

impl StreamOrchestrator {
    pub fn new(
        cache: Arc<UrlCache>,
        overrides: Arc<OverrideResolver>,
        origin: Arc<dyn MediaPathResolver>,
        codec: Arc<dyn TokenCodec>,
        backends: BackendRouter,
        max_alive_time: Duration,
        default_api_key: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            overrides,
            origin,
            codec,
            backends,
            max_alive_time,
            default_api_key: default_api_key.into(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cache(&self) -> &Arc<UrlCache> {
        &self.cache
    }

    /// Check parameters and fill in the default key
    pub fn extract(&self, params: StreamParams) -> Result<StreamRequest> {
        let auth_key = params
            .api_key
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| self.default_api_key.clone());
        if auth_key.is_empty() {
            return Err(AppError::BadRequest(MISSING_API_KEY.to_string()));
        }

        let item_id = params.item_id.unwrap_or_default();
        let media_source_id = params.media_source_id.unwrap_or_default();
        if item_id.is_empty() || media_source_id.is_empty() {
            return Err(AppError::BadRequest(MISSING_IDENTIFIERS.to_string()));
        }

        Ok(StreamRequest {
            item_id,
            media_source_id,
            auth_key,
            origin_path: None,
            is_override: false,
        })
    }

    pub async fn handle(&self, params: StreamParams) -> Result<Redirect> {
        let mut request = self.extract(params)?;
        let now = self.clock.now();

        if let Some(rule) = self.overrides.resolve_override(now) {
            info!(
                rule = %rule.name,
                key = rule.key.as_str(),
                requested_item = %request.item_id,
                item_id = %rule.item_id,
                "Special media override active"
            );
            metrics::record_override(rule.key.as_str());
            request.item_id = rule.item_id.clone();
            request.media_source_id = rule.media_source_id.clone();
            request.origin_path = Some(rule.media_path.clone());
            request.is_override = true;
        }

        let fingerprint = UrlCache::fingerprint(&request.item_id, &request.media_source_id);
        if let Some(location) = self.cached_location(&fingerprint, now) {
            return Ok(Redirect {
                location,
                source: RedirectSource::Cache,
            });
        }

        let media = self.resolve_media(request).await?;
        let location = self.mint(&media, now)?;

        if let Err(e) = self.cache.set(&fingerprint, &location) {
            warn!(fingerprint = %fingerprint, error = %e, "Signed URL not cached");
        }

        info!(
            item_id = %media.item_id,
            media_source_id = %media.media_source_id,
            source = media.source.as_str(),
            "Redirecting to signed stream URL"
        );
        Ok(Redirect {
            location,
            source: media.source,
        })
    }

    /// Cached URL whose embedded token is still valid at `now`
    fn cached_location(&self, fingerprint: &str, now: DateTime<Utc>) -> Option<String> {
        let Some(location) = self.cache.get(fingerprint) else {
            metrics::record_cache_lookup("miss");
            return None;
        };

        match self.validate_location(&location, now) {
            Ok(token) => {
                info!(
                    fingerprint = %fingerprint,
                    remaining_secs = token.remaining_secs(now.timestamp()),
                    "Serving signed URL from cache"
                );
                metrics::record_cache_lookup("hit");
                Some(location)
            }
            Err(reason) => {
                warn!(
                    fingerprint = %fingerprint,
                    reason = %reason,
                    "Cached signed URL rejected, regenerating"
                );
                metrics::record_cache_lookup("stale");
                if let Err(e) = self.cache.delete(fingerprint) {
                    warn!(fingerprint = %fingerprint, error = %e, "Stale signed URL not evicted");
                }
                None
            }
        }
    }

    fn validate_location(
        &self,
        location: &str,
        now: DateTime<Utc>,
    ) -> std::result::Result<SignedToken, String> {
        let url = Url::parse(location).map_err(|e| format!("unparseable url: {}", e))?;
        let signature = url
            .query_pairs()
            .find(|(name, _)| name == "signature")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| "no signature parameter".to_string())?;

        self.codec
            .validate(&signature, now.timestamp())
            .map_err(|e| e.to_string())
    }

    async fn resolve_media(&self, request: StreamRequest) -> Result<ServedMedia> {
        if request.is_override {
            return Ok(ServedMedia {
                item_id: request.item_id,
                media_source_id: request.media_source_id,
                path: request.origin_path.unwrap_or_default(),
                relative: true,
                source: RedirectSource::Override,
            });
        }

        let lookup = self
            .origin
            .get_media_path(&request.auth_key, &request.item_id, &request.media_source_id)
            .await;

        match lookup {
            Ok(path) => Ok(ServedMedia {
                item_id: request.item_id,
                media_source_id: request.media_source_id,
                path,
                relative: false,
                source: RedirectSource::Origin,
            }),
            Err(origin_err) => {
                metrics::record_origin_failure(origin_err.kind());

                let fallback = self
                    .overrides
                    .resolve_missing_media_fallback()
                    .filter(|rule| !rule.item_id.is_empty() && !rule.media_source_id.is_empty());
                let Some(rule) = fallback else {
                    return Err(AppError::OriginUnavailable(origin_err));
                };

                info!(
                    item_id = %request.item_id,
                    media_source_id = %request.media_source_id,
                    fallback = %rule.name,
                    error = %origin_err,
                    "Serving missing-media fallback"
                );
                metrics::record_override(rule.key.as_str());
                Ok(ServedMedia {
                    item_id: rule.item_id.clone(),
                    media_source_id: rule.media_source_id.clone(),
                    path: rule.media_path.clone(),
                    relative: true,
                    source: RedirectSource::Fallback,
                })
            }
        }
    }

    fn mint(&self, media: &ServedMedia, now: DateTime<Utc>) -> Result<String> {
        let (backend, path) = if media.relative {
            let backend = self
                .backends
                .default_backend()
                .ok_or_else(|| AppError::Internal("no backend configured".to_string()))?;
            (backend, media.path.clone())
        } else {
            self.backends
                .route_origin_path(&media.path)
                .ok_or_else(|| AppError::Internal("no backend configured".to_string()))?
        };

        let lifetime = i64::try_from(self.max_alive_time.as_secs()).unwrap_or(i64::MAX);
        let expire_at = now.timestamp().saturating_add(lifetime);

        let signature = self
            .codec
            .encrypt(Some(&media.item_id), &media.media_source_id, expire_at)
            .map_err(|e| {
                error!(item_id = %media.item_id, error = %e, "Failed to mint signed token");
                AppError::Signing(e)
            })?;

        debug!(path = %path, backend = %backend.base_url, expire_at, "Minted signed token");
        Ok(backend.stream_url(&path, &signature))
    }
}
