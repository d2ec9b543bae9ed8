//! Response and cache payload types produced by the pipeline.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::CachedOutcome;
use crate::platform::{fallback_thumbnail, stream_types};
use crate::resolver::{ResolveFailure, StreamMetadata};

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    Online,
    Offline,
    Error,
}

/// Full resolution of an online stream, including playback URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamDetails {
    pub status: StreamState,
    pub title: String,
    pub author: String,
    pub thumbnail: String,
    pub best_quality: Option<String>,
    pub all_qualities: BTreeMap<String, String>,
    pub category: String,
    pub stream_id: String,
    pub platform: String,
    pub stream_types: Vec<String>,
    #[serde(rename = "_cached", skip_serializing_if = "is_false")]
    pub cached: bool,
}

/// Resolution of a stream that exists but is not live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfflineStream {
    pub status: StreamState,
    pub original_url: String,
    pub platform: String,
    #[serde(rename = "_cached", skip_serializing_if = "is_false")]
    pub cached: bool,
}

/// Body of a successful `/resolve`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Resolution {
    Online(StreamDetails),
    Offline(OfflineStream),
}

impl Resolution {
    pub fn from_metadata(url: &str, platform: &str, metadata: StreamMetadata) -> Self {
        if metadata.streams.is_empty() {
            return Resolution::Offline(OfflineStream {
                status: StreamState::Offline,
                original_url: url.to_string(),
                platform: platform.to_string(),
                cached: false,
            });
        }

        let author = metadata
            .author
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| metadata.handler.clone());
        let thumbnail = metadata
            .thumbnail
            .unwrap_or_else(|| fallback_thumbnail(platform, &author));

        Resolution::Online(StreamDetails {
            status: StreamState::Online,
            title: metadata
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Live Stream".to_string()),
            author,
            thumbnail,
            best_quality: metadata.streams.get("best").map(|s| s.url.clone()),
            stream_types: stream_types(&metadata.streams),
            all_qualities: metadata
                .streams
                .into_iter()
                .map(|(name, variant)| (name, variant.url))
                .collect(),
            category: metadata.category.unwrap_or_default(),
            stream_id: metadata.id.unwrap_or_default(),
            platform: platform.to_string(),
            cached: false,
        })
    }

    pub fn state(&self) -> StreamState {
        match self {
            Resolution::Online(details) => details.status,
            Resolution::Offline(offline) => offline.status,
        }
    }

    pub fn mark_cached(mut self) -> Self {
        match &mut self {
            Resolution::Online(details) => details.cached = true,
            Resolution::Offline(offline) => offline.cached = true,
        }
        self
    }
}

/// Structured detail attached to classified status errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetails {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Lightweight status of one stream, as returned by `/status-batch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamStatus {
    pub url: String,
    pub status: StreamState,
    pub title: String,
    pub author: String,
    pub thumbnail: String,
    pub category: String,
    pub stream_id: String,
    pub platform: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<ErrorDetails>,
    #[serde(rename = "_cached", skip_serializing_if = "is_false")]
    pub cached: bool,
}

impl StreamStatus {
    fn empty(url: &str, platform: &str, status: StreamState) -> Self {
        Self {
            url: url.to_string(),
            status,
            title: String::new(),
            author: String::new(),
            thumbnail: String::new(),
            category: String::new(),
            stream_id: String::new(),
            platform: platform.to_string(),
            error: String::new(),
            error_details: None,
            cached: false,
        }
    }

    /// An error entry with a free-text message.
    pub fn error(url: &str, platform: &str, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            ..Self::empty(url, platform, StreamState::Error)
        }
    }

    pub fn from_metadata(url: &str, platform: &str, metadata: StreamMetadata) -> Self {
        match Resolution::from_metadata(url, platform, metadata) {
            Resolution::Offline(_) => Self::empty(url, platform, StreamState::Offline),
            Resolution::Online(details) => Self {
                title: details.title,
                author: details.author,
                thumbnail: details.thumbnail,
                category: details.category,
                stream_id: details.stream_id,
                ..Self::empty(url, platform, StreamState::Online)
            },
        }
    }

    /// Status entry for a classified failure. Missing content reads as offline.
    pub fn from_failure(url: &str, platform: &str, failure: &ResolveFailure) -> Self {
        match failure {
            ResolveFailure::NoStreams { .. } => Self {
                error: "No streams available".to_string(),
                ..Self::empty(url, platform, StreamState::Offline)
            },
            ResolveFailure::NoPlugin { .. } => {
                Self::error(url, platform, "No plugin available for this URL")
            }
            ResolveFailure::BrowserRequired { .. } => Self {
                error_details: Some(ErrorDetails {
                    kind: failure.kind().to_string(),
                    message: failure.to_string(),
                    reason: Some("Platform uses anti-bot protection".to_string()),
                }),
                ..Self::error(url, platform, "Browser dependency required")
            },
            ResolveFailure::Plugin { message, .. } => {
                Self::error(url, platform, format!("Plugin error: {}", message))
            }
            ResolveFailure::Unexpected { message, .. } => {
                Self::error(url, platform, format!("Unexpected error: {}", message))
            }
        }
    }

    pub fn mark_cached(mut self) -> Self {
        self.cached = true;
        self
    }

    pub fn cache_outcome(&self) -> CachedOutcome {
        match self.status {
            StreamState::Online => CachedOutcome::Online,
            StreamState::Offline => CachedOutcome::Offline,
            StreamState::Error => CachedOutcome::Failed,
        }
    }
}

/// What the pipeline stores in the result cache.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Resolution(Result<Resolution, ResolveFailure>),
    Status(StreamStatus),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::StreamVariant;

    fn metadata(with_streams: bool) -> StreamMetadata {
        let mut streams = BTreeMap::new();
        if with_streams {
            streams.insert(
                "best".to_string(),
                StreamVariant {
                    kind: "hls".into(),
                    url: "https://cdn/best.m3u8".into(),
                },
            );
        }
        StreamMetadata {
            handler: "twitch".into(),
            title: Some(String::new()),
            author: None,
            streams,
            ..StreamMetadata::default()
        }
    }

    #[test]
    fn test_online_resolution_fills_defaults() {
        let resolution = Resolution::from_metadata("https://twitch.tv/a", "twitch", metadata(true));
        let Resolution::Online(details) = resolution else {
            panic!("expected online resolution");
        };

        assert_eq!(details.title, "Live Stream");
        assert_eq!(details.author, "twitch");
        assert_eq!(details.best_quality.as_deref(), Some("https://cdn/best.m3u8"));
        assert_eq!(details.stream_types, vec!["HLS"]);
        assert!(details.thumbnail.contains("background=9146FF"));
    }

    #[test]
    fn test_empty_streams_are_offline() {
        let resolution = Resolution::from_metadata("https://twitch.tv/a", "twitch", metadata(false));
        assert_eq!(resolution.state(), StreamState::Offline);

        let json = serde_json::to_value(resolution.mark_cached()).unwrap();
        assert_eq!(json["status"], "offline");
        assert_eq!(json["original_url"], "https://twitch.tv/a");
        assert_eq!(json["_cached"], true);
    }

    #[test]
    fn test_status_from_browser_failure() {
        let failure = ResolveFailure::BrowserRequired {
            url: "https://kick.com/a".into(),
            platform: "kick".into(),
        };
        let status = StreamStatus::from_failure("https://kick.com/a", "kick", &failure);

        assert_eq!(status.status, StreamState::Error);
        assert_eq!(status.error, "Browser dependency required");
        let details = status.error_details.unwrap();
        assert_eq!(details.kind, "browser_required");
        assert_eq!(details.message, "Kick requires browser automation");
    }

    #[test]
    fn test_status_serialization_skips_empty_fields() {
        let status = StreamStatus::from_metadata("https://twitch.tv/a", "twitch", metadata(true));
        let json = serde_json::to_value(&status).unwrap();

        assert_eq!(json["status"], "online");
        assert!(json.get("error").is_none());
        assert!(json.get("_cached").is_none());
    }
}
