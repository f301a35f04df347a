//! Success payloads delivered to callers.
//!
//! Field names are serialized in camelCase to match what hosts expect on the
//! wire (`viewCount`, `videoCount`, ...).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata for a single video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    /// Video ID.
    pub id: String,
    /// Video title.
    pub title: String,
    /// Channel/uploader name.
    pub channel: String,
    /// Duration in seconds.
    pub duration: u64,
    /// Thumbnail URL.
    pub thumbnail: String,
    /// Description (possibly truncated by the engine).
    pub description: String,
    /// View count.
    pub view_count: u64,
    /// Like count.
    pub like_count: u64,
    /// Available formats, exactly as the engine listed them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formats: Option<Vec<Value>>,
}

/// Metadata for a playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistInfo {
    /// Playlist ID.
    pub id: String,
    /// Playlist title.
    pub title: String,
    /// Channel/uploader name.
    pub channel: String,
    /// Number of videos reported by the engine.
    pub video_count: u64,
    /// Playlist entries, exactly as the engine listed them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub videos: Option<Vec<Value>>,
}

/// Result of a video download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOutcome {
    /// Whether the engine reported success.
    pub success: bool,
    /// Path of the downloaded file.
    pub filename: String,
    /// Video title.
    pub title: String,
    /// Duration in seconds.
    pub duration: u64,
}

/// Result of a thumbnail download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailOutcome {
    /// Always `true` for a delivered thumbnail.
    pub success: bool,
    /// Path of the saved image.
    pub path: String,
}

/// Result of the engine diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticOutcome {
    /// Raw text returned by the engine.
    pub result: String,
    /// Always `true` when the engine answered.
    pub success: bool,
}

/// Any operation's success payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// `getVideoInfo`.
    Video(VideoInfo),
    /// `getPlaylistInfo`.
    Playlist(PlaylistInfo),
    /// `downloadVideo`.
    Download(DownloadOutcome),
    /// `downloadThumbnail`.
    Thumbnail(ThumbnailOutcome),
    /// `testPython`.
    Diagnostic(DiagnosticOutcome),
}

/// Extraction of a concrete payload type from [`Payload`].
pub trait FromPayload: Sized {
    /// Returns `None` when the payload belongs to another operation.
    fn from_payload(payload: Payload) -> Option<Self>;
}

impl FromPayload for Payload {
    fn from_payload(payload: Payload) -> Option<Self> {
        Some(payload)
    }
}

macro_rules! impl_from_payload {
    ($ty:ty, $variant:ident) => {
        impl FromPayload for $ty {
            fn from_payload(payload: Payload) -> Option<Self> {
                match payload {
                    Payload::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

impl_from_payload!(VideoInfo, Video);
impl_from_payload!(PlaylistInfo, Playlist);
impl_from_payload!(DownloadOutcome, Download);
impl_from_payload!(ThumbnailOutcome, Thumbnail);
impl_from_payload!(DiagnosticOutcome, Diagnostic);
