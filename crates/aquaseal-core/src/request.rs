//! Operation requests accepted by the bridge.
//!
//! Hosts address the bridge with an operation name and a loose key-value
//! argument map. Both are parsed at the edge into the closed [`Operation`]
//! enum, so the dispatcher and the engine adapter only ever see validated,
//! fully-defaulted requests.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Format selector used when a download request does not name one.
pub const DEFAULT_FORMAT_ID: &str = "best";

/// Every operation name the bridge answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Look up metadata for a single video.
    GetVideoInfo,
    /// Look up a playlist and its entries.
    GetPlaylistInfo,
    /// Download a video into the Downloads directory.
    DownloadVideo,
    /// Download a thumbnail into the Pictures directory.
    DownloadThumbnail,
    /// Report the resolved Downloads directory.
    GetDownloadPath,
    /// Engine connectivity diagnostic.
    TestEngine,
}

impl OperationKind {
    /// All operation kinds, in the order they are documented.
    pub const ALL: [Self; 6] = [
        Self::GetVideoInfo,
        Self::GetPlaylistInfo,
        Self::DownloadVideo,
        Self::DownloadThumbnail,
        Self::GetDownloadPath,
        Self::TestEngine,
    ];

    /// The caller-facing name of the operation.
    pub const fn name(self) -> &'static str {
        match self {
            Self::GetVideoInfo => "getVideoInfo",
            Self::GetPlaylistInfo => "getPlaylistInfo",
            Self::DownloadVideo => "downloadVideo",
            Self::DownloadThumbnail => "downloadThumbnail",
            Self::GetDownloadPath => "getDownloadPath",
            Self::TestEngine => "testPython",
        }
    }

    /// Look up an operation by its caller-facing name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated request that must run on the engine worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// `get_video_info(url)`.
    GetVideoInfo {
        /// Video URL.
        url: String,
    },
    /// `get_playlist_info(url)`.
    GetPlaylistInfo {
        /// Playlist URL.
        url: String,
    },
    /// `download_video(url, dir, formatId)`.
    DownloadVideo {
        /// Video URL.
        url: String,
        /// Engine format selector.
        format_id: String,
    },
    /// `download_thumbnail(url, id, dir)`.
    DownloadThumbnail {
        /// Video ID the thumbnail belongs to.
        video_id: String,
        /// Fallback thumbnail URL, possibly empty.
        url: String,
    },
    /// `test()`.
    TestEngine,
}

impl Operation {
    /// Build a video metadata request.
    pub fn video_info(url: &str) -> Result<Self> {
        Ok(Self::GetVideoInfo {
            url: require(OperationKind::GetVideoInfo, Some(url), URL_REQUIRED)?,
        })
    }

    /// Build a playlist metadata request.
    pub fn playlist_info(url: &str) -> Result<Self> {
        Ok(Self::GetPlaylistInfo {
            url: require(OperationKind::GetPlaylistInfo, Some(url), URL_REQUIRED)?,
        })
    }

    /// Build a download request. A missing or empty format selects [`DEFAULT_FORMAT_ID`].
    pub fn download_video(url: &str, format_id: Option<&str>) -> Result<Self> {
        let url = require(OperationKind::DownloadVideo, Some(url), URL_REQUIRED)?;
        let format_id = format_id
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_FORMAT_ID)
            .to_string();
        Ok(Self::DownloadVideo { url, format_id })
    }

    /// Build a thumbnail download request.
    pub fn download_thumbnail(video_id: &str, url: Option<&str>) -> Result<Self> {
        Ok(Self::DownloadThumbnail {
            video_id: require(
                OperationKind::DownloadThumbnail,
                Some(video_id),
                VIDEO_ID_REQUIRED,
            )?,
            url: url.unwrap_or_default().to_string(),
        })
    }

    /// The kind of this operation.
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::GetVideoInfo { .. } => OperationKind::GetVideoInfo,
            Self::GetPlaylistInfo { .. } => OperationKind::GetPlaylistInfo,
            Self::DownloadVideo { .. } => OperationKind::DownloadVideo,
            Self::DownloadThumbnail { .. } => OperationKind::DownloadThumbnail,
            Self::TestEngine => OperationKind::TestEngine,
        }
    }
}

const URL_REQUIRED: &str = "URL is required";
const VIDEO_ID_REQUIRED: &str = "Video ID is required";

fn require(kind: OperationKind, value: Option<&str>, message: &str) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(Error::validation(kind.name(), message)),
    }
}

/// Key-value arguments of a host call.
///
/// Values are expected to be primitives. `null` is treated as absent and
/// non-string primitives are rendered to text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    /// Create an empty argument map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Read an argument as text.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A parsed host call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Work that must be queued on the engine worker.
    Engine(Operation),
    /// Answered synchronously from the path resolver.
    DownloadPath,
}

impl Call {
    /// Parse and validate a host call.
    ///
    /// Unknown operations and missing required arguments are rejected here,
    /// before anything is queued.
    pub fn parse(method: &str, args: &Arguments) -> Result<Self> {
        let kind = OperationKind::from_name(method)
            .ok_or_else(|| Error::validation(method, format!("Unknown operation: {method}")))?;

        let url = args.get_str("url");
        let operation = match kind {
            OperationKind::GetVideoInfo => Operation::video_info(url.as_deref().unwrap_or(""))?,
            OperationKind::GetPlaylistInfo => {
                Operation::playlist_info(url.as_deref().unwrap_or(""))?
            }
            OperationKind::DownloadVideo => Operation::download_video(
                url.as_deref().unwrap_or(""),
                args.get_str("formatId").as_deref(),
            )?,
            OperationKind::DownloadThumbnail => Operation::download_thumbnail(
                args.get_str("videoId").as_deref().unwrap_or(""),
                url.as_deref(),
            )?,
            OperationKind::GetDownloadPath => return Ok(Self::DownloadPath),
            OperationKind::TestEngine => Operation::TestEngine,
        };
        Ok(Self::Engine(operation))
    }

    /// The kind of operation this call addresses.
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::Engine(op) => op.kind(),
            Self::DownloadPath => OperationKind::GetDownloadPath,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names_round_trip() {
        for kind in OperationKind::ALL {
            assert_eq!(OperationKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(OperationKind::from_name("deleteEverything"), None);
    }

    #[test]
    fn test_download_video_requires_url() {
        let err = Operation::download_video("", Some("22")).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "URL is required");
    }

    #[test]
    fn test_download_video_default_format() {
        let op = Operation::download_video("https://youtu.be/x", None).unwrap();
        assert_eq!(
            op,
            Operation::DownloadVideo {
                url: "https://youtu.be/x".to_string(),
                format_id: "best".to_string(),
            }
        );

        let op = Operation::download_video("https://youtu.be/x", Some("")).unwrap();
        assert!(matches!(op, Operation::DownloadVideo { format_id, .. } if format_id == "best"));
    }

    #[test]
    fn test_download_thumbnail_requires_video_id() {
        let err = Operation::download_thumbnail("", Some("https://i.ytimg.com/x.jpg")).unwrap_err();
        assert_eq!(err.to_string(), "Video ID is required");

        let op = Operation::download_thumbnail("dQw4w9WgXcQ", None).unwrap();
        assert_eq!(
            op,
            Operation::DownloadThumbnail {
                video_id: "dQw4w9WgXcQ".to_string(),
                url: String::new(),
            }
        );
    }

    #[test]
    fn test_call_parse_get_video_info() {
        let args = Arguments::new().with("url", "https://www.youtube.com/watch?v=abc");
        let call = Call::parse("getVideoInfo", &args).unwrap();
        assert_eq!(
            call,
            Call::Engine(Operation::GetVideoInfo {
                url: "https://www.youtube.com/watch?v=abc".to_string()
            })
        );
    }

    #[test]
    fn test_call_parse_null_counts_as_missing() {
        let args = Arguments::new().with("url", Value::Null);
        let err = Call::parse("getPlaylistInfo", &args).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_call_parse_unknown_operation() {
        let err = Call::parse("formatDisk", &Arguments::new()).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("formatDisk"));
    }

    #[test]
    fn test_call_parse_download_path_needs_no_args() {
        let call = Call::parse("getDownloadPath", &Arguments::new()).unwrap();
        assert_eq!(call, Call::DownloadPath);
        assert_eq!(call.kind(), OperationKind::GetDownloadPath);
    }

    #[test]
    fn test_call_parse_numeric_format_id() {
        let args = Arguments::new()
            .with("url", "https://youtu.be/x")
            .with("formatId", 137);
        let call = Call::parse("downloadVideo", &args).unwrap();
        assert!(matches!(
            call,
            Call::Engine(Operation::DownloadVideo { format_id, .. }) if format_id == "137"
        ));
    }

    #[test]
    fn test_call_parse_test_python() {
        let call = Call::parse("testPython", &Arguments::new()).unwrap();
        assert_eq!(call, Call::Engine(Operation::TestEngine));
    }
}
